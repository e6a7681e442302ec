use std::sync::Arc;

use chat_service::{ChatService, ServiceInitError};
use chat_service_http::{HttpChatService, HttpChatServiceConfig};
use chat_service_mock::MockChatService;

use crate::config::{PanelConfig, ProviderKind};

/// Builds the chat service selected by `config.provider`.
pub fn service_from_config(config: &PanelConfig) -> Result<Arc<dyn ChatService>, ServiceInitError> {
    match config.provider {
        ProviderKind::Http => {
            let service = HttpChatService::new(
                HttpChatServiceConfig::new()
                    .with_base_url(config.base_url.clone())
                    .with_timeout(config.timeout),
            )?;
            Ok(Arc::new(service))
        }
        ProviderKind::Mock => Ok(Arc::new(MockChatService::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_resolves_to_mock_service() {
        let config = PanelConfig {
            provider: ProviderKind::Mock,
            ..PanelConfig::default()
        };

        let service = service_from_config(&config).expect("mock service should build");
        assert_eq!(service.service_id(), "mock");
    }

    #[test]
    fn http_provider_resolves_with_default_base_url() {
        let service =
            service_from_config(&PanelConfig::default()).expect("http service should build");
        assert_eq!(service.service_id(), "http");
    }

    #[test]
    fn http_provider_rejects_unsupported_base_url() {
        let config = PanelConfig {
            base_url: "ftp://example.com/v1".to_string(),
            ..PanelConfig::default()
        };

        assert!(service_from_config(&config).is_err());
    }
}
