use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use chat_service::{ChatService, CredentialStore};
use chat_service_mock::MockChatService;
use side_panel::config::{PanelConfig, ProviderKind};
use side_panel::events::{PanelAction, PanelEvent, RenderPlan};
use side_panel::runtime::{PanelRuntime, WakeCallback};
use side_panel::services::service_from_config;
use side_panel::session::Mode;

fn runtime_for(
    config: &PanelConfig,
    service: Arc<dyn ChatService>,
) -> (PanelRuntime, Arc<Mutex<Vec<PanelEvent>>>) {
    let store: Arc<dyn CredentialStore> =
        Arc::new(config.credential_store().expect("explicit settings path"));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let (wake_sender, _wakes) = mpsc::channel::<()>();
    let wake: WakeCallback = Arc::new(move || {
        let _ = wake_sender.send(());
    });

    let runtime = PanelRuntime::new(
        service,
        store,
        Box::new(move |event| {
            if let Ok(mut events) = sink_events.lock() {
                events.push(event);
            }
        }),
        wake,
    );
    (runtime, events)
}

#[test]
fn credential_entered_once_is_used_by_the_next_panel() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = PanelConfig {
        settings_path: Some(dir.path().join("sidechat").join("settings.json")),
        provider: ProviderKind::Mock,
        ..PanelConfig::default()
    };

    let (mut first, _) = runtime_for(&config, Arc::new(MockChatService::new()));
    first.handle(PanelAction::Show);
    assert_eq!(first.session().mode(), &Mode::NoCredential);
    first.handle(PanelAction::SetCredential {
        secret: "validkey".to_string(),
    });
    assert_eq!(first.session().mode(), &Mode::Ready);
    first.handle(PanelAction::Dispose);

    let service = service_from_config(&config).expect("mock service");
    let (mut second, events) = runtime_for(&config, service);
    second.handle(PanelAction::Show);

    assert_eq!(second.session().mode(), &Mode::Ready);
    let events = events.lock().expect("events lock").clone();
    assert_matches!(
        events.as_slice(),
        [PanelEvent::Render(RenderPlan::Chat { models, .. })] if models.len() == 2
    );
}

#[test]
fn malformed_settings_file_routes_to_onboarding() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ nope").expect("seed settings");
    let config = PanelConfig {
        settings_path: Some(path),
        ..PanelConfig::default()
    };

    let service = Arc::new(MockChatService::new());
    let (mut runtime, events) = runtime_for(&config, Arc::clone(&service) as Arc<dyn ChatService>);
    runtime.handle(PanelAction::Show);

    assert_eq!(runtime.session().mode(), &Mode::NoCredential);
    assert_eq!(service.list_models_calls(), 0);
    assert_eq!(
        events.lock().expect("events lock").as_slice(),
        &[PanelEvent::Render(RenderPlan::Onboarding)]
    );
}
