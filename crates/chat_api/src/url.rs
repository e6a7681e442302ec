/// Default base URL for chat API requests.
pub const DEFAULT_BASE_URL: &str = "https://api.sidechat.dev/v1";

pub const MODELS_PATH: &str = "/models";
pub const CHAT_PATH: &str = "/chat";

/// Normalize a configured base URL.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_BASE_URL`]
/// 2) surrounding whitespace and trailing slashes are removed
/// 3) an endpoint path already present at the end (`/models`, `/chat`) is stripped
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    for suffix in [MODELS_PATH, CHAT_PATH] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.trim_end_matches('/').to_string();
        }
    }
    trimmed.to_string()
}

/// Model catalog endpoint for `base_url`.
pub fn models_endpoint(base_url: &str) -> String {
    format!("{}{MODELS_PATH}", normalize_base_url(base_url))
}

/// Chat completion endpoint for `base_url`.
pub fn chat_endpoint(base_url: &str) -> String {
    format!("{}{CHAT_PATH}", normalize_base_url(base_url))
}
