use chat_api::url::DEFAULT_BASE_URL;
use chat_api::{chat_endpoint, models_endpoint, normalize_base_url};

#[test]
fn blank_base_url_falls_back_to_default() {
    assert_eq!(normalize_base_url("  "), DEFAULT_BASE_URL);
}

#[test]
fn trailing_slashes_are_trimmed() {
    assert_eq!(
        normalize_base_url("https://example.test/api///"),
        "https://example.test/api"
    );
}

#[test]
fn endpoint_suffix_in_base_url_is_stripped() {
    assert_eq!(
        normalize_base_url("https://example.test/api/models"),
        "https://example.test/api"
    );
    assert_eq!(
        normalize_base_url("https://example.test/api/chat/"),
        "https://example.test/api"
    );
}

#[test]
fn endpoints_join_normalized_base() {
    assert_eq!(
        models_endpoint("https://example.test/api/"),
        "https://example.test/api/models"
    );
    assert_eq!(
        chat_endpoint("https://example.test/api"),
        "https://example.test/api/chat"
    );
}
