//! Query string helpers for the BinaryLane API

/// Build a URL-encoded query string from key/value filters
pub fn build_query_string(filters: &[(&str, &str)]) -> String {
    filters
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
