use std::time::Duration;

/// Control-plane client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base API URL, joined with [`version`](Self::version) and the endpoint
    /// path on every request.
    pub base_url: String,
    /// API version path segment.
    pub version: String,
    pub client_id: String,
    pub auth_token: String,
    /// Send credentials as query parameters instead of headers.
    pub url_auth: bool,
    /// Per-request timeout. `None` keeps reqwest's default.
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.reelpost.tv/api/".into(),
            version: "v2".into(),
            client_id: String::new(),
            auth_token: String::new(),
            url_auth: false,
            timeout: None,
        }
    }
}
