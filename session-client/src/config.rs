use std::time::Duration;

/// Applied to every outbound call, refreshes included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://portfolio.example.com/api`
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `PORTFOLIO_API_URL` and `PORTFOLIO_API_TIMEOUT_SECS`, loading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let config = std::env::var("PORTFOLIO_API_URL")
            .map(Self::new)
            .unwrap_or_default();

        match std::env::var("PORTFOLIO_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = ClientConfig::new("http://api.local/api/");
        assert_eq!(config.url("/projects"), "http://api.local/api/projects");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
