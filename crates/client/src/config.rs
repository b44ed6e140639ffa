//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::ClientResult;

/// Default quiet period for quantity edits.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(400);

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where and how the client talks to the storefront.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront base URL, e.g. `http://localhost:3000`.
    pub base_url: Url,
    /// File holding the anonymous shopper's cart.
    pub local_cart_path: PathBuf,
    /// Quiet period used to coalesce quantity edits.
    pub debounce_window: Duration,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            local_cart_path: PathBuf::from("stockroom-cart.json"),
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Persist the local cart at `path`.
    #[must_use]
    pub fn with_local_cart_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_cart_path = path.into();
        self
    }

    #[must_use]
    pub const fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:3000").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.debounce_window, DEFAULT_DEBOUNCE_WINDOW);
        assert_eq!(config.local_cart_path, PathBuf::from("stockroom-cart.json"));
    }

    #[test]
    fn test_rejects_invalid_url() {
        assert!(ClientConfig::new("not a url").is_err());
    }
}
