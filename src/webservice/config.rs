use std::time::Duration;
use url::Url;

use crate::core::{MapperError, Result};

/// HTTP client configuration for one remote API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme, host, port and optional path prefix of the API
    pub base_url: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Whole-request timeout
    pub request_timeout: Option<Duration>,

    /// Headers sent with every request
    pub headers: Vec<(String, String)>,

    pub user_agent: String,

    /// Basic auth credentials
    pub credentials: Option<(String, Option<String>)>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(30)),
            headers: Vec::new(),
            user_agent: format!("webmapper/{}", env!("CARGO_PKG_VERSION")),
            credentials: None,
        }
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Disable the request timeout
    pub fn no_request_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set basic auth credentials
    pub fn basic_auth(mut self, username: &str, password: Option<&str>) -> Self {
        self.credentials = Some((username.to_string(), password.map(str::to_string)));
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Parse from a base URL
    ///
    /// Format: "http(s)://[user:password@]host[:port][/prefix]". Credentials
    /// are moved out of the URL into basic auth.
    ///
    /// # Examples
    ///
    /// ```
    /// use webmapper::webservice::ClientConfig;
    ///
    /// let config = ClientConfig::from_url("https://api.example.com:8443/v1").unwrap();
    /// assert_eq!(config.base_url, "https://api.example.com:8443/v1");
    /// ```
    pub fn from_url(raw: &str) -> Result<Self> {
        let mut url = Url::parse(raw).map_err(|e| MapperError::InvalidConfig(e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(MapperError::InvalidConfig(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(MapperError::InvalidConfig("URL has no host".to_string()));
        }

        let credentials = (!url.username().is_empty())
            .then(|| (url.username().to_string(), url.password().map(str::to_string)));
        // Neither call can fail on an http(s) URL with a host.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_query(None);
        url.set_fragment(None);

        let mut config = Self::new(url.as_str());
        config.credentials = credentials;
        Ok(config)
    }

    /// Absolute URL of a path relative to the API root
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Convert to URL string without credentials
    pub fn to_url(&self) -> String {
        self.base_url.clone()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(MapperError::InvalidConfig("base URL cannot be empty".to_string()));
        }

        Url::parse(&self.base_url).map_err(|e| MapperError::InvalidConfig(e.to_string()))?;

        if self.connect_timeout.is_zero() {
            return Err(MapperError::InvalidConfig(
                "connect_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost")
    }
}
