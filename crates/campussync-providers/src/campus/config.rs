//! CampusOffice connection configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

/// Matriculation number and password for CampusOffice.
#[derive(Clone, PartialEq, Eq)]
pub struct CampusCredentials {
    matriculation: String,
    password: String,
}

impl CampusCredentials {
    /// Creates a credential pair.
    pub fn new(matriculation: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            matriculation: matriculation.into(),
            password: password.into(),
        }
    }

    /// The account identifier submitted as `u`.
    pub fn matriculation(&self) -> &str {
        &self.matriculation
    }

    /// The password submitted as `p`.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for CampusCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampusCredentials")
            .field("matriculation", &self.matriculation)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for the CampusOffice fetcher.
#[derive(Debug, Clone)]
pub struct CampusConfig {
    /// Base URL all CampusOffice paths are relative to.
    pub base_url: Url,

    /// Login credentials.
    pub credentials: CampusCredentials,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl CampusConfig {
    /// Production CampusOffice base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://www.campus.rwth-aachen.de/office/";

    /// Login form target.
    pub const LOGIN_PATH: &'static str = "views/campus/redirect.asp";

    /// iCalendar export endpoint.
    pub const EXPORT_PATH: &'static str = "views/calendar/iCalExport.asp";

    /// Logout endpoint.
    pub const LOGOUT_PATH: &'static str = "system/login/logoff.asp";

    /// Marker in the login redirect target that signals rejected credentials.
    pub const LOGIN_FAILED_MARKER: &'static str = "loginfailed";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration against the production CampusOffice.
    pub fn new(credentials: CampusCredentials) -> Self {
        Self {
            base_url: Url::parse(Self::DEFAULT_BASE_URL).expect("default base URL is valid"),
            credentials,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("campussync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets a different base URL.
    ///
    /// A trailing slash is added if missing so relative paths join below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let raw = base_url.as_ref();
        let parsed = if raw.ends_with('/') {
            Url::parse(raw)?
        } else {
            Url::parse(&format!("{}/", raw))?
        };
        self.base_url = parsed;
        Ok(self)
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Landing page used to obtain session cookies.
    pub fn landing_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Login form target.
    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(Self::LOGIN_PATH)
    }

    /// Export endpoint, without query parameters.
    pub fn export_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(Self::EXPORT_PATH)
    }

    /// Logout endpoint.
    pub fn logout_url(&self) -> Result<Url, url::ParseError> {
        self.base_url.join(Self::LOGOUT_PATH)
    }
}
