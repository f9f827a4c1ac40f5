//! Cookie-carrying HTTP session against CampusOffice.
//!
//! Two `reqwest` clients share one cookie jar: the default client follows
//! redirects, the login client does not, so the login redirect target can be
//! inspected for the failure marker.

use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::cookie::Jar;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, redirect};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

use super::config::CampusConfig;

/// An HTTP session with CampusOffice.
pub struct CampusSession {
    /// Follows redirects.
    client: Client,
    /// Never follows redirects; used for the login form.
    login_client: Client,
    config: CampusConfig,
}

impl CampusSession {
    /// Creates a session with an empty cookie jar.
    pub fn new(config: CampusConfig) -> SyncResult<Self> {
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SyncError::transport(format!("Failed to create HTTP client: {}", e)).with_source(e)
            })?;

        let login_client = Client::builder()
            .cookie_provider(jar)
            .redirect(redirect::Policy::none())
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SyncError::transport(format!("Failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            client,
            login_client,
            config,
        })
    }

    /// Fetches the landing page so the server hands out session cookies.
    pub async fn open(&self) -> SyncResult<()> {
        info!("Fetch base page for session cookie");
        self.get(self.config.landing_url(), "landing page").await?;
        Ok(())
    }

    /// Submits the login form and validates the session.
    ///
    /// The response must redirect; a redirect target containing the failure
    /// marker means the credentials were rejected.
    pub async fn login(&self) -> SyncResult<()> {
        info!("Validate session by logging in");
        let login_url = endpoint(self.config.login_url())?;
        let credentials = &self.config.credentials;
        let form = [
            ("u", credentials.matriculation()),
            ("p", credentials.password()),
        ];

        let response = self
            .login_client
            .post(login_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error("login", e))?;

        let status = response.status();
        trace!(status = %status, "Login response");
        if status.is_client_error() || status.is_server_error() {
            return Err(SyncError::transport(format!(
                "login request failed with status {}",
                status
            )));
        }

        let Some(target) = redirect_target(&login_url, &response) else {
            return Err(SyncError::authentication(
                "CampusOffice login failed: login did not redirect",
            ));
        };

        if target.as_str().contains(CampusConfig::LOGIN_FAILED_MARKER) {
            return Err(SyncError::authentication(
                "CampusOffice login failed: Maybe invalid username/password?",
            ));
        }

        debug!(target = %target, "Following login redirect");
        self.get(target, "login redirect").await?;
        Ok(())
    }

    /// Downloads the iCalendar export for the given days.
    ///
    /// The body is decoded as UTF-8 whatever charset the server declares.
    pub async fn export(&self, start: NaiveDate, end: NaiveDate) -> SyncResult<String> {
        info!("Retrieve calendar");
        let mut url = endpoint(self.config.export_url())?;
        url.query_pairs_mut()
            .append_pair("startdt", &export_start(start))
            .append_pair("enddt", &export_end(end));

        let response = self.get(url, "calendar export").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("calendar export", e))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Invalidates the session.
    ///
    /// Failures are logged and swallowed; the caller's result must not
    /// depend on whether the logout went through.
    pub async fn logout(&self) {
        info!("Invalidating session by logging out");
        let url = match self.config.logout_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not build logout URL");
                return;
            }
        };
        if let Err(e) = self.get(url, "logout").await {
            warn!(error = %e, "CampusOffice logout failed");
        }
    }

    async fn get(&self, url: Url, what: &str) -> SyncResult<Response> {
        trace!(url = %url, "GET {}", what);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(what, e))?;

        response.error_for_status().map_err(|e| transport_error(what, e))
    }
}

/// Formats the first export day as `DD.MM.YYYY`.
pub fn export_start(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Formats the last export day, extended to the last second of that day.
pub fn export_end(date: NaiveDate) -> String {
    date.format("%d.%m.%Y 23:59:59").to_string()
}

fn redirect_target(base: &Url, response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    base.join(location).ok()
}

fn endpoint(url: Result<Url, url::ParseError>) -> SyncResult<Url> {
    url.map_err(|e| SyncError::config(format!("invalid CampusOffice URL: {}", e)).with_source(e))
}

fn transport_error(what: &str, err: reqwest::Error) -> SyncError {
    SyncError::transport(format!("{} request failed: {}", what, err)).with_source(err)
}
