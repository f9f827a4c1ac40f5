//! Sync configuration.
//!
//! One TOML file holds both accounts and the optional time period:
//!
//! ```toml
//! [campus]
//! matriculation = "123456"
//! password = "env::CAMPUS_PASSWORD"
//!
//! [caldav]
//! url = "https://dav.example.com/calendars/me/uni/"
//! username = "me"
//! password = "pass::dav/me"
//!
//! [period]
//! start = "2024-01-01"
//! end = "2024-01-07"
//! ```
//!
//! Password values support secret references (see [`crate::secret`]).

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use campussync_core::SyncWindow;
use campussync_providers::caldav::CalDavConfig;
use campussync_providers::campus::{CampusConfig, CampusCredentials};
use campussync_providers::{SyncError, SyncResult};

use crate::secret;

/// The configuration file as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// CampusOffice account.
    pub campus: CampusSection,

    /// Destination calendar.
    pub caldav: CalDavSection,

    /// Time period to synchronize.
    pub period: PeriodSection,
}

/// `[campus]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CampusSection {
    pub matriculation: Option<String>,
    pub password: Option<String>,
    /// Overrides the production CampusOffice URL.
    pub base_url: Option<String>,
}

/// `[caldav]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalDavSection {
    /// URL of the target calendar collection; discovery starts here too.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_tls: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// `[period]`, both bounds or neither.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodSection {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub campus: CampusConfig,
    pub caldav: CalDavConfig,
    /// The calendar URL discovery has to find.
    pub calendar_url: String,
    pub window: SyncWindow,
}

impl SyncConfig {
    /// Loads configuration from a file.
    pub fn load_from(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("failed to read {}: {}", path.display(), e)).with_source(e)
        })?;
        toml::from_str(&content).map_err(|e| {
            SyncError::config(format!("failed to parse {}: {}", path.display(), e.message()))
                .with_source(e)
        })
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> SyncResult<Self> {
        toml::from_str(content)
            .map_err(|e| SyncError::config(e.message().to_string()).with_source(e))
    }

    /// Validates the configuration and resolves secret references.
    ///
    /// Every required field is checked before any secret is resolved, and
    /// nothing here touches the network.
    pub fn into_settings(self, today: NaiveDate) -> SyncResult<SyncSettings> {
        let matriculation = required(self.campus.matriculation, "campus.matriculation")?;
        let campus_password = required(self.campus.password, "campus.password")?;
        let url = required(self.caldav.url, "caldav.url")?;
        let username = required(self.caldav.username, "caldav.username")?;
        let caldav_password = required(self.caldav.password, "caldav.password")?;

        let window = self.period.window(today)?;

        let credentials = CampusCredentials::new(matriculation, resolve_secret(&campus_password)?);
        let mut campus = CampusConfig::new(credentials);
        if let Some(base_url) = self.campus.base_url {
            campus = campus.with_base_url(&base_url).map_err(|e| {
                SyncError::config(format!("invalid campus.base_url `{}`: {}", base_url, e))
            })?;
        }

        let mut caldav = CalDavConfig::new(
            &url,
            resolve_secret(&username)?,
            resolve_secret(&caldav_password)?,
        )
        .map_err(|e| SyncError::config(format!("invalid caldav.url `{}`: {}", url, e)))?;
        if self.caldav.verify_tls == Some(false) {
            caldav = caldav.with_insecure_tls();
        }
        if let Some(secs) = self.caldav.timeout_secs {
            caldav = caldav.with_timeout(Duration::from_secs(secs));
        }

        Ok(SyncSettings {
            calendar_url: caldav.url_str().to_string(),
            campus,
            caldav,
            window,
        })
    }
}

impl PeriodSection {
    /// Builds the window, falling back to the default around `today`.
    pub fn window(&self, today: NaiveDate) -> SyncResult<SyncWindow> {
        let start = self.start.as_deref().map(SyncWindow::parse_date).transpose()?;
        let end = self.end.as_deref().map(SyncWindow::parse_date).transpose()?;
        Ok(SyncWindow::from_bounds(start, end, today)?)
    }
}

fn required(value: Option<String>, field: &str) -> SyncResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SyncError::config(format!("missing `{}`", field)))
}

fn resolve_secret(value: &str) -> SyncResult<String> {
    secret::resolve(value).map_err(|e| SyncError::config(e.to_string()).with_source(e))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use campussync_providers::SyncErrorKind;

    use super::*;

    const FULL: &str = r#"
[campus]
matriculation = "123456"
password = "campus-pw"

[caldav]
url = "https://dav.example.com/calendars/me/uni/"
username = "me"
password = "dav-pw"
timeout_secs = 5

[period]
start = "2024-01-01"
end = "2024-01-07"
"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn loads_full_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let settings = SyncConfig::load_from(file.path())
            .unwrap()
            .into_settings(today())
            .unwrap();

        assert_eq!(settings.campus.credentials.matriculation(), "123456");
        assert_eq!(settings.campus.credentials.password(), "campus-pw");
        assert_eq!(
            settings.calendar_url,
            "https://dav.example.com/calendars/me/uni/"
        );
        assert_eq!(settings.caldav.username, "me");
        assert_eq!(settings.caldav.timeout, Duration::from_secs(5));
        assert!(settings.caldav.verify_tls);
        assert_eq!(settings.window.start(), date(2024, 1, 1));
        assert_eq!(settings.window.end(), date(2024, 1, 7));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Config);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[campus\nmatriculation = ").unwrap();
        let err = SyncConfig::load_from(file.path()).unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Config);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SyncConfig::parse("[campus]\nusername = \"x\"\n").unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Config);
    }

    #[test]
    fn missing_fields_are_named() {
        let config = SyncConfig::parse(&FULL.replace("username = \"me\"\n", "")).unwrap();
        let err = config.into_settings(today()).unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Config);
        assert!(err.message().contains("caldav.username"));

        let err = SyncConfig::default().into_settings(today()).unwrap_err();
        assert!(err.message().contains("campus.matriculation"));
    }

    #[test]
    fn absent_period_uses_default_window() {
        let content = FULL.split("[period]").next().unwrap();
        let settings = SyncConfig::parse(content)
            .unwrap()
            .into_settings(today())
            .unwrap();
        assert_eq!(settings.window, SyncWindow::around(today()));
    }

    #[test]
    fn one_sided_period_is_a_config_error() {
        let content = FULL.replace("end = \"2024-01-07\"\n", "");
        let err = SyncConfig::parse(&content)
            .unwrap()
            .into_settings(today())
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Config);
    }

    #[test]
    fn malformed_or_inverted_period_is_a_window_error() {
        let bad = FULL.replace("2024-01-07", "07.01.2024");
        let err = SyncConfig::parse(&bad)
            .unwrap()
            .into_settings(today())
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::InvalidWindow);

        let inverted = FULL.replace("2024-01-07", "2023-12-24");
        let err = SyncConfig::parse(&inverted)
            .unwrap()
            .into_settings(today())
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::InvalidWindow);
    }

    #[test]
    fn secret_references_are_resolved() {
        unsafe {
            std::env::set_var("_CAMPUSSYNC_CONFIG_TEST_PW", "from-env");
        }
        let content = FULL.replace("\"campus-pw\"", "\"env::_CAMPUSSYNC_CONFIG_TEST_PW\"");
        let settings = SyncConfig::parse(&content)
            .unwrap()
            .into_settings(today())
            .unwrap();
        assert_eq!(settings.campus.credentials.password(), "from-env");
        unsafe {
            std::env::remove_var("_CAMPUSSYNC_CONFIG_TEST_PW");
        }

        let content = FULL.replace("\"dav-pw\"", "\"env::_CAMPUSSYNC_UNSET_VAR_98765\"");
        let err = SyncConfig::parse(&content)
            .unwrap()
            .into_settings(today())
            .unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Config);
    }

    #[test]
    fn overrides_are_applied() {
        let content = FULL
            .replace(
                "password = \"campus-pw\"",
                "password = \"campus-pw\"\nbase_url = \"http://127.0.0.1:8080/office\"",
            )
            .replace("timeout_secs = 5", "verify_tls = false");
        let settings = SyncConfig::parse(&content)
            .unwrap()
            .into_settings(today())
            .unwrap();
        assert_eq!(
            settings.campus.base_url.as_str(),
            "http://127.0.0.1:8080/office/"
        );
        assert!(!settings.caldav.verify_tls);
    }
}
