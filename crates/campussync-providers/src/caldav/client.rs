//! HTTP client for CalDAV operations.
//!
//! Wraps `reqwest` with the WebDAV methods the synchronizer needs and with
//! challenge-driven Basic/Digest authentication. The first request goes out
//! without credentials; a 401 challenge selects the scheme, and from then on
//! every request carries an `Authorization` header right away. A later 401
//! with a new challenge (an expired Digest nonce) is answered once.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MATCH, WWW_AUTHENTICATE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use super::auth::AuthScheme;
use super::config::CalDavConfig;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// A failed CalDAV request.
#[derive(Debug, Error)]
pub enum DavError {
    #[error("authentication failed")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(&'static str),
}

impl DavError {
    /// Returns true if the server refused the credentials or the access.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

/// HTTP client for CalDAV operations.
pub struct CalDavClient {
    client: Client,
    config: CalDavConfig,
    /// Scheme chosen from the first challenge.
    scheme: Option<AuthScheme>,
}

impl CalDavClient {
    /// Creates a client; no request is made yet.
    pub fn new(config: CalDavConfig) -> Result<Self, DavError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            scheme: None,
        })
    }

    /// Performs a PROPFIND and returns the multistatus body.
    pub async fn propfind(&mut self, url: &str, body: &str, depth: u8) -> Result<String, DavError> {
        let response = self
            .send(dav_method("PROPFIND")?, url, |req| {
                req.header("Depth", depth.to_string())
                    .header(CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(body.to_string())
            })
            .await?;
        Ok(response.text().await?)
    }

    /// Performs a depth-1 REPORT and returns the multistatus body.
    pub async fn report(&mut self, url: &str, body: &str) -> Result<String, DavError> {
        let response = self
            .send(dav_method("REPORT")?, url, |req| {
                req.header("Depth", "1")
                    .header(CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(body.to_string())
            })
            .await?;
        Ok(response.text().await?)
    }

    /// Deletes a resource, only if it still matches `etag` when one is given.
    pub async fn delete(&mut self, url: &str, etag: Option<&str>) -> Result<(), DavError> {
        self.send(Method::DELETE, url, |req| match etag {
            Some(etag) => req.header(IF_MATCH, format!("\"{}\"", etag)),
            None => req,
        })
        .await?;
        Ok(())
    }

    /// Stores a calendar object, replacing any resource already at `url`,
    /// and returns its ETag, if reported.
    pub async fn put(&mut self, url: &str, ics: &str) -> Result<Option<String>, DavError> {
        let response = self
            .send(Method::PUT, url, |req| {
                req.header(CONTENT_TYPE, ICS_CONTENT_TYPE)
                    .body(ics.to_string())
            })
            .await?;
        Ok(response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string()))
    }

    async fn send<F>(&mut self, method: Method, url: &str, decorate: F) -> Result<Response, DavError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let target = Url::parse(url)?;
        let mut challenged = false;

        if self.scheme.is_none() {
            trace!(method = %method, url = %url, "Sending request");
            let response = decorate(self.client.request(method.clone(), target.clone()))
                .send()
                .await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return check_status(response).await;
            }

            let scheme = AuthScheme::from_challenge(challenge(&response).unwrap_or_default());
            debug!(scheme = scheme_name(&scheme), "Received 401, authenticating");
            self.scheme = Some(scheme);
            challenged = true;
        }

        loop {
            let authorization = self.authorization(&method, &target);
            trace!(method = %method, url = %url, "Sending authenticated request");
            let response = decorate(self.client.request(method.clone(), target.clone()))
                .header(AUTHORIZATION, authorization)
                .send()
                .await?;

            // A server may expire a Digest nonce at any time; answer the
            // fresh challenge once before giving up.
            if response.status() == StatusCode::UNAUTHORIZED && !challenged {
                if let Some(header) = challenge(&response) {
                    let scheme = AuthScheme::from_challenge(header);
                    debug!(
                        scheme = scheme_name(&scheme),
                        "Credentials rejected, answering new challenge"
                    );
                    self.scheme = Some(scheme);
                    challenged = true;
                    continue;
                }
            }

            return check_status(response).await;
        }
    }

    fn authorization(&mut self, method: &Method, target: &Url) -> String {
        let uri = match target.query() {
            Some(query) => format!("{}?{}", target.path(), query),
            None => target.path().to_string(),
        };
        let scheme = self.scheme.get_or_insert(AuthScheme::Basic);
        scheme.authorization(
            method.as_str(),
            &uri,
            &self.config.username,
            &self.config.password,
        )
    }
}

fn challenge(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
}

fn dav_method(name: &'static str) -> Result<Method, DavError> {
    Method::from_bytes(name.as_bytes()).map_err(|_| DavError::InvalidMethod(name))
}

fn scheme_name(scheme: &AuthScheme) -> &'static str {
    match scheme {
        AuthScheme::Basic => "basic",
        AuthScheme::Digest(_) => "digest",
    }
}

async fn check_status(response: Response) -> Result<Response, DavError> {
    let status = response.status();
    trace!(status = %status, "Received response");

    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(DavError::Unauthorized),
        StatusCode::FORBIDDEN => Err(DavError::Forbidden),
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(DavError::NotFound),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(DavError::Status { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, header_exists, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> CalDavClient {
        let config = CalDavConfig::new(server.uri(), "me", "secret").unwrap();
        CalDavClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn basic_challenge_is_answered_and_remembered() {
        let server = MockServer::start().await;
        Mock::given(header("authorization", "Basic bWU6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(207).set_body_string("<multistatus/>"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PROPFIND"))
            .respond_with(
                ResponseTemplate::new(401).insert_header("www-authenticate", r#"Basic realm="dav""#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let url = format!("{}/principals/me/", server.uri());
        assert_eq!(client.propfind(&url, "<x/>", 0).await.unwrap(), "<multistatus/>");
        // Second request carries credentials without another challenge.
        client.propfind(&url, "<x/>", 0).await.unwrap();
    }

    #[tokio::test]
    async fn digest_challenge_is_answered() {
        let server = MockServer::start().await;
        Mock::given(method("REPORT"))
            .and(header_exists("authorization"))
            .and(header("depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                r#"Digest realm="dav", nonce="n0", qop="auth""#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        let url = format!("{}/cal/", server.uri());
        assert_eq!(client.report(&url, "<q/>").await.unwrap(), "ok");
        assert!(matches!(client.scheme, Some(AuthScheme::Digest(_))));
    }

    #[tokio::test]
    async fn rejected_credentials_are_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("PROPFIND"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server)
            .propfind(&server.uri(), "<x/>", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DavError::Unauthorized));
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn put_sends_calendar_and_returns_etag() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cal/a.ics"))
            .and(header("content-type", ICS_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(201).insert_header("etag", "\"v1\""))
            .expect(1)
            .mount(&server)
            .await;

        let etag = client(&server)
            .put(&format!("{}/cal/a.ics", server.uri()), "BEGIN:VCALENDAR")
            .await
            .unwrap();
        assert_eq!(etag.as_deref(), Some("v1"));

        // Existing resources are overwritten, not refused.
        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("if-none-match"));
    }

    #[tokio::test]
    async fn delete_sends_known_etag_as_precondition() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/cal/a.ics"))
            .and(header("if-match", "\"v7\""))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete(&format!("{}/cal/a.ics", server.uri()), Some("v7"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_digest_nonce_is_renegotiated() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(header_regex("authorization", r#"nonce="n0""#))
            .respond_with(ResponseTemplate::new(201))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(header_regex("authorization", r#"nonce="n1""#))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                r#"Digest realm="dav", nonce="n1", qop="auth", stale=true"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server);
        client.scheme = Some(AuthScheme::from_challenge(
            r#"Digest realm="dav", nonce="n0", qop="auth""#,
        ));

        client
            .put(&format!("{}/cal/a.ics", server.uri()), "BEGIN:VCALENDAR")
            .await
            .unwrap();
        client
            .put(&format!("{}/cal/b.ics", server.uri()), "BEGIN:VCALENDAR")
            .await
            .unwrap();
        assert!(matches!(
            &client.scheme,
            Some(AuthScheme::Digest(challenge)) if challenge.nonce == "n1"
        ));
    }

    #[tokio::test]
    async fn repeated_rejection_after_new_challenge_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                r#"Digest realm="dav", nonce="fresh", qop="auth""#,
            ))
            .expect(2)
            .mount(&server)
            .await;

        let mut client = client(&server);
        client.scheme = Some(AuthScheme::Basic);

        let err = client
            .delete(&format!("{}/cal/a.ics", server.uri()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DavError::Unauthorized));
    }

    #[tokio::test]
    async fn error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/cal/gone.ics"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/cal/locked.ics"))
            .respond_with(ResponseTemplate::new(423).set_body_string("locked"))
            .mount(&server)
            .await;

        let mut client = client(&server);
        let gone = client
            .delete(&format!("{}/cal/gone.ics", server.uri()), None)
            .await;
        assert!(matches!(gone, Err(DavError::NotFound)));

        let locked = client
            .delete(&format!("{}/cal/locked.ics", server.uri()), None)
            .await
            .unwrap_err();
        assert_eq!(locked.to_string(), "unexpected status 423 Locked: locked");
    }
}
