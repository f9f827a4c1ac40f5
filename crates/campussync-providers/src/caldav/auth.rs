//! HTTP authentication for the CalDAV destination.
//!
//! Supports Basic (RFC 7617) and Digest (RFC 7616, MD5) authentication. The
//! scheme is picked from a `WWW-Authenticate` challenge and reused until the
//! server issues a new one.

use std::collections::HashMap;

use base64::Engine;
use rand::Rng;

/// Parameters of a Digest challenge plus the running nonce count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub qop: Option<String>,
    pub algorithm: String,
    nc: u32,
}

impl DigestChallenge {
    /// Parses the parameters of a `Digest` challenge.
    ///
    /// Returns `None` if the header is not a Digest challenge or lacks
    /// `realm` or `nonce`.
    pub fn parse(header: &str) -> Option<Self> {
        let content = strip_scheme(header, "Digest")?;
        let params = parse_auth_params(content);

        Some(Self {
            realm: params.get("realm")?.clone(),
            nonce: params.get("nonce")?.clone(),
            opaque: params.get("opaque").cloned(),
            qop: params.get("qop").cloned(),
            algorithm: params
                .get("algorithm")
                .cloned()
                .unwrap_or_else(|| "MD5".to_string()),
            nc: 0,
        })
    }

    fn authorize(&mut self, method: &str, uri: &str, username: &str, password: &str) -> String {
        self.nc += 1;
        let nc = format!("{:08x}", self.nc);
        let cnonce = generate_cnonce();

        let ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let qop_auth = self
            .qop
            .as_deref()
            .is_some_and(|qop| qop.split(',').any(|q| q.trim() == "auth"));

        let response = if qop_auth {
            md5_hex(&format!(
                "{}:{}:{}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let mut parts = vec![
            format!("username=\"{}\"", username),
            format!("realm=\"{}\"", self.realm),
            format!("nonce=\"{}\"", self.nonce),
            format!("uri=\"{}\"", uri),
            format!("response=\"{}\"", response),
            format!("algorithm={}", self.algorithm),
        ];
        if qop_auth {
            parts.push("qop=auth".to_string());
            parts.push(format!("nc={}", nc));
            parts.push(format!("cnonce=\"{}\"", cnonce));
        }
        if let Some(ref opaque) = self.opaque {
            parts.push(format!("opaque=\"{}\"", opaque));
        }

        format!("Digest {}", parts.join(", "))
    }
}

/// The authentication scheme negotiated with the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Digest(DigestChallenge),
}

impl AuthScheme {
    /// Picks a scheme from a `WWW-Authenticate` header value.
    ///
    /// Digest wins when the challenge is a well-formed Digest challenge;
    /// anything else falls back to Basic.
    pub fn from_challenge(header: &str) -> Self {
        match DigestChallenge::parse(header) {
            Some(challenge) => Self::Digest(challenge),
            None => Self::Basic,
        }
    }

    /// Builds the `Authorization` header value for one request.
    ///
    /// `uri` is the request path as sent on the wire.
    pub fn authorization(
        &mut self,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
    ) -> String {
        match self {
            Self::Basic => basic_auth(username, password),
            Self::Digest(challenge) => challenge.authorize(method, uri, username, password),
        }
    }
}

fn basic_auth(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

fn strip_scheme<'a>(header: &'a str, scheme: &str) -> Option<&'a str> {
    let header = header.trim_start();
    let (name, rest) = header.split_once(char::is_whitespace)?;
    name.eq_ignore_ascii_case(scheme).then(|| rest.trim())
}

fn parse_auth_params(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = content.chars().peekable();

    while chars.peek().is_some() {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_lowercase();
        if key.is_empty() {
            break;
        }

        let value = if chars.peek() == Some(&'"') {
            chars.next();
            let mut value = String::new();
            let mut escaped = false;
            for c in chars.by_ref() {
                match (escaped, c) {
                    (true, c) => {
                        value.push(c);
                        escaped = false;
                    }
                    (false, '\\') => escaped = true,
                    (false, '"') => break,
                    (false, c) => value.push(c),
                }
            }
            value
        } else {
            chars
                .by_ref()
                .take_while(|c| *c != ',' && !c.is_whitespace())
                .collect()
        };

        params.insert(key, value);
    }

    params
}

fn generate_cnonce() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}
