//! HTTP Basic and Digest authentication

use base64::Engine;
use md5::{Digest, Md5};
use std::fmt;
use url::Url;

/// A username and password pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Called when a server asks for authentication
pub trait CredentialProvider: Send + Sync {
    /// Credentials for `url`, or `None` to give up
    fn credentials(&self, url: &Url, realm: Option<&str>) -> Option<Credentials>;
}

/// Always answers with the same credentials
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialProvider for StaticCredentials {
    fn credentials(&self, _url: &Url, _realm: Option<&str>) -> Option<Credentials> {
        Some(self.0.clone())
    }
}

/// Parsed `WWW-Authenticate` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Challenge {
    Basic {
        realm: Option<String>,
    },
    Digest {
        realm: String,
        nonce: String,
        qop: Option<String>,
        opaque: Option<String>,
    },
}

impl Challenge {
    pub(crate) fn realm(&self) -> Option<&str> {
        match self {
            Self::Basic { realm } => realm.as_deref(),
            Self::Digest { realm, .. } => Some(realm),
        }
    }
}

/// Split `a="x, y", b=z` into key/value pairs, honouring quotes
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = input.trim();
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();
        let value;
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            value = quoted[..end].to_string();
            rest = quoted.get(end + 1..).unwrap_or("");
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = &rest[end..];
        }
        rest = rest.trim_start().trim_start_matches(',').trim_start();
        params.push((key, value));
    }
    params
}

pub(crate) fn parse_challenge(header: &str) -> Option<Challenge> {
    let header = header.trim();
    let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));
    let params = parse_params(params);
    let get = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };

    if scheme.eq_ignore_ascii_case("basic") {
        Some(Challenge::Basic {
            realm: get("realm"),
        })
    } else if scheme.eq_ignore_ascii_case("digest") {
        // Only MD5 is supported
        if get("algorithm").is_some_and(|a| !a.eq_ignore_ascii_case("md5")) {
            return None;
        }
        Some(Challenge::Digest {
            realm: get("realm").unwrap_or_default(),
            nonce: get("nonce")?,
            qop: get("qop").map(|q| {
                q.split(',')
                    .map(str::trim)
                    .find(|q| *q == "auth")
                    .unwrap_or("auth")
                    .to_string()
            }),
            opaque: get("opaque"),
        })
    } else {
        None
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Value of the `Authorization` header answering `challenge`
pub(crate) fn authorization_header(
    challenge: &Challenge,
    credentials: &Credentials,
    method: &str,
    url: &Url,
) -> String {
    match challenge {
        Challenge::Basic { .. } => {
            let raw = format!("{}:{}", credentials.username, credentials.password);
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
            )
        }
        Challenge::Digest {
            realm,
            nonce,
            qop,
            opaque,
        } => {
            let cnonce = hex::encode(rand::random::<[u8; 8]>());
            digest_header(
                credentials,
                method,
                url,
                realm,
                nonce,
                qop.as_deref(),
                opaque.as_deref(),
                &cnonce,
            )
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn digest_header(
    credentials: &Credentials,
    method: &str,
    url: &Url,
    realm: &str,
    nonce: &str,
    qop: Option<&str>,
    opaque: Option<&str>,
    cnonce: &str,
) -> String {
    let uri = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };
    let ha1 = md5_hex(&format!(
        "{}:{realm}:{}",
        credentials.username, credentials.password
    ));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    let nc = "00000001";

    let mut header = format!(
        "Digest username=\"{}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", algorithm=MD5",
        credentials.username
    );
    let response = if let Some(qop) = qop {
        header.push_str(&format!(", qop={qop}, nc={nc}, cnonce=\"{cnonce}\""));
        md5_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"))
    } else {
        md5_hex(&format!("{ha1}:{nonce}:{ha2}"))
    };
    header.push_str(&format!(", response=\"{response}\""));
    if let Some(opaque) = opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_digest_challenge() {
        let challenge = parse_challenge(
            r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap();
        assert_eq!(
            challenge,
            Challenge::Digest {
                realm: "testrealm@host.com".to_string(),
                nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
                qop: Some("auth".to_string()),
                opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
            }
        );
        assert!(parse_challenge("Negotiate abc").is_none());
        assert!(parse_challenge(r#"Digest realm="r", nonce="n", algorithm=SHA-256"#).is_none());
    }

    #[test]
    fn test_digest_response_rfc2617() {
        // Worked example from RFC 2617 section 3.5
        let url = Url::parse("http://www.nowhere.org/dir/index.html").unwrap();
        let header = digest_header(
            &Credentials::new("Mufasa", "Circle Of Life"),
            "GET",
            &url,
            "testrealm@host.com",
            "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            Some("auth"),
            Some("5ccc069c403ebaf9f0171e9517f40e41"),
            "0a4f113b",
        );
        assert!(header.contains("response=\"6629fae49393a05397450978507c4ef1\""));
    }

    #[test]
    fn test_basic_header() {
        let url = Url::parse("http://example.com/").unwrap();
        let header = authorization_header(
            &Challenge::Basic { realm: None },
            &Credentials::new("Aladdin", "open sesame"),
            "GET",
            &url,
        );
        assert_eq!(header, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let debug = format!("{:?}", Credentials::new("user", "secret"));
        assert!(!debug.contains("secret"));
    }
}
