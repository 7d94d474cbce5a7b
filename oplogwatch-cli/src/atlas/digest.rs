//! HTTP Digest authentication (RFC 7616)
//!
//! The Atlas Admin API authenticates programmatic API keys with digest auth:
//! the public key is the username and the private key the password. MD5 and
//! SHA-256 are answered, each with its `-sess` variant; any other algorithm
//! is refused rather than answered with the wrong hash.

use md5::{Digest, Md5};
use sha2::Sha256;

/// Digest errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Hash algorithm named by a challenge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MD5" => Some(Self::Md5),
            "MD5-SESS" => Some(Self::Md5Sess),
            "SHA-256" => Some(Self::Sha256),
            "SHA-256-SESS" => Some(Self::Sha256Sess),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
            Self::Sha256 => "SHA-256",
            Self::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(&self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    fn hash_hex(&self, input: &str) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => hex::encode(Md5::digest(input.as_bytes())),
            Self::Sha256 | Self::Sha256Sess => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }
}

/// Parameters of a `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Algorithm as sent by the server; absent means MD5
    pub algorithm: Option<String>,
    pub qop: Option<String>,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value. Returns `None` for non-digest
    /// schemes or when the nonce is missing.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut challenge = DigestChallenge::default();
        let mut has_nonce = false;

        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => {
                    challenge.nonce = value;
                    has_nonce = true;
                }
                "opaque" => challenge.opaque = Some(value),
                "algorithm" => challenge.algorithm = Some(value),
                "qop" => challenge.qop = Some(value),
                _ => {}
            }
        }

        has_nonce.then_some(challenge)
    }

    /// Resolved hash algorithm
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm, DigestError> {
        match self.algorithm.as_deref() {
            None => Ok(DigestAlgorithm::Md5),
            Some(name) => {
                DigestAlgorithm::from_name(name).ok_or_else(|| DigestError::UnsupportedAlgorithm(name.to_string()))
            }
        }
    }

    /// Whether the server offers `qop=auth`
    fn supports_auth_qop(&self) -> bool {
        self.qop
            .as_deref()
            .map(|qop| qop.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")))
            .unwrap_or(false)
    }
}

/// Digest credentials
#[derive(Clone)]
pub struct DigestCredentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for DigestCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DigestCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Build the `Authorization` header value answering `challenge` for a
    /// request of `method` on `uri` (path and query).
    pub fn authorization(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> Result<String, DigestError> {
        let algorithm = challenge.digest_algorithm()?;

        let mut ha1 = algorithm.hash_hex(&format!("{}:{}:{}", self.username, challenge.realm, self.password));
        if algorithm.is_session() {
            ha1 = algorithm.hash_hex(&format!("{}:{}:{}", ha1, challenge.nonce, cnonce));
        }
        let ha2 = algorithm.hash_hex(&format!("{}:{}", method, uri));
        let nc = format!("{:08x}", nc);

        let mut header = format!(
            "Digest username={}, realm={}, nonce={}, uri={}",
            quote(&self.username),
            quote(&challenge.realm),
            quote(&challenge.nonce),
            quote(uri)
        );

        if challenge.supports_auth_qop() {
            let response = algorithm.hash_hex(&format!("{}:{}:{}:{}:auth:{}", ha1, challenge.nonce, nc, cnonce, ha2));
            header.push_str(&format!(
                ", qop=auth, nc={}, cnonce={}, response=\"{}\"",
                nc,
                quote(cnonce),
                response
            ));
        } else {
            let response = algorithm.hash_hex(&format!("{}:{}:{}", ha1, challenge.nonce, ha2));
            header.push_str(&format!(", response=\"{}\"", response));
        }

        if let Some(ref opaque) = challenge.opaque {
            header.push_str(&format!(", opaque={}", quote(opaque)));
        }
        if challenge.algorithm.is_some() {
            header.push_str(&format!(", algorithm={}", algorithm.as_str()));
        }

        Ok(header)
    }
}

/// Random client nonce
pub fn new_cnonce() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Quoted-string with `"` and `\` escaped
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Split `key=value, key="quoted, \"value\""` pairs
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = params.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_string();
        rest = rest[eq + 1..].trim_start();

        let value;
        if let Some(quoted) = rest.strip_prefix('"') {
            let (unquoted, consumed) = read_quoted(quoted);
            value = unquoted;
            rest = &quoted[consumed..];
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = &rest[end..];
        }

        rest = rest.trim_start().trim_start_matches(',').trim_start();
        pairs.push((key, value));
    }

    pairs
}

/// Read a quoted-string body up to its closing quote, resolving
/// quoted-pairs. Returns the value and the number of bytes consumed,
/// closing quote included.
fn read_quoted(input: &str) -> (String, usize) {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return (value, idx + 1),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => return (value, input.len()),
            },
            _ => value.push(c),
        }
    }

    (value, input.len())
}
