//! Route pattern syntax: `[METHOD:]path[@domain]`.
//!
//! - `METHOD` is an HTTP verb or `ALL` (the default, matches any verb)
//! - `path` must be absolute; a trailing `/` is dropped except for the root
//! - `domain` defaults to `default`, which matches any host

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Wildcard method component.
pub const DEFAULT_METHOD: &str = "ALL";

/// Domain used when a pattern does not name one.
pub const DEFAULT_DOMAIN: &str = "default";

/// Verbs accepted as a pattern method and as REST method names.
pub const HTTP_METHODS: [&str; 9] = [
    "GET", "PUT", "POST", "DELETE", "PATCH", "HEAD", "CONNECT", "OPTIONS", "TRACE",
];

#[allow(clippy::expect_used)]
static METHOD_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z]+):(.+)$").expect("valid method prefix regex"));

#[allow(clippy::expect_used)]
static DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.\-]+$").expect("valid domain regex"));

#[allow(clippy::expect_used)]
static BUILTIN_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\.\w+\}").expect("valid placeholder regex"));

/// Case-insensitive check against [`HTTP_METHODS`].
#[must_use]
pub fn is_http_method(name: &str) -> bool {
    HTTP_METHODS.iter().any(|m| m.eq_ignore_ascii_case(name))
}

/// True if the pattern contains a built-in placeholder such as `{.struct}`.
#[must_use]
pub fn has_builtin_placeholder(pattern: &str) -> bool {
    BUILTIN_PLACEHOLDER.is_match(pattern)
}

/// Malformed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Nothing left once method and domain are removed
    EmptyPath { pattern: String },
    /// Path does not start with `/`
    RelativePath { pattern: String },
    /// Method component is not an HTTP verb or `ALL`
    InvalidMethod { pattern: String, method: String },
    /// Domain component is empty or contains illegal characters
    InvalidDomain { pattern: String, domain: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::EmptyPath { pattern } => {
                write!(f, "invalid pattern '{pattern}': URI should not be empty")
            }
            PatternError::RelativePath { pattern } => {
                write!(f, "invalid pattern '{pattern}': URI must start with '/'")
            }
            PatternError::InvalidMethod { pattern, method } => {
                write!(f, "invalid pattern '{pattern}': unknown method '{method}'")
            }
            PatternError::InvalidDomain { pattern, domain } => {
                write!(f, "invalid pattern '{pattern}': malformed domain '{domain}'")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Components of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    /// Upper-case verb or [`DEFAULT_METHOD`]
    pub method: String,
    pub path: String,
    /// Lower-case domain or [`DEFAULT_DOMAIN`]
    pub domain: String,
}

impl ParsedPattern {
    /// Render back to `path@domain` (wildcard method) or `METHOD:path@domain`.
    #[must_use]
    pub fn to_key(&self) -> String {
        if self.method == DEFAULT_METHOD {
            serve_handler_key("", &self.path, &self.domain)
        } else {
            serve_handler_key(&self.method, &self.path, &self.domain)
        }
    }
}

/// Split a pattern into method, path and domain.
pub fn parse_pattern(pattern: &str) -> Result<ParsedPattern, PatternError> {
    let trimmed = pattern.trim();
    let mut method = DEFAULT_METHOD.to_string();
    let mut rest = trimmed;

    if let Some(caps) = METHOD_PREFIX.captures(trimmed) {
        let verb = caps.get(1).map_or("", |m| m.as_str());
        rest = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !is_http_method(verb) && !verb.eq_ignore_ascii_case(DEFAULT_METHOD) {
            return Err(PatternError::InvalidMethod {
                pattern: trimmed.to_string(),
                method: verb.to_string(),
            });
        }
        method = verb.to_ascii_uppercase();
    }

    let mut domain = DEFAULT_DOMAIN.to_string();
    let mut path = rest;
    if let Some((uri, host)) = rest.rsplit_once('@') {
        let host = host.trim();
        if !DOMAIN.is_match(host) {
            return Err(PatternError::InvalidDomain {
                pattern: trimmed.to_string(),
                domain: host.to_string(),
            });
        }
        domain = host.to_ascii_lowercase();
        path = uri.trim();
    }

    if path.is_empty() {
        return Err(PatternError::EmptyPath {
            pattern: trimmed.to_string(),
        });
    }
    if !path.starts_with('/') {
        return Err(PatternError::RelativePath {
            pattern: trimmed.to_string(),
        });
    }
    let path = if path == "/" {
        path
    } else {
        let stripped = path.trim_end_matches('/');
        if stripped.is_empty() {
            "/"
        } else {
            stripped
        }
    };

    Ok(ParsedPattern {
        method,
        path: path.to_string(),
        domain,
    })
}

/// Format a handler key; an empty `method` leaves the method component out.
#[must_use]
pub fn serve_handler_key(method: &str, path: &str, domain: &str) -> String {
    let domain = if domain.is_empty() {
        String::new()
    } else {
        format!("@{}", domain.to_ascii_lowercase())
    };
    if method.is_empty() {
        format!("{path}{domain}")
    } else {
        format!("{}:{}{}", method.to_ascii_uppercase(), path, domain)
    }
}
