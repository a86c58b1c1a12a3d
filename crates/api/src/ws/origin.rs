//! WebSocket upgrade origin checking.

use axum::http::HeaderMap;

/// Validates the `Origin` header of upgrade requests against a list of
/// host patterns (`localhost:*`, `poker.example.com`).
#[derive(Debug, Clone)]
pub struct OriginValidator {
    allowed_patterns: Vec<String>,
}

impl OriginValidator {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            allowed_patterns: patterns,
        }
    }

    /// Check an upgrade request's headers.
    ///
    /// Requests without an `Origin` header are allowed: non-browser
    /// clients do not send one, and the header only protects against
    /// cross-site browser connections.
    pub fn check(&self, headers: &HeaderMap) -> bool {
        let Some(origin) = headers.get("origin").and_then(|v| v.to_str().ok()) else {
            return true;
        };
        self.is_allowed_origin(origin)
    }

    /// Check a single origin value (e.g. `http://localhost:3000`).
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        let host = origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
            .unwrap_or(origin);

        self.allowed_patterns
            .iter()
            .any(|pattern| host_matches(pattern, host))
    }
}

/// Match a host against a pattern with at most one `*` wildcard.
fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            host.len() >= prefix.len() + suffix.len()
                && host.starts_with(prefix)
                && host.ends_with(suffix)
        }
        None => pattern == host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> OriginValidator {
        OriginValidator::new(vec!["localhost:*".to_string(), "127.0.0.1:*".to_string()])
    }

    #[test]
    fn default_patterns_match_local_origins() {
        let v = validator();
        assert!(v.is_allowed_origin("http://localhost:3000"));
        assert!(v.is_allowed_origin("https://localhost:8443"));
        assert!(v.is_allowed_origin("http://127.0.0.1:5173"));
    }

    #[test]
    fn foreign_origins_rejected() {
        let v = validator();
        assert!(!v.is_allowed_origin("https://evil.example.com"));
        assert!(!v.is_allowed_origin("http://localhost.evil.com:80"));
    }

    #[test]
    fn exact_pattern_requires_exact_host() {
        let v = OriginValidator::new(vec!["poker.example.com".to_string()]);
        assert!(v.is_allowed_origin("https://poker.example.com"));
        assert!(!v.is_allowed_origin("https://poker.example.com.evil.com"));
    }

    #[test]
    fn missing_origin_header_is_allowed() {
        let v = validator();
        assert!(v.check(&HeaderMap::new()));
    }

    #[test]
    fn origin_header_is_checked() {
        let v = validator();
        let mut headers = HeaderMap::new();
        headers.insert("origin", "http://localhost:3000".parse().unwrap());
        assert!(v.check(&headers));

        headers.insert("origin", "https://evil.example.com".parse().unwrap());
        assert!(!v.check(&headers));
    }
}
