//! Cross-origin policy for browser callers.

use url::Url;

/// Origins allowed to call the relay from a browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsPolicy {
    /// Exact origins, e.g. `https://checkout.example.com`.
    pub allowed_origins: Vec<String>,
    /// Host suffixes, e.g. `.netlify.app`, matching any subdomain.
    pub allowed_origin_suffixes: Vec<String>,
    /// Also allow `localhost` and loopback origins on any port.
    pub allow_localhost: bool,
}

impl CorsPolicy {
    /// Whether a request carrying this `Origin` header value may be served.
    pub fn allows(&self, origin: &str) -> bool {
        if self
            .allowed_origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/') == origin)
        {
            return true;
        }

        let Ok(parsed) = Url::parse(origin) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };

        if self.allow_localhost && matches!(host, "localhost" | "127.0.0.1" | "[::1]") {
            return true;
        }

        self.allowed_origin_suffixes.iter().any(|suffix| {
            let suffix = suffix.trim_start_matches('.');
            !suffix.is_empty()
                && (host == suffix
                    || host
                        .strip_suffix(suffix)
                        .is_some_and(|rest| rest.ends_with('.')))
        })
    }
}
