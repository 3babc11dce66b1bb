use std::fmt;

use url::Url;

use crate::errors::WakeError;

/// A scheme/host/port triple identifying one application instance.
///
/// Non-special schemes such as `app://` are accepted as long as they carry a host, so
/// desktop shells can use a private scheme. Opaque origins (`data:`, `file:`) never match
/// anything and are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppOrigin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl AppOrigin {
    pub fn parse(raw: &str) -> Result<Self, WakeError> {
        let url = Url::parse(raw.trim()).map_err(|e| WakeError::config("origin", e))?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                WakeError::config("origin", format!("'{raw}' is an opaque origin without a host"))
            })?;

        Ok(Self {
            scheme: url.scheme().to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port: url.port_or_known_default(),
        })
    }

    /// Compares against an origin string reported by the transport. Unparseable input never matches.
    pub fn matches(&self, candidate: &str) -> bool {
        match AppOrigin::parse(candidate) {
            Ok(other) => &other == self,
            Err(_) => false,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for AppOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_port = match self.scheme.as_str() {
            "http" | "ws" => Some(80),
            "https" | "wss" => Some(443),
            "ftp" => Some(21),
            _ => None,
        };
        match self.port {
            Some(port) if Some(port) != default_port => {
                write!(f, "{}://{}:{port}", self.scheme, self.host)
            }
            _ => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_are_normalized() {
        let origin = AppOrigin::parse("https://Wake.Example").unwrap();
        assert!(origin.matches("https://wake.example:443"));
        assert!(origin.matches("https://wake.example/some/path?q=1"));
        assert_eq!(origin.to_string(), "https://wake.example");
    }

    #[test]
    fn scheme_host_and_port_must_all_match() {
        let origin = AppOrigin::parse("https://wake.example").unwrap();
        assert!(!origin.matches("http://wake.example"));
        assert!(!origin.matches("https://evil.example"));
        assert!(!origin.matches("https://wake.example:8443"));
        assert!(!origin.matches("not a url"));
        assert!(!origin.matches(""));
    }

    #[test]
    fn private_schemes_with_hosts_are_supported() {
        let origin = AppOrigin::parse("app://wakelink").unwrap();
        assert_eq!(origin.scheme(), "app");
        assert_eq!(origin.host(), "wakelink");
        assert_eq!(origin.port(), None);
        assert!(origin.matches("app://WAKELINK"));
        assert_eq!(origin.to_string(), "app://wakelink");
    }

    #[test]
    fn opaque_origins_are_rejected() {
        assert!(AppOrigin::parse("data:text/plain,hi").is_err());
        assert!(AppOrigin::parse("file:///tmp/index.html").is_err());
    }
}
