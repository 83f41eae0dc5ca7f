//! URL classification shared by the validator, resolver and pipeline

use std::net::IpAddr;

use reqwest::Url;

use crate::config::Config;

/// Base that root-relative paths are resolved against to see where a browser
/// would actually send them
const LOCAL_BASE: &str = "http://local.invalid/";

/// A URL that is safe to hand to a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeUrl {
    /// Validated third-party image, rewritten to the proxy endpoint
    Proxied(String),
    /// Already served from our own origin
    Local(String),
    /// No usable image
    Placeholder(String),
}

impl SafeUrl {
    pub fn as_str(&self) -> &str {
        match self {
            SafeUrl::Proxied(url) | SafeUrl::Local(url) | SafeUrl::Placeholder(url) => url,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            SafeUrl::Proxied(url) | SafeUrl::Local(url) | SafeUrl::Placeholder(url) => url,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, SafeUrl::Placeholder(_))
    }
}

/// Outcome of the checks that need no network access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    Placeholder,
    Local,
    Remote(Url),
    Rejected(&'static str),
}

/// Knows the placeholder, the proxy endpoint and our own origin
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    placeholder: String,
    proxy_path: String,
    public_origin: Option<Url>,
    allow_private_hosts: bool,
}

impl UrlPolicy {
    pub fn new(
        placeholder: impl Into<String>,
        proxy_path: impl Into<String>,
        public_origin: Option<String>,
    ) -> Self {
        let public_origin = public_origin.and_then(|origin| match Url::parse(origin.trim()) {
            Ok(url) if url.has_host() => Some(url),
            _ => {
                tracing::warn!(origin = %origin, "Ignoring unparsable public origin");
                None
            }
        });

        Self {
            placeholder: placeholder.into(),
            proxy_path: proxy_path.into(),
            public_origin,
            allow_private_hosts: false,
        }
    }

    /// Allow loopback and private-network image hosts (local development)
    pub fn with_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.proxy.placeholder_url.clone(),
            config.proxy.proxy_path.clone(),
            config.server.public_origin.clone(),
        )
        .with_private_hosts(config.proxy.allow_private_hosts)
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn placeholder_url(&self) -> SafeUrl {
        SafeUrl::Placeholder(self.placeholder.clone())
    }

    pub fn allows_private_hosts(&self) -> bool {
        self.allow_private_hosts
    }

    /// Path under which `source` is served by the proxy endpoint
    pub fn proxy_url(&self, source: &str) -> String {
        format!("{}?url={}", self.proxy_path, urlencoding::encode(source))
    }

    /// Placeholder or same-origin; needs no validation
    pub fn is_trusted(&self, url: &str) -> bool {
        url == self.placeholder || self.is_same_origin(url)
    }

    fn is_same_origin(&self, url: &str) -> bool {
        if url.starts_with('/') {
            return is_local_path(url);
        }

        match (&self.public_origin, Url::parse(url)) {
            (Some(origin), Ok(parsed)) => parsed.origin() == origin.origin(),
            _ => false,
        }
    }

    pub fn precheck(&self, url: &str) -> Precheck {
        let url = url.trim();
        if url.is_empty() {
            return Precheck::Rejected("empty url");
        }
        if url == self.placeholder {
            return Precheck::Placeholder;
        }
        if self.is_same_origin(url) {
            return Precheck::Local;
        }

        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
                if !self.allow_private_hosts && is_private_host(&parsed) {
                    return Precheck::Rejected("private address");
                }
                Precheck::Remote(parsed)
            }
            Ok(_) => Precheck::Rejected("unsupported scheme"),
            Err(_) => Precheck::Rejected("malformed url"),
        }
    }
}

/// A root-relative path that a browser resolves against our own host.
/// `//host` and `/\host` both leave the origin.
fn is_local_path(path: &str) -> bool {
    let Ok(base) = Url::parse(LOCAL_BASE) else {
        return false;
    };

    base.join(path)
        .is_ok_and(|joined| joined.origin() == base.origin())
}

/// Loopback, private-network, link-local or unspecified targets
pub fn is_private_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost") {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            ip.is_loopback()
                || ip.is_private()
                || ip.is_link_local()
                || ip.is_unspecified()
                || ip.is_broadcast()
        }
        Ok(IpAddr::V6(ip)) => {
            let first = ip.segments()[0];
            ip.is_loopback()
                || ip.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || ip.to_ipv4_mapped().is_some_and(|v4| {
                    v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
                })
        }
        Err(_) => false,
    }
}
