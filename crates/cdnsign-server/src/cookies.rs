//! `Set-Cookie` rendering for signed cookies.
//!
//! The engine only hands back names and values. Transport attributes are
//! added here: a `Domain` covering the resource host, `Path=/`, `Secure` and
//! `HttpOnly`.

use cdnsign_core::CookieSet;
use url::Url;

/// The `Domain` attribute for cookies issued for `resource_url`.
///
/// A configured domain always wins. Without one, the resource host is used.
pub fn cookie_domain(configured: Option<&str>, resource_url: &str) -> Option<String> {
    let host = Url::parse(resource_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

    match configured {
        Some(domain) => {
            if let Some(host) = &host {
                if !domain_covers(domain, host) {
                    tracing::warn!(
                        cookie_domain = domain,
                        resource_host = %host,
                        "cookie domain does not cover the resource host, the edge will not receive the cookies"
                    );
                }
            }
            Some(domain.to_string())
        }
        None => host,
    }
}

/// Whether cookies scoped to `domain` are sent to `host`.
pub fn domain_covers(domain: &str, host: &str) -> bool {
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    !domain.is_empty() && (host == domain || host.ends_with(&format!(".{domain}")))
}

pub fn render_set_cookie(name: &str, value: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) => format!("{name}={value}; Domain={domain}; Path=/; Secure; HttpOnly"),
        None => format!("{name}={value}; Path=/; Secure; HttpOnly"),
    }
}

/// One `Set-Cookie` header value per signed cookie, in issue order.
pub fn set_cookie_headers(cookies: &CookieSet, configured_domain: Option<&str>) -> Vec<String> {
    let domain = cookie_domain(configured_domain, cookies.resource_url());
    cookies
        .iter()
        .map(|(name, value)| render_set_cookie(name, value, domain.as_deref()))
        .collect()
}
