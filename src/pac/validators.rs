// src/pac/validators.rs
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})$").unwrap());

static HOSTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]{1,253}\.[a-zA-Z]{2,63}$").unwrap());

/// True iff `text` is a dotted quad whose four groups are all in `0..=255`.
pub fn validate_ip(text: &str) -> bool {
    let Some(caps) = IP_RE.captures(text) else {
        return false;
    };
    caps.iter()
        .skip(1)
        .flatten()
        .all(|group| group.as_str().parse::<u16>().is_ok_and(|octet| octet <= 255))
}

/// Accepts `localhost`, a valid IPv4 address, or a dotted name whose last
/// label is alphabetic.
pub fn validate_hostname(text: &str) -> bool {
    if text == "localhost" {
        return true;
    }
    if validate_ip(text) {
        return true;
    }
    HOSTNAME_RE.is_match(text)
}

/// A destination URL must at least carry a scheme and a host.
pub fn validate_url(text: &str) -> bool {
    Url::parse(text)
        .ok()
        .is_some_and(|url| url.host_str().is_some_and(|host| !host.is_empty()))
}
