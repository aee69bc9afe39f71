// src/pac/directive.rs
use crate::error::{PacError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const DIRECT: &str = "DIRECT";
const PROXY_PREFIX: &str = "PROXY ";

/// One entry of a proxy preference list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ProxyDirective {
    /// Connect without a proxy.
    Direct,
    /// Connect through `host_port` (`host:port`, as the script wrote it).
    Proxy {
        #[serde(rename = "hostPort")]
        host_port: String,
    },
}

impl ProxyDirective {
    pub fn proxy(host_port: impl Into<String>) -> Self {
        Self::Proxy {
            host_port: host_port.into(),
        }
    }

    /// Host part of a `PROXY` directive.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Direct => None,
            Self::Proxy { host_port } => Some(
                split_host_port(host_port).map_or(host_port.as_str(), |(host, _)| host),
            ),
        }
    }

    /// Port of a `PROXY` directive, when the script gave a numeric one.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Direct => None,
            Self::Proxy { host_port } => split_host_port(host_port).map(|(_, port)| port),
        }
    }
}

fn split_host_port(host_port: &str) -> Option<(&str, u16)> {
    let (host, port) = host_port.rsplit_once(':')?;
    let port = port.parse().ok()?;
    Some((host, port))
}

impl fmt::Display for ProxyDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str(DIRECT),
            Self::Proxy { host_port } => write!(f, "{PROXY_PREFIX}{host_port}"),
        }
    }
}

/// Ordered, non-empty proxy preference list. Clients try entries in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProxyDecision(Vec<ProxyDirective>);

impl ProxyDecision {
    pub fn directives(&self) -> &[ProxyDirective] {
        &self.0
    }

    pub fn into_directives(self) -> Vec<ProxyDirective> {
        self.0
    }

    /// The entry a client tries first.
    pub fn preferred(&self) -> &ProxyDirective {
        &self.0[0]
    }
}

impl fmt::Display for ProxyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{directive}")?;
        }
        Ok(())
    }
}

/// What `FindProxyForURL` handed back, detached from the script context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawDecision {
    Text(String),
    /// `undefined` or `null`.
    Absent,
    /// Any other value; carries the JavaScript type name.
    NotText(String),
}

/// Turns the entry point's return value into a decision.
///
/// Unrecognized segments are a hard failure: dropping one would silently
/// change where traffic goes.
pub fn parse_decision(raw: RawDecision) -> Result<ProxyDecision> {
    let text = match raw {
        RawDecision::Text(text) => text,
        RawDecision::Absent => {
            return Err(PacError::NoDirective(
                "FindProxyForURL returned no value".to_string(),
            ))
        }
        RawDecision::NotText(kind) => {
            return Err(PacError::Parse(format!(
                "FindProxyForURL returned a {kind}, expected a string"
            )))
        }
    };

    let directives = parse_directives(&text)?;
    if directives.is_empty() {
        return Err(PacError::NoDirective(
            "FindProxyForURL returned no proxy directive".to_string(),
        ));
    }
    Ok(ProxyDecision(directives))
}

/// Splits a PAC result string on `;` into directives, skipping empty segments.
pub fn parse_directives(text: &str) -> Result<Vec<ProxyDirective>> {
    let mut directives = Vec::new();
    for segment in text.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if segment == DIRECT {
            directives.push(ProxyDirective::Direct);
            continue;
        }
        match segment.strip_prefix(PROXY_PREFIX).map(str::trim) {
            Some(host_port) if !host_port.is_empty() => {
                directives.push(ProxyDirective::proxy(host_port));
            }
            _ => {
                return Err(PacError::Parse(format!(
                    "unrecognized directive `{segment}`"
                )))
            }
        }
    }
    Ok(directives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> RawDecision {
        RawDecision::Text(s.to_string())
    }

    #[test]
    fn trailing_empty_segment_is_ignored() {
        let decision = parse_decision(text("DIRECT;PROXY 1.2.3.4:80;")).unwrap();
        assert_eq!(
            decision.directives(),
            &[ProxyDirective::Direct, ProxyDirective::proxy("1.2.3.4:80")]
        );
    }

    #[test]
    fn order_is_preserved() {
        let decision =
            parse_decision(text(" PROXY a.example:3128 ; PROXY b.example:3128;DIRECT")).unwrap();
        assert_eq!(
            decision.into_directives(),
            vec![
                ProxyDirective::proxy("a.example:3128"),
                ProxyDirective::proxy("b.example:3128"),
                ProxyDirective::Direct,
            ]
        );
    }

    #[test]
    fn unknown_segment_is_a_hard_failure() {
        let err = parse_decision(text("PROXY a:1; SOCKS b:2")).unwrap_err();
        assert_eq!(err, PacError::Parse("unrecognized directive `SOCKS b:2`".into()));
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert!(matches!(parse_decision(text("direct")), Err(PacError::Parse(_))));
        assert!(matches!(parse_decision(text("proxy a:1")), Err(PacError::Parse(_))));
    }

    #[test]
    fn proxy_without_target_is_rejected() {
        assert!(matches!(parse_decision(text("PROXY ")), Err(PacError::Parse(_))));
        assert!(matches!(parse_decision(text("PROXY")), Err(PacError::Parse(_))));
    }

    #[test]
    fn absent_and_empty_results_are_no_directive() {
        assert!(matches!(parse_decision(RawDecision::Absent), Err(PacError::NoDirective(_))));
        assert!(matches!(parse_decision(text("")), Err(PacError::NoDirective(_))));
        assert!(matches!(parse_decision(text(" ; ;")), Err(PacError::NoDirective(_))));
    }

    #[test]
    fn non_string_result_is_a_parse_error() {
        let err = parse_decision(RawDecision::NotText("number".into())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "FindProxyForURL returned a number, expected a string"
        );
    }

    #[test]
    fn host_and_port_accessors() {
        let proxy = ProxyDirective::proxy("proxy.example.com:8080");
        assert_eq!(proxy.host(), Some("proxy.example.com"));
        assert_eq!(proxy.port(), Some(8080));

        let bare = ProxyDirective::proxy("proxy.example.com");
        assert_eq!(bare.host(), Some("proxy.example.com"));
        assert_eq!(bare.port(), None);

        assert_eq!(ProxyDirective::Direct.host(), None);
    }

    #[test]
    fn renders_back_to_pac_syntax() {
        let decision = parse_decision(text("PROXY p:1;DIRECT")).unwrap();
        assert_eq!(decision.to_string(), "PROXY p:1; DIRECT");
        assert!(decision.preferred().port() == Some(1));
    }

    #[test]
    fn serializes_as_tagged_objects() {
        let json = serde_json::to_value(vec![
            ProxyDirective::Direct,
            ProxyDirective::proxy("p.example:8080"),
        ])
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "DIRECT"},
                {"type": "PROXY", "hostPort": "p.example:8080"}
            ])
        );
    }
}
