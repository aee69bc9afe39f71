// src/pac/primitives.rs
//! The PAC helper library exposed to scripts.
//!
//! The free functions hold the semantics and are usable without a script
//! context. [`PrimitiveContext`] binds them into a `boa_engine` context for one
//! evaluation. Network, DNS and clock helpers are fixed stubs: a script can
//! compute over its arguments and nothing else.

use boa_engine::{
    Context, JsArgs, JsNativeError, JsResult, JsString, JsValue, NativeFunction,
};
use log::debug;
use regex::Regex;

/// What `dnsResolve` answers for every host.
pub const PLACEHOLDER_ADDRESS: &str = "1.1.1.1";

const ALERT_PREVIEW_CHARS: usize = 200;

/// True iff `host` ends with `domain` as a literal suffix.
pub fn dns_domain_is(host: &str, domain: &str) -> bool {
    host.len() >= domain.len() && host.ends_with(domain)
}

/// Number of `.` separators in `host`.
pub fn dns_domain_levels(host: &str) -> usize {
    host.matches('.').count()
}

/// Packs a dotted quad into a signed 32-bit integer, big-endian.
///
/// Each part is coerced like JavaScript's `Number()` followed by `ToInt32`,
/// then masked to 8 bits; nothing is rejected here. The top octet lands in the
/// sign bit, so `192.168.1.1` packs to a negative number.
pub fn convert_addr(ip: &str) -> i32 {
    let mut parts = ip.split('.');
    let mut packed: i32 = 0;
    for shift in [24, 16, 8, 0] {
        let octet = parts.next().map_or(0, |part| js_to_int32(js_to_number(part)) & 0xff);
        packed |= octet << shift;
    }
    packed
}

/// Four 1–3 digit groups, each no larger than 255.
pub fn is_valid_ip_address(text: &str) -> bool {
    super::validators::validate_ip(text)
}

/// `(addr & mask) == (pattern & mask)` over [`convert_addr`] values.
///
/// Non-address hosts go through the stub resolver instead of DNS.
pub fn is_in_net(ip_or_host: &str, pattern: &str, mask: &str) -> bool {
    if !is_valid_ip_address(pattern) || !is_valid_ip_address(mask) {
        return false;
    }
    let addr = if is_valid_ip_address(ip_or_host) {
        ip_or_host
    } else {
        dns_resolve(ip_or_host)
    };
    let mask = convert_addr(mask);
    (convert_addr(addr) & mask) == (convert_addr(pattern) & mask)
}

pub fn is_plain_host_name(host: &str) -> bool {
    !host.contains('.')
}

/// True iff `host == hostdom` or `hostdom` starts with `host + "."`.
pub fn local_host_or_domain_is(host: &str, hostdom: &str) -> bool {
    host == hostdom
        || hostdom
            .strip_prefix(host)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Translates a shell glob into an anchored regex and matches `subject`.
///
/// `.` is literal, `*` is any run, `?` is one character. Every other
/// character is handed to the regex engine untouched, so a pattern that is
/// not a valid regex is an error.
pub fn sh_exp_match(subject: &str, pattern: &str) -> Result<bool, regex::Error> {
    let re = Regex::new(&sh_exp_to_regex(pattern))?;
    Ok(re.is_match(subject))
}

fn sh_exp_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '.' => out.push_str("\\."),
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push(other),
        }
    }
    out.push('$');
    out
}

pub fn is_resolvable(_host: &str) -> bool {
    false
}

pub fn dns_resolve(_host: &str) -> &'static str {
    PLACEHOLDER_ADDRESS
}

/// `weekdayRange`, `dateRange` and `timeRange` never match.
pub fn time_window_matches() -> bool {
    false
}

/// JavaScript `Number(text)` for the string forms PAC scripts produce.
fn js_to_number(text: &str) -> f64 {
    let trimmed = text.trim().trim_matches('\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits.chars().try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts spellings JavaScript does not ("inf", "nan"); both
        // collapse to 0 in `js_to_int32`, so the difference never shows.
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// ECMAScript `ToInt32`.
fn js_to_int32(number: f64) -> i32 {
    if !number.is_finite() {
        return 0;
    }
    const TWO_32: f64 = 4_294_967_296.0;
    let wrapped = number.trunc().rem_euclid(TWO_32);
    if wrapped >= TWO_32 / 2.0 {
        (wrapped - TWO_32) as i32
    } else {
        wrapped as i32
    }
}

type Primitive = fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// Stateless primitives, installed under their PAC names.
const PRIMITIVES: &[(&str, usize, Primitive)] = &[
    ("dnsDomainIs", 2, js_dns_domain_is),
    ("dnsDomainLevels", 1, js_dns_domain_levels),
    ("convert_addr", 1, js_convert_addr),
    ("isValidIpAddress", 1, js_is_valid_ip_address),
    ("isInNet", 3, js_is_in_net),
    ("isPlainHostName", 1, js_is_plain_host_name),
    ("localHostOrDomainIs", 2, js_local_host_or_domain_is),
    ("shExpMatch", 2, js_sh_exp_match),
    ("isResolvable", 1, js_is_resolvable),
    ("dnsResolve", 1, js_dns_resolve),
    ("weekdayRange", 3, js_time_window),
    ("dateRange", 7, js_time_window),
    ("timeRange", 7, js_time_window),
    ("alert", 1, js_alert),
];

const MY_IP_ADDRESS: &str = "myIpAddress";

/// The capability set handed to one evaluation.
///
/// Only `myIpAddress` depends on the request; everything else is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveContext {
    source_address: String,
}

impl PrimitiveContext {
    pub fn new(source_address: impl Into<String>) -> Self {
        Self {
            source_address: source_address.into(),
        }
    }

    /// Script-visible names, in installation order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        PRIMITIVES
            .iter()
            .map(|(name, _, _)| *name)
            .chain(std::iter::once(MY_IP_ADDRESS))
    }

    /// Defines every primitive as a global function of `context`.
    pub fn install(&self, context: &mut Context) -> JsResult<()> {
        for &(name, length, body) in PRIMITIVES {
            context.register_global_callable(
                JsString::from(name),
                length,
                NativeFunction::from_fn_ptr(body),
            )?;
        }

        let address = JsValue::from(JsString::from(self.source_address.as_str()));
        context.register_global_callable(
            JsString::from(MY_IP_ADDRESS),
            0,
            NativeFunction::from_copy_closure_with_captures(
                |_this, _args, address: &JsValue, _context| Ok(address.clone()),
                address,
            ),
        )?;
        Ok(())
    }
}

fn string_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get_or_undefined(index)
        .to_string(context)?
        .to_std_string_escaped())
}

fn js_dns_domain_is(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let domain = string_arg(args, 1, context)?;
    Ok(dns_domain_is(&host, &domain).into())
}

fn js_dns_domain_levels(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let levels = i32::try_from(dns_domain_levels(&host)).unwrap_or(i32::MAX);
    Ok(levels.into())
}

fn js_convert_addr(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let ip = string_arg(args, 0, context)?;
    Ok(convert_addr(&ip).into())
}

fn js_is_valid_ip_address(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let text = string_arg(args, 0, context)?;
    Ok(is_valid_ip_address(&text).into())
}

fn js_is_in_net(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let pattern = string_arg(args, 1, context)?;
    let mask = string_arg(args, 2, context)?;
    Ok(is_in_net(&host, &pattern, &mask).into())
}

fn js_is_plain_host_name(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(is_plain_host_name(&host).into())
}

fn js_local_host_or_domain_is(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    let hostdom = string_arg(args, 1, context)?;
    Ok(local_host_or_domain_is(&host, &hostdom).into())
}

fn js_sh_exp_match(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let subject = string_arg(args, 0, context)?;
    let pattern = string_arg(args, 1, context)?;
    sh_exp_match(&subject, &pattern)
        .map(JsValue::from)
        .map_err(|err| {
            JsNativeError::syntax()
                .with_message(format!("invalid shExpMatch pattern {pattern:?}: {err}"))
                .into()
        })
}

fn js_is_resolvable(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(is_resolvable(&host).into())
}

fn js_dns_resolve(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let host = string_arg(args, 0, context)?;
    Ok(JsString::from(dns_resolve(&host)).into())
}

fn js_time_window(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(time_window_matches().into())
}

fn js_alert(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let message = string_arg(args, 0, context)?;
    let preview: String = message.chars().take(ALERT_PREVIEW_CHARS).collect();
    debug!("PAC alert: {}", preview);
    Ok(JsValue::undefined())
}
