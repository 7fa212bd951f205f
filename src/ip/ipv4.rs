//! IPv4 text codec.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use super::CodecError;

static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})$")
        .unwrap_or_else(|e| unreachable!("static IPv4 pattern failed to compile: {}", e))
});

/// Parse dotted-quad text into its 32-bit value.
///
/// Only four groups of one to three decimal digits, each at most 255, are
/// accepted. Zero-padded groups such as `010` read as decimal.
pub fn parse_ipv4(text: &str) -> Result<u32, CodecError> {
    let invalid = || CodecError::InvalidIpv4(text.to_string());
    let captures = DOTTED_QUAD.captures(text).ok_or_else(invalid)?;

    let mut octets = [0u8; 4];
    for (octet, group) in octets.iter_mut().zip(1..=4) {
        *octet = captures
            .get(group)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(invalid)?;
    }
    Ok(u32::from(Ipv4Addr::from(octets)))
}

/// Format a 32-bit value as dotted-quad text.
pub fn format_ipv4(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}
