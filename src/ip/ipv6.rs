//! IPv6 text codec.
//!
//! Parsing and formatting go through `std::net::Ipv6Addr`, so text follows
//! RFC 5952: lowercase hex, the first longest run of two or more zero groups
//! collapsed to `::`, and IPv4-mapped addresses in dotted form.

use std::net::Ipv6Addr;

use super::CodecError;

/// Parse IPv6 text into its 128-bit value.
pub fn parse_ipv6(text: &str) -> Result<u128, CodecError> {
    text.parse::<Ipv6Addr>()
        .map(u128::from)
        .map_err(|_| CodecError::InvalidIpv6(text.to_string()))
}

/// Format a 128-bit value as IPv6 text.
pub fn format_ipv6(value: u128) -> String {
    Ipv6Addr::from(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_canonical_forms() {
        for text in [
            "dead::beef",
            "::1",
            "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff",
            "::",
            "a897:fedc:1111:9999:f999::abcd",
            "1::",
            "ffff:ffff:ffff:ffff:ffff:ffff:ffff:0",
        ] {
            assert_eq!(format_ipv6(parse_ipv6(text).unwrap()), text);
        }
    }

    #[test]
    fn test_parse_expands_elision() {
        assert_eq!(parse_ipv6("dead::beef").unwrap(), 0xdead_0000_0000_0000_0000_0000_0000_beef);
        assert_eq!(parse_ipv6("::").unwrap(), 0);
        assert_eq!(parse_ipv6("1:2:3:4:5:6:7:8").unwrap(), 0x0001_0002_0003_0004_0005_0006_0007_0008);
        assert_eq!(parse_ipv6("DEAD::BEEF").unwrap(), parse_ipv6("dead::beef").unwrap());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for text in [
            "xxxx::yyyy",
            "z",
            "888878468945",
            "1::2::3",
            "12345::",
            "1:2:3:4:5:6:7",
            "1:2:3:4:5:6:7:8:9",
            "1:2:3:4::5:6:7:8",
            ":1:2:3:4:5:6:7",
            "1:2:3:4:5:6:7:",
            "",
        ] {
            assert!(parse_ipv6(text).is_err(), "{} should be rejected", text);
        }
    }

    #[test]
    fn test_format_collapses_first_longest_run() {
        // two runs of equal length: the first one collapses
        assert_eq!(format_ipv6(parse_ipv6("1:0:0:2:3:0:0:4").unwrap()), "1::2:3:0:0:4");
        // the longer run wins
        assert_eq!(format_ipv6(parse_ipv6("1:0:0:2:0:0:0:4").unwrap()), "1:0:0:2::4");
        // a single zero group is never collapsed
        assert_eq!(format_ipv6(parse_ipv6("1:0:2:3:4:5:6:7").unwrap()), "1:0:2:3:4:5:6:7");
    }
}
