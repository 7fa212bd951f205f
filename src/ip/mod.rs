//! IP address codecs and prefix arithmetic.
//!
//! Both families share one numeric representation: IPv4 values are widened to
//! `u128` so the allocators can be written once over [`AddressFamily`].

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};

pub mod cidr;
pub mod ipv4;
pub mod ipv6;

pub use cidr::Cidr;
pub use ipv4::{format_ipv4, parse_ipv4};
pub use ipv6::{format_ipv6, parse_ipv6};

/// Errors raised while parsing addresses and prefixes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Address {0} is not a valid IPv4 address")]
    InvalidIpv4(String),

    #[error("Address {0} is not a valid IPv6 address")]
    InvalidIpv6(String),

    #[error("Prefix {0} is not in address/mask form")]
    InvalidPrefix(String),

    #[error("Mask {mask} is outside of the range 0-{max}")]
    MaskOutOfRange { mask: u32, max: u32 },
}

/// An address family the allocators can be parameterized over.
pub trait AddressFamily: Copy + Send + Sync + std::fmt::Debug + 'static {
    /// Address width in bits.
    const BITS: u32;
    /// Resource-type tag of the single-address strategy.
    const ADDRESS_TAG: &'static str;
    /// Resource-type tag of the prefix strategy.
    const PREFIX_TAG: &'static str;

    fn parse(text: &str) -> Result<u128, CodecError>;
    fn format(value: u128) -> String;

    /// Network address of `address/prefix_len` with the host bits cleared.
    fn network(address: u128, prefix_len: u8) -> Result<u128, CodecError>;

    /// Parse `address/mask` text into its network address and mask.
    fn parse_net(text: &str) -> Result<(u128, u8), CodecError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6;

impl AddressFamily for Ipv4 {
    const BITS: u32 = 32;
    const ADDRESS_TAG: &'static str = "ipv4";
    const PREFIX_TAG: &'static str = "ipv4_prefix";

    fn parse(text: &str) -> Result<u128, CodecError> {
        parse_ipv4(text).map(u128::from)
    }

    fn format(value: u128) -> String {
        // callers only pass values inside a 32-bit root
        format_ipv4(value as u32)
    }

    fn network(address: u128, prefix_len: u8) -> Result<u128, CodecError> {
        let address = u32::try_from(address).map_err(|_| CodecError::InvalidIpv4(address.to_string()))?;
        let net = Ipv4Net::new(Ipv4Addr::from(address), prefix_len).map_err(|_| CodecError::MaskOutOfRange {
            mask: u32::from(prefix_len),
            max: Self::BITS,
        })?;
        Ok(u128::from(u32::from(net.trunc().network())))
    }

    fn parse_net(text: &str) -> Result<(u128, u8), CodecError> {
        let net: Ipv4Net = text
            .parse()
            .map_err(|_| CodecError::InvalidPrefix(text.to_string()))?;
        Ok((u128::from(u32::from(net.trunc().network())), net.prefix_len()))
    }
}

impl AddressFamily for Ipv6 {
    const BITS: u32 = 128;
    const ADDRESS_TAG: &'static str = "ipv6";
    const PREFIX_TAG: &'static str = "ipv6_prefix";

    fn parse(text: &str) -> Result<u128, CodecError> {
        parse_ipv6(text)
    }

    fn format(value: u128) -> String {
        format_ipv6(value)
    }

    fn network(address: u128, prefix_len: u8) -> Result<u128, CodecError> {
        let net = Ipv6Net::new(Ipv6Addr::from(address), prefix_len).map_err(|_| CodecError::MaskOutOfRange {
            mask: u32::from(prefix_len),
            max: Self::BITS,
        })?;
        Ok(u128::from(net.trunc().network()))
    }

    fn parse_net(text: &str) -> Result<(u128, u8), CodecError> {
        let net: Ipv6Net = text
            .parse()
            .map_err(|_| CodecError::InvalidPrefix(text.to_string()))?;
        Ok((u128::from(net.trunc().network()), net.prefix_len()))
    }
}
