//! CIDR prefixes over either address family.

use std::fmt;
use std::marker::PhantomData;

use super::{AddressFamily, CodecError};
use crate::utils::count::Count;
use crate::utils::interval::{host_mask, Interval};

/// A canonical prefix: the address has every bit beyond `prefix_len` cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr<F: AddressFamily> {
    address: u128,
    prefix_len: u32,
    family: PhantomData<F>,
}

impl<F: AddressFamily> Cidr<F> {
    /// Build a prefix from an address and mask, zeroing host bits.
    pub fn new(address: u128, prefix_len: u32) -> Result<Self, CodecError> {
        let mask = u8::try_from(prefix_len).map_err(|_| CodecError::MaskOutOfRange {
            mask: prefix_len,
            max: F::BITS,
        })?;
        Ok(Cidr {
            address: F::network(address, mask)?,
            prefix_len,
            family: PhantomData,
        })
    }

    /// Parse `address/mask` text.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let (address, mask) = F::parse_net(text)?;
        Ok(Cidr {
            address,
            prefix_len: u32::from(mask),
            family: PhantomData,
        })
    }

    /// Build a prefix from separately stored address text and mask.
    pub fn from_parts(address: &str, prefix_len: u32) -> Result<Self, CodecError> {
        Self::new(F::parse(address)?, prefix_len)
    }

    pub fn address(&self) -> u128 {
        self.address
    }

    pub fn prefix_len(&self) -> u32 {
        self.prefix_len
    }

    pub fn host_bits(&self) -> u32 {
        F::BITS - self.prefix_len
    }

    /// Number of addresses covered.
    pub fn width(&self) -> Count {
        self.interval().width()
    }

    pub fn last_address(&self) -> u128 {
        self.address | host_mask(self.host_bits())
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.address,
            last: self.last_address(),
        }
    }

    /// Assignable host addresses: everything but network and broadcast,
    /// except for /31 and /32 style point-to-point blocks.
    pub fn hosts_in_mask(&self) -> Count {
        match self.host_bits() {
            0 => Count::ONE,
            1 => Count::new(2),
            _ => self.width().saturating_sub(Count::new(2)),
        }
    }
}

impl<F: AddressFamily> fmt::Display for Cidr<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", F::format(self.address), self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::{Ipv4, Ipv6};

    #[test]
    fn test_parse_canonicalizes_host_bits() {
        let v4 = Cidr::<Ipv4>::parse("192.168.1.77/24").unwrap();
        assert_eq!(v4.to_string(), "192.168.1.0/24");
        assert_eq!(Cidr::<Ipv4>::parse("10.1.2.3/0").unwrap().to_string(), "0.0.0.0/0");

        let cases = [
            ("dead::beef/64", "dead::/64"),
            ("::1/19", "::/19"),
            ("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128", "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/128"),
            ("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/112", "ffff:ffff:ffff:ffff:ffff:ffff:ffff:0/112"),
            ("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff/8", "ff00::/8"),
            ("a897:fedc:1111:9999:f999:abcd::/95", "a897:fedc:1111:9999:f999:abcc::/95"),
        ];
        for (text, canonical) in cases {
            assert_eq!(Cidr::<Ipv6>::parse(text).unwrap().to_string(), canonical);
        }
    }

    #[test]
    fn test_parse_rejects_bad_masks() {
        assert!(Cidr::<Ipv4>::parse("10.0.0.0/33").is_err());
        assert!(Cidr::<Ipv4>::parse("10.0.0.0").is_err());
        assert!(Cidr::<Ipv4>::parse("10.0.0.0/x").is_err());
        assert!(Cidr::<Ipv6>::parse("::/129").is_err());
        assert!(Cidr::<Ipv6>::parse("::/-1").is_err());
        assert!(Cidr::<Ipv4>::parse("10.0.0.0/+8").is_err());
        assert!(Cidr::<Ipv6>::parse("dead::/+64").is_err());
        assert!(matches!(
            Cidr::<Ipv4>::from_parts("10.0.0.0", 33),
            Err(CodecError::MaskOutOfRange { mask: 33, max: 32 })
        ));
        assert!(matches!(
            Cidr::<Ipv6>::new(0, 300),
            Err(CodecError::MaskOutOfRange { mask: 300, max: 128 })
        ));
    }

    #[test]
    fn test_widths_and_hosts() {
        let root = Cidr::<Ipv4>::parse("10.0.0.0/8").unwrap();
        assert_eq!(root.width(), Count::new(16_777_216));
        assert_eq!(root.hosts_in_mask(), Count::new(16_777_214));
        assert_eq!(Cidr::<Ipv4>::parse("10.0.0.0/31").unwrap().hosts_in_mask(), Count::new(2));
        assert_eq!(Cidr::<Ipv4>::parse("10.0.0.0/32").unwrap().hosts_in_mask(), Count::ONE);
        assert_eq!(Cidr::<Ipv6>::parse("::/0").unwrap().width(), Count::MAX);
        assert_eq!(Cidr::<Ipv6>::parse("::/0").unwrap().last_address(), u128::MAX);
    }
}
