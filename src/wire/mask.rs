use core::fmt;

/// Bytes needed to hold one bit for every DHCPv4 option code.
pub const DHCPV4_MASK_LEN: usize = 256 / 8;
/// Bytes needed to hold one bit for every DHCPv6 option code.
pub const DHCPV6_MASK_LEN: usize = (u16::MAX as usize + 1) / 8;

/// A fixed-capacity set of option codes.
///
/// Code `n` lives in bit `n & 7` of byte `n >> 3`, which is also how a
/// parameter request list is laid out when built from the mask. Codes at or
/// above `N * 8` are a contract violation by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct OptionMask<const N: usize> {
    bits: [u8; N],
}

/// Mask covering option codes 0 to 255.
pub type Dhcpv4Mask = OptionMask<DHCPV4_MASK_LEN>;
/// Mask covering option codes 0 to 65535.
pub type Dhcpv6Mask = OptionMask<DHCPV6_MASK_LEN>;

impl<const N: usize> OptionMask<N> {
    /// Highest code plus one that fits in this mask.
    pub const CAPACITY: usize = N * 8;

    /// Create an empty mask.
    pub const fn new() -> Self {
        Self { bits: [0; N] }
    }

    /// Imbue a raw octet array with mask structure.
    pub const fn from_bytes(bits: [u8; N]) -> Self {
        Self { bits }
    }

    /// Return the underlying octets.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bits
    }

    pub fn add(&mut self, code: u32) {
        debug_assert!((code as usize) < Self::CAPACITY);
        self.bits[(code >> 3) as usize] |= 1u8 << (code & 7);
    }

    pub fn remove(&mut self, code: u32) {
        debug_assert!((code as usize) < Self::CAPACITY);
        self.bits[(code >> 3) as usize] &= !(1u8 << (code & 7));
    }

    pub fn contains(&self, code: u32) -> bool {
        debug_assert!((code as usize) < Self::CAPACITY);
        self.bits[(code >> 3) as usize] & (1u8 << (code & 7)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|b| *b == 0)
    }

    /// Return an iterator over the codes in the mask, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte != 0)
            .flat_map(|(i, byte)| {
                (0..8u32)
                    .filter(move |bit| *byte & (1u8 << *bit) != 0)
                    .map(move |bit| (i as u32) << 3 | bit)
            })
    }
}

impl<const N: usize> Default for OptionMask<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for OptionMask<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<const N: usize> fmt::Display for OptionMask<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for code in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

/// Return whether `code` was requested but not yet received.
pub fn still_needed<const N: usize>(
    requested: &OptionMask<N>,
    received: &OptionMask<N>,
    code: u32,
) -> bool {
    requested.contains(code) && !received.contains(code)
}
