/*! Option schemas.

A [Descriptor] says how one option is laid out: its code, a set of
[OptionType] tags, an optional fixed length and the children it embeds
or encapsulates. A [Registry] holds the descriptor tables of both option
spaces, plus the per-enterprise tables of their vendor-specific options.

Registries are built once and then only read; the codec never mutates
them, and decoding state is kept by the caller instead.
*/

use alloc::string::String;
use alloc::vec::Vec;
use bitflags::bitflags;
use core::fmt;

use crate::wire::{Framing, OptionMask};
use crate::{Error, Result};

#[cfg(any(feature = "proto-dhcpv4", feature = "proto-dhcpv6"))]
pub mod builtin;

bitflags! {
    /// Type tags of an option.
    ///
    /// Exactly one value type is normally set, combined with any number of
    /// modifiers (`ARRAY`, `OPTIONAL`, `EMBED`, ...).
    pub struct OptionType: u32 {
        const REQUEST   = 1 << 0;
        const UINT8     = 1 << 1;
        const INT8      = 1 << 2;
        const UINT16    = 1 << 3;
        const INT16     = 1 << 4;
        const UINT32    = 1 << 5;
        const INT32     = 1 << 6;
        const ADDRIPV4  = 1 << 7;
        const STRING    = 1 << 8;
        const ARRAY     = 1 << 9;
        const RFC3361   = 1 << 10;
        const RFC1035   = 1 << 11;
        const RFC3442   = 1 << 12;
        const OPTIONAL  = 1 << 13;
        const ADDRIPV6  = 1 << 14;
        const BINHEX    = 1 << 15;
        const FLAG      = 1 << 16;
        const NOREQ     = 1 << 17;
        const EMBED     = 1 << 18;
        const ENCAP     = 1 << 19;
        const INDEX     = 1 << 20;
        const OPTION    = 1 << 21;
        const DOMAIN    = 1 << 22;
        const ASCII     = 1 << 23;
        const RAW       = 1 << 24;
        const ESCSTRING = 1 << 25;
        const ESCFILE   = 1 << 26;
        const BITFLAG   = 1 << 27;
        const RESERVED  = 1 << 28;
        const URI       = 1 << 29;
        const TRUNCATED = 1 << 30;
    }
}

const KEYWORDS: &[(OptionType, &str)] = &[
    (OptionType::REQUEST, "request"),
    (OptionType::NOREQ, "norequest"),
    (OptionType::OPTIONAL, "optional"),
    (OptionType::RESERVED, "reserved"),
    (OptionType::TRUNCATED, "truncated"),
    (OptionType::INDEX, "index"),
    (OptionType::ARRAY, "array"),
    (OptionType::UINT8, "uint8"),
    (OptionType::INT8, "int8"),
    (OptionType::UINT16, "uint16"),
    (OptionType::INT16, "int16"),
    (OptionType::UINT32, "uint32"),
    (OptionType::INT32, "int32"),
    (OptionType::ADDRIPV4, "ipaddress"),
    (OptionType::ADDRIPV6, "ip6address"),
    (OptionType::FLAG, "flag"),
    (OptionType::BITFLAG, "bitflags"),
    (OptionType::RFC1035, "rfc1035"),
    (OptionType::DOMAIN, "domain"),
    (OptionType::RFC3361, "rfc3361"),
    (OptionType::RFC3442, "rfc3442"),
    (OptionType::BINHEX, "binhex"),
    (OptionType::ASCII, "ascii"),
    (OptionType::RAW, "raw"),
    (OptionType::ESCSTRING, "escstring"),
    (OptionType::ESCFILE, "escfile"),
    (OptionType::URI, "uri"),
    (OptionType::STRING, "string"),
    (OptionType::EMBED, "embed"),
    (OptionType::ENCAP, "encap"),
    (OptionType::OPTION, "option"),
];

impl OptionType {
    /// Return the width of one element of a fixed-width type.
    pub fn fixed_width(&self) -> Option<usize> {
        if self.intersects(OptionType::UINT8 | OptionType::INT8 | OptionType::BITFLAG) {
            Some(1)
        } else if self.intersects(OptionType::UINT16 | OptionType::INT16) {
            Some(2)
        } else if self.intersects(OptionType::UINT32 | OptionType::INT32 | OptionType::ADDRIPV4) {
            Some(4)
        } else if self.contains(OptionType::ADDRIPV6) {
            Some(16)
        } else {
            None
        }
    }

    /// Return the keyword of `self`, if it is a single known tag.
    pub fn keyword(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(tag, _)| tag == self)
            .map(|(_, keyword)| *keyword)
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (tag, keyword) in KEYWORDS {
            if self.contains(*tag) {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write!(f, "{keyword}")?;
            }
        }
        Ok(())
    }
}

/// Describes the layout of one option, or of one field or sub-option of
/// another option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Option code. In a vendor table, the IANA enterprise number.
    pub code: u32,
    pub kind: OptionType,
    /// Fixed payload length for variable-length types, 0 to take the
    /// length from the wire.
    pub len: usize,
    /// Name used when rendering variables.
    pub name: String,
    /// Labels of the bits of a `BITFLAG` byte, most significant bit first.
    /// `b'0'` or `0` leaves a bit unnamed.
    pub bitflags: [u8; 8],
    /// Fields laid out back to back at the start of the payload.
    pub embedded: Vec<Descriptor>,
    /// Sub-options carried as a TLV stream after the embedded fields.
    pub encapsulated: Vec<Descriptor>,
}

impl Descriptor {
    pub fn new(code: u32, kind: OptionType, name: &str) -> Self {
        Descriptor {
            code,
            kind,
            len: 0,
            name: name.into(),
            bitflags: [0; 8],
            embedded: Vec::new(),
            encapsulated: Vec::new(),
        }
    }

    pub fn with_len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    pub fn with_bitflags(mut self, labels: &[u8; 8]) -> Self {
        self.bitflags = *labels;
        self
    }

    /// Append an embedded field.
    pub fn embed(mut self, child: Descriptor) -> Self {
        self.kind |= OptionType::EMBED;
        self.embedded.push(child);
        self
    }

    /// Add an encapsulated sub-option, replacing any with the same code.
    pub fn encap(mut self, child: Descriptor) -> Self {
        self.kind |= OptionType::ENCAP;
        insert_sorted(&mut self.encapsulated, child);
        self
    }

    /// Find the encapsulated sub-option with `code`.
    pub fn encapsulated(&self, code: u32) -> Option<&Descriptor> {
        find(&self.encapsulated, code)
    }

    /// Return the number of octets this option takes from `remaining`
    /// octets of payload.
    ///
    /// Fixed-width types take their width, or as many whole elements as
    /// fit when they are arrays. Other types take their fixed length if
    /// they have one, and everything otherwise. The result may exceed
    /// `remaining`; that is for the caller to reject.
    pub fn width(&self, remaining: usize) -> usize {
        if self.kind.contains(OptionType::FLAG) {
            return 0;
        }
        match self.kind.fixed_width() {
            Some(width) if self.kind.contains(OptionType::ARRAY) => remaining - remaining % width,
            Some(width) => width,
            None if self.len > 0 => self.len,
            None => remaining,
        }
    }

    /// Return whether the option may be asked for in a request list.
    pub fn is_requestable(&self) -> bool {
        !self.kind.intersects(OptionType::NOREQ | OptionType::RESERVED)
    }
}

fn find(list: &[Descriptor], code: u32) -> Option<&Descriptor> {
    list.binary_search_by_key(&code, |d| d.code)
        .ok()
        .map(|index| &list[index])
}

fn insert_sorted(list: &mut Vec<Descriptor>, descriptor: Descriptor) -> Option<Descriptor> {
    match list.binary_search_by_key(&descriptor.code, |d| d.code) {
        Ok(index) => Some(core::mem::replace(&mut list[index], descriptor)),
        Err(index) => {
            list.insert(index, descriptor);
            None
        }
    }
}

/// An option space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Space {
    /// DHCP for IPv4.
    Dhcp,
    /// DHCP for IPv6.
    Dhcp6,
}

impl Space {
    pub const fn framing(&self) -> Framing {
        match self {
            Space::Dhcp => Framing::Dhcpv4,
            Space::Dhcp6 => Framing::Dhcpv6,
        }
    }

    /// Code of the vendor-identifying vendor-specific option.
    pub const fn vendor_option(&self) -> u32 {
        match self {
            // RFC 3925
            Space::Dhcp => 125,
            // RFC 8415 section 21.17
            Space::Dhcp6 => 17,
        }
    }
}

/// Union of the codes in `base` and `overrides` that should be requested.
///
/// A code qualifies when it is tagged `REQUEST` or set in `include`, and
/// is not tagged `NOREQ`. Codes set in `exclude` are then removed.
pub fn request_mask<const N: usize>(
    base: &[Descriptor],
    overrides: &[Descriptor],
    include: &OptionMask<N>,
    exclude: &OptionMask<N>,
) -> OptionMask<N> {
    let mut mask = OptionMask::new();

    for descriptor in base.iter().chain(overrides) {
        let code = descriptor.code;
        if code as usize >= OptionMask::<N>::CAPACITY || !descriptor.is_requestable() {
            continue;
        }
        if descriptor.kind.contains(OptionType::REQUEST) || include.contains(code) {
            mask.add(code);
        }
    }

    for code in exclude.iter() {
        mask.remove(code);
    }

    mask
}

/// The descriptor tables of both option spaces.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    dhcp: Vec<Descriptor>,
    dhcp_vendor: Vec<Descriptor>,
    dhcp6: Vec<Descriptor>,
    dhcp6_vendor: Vec<Descriptor>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in tables of every enabled
    /// protocol.
    pub fn with_builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "proto-dhcpv4")]
        for descriptor in builtin::dhcp_options() {
            insert_sorted(&mut registry.dhcp, descriptor);
        }
        #[cfg(feature = "proto-dhcpv6")]
        {
            for descriptor in builtin::dhcp6_options() {
                insert_sorted(&mut registry.dhcp6, descriptor);
            }
            for descriptor in builtin::dhcp6_vendor_options() {
                insert_sorted(&mut registry.dhcp6_vendor, descriptor);
            }
        }

        registry
    }

    fn list(&self, space: Space, vendor: bool) -> &Vec<Descriptor> {
        match (space, vendor) {
            (Space::Dhcp, false) => &self.dhcp,
            (Space::Dhcp, true) => &self.dhcp_vendor,
            (Space::Dhcp6, false) => &self.dhcp6,
            (Space::Dhcp6, true) => &self.dhcp6_vendor,
        }
    }

    fn list_mut(&mut self, space: Space, vendor: bool) -> &mut Vec<Descriptor> {
        match (space, vendor) {
            (Space::Dhcp, false) => &mut self.dhcp,
            (Space::Dhcp, true) => &mut self.dhcp_vendor,
            (Space::Dhcp6, false) => &mut self.dhcp6,
            (Space::Dhcp6, true) => &mut self.dhcp6_vendor,
        }
    }

    /// Add an option to `space`, returning the descriptor it replaced.
    pub fn insert(&mut self, space: Space, descriptor: Descriptor) -> Result<Option<Descriptor>> {
        if descriptor.code > space.framing().max_code() {
            return Err(Error::InvalidFieldValue);
        }
        Ok(insert_sorted(self.list_mut(space, false), descriptor))
    }

    /// Add a vendor table to `space`.
    ///
    /// The descriptor's code is the enterprise number, and its
    /// encapsulated children are the vendor's sub-options.
    pub fn insert_vendor(&mut self, space: Space, descriptor: Descriptor) -> Option<Descriptor> {
        insert_sorted(self.list_mut(space, true), descriptor)
    }

    pub fn lookup(&self, space: Space, code: u32) -> Option<&Descriptor> {
        find(self.list(space, false), code)
    }

    pub fn lookup_name(&self, space: Space, name: &str) -> Option<&Descriptor> {
        self.list(space, false).iter().find(|d| d.name == name)
    }

    pub fn vendor_lookup(&self, space: Space, enterprise: u32) -> Option<&Descriptor> {
        find(self.list(space, true), enterprise)
    }

    /// Return the options of `space`, ordered by code.
    pub fn options(&self, space: Space) -> &[Descriptor] {
        self.list(space, false)
    }

    /// Build the mask of codes to request in `space`.
    ///
    /// See [request_mask].
    pub fn build_request_mask<const N: usize>(
        &self,
        space: Space,
        overrides: &[Descriptor],
        include: &OptionMask<N>,
        exclude: &OptionMask<N>,
    ) -> OptionMask<N> {
        request_mask(self.options(space), overrides, include, exclude)
    }

    /// Set or clear the bits of `mask` for a list of options.
    ///
    /// `names` is separated by commas or whitespace; each entry is an
    /// option name, looked up in `overrides` first, or a decimal code.
    pub fn apply_names<const N: usize>(
        &self,
        space: Space,
        overrides: &[Descriptor],
        names: &str,
        mask: &mut OptionMask<N>,
        add: bool,
    ) -> Result<()> {
        let tokens = names
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty());

        for token in tokens {
            let code = match token.parse::<u32>() {
                Ok(code) => code,
                Err(_) => overrides
                    .iter()
                    .find(|d| d.name == token)
                    .or_else(|| self.lookup_name(space, token))
                    .map(|d| d.code)
                    .ok_or_else(|| {
                        net_debug!("schema: unknown option {}", token);
                        Error::InvalidFieldValue
                    })?,
            };
            if code as usize >= OptionMask::<N>::CAPACITY || code > space.framing().max_code() {
                return Err(Error::InvalidFieldValue);
            }
            if add {
                mask.add(code);
            } else {
                mask.remove(code);
            }
        }

        Ok(())
    }
}
