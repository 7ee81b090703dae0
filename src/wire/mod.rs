/*! Leaf codecs for option payloads.

The `wire` module deals with the byte-level pieces the option engine is
built from. None of them know anything about option schemas:

 * [OptionMask] is a bitset of option codes whose byte layout is the wire
   form of a parameter request list.
 * [dname] encodes and decompresses RFC 1035 domain names.
 * [escape] renders untrusted payload bytes as text that is safe to expose
   in environment variables, and parses such text back.
 * [tlv] walks and writes DHCPv4 (1-octet code/length) and DHCPv6
   (2-octet code/length) option streams behind the [OptionSource] trait.

All decoders take borrowed slices and never index outside them; every
malformed input is reported as an [Error](crate::Error).
*/

pub mod dname;
pub mod escape;
mod mask;
pub mod tlv;

pub use self::mask::{
    still_needed, Dhcpv4Mask, Dhcpv6Mask, OptionMask, DHCPV4_MASK_LEN, DHCPV6_MASK_LEN,
};
pub use self::tlv::{Framing, OptionSource, RawOption, TlvSource, TlvWriter};
