#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

//! The _dhcpopt_ library is the option model of a DHCP client: a schema of
//! every known DHCP and DHCPv6 option, and the engine that turns option
//! payloads into values and back.
//!
//! Payloads come from the network and are treated as hostile. No decode
//! path reads outside the slice it was given, recursion into nested
//! options is bounded, and domain-name decompression refuses pointer
//! loops.
//!
//! # Layers
//!
//! * [wire] holds the leaf codecs: the requested-option bitset, RFC 1035
//!   names, escaped text and the TLV walker/writer that sit between the
//!   engine and the message framing.
//! * [schema] holds option descriptors and the [Registry](schema::Registry)
//!   of option spaces.
//! * [codec] dispatches on a descriptor's type tags to decode or encode a
//!   payload, and renders decoded options as environment variables.
//!
//! # Feature flags
//!
//! * `std`: implements `std::error::Error` for [Error].
//! * `log`: emits `debug!`/`trace!` records for skipped or malformed options.
//! * `defmt`: derives `defmt::Format` for the plain data types.
//! * `proto-dhcpv4`, `proto-dhcpv6`: enable the built-in option tables in
//!   [schema::builtin].
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "proto-dhcpv4")]
//! # {
//! use dhcpopt::codec::{Codec, DecodeContext, Value};
//! use dhcpopt::schema::{Registry, Space};
//!
//! let registry = Registry::with_builtin();
//! let codec = Codec::new(&registry, Space::Dhcp);
//! let routers = registry.lookup(Space::Dhcp, 3).unwrap();
//!
//! let mut ctx = DecodeContext::new();
//! let value = codec.decode(routers, &[192, 168, 0, 1, 192, 168, 0, 2], &mut ctx).unwrap();
//! assert_eq!(value, Value::Text("192.168.0.1 192.168.0.2".into()));
//!
//! let bytes = codec.encode(routers, &value).unwrap();
//! assert_eq!(bytes, [192, 168, 0, 1, 192, 168, 0, 2]);
//! # }
//! ```

extern crate alloc;

#[cfg(feature = "log")]
#[macro_use]
extern crate log;

use core::fmt;

#[macro_use]
mod macros;

pub mod codec;
pub mod schema;
pub mod wire;

/// The error type for option encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A declared or implied length does not fit the remaining buffer, or
    /// the payload length does not match the descriptor's width.
    MalformedLength,
    /// A field holds a value outside its domain, e.g. an RFC 3442 prefix
    /// length above 32, a bad address literal or an unsafe character.
    InvalidFieldValue,
    /// A domain name ran past the end of its buffer before the root label.
    UnterminatedCompression,
    /// A compression pointer pointed forwards, at itself, or too many
    /// pointers were followed.
    CompressionLoop,
    /// The output buffer is too small for the encoded option.
    BufferTooSmall,
    /// A value does not have the shape its descriptor declares.
    SchemaMismatch,
    /// Embedded or encapsulated options are nested deeper than allowed.
    TooDeep,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MalformedLength => write!(f, "malformed option length"),
            Error::InvalidFieldValue => write!(f, "invalid field value"),
            Error::UnterminatedCompression => write!(f, "unterminated domain name"),
            Error::CompressionLoop => write!(f, "domain name compression loop"),
            Error::BufferTooSmall => write!(f, "buffer too small"),
            Error::SchemaMismatch => write!(f, "value does not match option schema"),
            Error::TooDeep => write!(f, "options nested too deep"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
