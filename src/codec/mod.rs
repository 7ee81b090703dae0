/*! The option codec engine.

A [Codec] pairs a [Registry] with the option space it is decoding. It
dispatches on the [OptionType] tags of a [Descriptor] to turn an option
payload into a [Value], recursing into embedded fields and encapsulated
sub-options, and turns values back into payloads.

The codec only reads the registry. Everything a decoding pass has to
remember, which today is the instance numbers of `INDEX` options, is
kept in a [DecodeContext] owned by the caller, so one codec can serve
any number of concurrent passes.
*/

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use managed::ManagedMap;

use crate::schema::{Descriptor, OptionType, Registry, Space};
use crate::wire::escape::TextMode;
use crate::{Error, Result};

mod decode;
mod encode;
pub mod env;

pub use self::env::{variables, Variable};

/// Deepest nesting of embedded and encapsulated options accepted.
pub const MAX_DEPTH: usize = 8;

/// A decoded option payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An optional field with no payload.
    Absent,
    /// A flag option that was present.
    Present,
    /// The text form of the payload.
    Text(String),
    /// Bytes with no text form.
    Raw(Vec<u8>),
    /// An option made of embedded fields and encapsulated sub-options.
    Composite {
        embedded: Vec<Value>,
        encapsulated: Vec<Decoded>,
    },
}

/// A sub-option, or a vendor block, of a composite value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub code: u32,
    /// Instance number of an `INDEX` option, counting from 1.
    pub index: Option<u32>,
    pub value: Value,
}

/// One top-level option found in a message.
///
/// Options fail to decode independently of each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOption {
    pub code: u32,
    pub index: Option<u32>,
    pub value: Result<Value>,
}

/// Per-pass decoding state.
///
/// Each stream of encapsulated options is an enumeration scope of its
/// own; the top level of a message is scope 0.
pub struct DecodeContext<'c> {
    indexes: ManagedMap<'c, (u32, u32), u32>,
    next_scope: u32,
}

impl DecodeContext<'static> {
    /// Create a context whose index table grows as needed.
    pub fn new() -> Self {
        DecodeContext {
            indexes: ManagedMap::Owned(BTreeMap::new()),
            next_scope: 1,
        }
    }
}

impl<'c> DecodeContext<'c> {
    /// Create a context keeping its index table in `storage`.
    ///
    /// Decoding fails with [Error::BufferTooSmall] once every slot is in
    /// use. One slot per distinct indexed code on the path from the top
    /// level to the deepest option is enough.
    pub fn with_storage(storage: &'c mut [Option<((u32, u32), u32)>]) -> Self {
        let mut indexes = ManagedMap::Borrowed(storage);
        indexes.clear();
        DecodeContext {
            indexes,
            next_scope: 1,
        }
    }

    /// Forget every instance number, ready for the next message.
    pub fn reset(&mut self) {
        self.indexes.clear();
        self.next_scope = 1;
    }

    /// Return the instance number for the next option `code` in `scope`.
    pub(crate) fn next_index(&mut self, scope: u32, code: u32) -> Result<u32> {
        let index = self.indexes.get(&(scope, code)).copied().unwrap_or(0) + 1;
        self.indexes
            .insert((scope, code), index)
            .map_err(|_| Error::BufferTooSmall)?;
        Ok(index)
    }

    pub(crate) fn open_scope(&mut self) -> u32 {
        let scope = self.next_scope;
        self.next_scope = self.next_scope.wrapping_add(1).max(1);
        scope
    }

    pub(crate) fn close_scope(&mut self, scope: u32) {
        let keys: Vec<(u32, u32)> = self
            .indexes
            .iter()
            .filter(|((s, _), _)| *s == scope)
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.indexes.remove(&key);
        }
    }
}

impl<'c> fmt::Debug for DecodeContext<'c> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.indexes.iter()).finish()
    }
}

impl Default for DecodeContext<'static> {
    fn default() -> Self {
        DecodeContext::new()
    }
}

/// Decodes and encodes option payloads of one option space.
#[derive(Debug, Clone, Copy)]
pub struct Codec<'r> {
    registry: &'r Registry,
    space: Space,
}

impl<'r> Codec<'r> {
    pub fn new(registry: &'r Registry, space: Space) -> Self {
        Codec { registry, space }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn space(&self) -> Space {
        self.space
    }

    /// Return the descriptor of sub-option `code` of `parent`.
    ///
    /// A sub-option tagged `OPTION` is laid out like the top-level option
    /// with the same code.
    pub(crate) fn resolve<'a>(&self, parent: &'a Descriptor, code: u32) -> Option<&'a Descriptor>
    where
        'r: 'a,
    {
        let child = parent.encapsulated(code)?;
        if child.kind.contains(OptionType::OPTION) {
            self.registry.lookup(self.space, code)
        } else {
            Some(child)
        }
    }

    pub(crate) fn is_vendor(&self, descriptor: &Descriptor, depth: usize) -> bool {
        depth == 0 && descriptor.code == self.space.vendor_option()
    }
}

/// Pick the text convention of a string-like option.
///
/// Returns `None` for options that carry no text at all.
pub(crate) fn text_mode(kind: OptionType) -> Option<TextMode> {
    if kind.contains(OptionType::BINHEX) {
        Some(TextMode::BinHex)
    } else if kind.contains(OptionType::RAW) {
        Some(TextMode::Raw)
    } else if kind.contains(OptionType::ESCFILE) {
        Some(TextMode::EscFile)
    } else if kind.contains(OptionType::ESCSTRING) {
        Some(TextMode::EscString)
    } else if kind.contains(OptionType::URI) {
        Some(TextMode::Uri)
    } else if kind.contains(OptionType::ASCII) {
        Some(TextMode::Ascii)
    } else if kind.contains(OptionType::STRING) {
        Some(TextMode::Plain)
    } else {
        None
    }
}

/// Return whether an embedded field takes every octet left in the block.
pub(crate) fn takes_rest(kind: OptionType, len: usize) -> bool {
    if kind.contains(OptionType::FLAG) {
        false
    } else if kind.fixed_width().is_some() {
        kind.contains(OptionType::ARRAY)
    } else {
        len == 0
    }
}
