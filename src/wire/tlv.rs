// See https://tools.ietf.org/html/rfc2132#section-2 (DHCPv4) and
// https://datatracker.ietf.org/doc/html/rfc8415#section-21.1 (DHCPv6)
// for the option formats walked here.

use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::OptionMask;
use crate::{Error, Result};

/// DHCPv4 pad option, a single octet with no length.
pub const DHCPV4_OPT_PAD: u8 = 0;
/// DHCPv4 end option, terminates the option area.
pub const DHCPV4_OPT_END: u8 = 255;

/// Request list entries emitted by [TlvWriter::emit_request_list].
pub const MAX_REQUEST_OPTIONS: usize = 256;

/// How option code and length are laid out in front of each payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    /// One octet code, one octet length.
    Dhcpv4,
    /// Two octet code, two octet length, network byte order.
    Dhcpv6,
}

impl Framing {
    /// Length of the code and length fields together.
    pub const fn header_len(&self) -> usize {
        match self {
            Framing::Dhcpv4 => 2,
            Framing::Dhcpv6 => 4,
        }
    }

    /// Largest payload a single option instance can carry.
    pub const fn max_data_len(&self) -> usize {
        match self {
            Framing::Dhcpv4 => u8::MAX as usize,
            Framing::Dhcpv6 => u16::MAX as usize,
        }
    }

    /// Largest option code representable.
    pub const fn max_code(&self) -> u32 {
        match self {
            Framing::Dhcpv4 => u8::MAX as u32,
            Framing::Dhcpv6 => u16::MAX as u32,
        }
    }
}

// The format of DHCPv4 options is:
//
//     0                   1
//     0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 ...
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-
//    |     code      |      len      |  data ...
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-
//
// Codes 0 (pad) and 255 (end) carry no length octet.
//
// The format of DHCPv6 options is:
//
//     0                   1                   2                   3
//     0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//    |          option-code          |           option-len          |
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//    |                          option-data                          |
//    |                      (option-len octets)                      |
//    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
/// A single option instance, borrowed from the message it was found in.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawOption<'a> {
    pub code: u32,
    pub data: &'a [u8],
}

/// A stream of raw options.
///
/// The codec never parses message framing itself; it asks a source for
/// option instances. Sources for DHCPv4, DHCPv6 and nested option streams
/// only differ in how they frame each option.
pub trait OptionSource<'a> {
    /// Return the next option in the stream, `None` once it is exhausted.
    ///
    /// A malformed header or an option running past the end of the
    /// buffer yields `Some(Err(_))`, after which the stream is exhausted.
    fn next_option(&mut self) -> Option<Result<RawOption<'a>>>;

    /// Restart the stream from its first option.
    fn rewind(&mut self);

    /// Return the payload of the next instance of `code`.
    fn next_instance(&mut self, code: u32) -> Option<Result<&'a [u8]>> {
        while let Some(option) = self.next_option() {
            match option {
                Ok(option) if option.code == code => return Some(Ok(option.data)),
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

/// An [OptionSource] over a contiguous buffer of TLV-framed options.
#[derive(Debug, Clone)]
pub struct TlvSource<'a> {
    framing: Framing,
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> TlvSource<'a> {
    pub fn new(framing: Framing, buffer: &'a [u8]) -> Self {
        Self {
            framing,
            buffer,
            offset: 0,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Octets not yet walked.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buffer[self.offset..]
    }

    fn exhaust(&mut self) {
        self.offset = self.buffer.len();
    }
}

impl<'a> OptionSource<'a> for TlvSource<'a> {
    fn next_option(&mut self) -> Option<Result<RawOption<'a>>> {
        loop {
            let buf = &self.buffer[self.offset..];
            if buf.is_empty() {
                return None;
            }

            let (code, len) = match self.framing {
                Framing::Dhcpv4 => match buf[0] {
                    DHCPV4_OPT_PAD => {
                        self.offset += 1;
                        continue;
                    }
                    DHCPV4_OPT_END => {
                        self.exhaust();
                        return None;
                    }
                    code => match buf.get(1) {
                        Some(len) => (code as u32, *len as usize),
                        None => {
                            self.exhaust();
                            return Some(Err(Error::MalformedLength));
                        }
                    },
                },
                Framing::Dhcpv6 => {
                    if buf.len() < 4 {
                        self.exhaust();
                        return Some(Err(Error::MalformedLength));
                    }
                    let code = NetworkEndian::read_u16(&buf[0..2]) as u32;
                    let len = NetworkEndian::read_u16(&buf[2..4]) as usize;
                    (code, len)
                }
            };

            let start = self.framing.header_len();
            let data = match buf.get(start..start + len) {
                Some(data) => data,
                None => {
                    net_debug!("tlv: option {} overruns buffer ({} > {})", code, len, buf.len() - start);
                    self.exhaust();
                    return Some(Err(Error::MalformedLength));
                }
            };

            self.offset += start + len;
            return Some(Ok(RawOption { code, data }));
        }
    }

    fn rewind(&mut self) {
        self.offset = 0;
    }
}

/// Writes TLV-framed options into a caller supplied buffer.
pub struct TlvWriter<'a> {
    framing: Framing,
    /// The part of the buffer that has not been written yet.
    buffer: &'a mut [u8],
    written: usize,
}

impl<'a> TlvWriter<'a> {
    pub fn new(framing: Framing, buffer: &'a mut [u8]) -> Self {
        Self {
            framing,
            buffer,
            written: 0,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Octets written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Return the number of octets `emit` will use for a payload of `data_len`.
    pub fn buffer_len(framing: Framing, data_len: usize) -> usize {
        let max = framing.max_data_len();
        let instances = if data_len == 0 {
            1
        } else {
            (data_len + max - 1) / max
        };
        instances * framing.header_len() + data_len
    }

    fn take(&mut self, len: usize) -> &'a mut [u8] {
        let (buf, rest) = core::mem::take(&mut self.buffer).split_at_mut(len);
        self.buffer = rest;
        self.written += len;
        buf
    }

    fn emit_one(&mut self, code: u32, data: &[u8]) {
        let header_len = self.framing.header_len();
        let buf = self.take(header_len + data.len());
        match self.framing {
            Framing::Dhcpv4 => {
                buf[0] = code as u8;
                buf[1] = data.len() as u8;
            }
            Framing::Dhcpv6 => {
                NetworkEndian::write_u16(&mut buf[0..2], code as u16);
                NetworkEndian::write_u16(&mut buf[2..4], data.len() as u16);
            }
        }
        buf[header_len..].copy_from_slice(data);
    }

    /// Emit one option.
    ///
    /// A DHCPv4 payload longer than 255 octets is split over consecutive
    /// instances of the same code (RFC 3396); a DHCPv6 payload that does
    /// not fit a 16-bit length is an error.
    pub fn emit(&mut self, code: u32, data: &[u8]) -> Result<()> {
        if code > self.framing.max_code() {
            return Err(Error::InvalidFieldValue);
        }
        if self.framing == Framing::Dhcpv6 && data.len() > self.framing.max_data_len() {
            return Err(Error::MalformedLength);
        }
        if self.buffer.len() < Self::buffer_len(self.framing, data.len()) {
            return Err(Error::BufferTooSmall);
        }

        if data.is_empty() {
            self.emit_one(code, data);
        } else {
            for chunk in data.chunks(self.framing.max_data_len()) {
                self.emit_one(code, chunk);
            }
        }
        Ok(())
    }

    /// Emit a parameter request list holding every code in `mask`.
    ///
    /// DHCPv4 lists one octet per code, DHCPv6 (the ORO) two.
    pub fn emit_request_list<const N: usize>(&mut self, code: u32, mask: &OptionMask<N>) -> Result<()> {
        let width = self.framing.header_len() / 2;
        let mut list: heapless::Vec<u8, { MAX_REQUEST_OPTIONS * 2 }> = heapless::Vec::new();

        for requested in mask.iter() {
            if requested > self.framing.max_code() {
                return Err(Error::InvalidFieldValue);
            }
            let mut field = [0u8; 2];
            NetworkEndian::write_u16(&mut field, requested as u16);
            list.extend_from_slice(&field[2 - width..])
                .map_err(|_| Error::BufferTooSmall)?;
        }

        self.emit(code, &list)
    }
}

impl<'a> fmt::Debug for TlvWriter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TlvWriter")
            .field("framing", &self.framing)
            .field("written", &self.written)
            .field("free", &self.buffer.len())
            .finish()
    }
}
