use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use core::net::{Ipv4Addr, Ipv6Addr};
use core::str::FromStr;

use super::{takes_rest, text_mode, Codec, Decoded, Value, MAX_DEPTH};
use crate::schema::{Descriptor, OptionType};
use crate::wire::escape::{self, TextMode};
use crate::wire::{dname, Framing, TlvWriter};
use crate::{Error, Result};

/// Append one TLV-framed option to `out`.
fn push_tlv(framing: Framing, code: u32, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    out.resize(start + TlvWriter::buffer_len(framing, data.len()), 0);
    let result = TlvWriter::new(framing, &mut out[start..]).emit(code, data);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

fn parse<T: FromStr>(token: &str) -> Result<T> {
    token.parse().map_err(|_| Error::InvalidFieldValue)
}

impl<'r> Codec<'r> {
    /// Encode a value as the payload of an option.
    pub fn encode(&self, descriptor: &Descriptor, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_at(descriptor, value, &mut out, 0)?;
        Ok(out)
    }

    /// Encode a value into `buffer`, returning the payload length.
    pub fn encode_into(&self, descriptor: &Descriptor, value: &Value, buffer: &mut [u8]) -> Result<usize> {
        let payload = self.encode(descriptor, value)?;
        buffer
            .get_mut(..payload.len())
            .ok_or(Error::BufferTooSmall)?
            .copy_from_slice(&payload);
        Ok(payload.len())
    }

    /// Encode a value and write it as a whole option.
    pub fn emit(&self, writer: &mut TlvWriter, descriptor: &Descriptor, value: &Value) -> Result<()> {
        let payload = self.encode(descriptor, value)?;
        writer.emit(descriptor.code, &payload)
    }

    fn encode_at(&self, descriptor: &Descriptor, value: &Value, out: &mut Vec<u8>, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep);
        }
        let kind = descriptor.kind;
        if kind.contains(OptionType::RESERVED) {
            net_debug!("encode: option {} ({}) is reserved", descriptor.code, descriptor.name);
            return Err(Error::SchemaMismatch);
        }

        match value {
            Value::Absent if kind.contains(OptionType::OPTIONAL) => Ok(()),
            Value::Present if kind.contains(OptionType::FLAG) => Ok(()),
            Value::Composite {
                embedded,
                encapsulated,
            } if self.is_vendor(descriptor, depth) && embedded.is_empty() => {
                self.encode_vendor(encapsulated, out, depth)
            }
            Value::Composite {
                embedded,
                encapsulated,
            } if kind.intersects(OptionType::EMBED | OptionType::ENCAP) => {
                self.encode_composite(descriptor, embedded, encapsulated, out, depth)
            }
            Value::Raw(bytes) if matches!(text_mode(kind), Some(TextMode::Raw) | None) => {
                if kind.intersects(OptionType::EMBED | OptionType::ENCAP | OptionType::FLAG)
                    || kind.fixed_width().is_some()
                    || (descriptor.len > 0 && bytes.len() != descriptor.len)
                {
                    return Err(Error::SchemaMismatch);
                }
                out.extend_from_slice(bytes);
                Ok(())
            }
            Value::Text(text) if !kind.intersects(OptionType::EMBED | OptionType::ENCAP | OptionType::FLAG) => {
                encode_text(descriptor, text, out)
            }
            _ => Err(Error::SchemaMismatch),
        }
    }

    fn encode_composite(
        &self,
        descriptor: &Descriptor,
        embedded: &[Value],
        encapsulated: &[Decoded],
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<()> {
        if embedded.len() > descriptor.embedded.len() {
            return Err(Error::SchemaMismatch);
        }

        let mut ended = false;
        for (i, child) in descriptor.embedded.iter().enumerate() {
            let value = embedded.get(i);
            if ended {
                if value.is_some() {
                    return Err(Error::SchemaMismatch);
                }
                continue;
            }
            match value {
                None | Some(Value::Absent) if child.kind.contains(OptionType::OPTIONAL) => ended = true,
                None => return Err(Error::SchemaMismatch),
                Some(value) => {
                    let last = i + 1 == embedded.len() && encapsulated.is_empty();
                    if takes_rest(child.kind, child.len) && !last {
                        return Err(Error::SchemaMismatch);
                    }
                    self.encode_at(child, value, out, depth + 1)?;
                }
            }
        }

        if !encapsulated.is_empty() {
            if !descriptor.kind.contains(OptionType::ENCAP) {
                return Err(Error::SchemaMismatch);
            }
            self.encode_stream(descriptor, encapsulated, out, depth + 1)?;
        }
        Ok(())
    }

    /// Encode sub-options of `parent` as a TLV stream.
    fn encode_stream(&self, parent: &Descriptor, entries: &[Decoded], out: &mut Vec<u8>, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep);
        }
        let framing = self.space.framing();

        for entry in entries {
            let mut payload = Vec::new();
            match self.resolve(parent, entry.code) {
                Some(child) => self.encode_at(child, &entry.value, &mut payload, depth + 1)?,
                None => match &entry.value {
                    Value::Raw(bytes) => payload.extend_from_slice(bytes),
                    _ => return Err(Error::SchemaMismatch),
                },
            }
            // RFC 3396 splitting applies to top-level options only.
            if payload.len() > framing.max_data_len() {
                return Err(Error::MalformedLength);
            }
            push_tlv(framing, entry.code, &payload, out)?;
        }
        Ok(())
    }

    fn encode_vendor(&self, entries: &[Decoded], out: &mut Vec<u8>, depth: usize) -> Result<()> {
        let framing = self.space.framing();
        if entries.is_empty() || (framing == Framing::Dhcpv6 && entries.len() != 1) {
            return Err(Error::SchemaMismatch);
        }

        for entry in entries {
            let mut stream = Vec::new();
            match (&entry.value, self.registry.vendor_lookup(self.space, entry.code)) {
                (
                    Value::Composite {
                        embedded,
                        encapsulated,
                    },
                    Some(vendor),
                ) if embedded.is_empty() => {
                    self.encode_stream(vendor, encapsulated, &mut stream, depth + 1)?
                }
                (Value::Raw(bytes), _) => stream.extend_from_slice(bytes),
                _ => return Err(Error::SchemaMismatch),
            }

            let mut enterprise = [0u8; 4];
            NetworkEndian::write_u32(&mut enterprise, entry.code);
            out.extend_from_slice(&enterprise);
            if framing == Framing::Dhcpv4 {
                let len = u8::try_from(stream.len()).map_err(|_| Error::MalformedLength)?;
                out.push(len);
            }
            out.extend_from_slice(&stream);
        }
        Ok(())
    }
}

fn encode_text(descriptor: &Descriptor, text: &str, out: &mut Vec<u8>) -> Result<()> {
    let kind = descriptor.kind;

    if kind.contains(OptionType::RFC3442) {
        return encode_rfc3442(text, out);
    }
    if kind.contains(OptionType::RFC3361) {
        return encode_rfc3361(text, out);
    }
    if kind.contains(OptionType::RFC1035) {
        out.extend_from_slice(&dname::encode_list(text)?);
        return Ok(());
    }
    if kind.contains(OptionType::BITFLAG) {
        return encode_bitflags(descriptor, text, out);
    }

    if kind.fixed_width().is_some() {
        let count = text.split_whitespace().count();
        if count == 0 || (count > 1 && !kind.contains(OptionType::ARRAY)) {
            return Err(Error::SchemaMismatch);
        }
        for token in text.split_whitespace() {
            encode_element(kind, token, out)?;
        }
        return Ok(());
    }

    if kind.contains(OptionType::ARRAY | OptionType::URI) {
        return encode_uri_list(text, out);
    }

    let bytes = if kind.contains(OptionType::DOMAIN) {
        if !dname::is_valid_name(text) {
            return Err(Error::InvalidFieldValue);
        }
        text.as_bytes().to_vec()
    } else {
        match text_mode(kind) {
            Some(mode) => escape::parse(text, mode)?,
            None => return Err(Error::SchemaMismatch),
        }
    };

    if bytes.is_empty() || (descriptor.len > 0 && bytes.len() != descriptor.len) {
        return Err(Error::SchemaMismatch);
    }
    out.extend_from_slice(&bytes);
    Ok(())
}

fn encode_element(kind: OptionType, token: &str, out: &mut Vec<u8>) -> Result<()> {
    let mut buf = [0u8; 4];
    if kind.contains(OptionType::UINT8) {
        out.push(parse::<u8>(token)?);
    } else if kind.contains(OptionType::INT8) {
        out.push(parse::<i8>(token)? as u8);
    } else if kind.contains(OptionType::UINT16) {
        NetworkEndian::write_u16(&mut buf, parse(token)?);
        out.extend_from_slice(&buf[..2]);
    } else if kind.contains(OptionType::INT16) {
        NetworkEndian::write_i16(&mut buf, parse(token)?);
        out.extend_from_slice(&buf[..2]);
    } else if kind.contains(OptionType::UINT32) {
        NetworkEndian::write_u32(&mut buf, parse(token)?);
        out.extend_from_slice(&buf);
    } else if kind.contains(OptionType::INT32) {
        NetworkEndian::write_i32(&mut buf, parse(token)?);
        out.extend_from_slice(&buf);
    } else if kind.contains(OptionType::ADDRIPV4) {
        out.extend_from_slice(&parse::<Ipv4Addr>(token)?.octets());
    } else {
        out.extend_from_slice(&parse::<Ipv6Addr>(token)?.octets());
    }
    Ok(())
}

fn encode_rfc3442(text: &str, out: &mut Vec<u8>) -> Result<()> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 2 != 0 {
        return Err(Error::SchemaMismatch);
    }

    for pair in tokens.chunks(2) {
        let (dest, prefix) = pair[0].split_once('/').ok_or(Error::InvalidFieldValue)?;
        let dest = parse::<Ipv4Addr>(dest)?;
        let prefix = parse::<u8>(prefix)?;
        if prefix > 32 {
            return Err(Error::InvalidFieldValue);
        }
        let gateway = parse::<Ipv4Addr>(pair[1])?;

        out.push(prefix);
        out.extend_from_slice(&dest.octets()[..(prefix as usize).div_ceil(8)]);
        out.extend_from_slice(&gateway.octets());
    }
    Ok(())
}

fn encode_rfc3361(text: &str, out: &mut Vec<u8>) -> Result<()> {
    let addresses: Option<Vec<Ipv4Addr>> = text.split_whitespace().map(|t| t.parse().ok()).collect();
    match addresses {
        Some(addresses) if !addresses.is_empty() => {
            out.push(1);
            for address in addresses {
                out.extend_from_slice(&address.octets());
            }
        }
        _ => {
            out.push(0);
            out.extend_from_slice(&dname::encode_list(text)?);
        }
    }
    Ok(())
}

fn encode_bitflags(descriptor: &Descriptor, text: &str, out: &mut Vec<u8>) -> Result<()> {
    let mut byte = 0u8;
    for c in text.bytes() {
        let bit = descriptor
            .bitflags
            .iter()
            .position(|label| *label == c && c != b'0' && c != 0)
            .ok_or(Error::InvalidFieldValue)?;
        byte |= 0x80 >> bit;
    }
    out.push(byte);
    Ok(())
}

fn encode_uri_list(text: &str, out: &mut Vec<u8>) -> Result<()> {
    let mut count = 0;
    for token in text.split_whitespace() {
        let uri = escape::parse(token, TextMode::Uri)?;
        let len = u16::try_from(uri.len()).map_err(|_| Error::MalformedLength)?;
        let mut prefix = [0u8; 2];
        NetworkEndian::write_u16(&mut prefix, len);
        out.extend_from_slice(&prefix);
        out.extend_from_slice(&uri);
        count += 1;
    }
    if count == 0 {
        return Err(Error::SchemaMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::DecodeContext;
    use crate::schema::{OptionType as T, Registry, Space};
    use alloc::vec;

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    #[test]
    fn test_scalars() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);

        let d = Descriptor::new(3, T::ARRAY | T::ADDRIPV4, "routers");
        assert_eq!(codec.encode(&d, &text("10.0.0.1 10.0.0.2")), Ok(vec![10, 0, 0, 1, 10, 0, 0, 2]));
        assert_eq!(codec.encode(&d, &text("")), Err(Error::SchemaMismatch));
        assert_eq!(codec.encode(&d, &text("10.0.0.256")), Err(Error::InvalidFieldValue));

        let d = Descriptor::new(26, T::UINT16, "mtu");
        assert_eq!(codec.encode(&d, &text("1500")), Ok(vec![0x05, 0xdc]));
        assert_eq!(codec.encode(&d, &text("1500 1400")), Err(Error::SchemaMismatch));
        assert_eq!(codec.encode(&d, &text("70000")), Err(Error::InvalidFieldValue));
        assert_eq!(codec.encode(&d, &Value::Raw(vec![5, 0xdc])), Err(Error::SchemaMismatch));

        let d = Descriptor::new(2, T::INT32, "time_offset");
        assert_eq!(codec.encode(&d, &text("-3600")), Ok(vec![0xff, 0xff, 0xf1, 0xf0]));
    }

    #[test]
    fn test_rfc3442() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);
        let d = Descriptor::new(121, T::RFC3442, "classless_static_routes");

        assert_eq!(
            codec.encode(&d, &text("192.168.1.0/24 10.0.0.1 0.0.0.0/0 10.0.0.254")),
            Ok(vec![24, 192, 168, 1, 10, 0, 0, 1, 0, 10, 0, 0, 254])
        );
        assert_eq!(
            codec.encode(&d, &text("192.168.1.0/24")),
            Err(Error::SchemaMismatch)
        );
        assert_eq!(
            codec.encode(&d, &text("192.168.1.0/33 10.0.0.1")),
            Err(Error::InvalidFieldValue)
        );
    }

    #[test]
    fn test_rfc3361() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);
        let d = Descriptor::new(120, T::RFC3361, "sip_server");
        assert_eq!(codec.encode(&d, &text("10.0.0.1")), Ok(vec![1, 10, 0, 0, 1]));
        assert_eq!(codec.encode(&d, &text("sip.lan")), Ok(b"\x00\x03sip\x03lan\x00".to_vec()));
    }

    #[test]
    fn test_bitflags() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);
        let d = Descriptor::new(0, T::BITFLAG, "flags").with_bitflags(b"0000NEOS");
        assert_eq!(codec.encode(&d, &text("ES")), Ok(vec![0x05]));
        assert_eq!(codec.encode(&d, &text("")), Ok(vec![0x00]));
        assert_eq!(codec.encode(&d, &text("X")), Err(Error::InvalidFieldValue));
        assert_eq!(codec.encode(&d, &text("0")), Err(Error::InvalidFieldValue));
    }

    #[test]
    fn test_composite_shapes() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp6);
        let d = Descriptor::new(13, T::empty(), "status_code")
            .embed(Descriptor::new(0, T::UINT16, "status_code"))
            .embed(Descriptor::new(0, T::OPTIONAL | T::STRING | T::ESCSTRING, "message"));

        let full = Value::Composite {
            embedded: vec![text("2"), text("no addrs")],
            encapsulated: vec![],
        };
        assert_eq!(codec.encode(&d, &full), Ok(b"\x00\x02no addrs".to_vec()));

        let short = Value::Composite {
            embedded: vec![text("0")],
            encapsulated: vec![],
        };
        assert_eq!(codec.encode(&d, &short), Ok(vec![0, 0]));

        let missing = Value::Composite {
            embedded: vec![],
            encapsulated: vec![],
        };
        assert_eq!(codec.encode(&d, &missing), Err(Error::SchemaMismatch));

        let extra = Value::Composite {
            embedded: vec![text("0"), text("a"), text("b")],
            encapsulated: vec![],
        };
        assert_eq!(codec.encode(&d, &extra), Err(Error::SchemaMismatch));

        assert_eq!(codec.encode(&d, &text("0")), Err(Error::SchemaMismatch));
    }

    #[test]
    fn test_encapsulated_round_trip() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);
        let d = Descriptor::new(43, T::empty(), "vendor")
            .encap(Descriptor::new(1, T::ADDRIPV4, "server"))
            .encap(Descriptor::new(2, T::FLAG, "enabled"));
        let value = Value::Composite {
            embedded: vec![],
            encapsulated: vec![
                Decoded { code: 1, index: None, value: text("10.0.0.1") },
                Decoded { code: 2, index: None, value: Value::Present },
                Decoded { code: 9, index: None, value: Value::Raw(vec![0xab]) },
            ],
        };
        let bytes = codec.encode(&d, &value).unwrap();
        assert_eq!(bytes, [1, 4, 10, 0, 0, 1, 2, 0, 9, 1, 0xab]);
        assert_eq!(codec.decode(&d, &bytes, &mut DecodeContext::new()), Ok(value));
    }

    #[test]
    fn test_encode_into() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);
        let d = Descriptor::new(1, T::ADDRIPV4, "subnet_mask");
        let value = text("255.255.255.0");

        let mut buffer = [0u8; 3];
        assert_eq!(codec.encode_into(&d, &value, &mut buffer), Err(Error::BufferTooSmall));
        let mut buffer = [0u8; 8];
        assert_eq!(codec.encode_into(&d, &value, &mut buffer), Ok(4));
        assert_eq!(&buffer[..4], [255, 255, 255, 0]);

        let mut message = [0u8; 6];
        let mut writer = TlvWriter::new(Framing::Dhcpv4, &mut message);
        codec.emit(&mut writer, &d, &value).unwrap();
        assert_eq!(message, [1, 4, 255, 255, 255, 0]);
    }

    #[test]
    fn test_reserved() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp);
        let d = Descriptor::new(100, T::RESERVED | T::UINT8, "reserved");
        assert_eq!(codec.encode(&d, &text("7")), Err(Error::SchemaMismatch));

        let mut message = [0u8; 8];
        let mut writer = TlvWriter::new(Framing::Dhcpv4, &mut message);
        assert_eq!(codec.emit(&mut writer, &d, &text("7")), Err(Error::SchemaMismatch));
        assert!(writer.is_empty());

        let parent = Descriptor::new(43, T::empty(), "vendor")
            .encap(Descriptor::new(5, T::RESERVED | T::UINT8, "old"));
        let value = Value::Composite {
            embedded: vec![],
            encapsulated: vec![Decoded { code: 5, index: None, value: text("1") }],
        };
        assert_eq!(codec.encode(&parent, &value), Err(Error::SchemaMismatch));
    }

    #[test]
    fn test_long_sub_option() {
        let registry = Registry::new();
        let d = Descriptor::new(43, T::empty(), "vendor")
            .encap(Descriptor::new(1, T::BINHEX, "blob"));
        let value = Value::Composite {
            embedded: vec![],
            encapsulated: vec![Decoded { code: 1, index: None, value: text(&"ab".repeat(300)) }],
        };

        let codec = Codec::new(&registry, Space::Dhcp);
        assert_eq!(codec.encode(&d, &value), Err(Error::MalformedLength));
        let unknown = Value::Composite {
            embedded: vec![],
            encapsulated: vec![Decoded { code: 9, index: None, value: Value::Raw(vec![0; 256]) }],
        };
        assert_eq!(codec.encode(&d, &unknown), Err(Error::MalformedLength));

        let mut fits = value.clone();
        if let Value::Composite { encapsulated, .. } = &mut fits {
            encapsulated[0].value = text(&"ab".repeat(255));
        }
        let bytes = codec.encode(&d, &fits).unwrap();
        assert_eq!(bytes.len(), 257);
        assert_eq!(codec.decode(&d, &bytes, &mut DecodeContext::new()), Ok(fits));

        let codec = Codec::new(&registry, Space::Dhcp6);
        let bytes = codec.encode(&d, &value).unwrap();
        assert_eq!(bytes.len(), 304);
        assert_eq!(codec.decode(&d, &bytes, &mut DecodeContext::new()), Ok(value));
    }

    #[test]
    fn test_uri_list() {
        let registry = Registry::new();
        let codec = Codec::new(&registry, Space::Dhcp6);
        let d = Descriptor::new(60, T::ARRAY | T::URI, "bootfile_param");
        assert_eq!(codec.encode(&d, &text("abc de")), Ok(b"\x00\x03abc\x00\x02de".to_vec()));
    }
}
