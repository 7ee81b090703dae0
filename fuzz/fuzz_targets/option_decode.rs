#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use dhcpopt::codec::{Codec, DecodeContext};
use dhcpopt::schema::{Registry, Space};

#[derive(Arbitrary, Debug)]
struct Input {
    dhcp6: bool,
    code: u16,
    payload: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let registry = Registry::with_builtin();
    let space = if input.dhcp6 { Space::Dhcp6 } else { Space::Dhcp };
    let codec = Codec::new(&registry, space);

    let descriptor = match registry.lookup(space, input.code as u32) {
        Some(descriptor) => descriptor,
        None => return,
    };
    if let Ok(value) = codec.decode(descriptor, &input.payload, &mut DecodeContext::new()) {
        // Decoding is lossy for some text modes, so the payload may not
        // come back byte for byte; encoding just has to not panic.
        let _ = codec.encode(descriptor, &value);
    }
});
