#![no_main]
use libfuzzer_sys::fuzz_target;
use dhcpopt::codec::{variables, Codec, DecodeContext};
use dhcpopt::schema::{Registry, Space};
use dhcpopt::wire::TlvSource;

fuzz_target!(|data: &[u8]| {
    let registry = Registry::with_builtin();
    for space in [Space::Dhcp, Space::Dhcp6] {
        let codec = Codec::new(&registry, space);
        let mut source = TlvSource::new(space.framing(), data);
        if let Ok(options) = codec.decode_all(&mut source, &mut DecodeContext::new()) {
            let _ = variables(&codec, "new", &options);
        }
    }
});
