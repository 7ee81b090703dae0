#![no_main]
use libfuzzer_sys::fuzz_target;
use dhcpopt::wire::dname;

fuzz_target!(|data: &[u8]| {
    if let Ok(names) = dname::decode_list(data) {
        // Names longer than one wire name decode but may not encode; only
        // panics are of interest here.
        let _ = dname::encode_list(&names);
    }
});
