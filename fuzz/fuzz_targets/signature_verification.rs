#![no_main]

//! Fuzz target for signature verification.
//!
//! Verification must never panic on arbitrary secrets, payloads, or
//! signature strings, and must accept exactly the signature `sign` produces.

use hookwire_core::{sign, verify, SIGNATURE_PREFIX};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let split = usize::from(data[0]) % data.len();
    let (secret, payload) = data[1..].split_at(split.min(data.len() - 1));
    let candidate = String::from_utf8_lossy(payload);

    // arbitrary strings, with and without the expected prefix
    let _ = verify(secret, payload, &candidate);
    let _ = verify(secret, payload, &format!("{SIGNATURE_PREFIX}{candidate}"));

    if let Ok(signature) = sign(secret, payload) {
        assert!(verify(secret, payload, &signature));
        assert!(!verify(secret, payload, &signature[..signature.len() - 1]));
    }
});
