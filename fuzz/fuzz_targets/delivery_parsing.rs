#![no_main]

//! Fuzz target for delivery body handling.
//!
//! Arbitrary bodies must either parse into an event or fail with an
//! `InvalidJson` error, and signed bytes of a raw body are the body itself.

use bytes::Bytes;
use hookwire_core::{Delivery, DeliveryBody, DeliveryId, EventName, HookError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = DeliveryBody::Raw(Bytes::copy_from_slice(data));
    assert_eq!(&*body.signed_bytes(), data);

    let delivery = Delivery {
        id: DeliveryId::from("fuzz"),
        name: EventName::from("push"),
        body,
        signature: String::from_utf8_lossy(data).into_owned(),
    };

    let _ = delivery.verify(b"secret");

    match delivery.into_event() {
        Ok(event) => {
            let _ = event.qualified_name();
        },
        Err(HookError::InvalidJson { .. }) => {},
        Err(other) => panic!("unexpected error: {other}"),
    }
});
