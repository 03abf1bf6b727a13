//! Request/reply behaviour of the device orchestrator

mod common;

use common::*;
use harp_core::register::address;
use harp_core::{OperationControl, Register, RegisterValue};
use harp_protocol::{checksum, Frame, MessageType, PayloadType, Timestamp, Value};

fn values(frame: &Frame) -> Vec<Value> {
    frame.payload().unwrap().collect()
}

#[test]
fn test_who_am_i_read_canonical_length() {
    let (device, _) = device();
    device.clock().source().0.set(3_000_640);
    let raw = [0x01, 0x04, 0x00, 0xFF, 0x02, 0x06];
    let reply = round_trip(&device, Frame::from_bytes(&raw).unwrap()).unwrap();

    assert_eq!(reply.message_type(), 1);
    assert_eq!(reply.length(), 12);
    assert_eq!(reply.address(), 0);
    assert_eq!(reply.port(), 0xFF);
    assert_eq!(reply.payload_type().raw(), 0x12);
    assert_eq!(reply.timestamp(), Some(Timestamp::new(3, 20)));
    assert_eq!(values(&reply), [Value::U16(WHO_AM_I)]);
    assert!(reply.has_valid_checksum());
}

#[test]
fn test_who_am_i_read_with_padded_length() {
    let (device, _) = device();
    let mut raw = vec![0x01, 0x05, 0x00, 0xFF, 0x02, 0x00];
    raw.push(checksum(&raw));
    let request = Frame::from_bytes(&raw).unwrap();
    assert_eq!(request.length(), 5);
    assert_eq!(request.payload_type(), PayloadType::U16);

    let reply = round_trip(&device, request).unwrap();
    assert_eq!(reply.message_type(), MessageType::Read.code());
    assert_eq!(values(&reply), [Value::U16(WHO_AM_I)]);
    assert!(reply.timestamp().is_some());
    assert!(reply.has_valid_checksum());
}

#[test]
fn test_unknown_address_read_is_error() {
    let (device, _) = device();
    let reply = round_trip(&device, request(MessageType::Read, 77, PayloadType::U8, &[])).unwrap();

    assert_eq!(reply.message_type(), MessageType::Read.error_code());
    assert_eq!(reply.address(), 77);
    assert_eq!(reply.length(), 4 + 6);
    assert!(reply.timestamp().is_some());
    assert!(reply.has_valid_checksum());
}

#[test]
fn test_type_mismatch_read_is_error() {
    let (device, _) = device();
    let reply = round_trip(
        &device,
        request(MessageType::Read, address::WHO_AM_I, PayloadType::U8, &[]),
    )
    .unwrap();
    assert_eq!(reply.message_type(), 0x09);
}

#[test]
fn test_write_to_micros_echoes_payload() {
    let (device, _) = device();
    let reply = round_trip(
        &device,
        request(
            MessageType::Write,
            address::TIMESTAMP_MICRO,
            PayloadType::U16,
            &[0x34, 0x12],
        ),
    )
    .unwrap();

    assert_eq!(reply.message_type(), 0x0A);
    assert_eq!(reply.length(), 6 + 6);
    assert_eq!(values(&reply), [Value::U16(0x1234)]);
    assert!(reply.has_valid_checksum());
}

#[test]
fn test_write_short_of_its_timestamp_still_echoes_payload() {
    let (device, _) = device();
    // Timestamp flag set but LENGTH leaves room for one payload byte only
    let mut raw = vec![0x02, 0x05, address::TIMESTAMP_MICRO, 0xFF, 0x12, 0x33];
    raw.push(checksum(&raw));
    let reply = round_trip(&device, Frame::from_bytes(&raw).unwrap()).unwrap();

    assert_eq!(reply.message_type(), 0x0A);
    assert_eq!(reply.length(), 11);
    assert_eq!(reply.as_bytes()[11], 0x33);
    assert!(reply.has_valid_checksum());
}

#[test]
fn test_write_to_read_only_is_error() {
    let (device, _) = device();
    let reply = round_trip(
        &device,
        request(MessageType::Write, address::WHO_AM_I, PayloadType::U16, &[1, 0]),
    )
    .unwrap();
    assert_eq!(reply.message_type(), MessageType::Write.error_code());
    assert_eq!(reply.payload_bytes(), &[1, 0]);
}

#[test]
fn test_error_reply_keeps_timestamped_length() {
    let (device, _) = device();
    let mut request = Frame::new(
        MessageType::Write.code(),
        11,
        address::WHO_AM_I,
        PayloadType::U8,
        Some(Timestamp::new(1, 1)),
    )
    .unwrap();
    request.set_payload_bytes(&[9]).unwrap();
    request.finalize_checksum();

    let reply = round_trip(&device, request).unwrap();
    assert_eq!(reply.length(), 11);
    assert_eq!(reply.payload_bytes(), &[9]);
}

#[test]
fn test_write_seconds_rebases_clock() {
    let (device, _) = device();
    device.clock().source().0.set(123_456_789);
    let reply = round_trip(
        &device,
        request(
            MessageType::Write,
            address::TIMESTAMP_SECOND,
            PayloadType::U32,
            &5000u32.to_le_bytes(),
        ),
    )
    .unwrap();

    assert_eq!(reply.message_type(), MessageType::Write.code());
    assert_eq!(values(&reply), [Value::U32(5000)]);
    assert_eq!(reply.timestamp().map(|ts| ts.seconds), Some(5000));
}

#[test]
fn test_write_then_read_device_name() {
    let (device, _) = device();
    let reply = round_trip(
        &device,
        request(MessageType::Write, address::DEVICE_NAME, PayloadType::U8, b"Olfactometer"),
    )
    .unwrap();
    assert_eq!(reply.length() as usize, 12 + 10);
    assert_eq!(reply.payload_bytes(), b"Olfactometer");

    let reply = round_trip(
        &device,
        request(MessageType::Read, address::DEVICE_NAME, PayloadType::U8, &[]),
    )
    .unwrap();
    assert_eq!(reply.payload_bytes(), b"Olfactometer");
}

#[test]
fn test_reset_register_is_stored_only() {
    let (device, _) = device();
    let reply = round_trip(
        &device,
        request(MessageType::Write, address::RESET_DEV, PayloadType::U8, &[1]),
    )
    .unwrap();
    assert_eq!(reply.message_type(), MessageType::Write.code());
    assert_eq!(values(&reply), [Value::U8(1)]);
}

#[test]
fn test_mute_reply_suppresses_success_only() {
    let (device, _) = device();
    let muted = OperationControl::MUTE_REPLY;
    assert!(round_trip(
        &device,
        request(MessageType::Write, address::OPERATION_CTRL, PayloadType::U8, &[muted]),
    )
    .is_none());

    assert!(round_trip(
        &device,
        request(MessageType::Read, address::WHO_AM_I, PayloadType::U16, &[]),
    )
    .is_none());

    let reply = round_trip(&device, request(MessageType::Read, 99, PayloadType::U8, &[])).unwrap();
    assert_eq!(reply.message_type(), MessageType::Read.error_code());
}

#[test]
fn test_device_specific_register() {
    let (mut device, _) = device();
    device
        .add_register(
            address::APP_BASE,
            Register::ReadWrite(RegisterValue::from_values(&[Value::Float(0.5)]).unwrap()),
        )
        .unwrap();

    let reply = round_trip(
        &device,
        request(
            MessageType::Write,
            address::APP_BASE,
            PayloadType::FLOAT,
            &2.25f32.to_le_bytes(),
        ),
    )
    .unwrap();
    assert_eq!(values(&reply), [Value::Float(2.25)]);
}

#[test]
fn test_empty_queue_dispatches_nothing() {
    let (device, _) = device();
    assert!(!device.dispatch_next());
    assert!(device.next_outgoing().is_none());
}

#[test]
fn test_replies_keep_request_order() {
    let (device, _) = device();
    for addr in [address::HW_VERSION_H, address::HW_VERSION_L, address::FW_VERSION_H] {
        device.accept(request(MessageType::Read, addr, PayloadType::U8, &[]));
    }
    while device.dispatch_next() {}
    let order: Vec<u8> = std::iter::from_fn(|| device.next_outgoing())
        .map(|frame| frame.address())
        .collect();
    assert_eq!(
        order,
        [address::HW_VERSION_H, address::HW_VERSION_L, address::FW_VERSION_H]
    );
}
