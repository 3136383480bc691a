//! Binary wire framing for incoming order and cancel records.
//!
//! Fields are parsed one at a time with `from_le_bytes` on byte slices
//! rather than cast through a packed struct pointer, since a reference to
//! a field of a packed struct is reference-to-unaligned-data and therefore
//! undefined behavior in Rust.

use crate::engine::types::{Order, OrderId, OrderType, Price, Quantity, Side};

pub const NEW_ORDER_TYPE: u8 = 1;
pub const CANCEL_ORDER_TYPE: u8 = 2;

pub const NEW_ORDER_LEN: usize = 34;
pub const CANCEL_ORDER_LEN: usize = 9;

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown record type byte {0}")]
    UnknownType(u8),
}

/// Raw fields of a `NewOrder` wire record (offsets 0..34).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderMsg {
    pub timestamp: u64,
    pub order_id: OrderId,
    pub price: u32,
    pub quantity: u32,
    pub side: u8,
    pub symbol: [u8; 8],
}

impl NewOrderMsg {
    /// `0` maps to `Buy`, `1` to `Sell`; any other byte has no meaning on
    /// the wire and is treated as a protocol error by the caller.
    pub fn side(&self) -> Option<Side> {
        match self.side {
            0 => Some(Side::Buy),
            1 => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Raw fields of a `CancelOrder` wire record (offsets 0..9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelOrderMsg {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMessage {
    New(NewOrderMsg),
    Cancel(CancelOrderMsg),
}

/// Reassembles whole wire records out of a possibly-fragmented byte stream.
///
/// Each `push` call appends the new bytes to an internal tail buffer,
/// decodes and drains every complete record it finds, and keeps any
/// leftover partial record for the next call.
#[derive(Default)]
pub struct Decoder {
    tail: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self { tail: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<WireMessage>, DecodeError> {
        self.tail.extend_from_slice(bytes);

        let mut messages = Vec::new();
        let mut consumed = 0;
        loop {
            let remaining = &self.tail[consumed..];
            let Some(&type_byte) = remaining.first() else {
                break;
            };
            let record_len = match type_byte {
                NEW_ORDER_TYPE => NEW_ORDER_LEN,
                CANCEL_ORDER_TYPE => CANCEL_ORDER_LEN,
                other => return Err(DecodeError::UnknownType(other)),
            };
            if remaining.len() < record_len {
                break;
            }
            messages.push(decode_record(&remaining[..record_len]));
            consumed += record_len;
        }

        self.tail.drain(..consumed);
        Ok(messages)
    }
}

fn decode_record(record: &[u8]) -> WireMessage {
    match record[0] {
        NEW_ORDER_TYPE => WireMessage::New(NewOrderMsg {
            timestamp: u64::from_le_bytes(record[1..9].try_into().unwrap()),
            order_id: u64::from_le_bytes(record[9..17].try_into().unwrap()),
            price: u32::from_le_bytes(record[17..21].try_into().unwrap()),
            quantity: u32::from_le_bytes(record[21..25].try_into().unwrap()),
            side: record[25],
            symbol: record[26..34].try_into().unwrap(),
        }),
        CANCEL_ORDER_TYPE => WireMessage::Cancel(CancelOrderMsg {
            order_id: u64::from_le_bytes(record[1..9].try_into().unwrap()),
        }),
        other => unreachable!("record type {other} must be validated by the caller before decode_record"),
    }
}

/// Construct the order a `NewOrderMsg` represents, given its side has
/// already been validated by the caller. Every order arriving over the wire
/// is `GoodTillCancel`; the wire schema has no field to request
/// `FillAndKill`/`FillOrKill`.
pub fn new_order_from_wire(msg: &NewOrderMsg, side: Side) -> Result<Order, crate::engine::types::OrderValidationError> {
    Order::new(
        msg.order_id,
        side,
        OrderType::GoodTillCancel,
        msg.price as Price,
        msg.quantity as Quantity,
    )
}
