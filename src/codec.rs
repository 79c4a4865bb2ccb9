//! Decoding of raw ring buffer bytes into flow events
//!
//! The probe submits fixed-size [`FlowRecord`] structs with every multi-byte
//! field still in network order. This module owns the byte swapping and the
//! translation into printable userspace types.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use thiserror::Error;

use flowatch_common::{protocol, FlowRecord};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("flow record too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("flow record has trailing bytes: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },
}

/// Transport protocol of a flow, classified from the IPv4 protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Other(u8),
}

impl From<u8> for Protocol {
    fn from(value: u8) -> Self {
        match value {
            protocol::TCP => Protocol::Tcp,
            protocol::UDP => Protocol::Udp,
            other => Protocol::Other(other),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Other(_) => write!(f, "UNK"),
        }
    }
}

/// A decoded flow, ready for display. Addresses and ports are host-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowEvent {
    pub protocol: Protocol,
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
}

impl From<FlowRecord> for FlowEvent {
    fn from(record: FlowRecord) -> Self {
        Self {
            protocol: Protocol::from(record.protocol),
            src: SocketAddrV4::new(Ipv4Addr::from(record.src_addr), record.src_port()),
            dst: SocketAddrV4::new(Ipv4Addr::from(record.dst_addr), record.dst_port()),
        }
    }
}

impl fmt::Display for FlowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.protocol, self.src, self.dst)
    }
}

/// Decode one ring buffer item into a [`FlowEvent`].
///
/// The item must be exactly [`FlowRecord::LEN`] bytes; short reads and
/// oversized items are reported as distinct errors so callers can tell a
/// torn read from a producer speaking a different layout.
pub fn decode(bytes: &[u8]) -> Result<FlowEvent, DecodeError> {
    if bytes.len() < FlowRecord::LEN {
        return Err(DecodeError::Truncated {
            expected: FlowRecord::LEN,
            actual: bytes.len(),
        });
    }
    if bytes.len() > FlowRecord::LEN {
        return Err(DecodeError::TrailingBytes {
            expected: FlowRecord::LEN,
            actual: bytes.len(),
        });
    }

    // SAFETY: the length is exactly FlowRecord::LEN and FlowRecord is a
    // repr(C) struct of byte arrays with alignment 1, so reading it from
    // an arbitrary buffer address is valid.
    let record: FlowRecord =
        unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const FlowRecord) };

    Ok(FlowEvent::from(record))
}
