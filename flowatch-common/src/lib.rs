//! Shared types between the eBPF probe (kernel) and userspace
//!
//! This crate defines the flow-record layout that must be:
//! - `#[repr(C)]` for a stable memory layout on both sides
//! - `no_std` compatible for eBPF
//! - byte-for-byte identical to what the XDP probe submits

#![cfg_attr(not(feature = "userspace"), no_std)]

/// One observed network flow, as written by the XDP probe.
///
/// Layout (16 bytes total, 1-byte aligned):
/// - src_addr / dst_addr: IPv4 octets in wire order (first stored byte is
///   the first dotted-decimal octet)
/// - src_port / dst_port: transport ports in network byte order, copied
///   verbatim from the TCP/UDP header; zero for other protocols
/// - protocol: IP protocol number (6=TCP, 17=UDP)
/// - _pad: fixed-size contract with the producer, no meaning
///
/// Ports and addresses are byte arrays rather than integers so the encoding
/// is explicit and independent of host endianness. Use the accessor methods
/// to obtain port numbers in host order.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "userspace", derive(PartialEq, Eq))]
pub struct FlowRecord {
    pub src_addr: [u8; 4],
    pub dst_addr: [u8; 4],
    pub src_port: [u8; 2],
    pub dst_port: [u8; 2],
    pub protocol: u8,
    pub _pad: [u8; 3],
}

impl FlowRecord {
    /// Fixed wire length of one record.
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Source port in host order (the stored bytes are network order).
    #[inline]
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes(self.src_port)
    }

    /// Destination port in host order.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes(self.dst_port)
    }

    /// Wire encoding of this record, offset for offset what the probe
    /// submits into the ring buffer.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.src_addr);
        buf[4..8].copy_from_slice(&self.dst_addr);
        buf[8..10].copy_from_slice(&self.src_port);
        buf[10..12].copy_from_slice(&self.dst_port);
        buf[12] = self.protocol;
        buf[13..16].copy_from_slice(&self._pad);
        buf
    }
}

/// IP protocol constants
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

#[cfg(feature = "userspace")]
const _: () = {
    assert!(
        core::mem::size_of::<FlowRecord>() == 16,
        "FlowRecord must be exactly 16 bytes"
    );
    assert!(
        core::mem::align_of::<FlowRecord>() == 1,
        "FlowRecord must have no alignment requirement"
    );
};
