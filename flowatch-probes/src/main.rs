//! XDP probe that publishes one flow record per observed IPv4 packet
//!
//! This probe:
//! - Attaches to a network interface via XDP
//! - Parses Ethernet and IPv4 headers with bounds checks the verifier accepts
//! - Copies addresses, ports and protocol into a fixed 16-byte record
//! - Sends records to userspace via ring buffer
//!
//! Note: This binary must be built for the bpfel-unknown-none target.
//! The flowatch build script handles the cross-compilation automatically.

#![no_std]
#![no_main]

use core::mem;

use aya_ebpf::{
    bindings::xdp_action,
    macros::{map, xdp},
    maps::RingBuf,
    programs::XdpContext,
};
use aya_log_ebpf::debug;
use flowatch_common::{protocol, FlowRecord};

/// Ring buffer capacity in bytes. Reservation fails and the record is
/// dropped once userspace falls a full buffer behind.
const RING_BUF_SIZE: u32 = 1024 * 1024;

#[map]
static FLOW_EVENTS: RingBuf = RingBuf::with_byte_size(RING_BUF_SIZE, 0);

const ETH_P_IP: u16 = 0x0800;

/// Ethernet header (14 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
struct EthHdr {
    dst_mac: [u8; 6],
    src_mac: [u8; 6],
    ether_type: [u8; 2],
}

/// IPv4 header without options (20 bytes). Multi-byte fields stay as raw
/// network-order bytes; userspace owns the byte swapping.
#[repr(C)]
#[derive(Clone, Copy)]
struct Ipv4Hdr {
    version_ihl: u8,
    tos: u8,
    total_len: [u8; 2],
    id: [u8; 2],
    flags_frag: [u8; 2],
    ttl: u8,
    protocol: u8,
    checksum: [u8; 2],
    src_addr: [u8; 4],
    dst_addr: [u8; 4],
}

/// TCP header without options (20 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
struct TcpHdr {
    src_port: [u8; 2],
    dst_port: [u8; 2],
    seq: [u8; 4],
    ack_seq: [u8; 4],
    offset_flags: [u8; 2],
    window: [u8; 2],
    checksum: [u8; 2],
    urg_ptr: [u8; 2],
}

/// UDP header (8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
struct UdpHdr {
    src_port: [u8; 2],
    dst_port: [u8; 2],
    len: [u8; 2],
    checksum: [u8; 2],
}

#[xdp]
pub fn flow_probe(ctx: XdpContext) -> u32 {
    match try_flow_probe(&ctx) {
        Ok(ret) => ret,
        Err(_) => xdp_action::XDP_PASS,
    }
}

fn try_flow_probe(ctx: &XdpContext) -> Result<u32, ()> {
    // Frames too short to hold the Ethernet header are dropped; anything
    // that is not IPv4 passes through untouched.
    let eth = match ptr_at::<EthHdr>(ctx, 0) {
        Ok(eth) => eth,
        Err(()) => return Ok(xdp_action::XDP_DROP),
    };

    if u16::from_be_bytes(unsafe { (*eth).ether_type }) != ETH_P_IP {
        return Ok(xdp_action::XDP_PASS);
    }

    let ip = match ptr_at::<Ipv4Hdr>(ctx, mem::size_of::<EthHdr>()) {
        Ok(ip) => ip,
        Err(()) => return Ok(xdp_action::XDP_DROP),
    };

    let mut record = FlowRecord {
        src_addr: unsafe { (*ip).src_addr },
        dst_addr: unsafe { (*ip).dst_addr },
        src_port: [0; 2],
        dst_port: [0; 2],
        protocol: unsafe { (*ip).protocol },
        _pad: [0; 3],
    };

    // The transport header is read at the fixed 20-byte IPv4 header offset;
    // IHL is not consulted. Packets whose transport header does not fit in
    // the frame keep zeroed ports.
    const TRANSPORT_OFF: usize = mem::size_of::<EthHdr>() + mem::size_of::<Ipv4Hdr>();

    match record.protocol {
        protocol::TCP => {
            if let Ok(tcp) = ptr_at::<TcpHdr>(ctx, TRANSPORT_OFF) {
                record.src_port = unsafe { (*tcp).src_port };
                record.dst_port = unsafe { (*tcp).dst_port };
            }
        }
        protocol::UDP => {
            if let Ok(udp) = ptr_at::<UdpHdr>(ctx, TRANSPORT_OFF) {
                record.src_port = unsafe { (*udp).src_port };
                record.dst_port = unsafe { (*udp).dst_port };
            }
        }
        _ => {}
    }

    match FLOW_EVENTS.reserve::<FlowRecord>(0) {
        Some(mut entry) => {
            entry.write(record);
            entry.submit(0);
        }
        None => debug!(ctx, "flow buffer full, dropping record"),
    }

    Ok(xdp_action::XDP_PASS)
}

/// Bounds-checked pointer into packet data. Fails when the requested region
/// extends past `data_end`, which the verifier requires us to prove before
/// every access.
#[inline(always)]
fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Result<*const T, ()> {
    let start = ctx.data();
    let end = ctx.data_end();
    let len = mem::size_of::<T>();

    if start + offset + len > end {
        return Err(());
    }

    Ok((start + offset) as *const T)
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
