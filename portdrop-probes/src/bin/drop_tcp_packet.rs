//! XDP program that counts IPv4/TCP packets and drops connection attempts
//! to the port stored in the CONFIG map.
//!
//! Counter 0 counts every TCP segment seen, counter 1 the dropped ones.
//! Until user space writes slot 0, the default port is used.
//!
//! Note: This binary must be built for the bpfel-unknown-none target.
//! The control plane's build.rs handles cross-compilation.

#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action,
    macros::{map, xdp},
    maps::Array,
    programs::XdpContext,
};
use aya_log_ebpf::debug;
use core::sync::atomic::{AtomicU64, Ordering};
use portdrop_common::{config, counter, DEFAULT_DROP_PORT};
use portdrop_probes::{EthHdr, Ipv4Hdr, TcpHdr, ETH_HDR_LEN, ETH_P_IP, IPPROTO_TCP};

#[map]
static PKT_COUNT: Array<u64> = Array::with_max_entries(counter::COUNT, 0);

#[map]
static CONFIG: Array<u16> = Array::with_max_entries(config::COUNT, 0);

#[xdp]
pub fn drop_tcp_packet(ctx: XdpContext) -> u32 {
    match try_drop_tcp_packet(&ctx) {
        Ok(action) => action,
        Err(_) => xdp_action::XDP_PASS,
    }
}

#[inline(always)]
fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Result<*const T, ()> {
    let start = ctx.data();
    let end = ctx.data_end();
    let len = core::mem::size_of::<T>();

    if start + offset + len > end {
        return Err(());
    }
    Ok((start + offset) as *const T)
}

#[inline(always)]
fn increment(index: u32) {
    if let Some(ptr) = PKT_COUNT.get_ptr_mut(index) {
        // SAFETY: array map values are 8-byte aligned and live as long as the map
        let value = unsafe { AtomicU64::from_ptr(ptr) };
        value.fetch_add(1, Ordering::Relaxed);
    }
}

fn try_drop_tcp_packet(ctx: &XdpContext) -> Result<u32, ()> {
    let eth = ptr_at::<EthHdr>(ctx, 0)?;
    let proto = unsafe { core::ptr::addr_of!((*eth).proto).read_unaligned() };
    if u16::from_be(proto) != ETH_P_IP {
        return Ok(xdp_action::XDP_PASS);
    }

    let ip = ptr_at::<Ipv4Hdr>(ctx, ETH_HDR_LEN)?;
    if unsafe { (*ip).protocol } != IPPROTO_TCP {
        return Ok(xdp_action::XDP_PASS);
    }

    let tcp_offset = ETH_HDR_LEN + unsafe { (*ip).header_len() };
    let tcp = ptr_at::<TcpHdr>(ctx, tcp_offset)?;

    let drop_port = CONFIG
        .get(config::DROP_PORT)
        .copied()
        .unwrap_or(DEFAULT_DROP_PORT);

    increment(counter::TOTAL);

    let dest = u16::from_be(unsafe { core::ptr::addr_of!((*tcp).dest).read_unaligned() });
    if dest == drop_port && unsafe { (*tcp).is_connection_request() } {
        increment(counter::DROPPED);
        debug!(ctx, "dropping SYN to port {}", dest);
        return Ok(xdp_action::XDP_DROP);
    }

    Ok(xdp_action::XDP_PASS)
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
