//! XDP program for portdrop
//!
//! The program itself lives in src/bin/drop_tcp_packet.rs. This library holds
//! the header layout it walks: Ethernet, IPv4 (variable IHL) and the fixed TCP
//! header prefix. Only the fields the drop rule reads are exposed.

#![no_std]

pub const ETH_HDR_LEN: usize = 14;
pub const ETH_P_IP: u16 = 0x0800;

pub const IPV4_MIN_HDR_LEN: usize = 20;
pub const IPPROTO_TCP: u8 = 6;

pub const TCP_HDR_LEN: usize = 20;
pub const TCP_FLAG_SYN: u8 = 0x02;
pub const TCP_FLAG_ACK: u8 = 0x10;

#[repr(C)]
pub struct EthHdr {
    pub dst: [u8; 6],
    pub src: [u8; 6],
    /// Network byte order
    pub proto: u16,
}

#[repr(C)]
pub struct Ipv4Hdr {
    pub version_ihl: u8,
    pub tos: u8,
    pub tot_len: u16,
    pub id: u16,
    pub frag_off: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub check: u16,
    pub saddr: u32,
    pub daddr: u32,
}

impl Ipv4Hdr {
    /// Header length in bytes, options included
    #[inline(always)]
    pub fn header_len(&self) -> usize {
        ((self.version_ihl & 0x0f) as usize) * 4
    }
}

#[repr(C)]
pub struct TcpHdr {
    /// Network byte order
    pub source: u16,
    /// Network byte order
    pub dest: u16,
    pub seq: u32,
    pub ack_seq: u32,
    pub data_off: u8,
    pub flags: u8,
    pub window: u16,
    pub check: u16,
    pub urg_ptr: u16,
}

impl TcpHdr {
    /// SYN set and ACK clear: the first packet of a handshake
    #[inline(always)]
    pub fn is_connection_request(&self) -> bool {
        self.flags & TCP_FLAG_SYN != 0 && self.flags & TCP_FLAG_ACK == 0
    }
}
