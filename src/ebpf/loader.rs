//! XDP program loader and lifecycle management

use crate::config::XdpMode;
use crate::ebpf::maps::XdpTable;
use crate::{PortdropError, Result};
use aya::programs::{xdp::XdpLinkId, Xdp, XdpFlags};
use aya::Ebpf;
use portdrop_common::PROGRAM_NAME;
use std::ffi::CString;
use std::path::Path;
use tracing::{debug, info, warn};

/// Oldest kernel with XDP generic mode and BPF array map updates from user space
const MIN_KERNEL: (u32, u32) = (4, 18);

/// Owns the loaded object and, once attached, the interface link
pub struct XdpManager {
    bpf: Ebpf,
    attached: Option<(String, XdpLinkId)>,
}

impl XdpManager {
    /// Run pre-flight checks, load the embedded object and verify the program
    pub fn load() -> Result<Self> {
        run_preflight_checks()?;

        info!("Loading XDP program...");
        let mut bpf = load_object()?;

        let program = program_mut(&mut bpf)?;
        program
            .load()
            .map_err(|e| PortdropError::ProgramLoadFailed(e.to_string()))?;

        Ok(Self {
            bpf,
            attached: None,
        })
    }

    /// Mutable access to the object for the aya-log forwarder
    pub fn bpf_mut(&mut self) -> &mut Ebpf {
        &mut self.bpf
    }

    /// Hand out the counter/config table. Can only be taken once.
    pub fn take_table(&mut self) -> Result<XdpTable> {
        XdpTable::take_from(&mut self.bpf)
    }

    /// Attach the program to `iface`
    pub fn attach(&mut self, iface: &str, mode: XdpMode) -> Result<()> {
        let index = interface_index(iface)?;
        info!(
            "Attaching XDP program to {} (ifindex {}, mode {})...",
            iface, index, mode
        );

        let program = program_mut(&mut self.bpf)?;
        let link = program
            .attach(iface, xdp_flags(mode))
            .map_err(|e| PortdropError::AttachFailed {
                iface: iface.to_string(),
                reason: e.to_string(),
            })?;

        self.attached = Some((iface.to_string(), link));
        info!("XDP program attached to {}", iface);
        Ok(())
    }

    /// Detach from the interface, if attached
    pub fn detach(&mut self) {
        let Some((iface, link)) = self.attached.take() else {
            return;
        };

        let result = program_mut(&mut self.bpf).and_then(|program| {
            program
                .detach(link)
                .map_err(|e| PortdropError::EbpfError(e.to_string()))
        });
        match result {
            Ok(()) => info!("XDP program detached from {}", iface),
            Err(e) => warn!("Failed to detach XDP program from {}: {}", iface, e),
        }
    }

    /// Detach and unload the program
    pub fn unload(mut self) {
        info!("Unloading XDP program...");
        self.detach();
        drop(self.bpf);
        info!("XDP program unloaded");
    }
}

fn program_mut(bpf: &mut Ebpf) -> Result<&mut Xdp> {
    bpf.program_mut(PROGRAM_NAME)
        .ok_or_else(|| {
            PortdropError::ProgramLoadFailed(format!(
                "{} program not found in eBPF object",
                PROGRAM_NAME
            ))
        })?
        .try_into()
        .map_err(|e: aya::programs::ProgramError| PortdropError::ProgramLoadFailed(e.to_string()))
}

fn xdp_flags(mode: XdpMode) -> XdpFlags {
    match mode {
        XdpMode::Default => XdpFlags::default(),
        XdpMode::Skb => XdpFlags::SKB_MODE,
        XdpMode::Drv => XdpFlags::DRV_MODE,
        XdpMode::Hw => XdpFlags::HW_MODE,
    }
}

/// Resolve an interface name to its index
pub fn interface_index(name: &str) -> Result<u32> {
    let c_name = CString::new(name).map_err(|_| PortdropError::InterfaceNotFound {
        name: name.to_string(),
        reason: "name contains a NUL byte".to_string(),
    })?;

    // SAFETY: c_name is a valid NUL-terminated string for the duration of the call
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(PortdropError::InterfaceNotFound {
            name: name.to_string(),
            reason: std::io::Error::last_os_error().to_string(),
        });
    }
    Ok(index)
}

/// Load the XDP object embedded by build.rs
fn load_object() -> Result<Ebpf> {
    let object: &[u8] = aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/drop_tcp_packet"));

    if object.is_empty() {
        return Err(PortdropError::ProgramLoadFailed(
            "binary was built without the XDP object (eBPF toolchain unavailable at build time)"
                .to_string(),
        ));
    }

    Ebpf::load(object).map_err(|e| PortdropError::ProgramLoadFailed(e.to_string()))
}

/// Run pre-flight checks to validate the system can run XDP programs
fn run_preflight_checks() -> Result<()> {
    info!("Running pre-flight checks...");

    check_kernel_version()?;
    check_btf();
    check_capabilities();

    info!("Pre-flight checks passed");
    Ok(())
}

fn check_kernel_version() -> Result<()> {
    let release = std::fs::read_to_string("/proc/sys/kernel/osrelease")?;
    let release = release.trim();

    let Some((major, minor)) = parse_kernel_release(release) else {
        return Err(PortdropError::UnsupportedFeature(format!(
            "could not parse kernel version: {}",
            release
        )));
    };

    if (major, minor) < MIN_KERNEL {
        return Err(PortdropError::KernelVersionTooOld {
            version: release.to_string(),
            min_version: format!("{}.{}", MIN_KERNEL.0, MIN_KERNEL.1),
        });
    }

    info!("Kernel version: {} (supported)", release);
    Ok(())
}

/// Extract `(major, minor)` from a release string such as `6.8.0-45-generic`
pub fn parse_kernel_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()?;
    Some((major, minor))
}

fn check_btf() {
    if !Path::new("/sys/kernel/btf/vmlinux").exists() {
        warn!("BTF not found at /sys/kernel/btf/vmlinux");
        return;
    }
    debug!("BTF available");
}

fn check_capabilities() {
    // SAFETY: geteuid has no preconditions and cannot fail
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        warn!(
            "Not running as root (euid={}). Ensure CAP_BPF and CAP_NET_ADMIN are granted.",
            euid
        );
    } else {
        debug!("Running with root privileges");
    }
}
