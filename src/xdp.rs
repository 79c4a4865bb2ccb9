//! XDP-backed probe: loading, attachment and the ring buffer source
//!
//! The compiled probe object is embedded at build time. Loading runs a set
//! of pre-flight checks first so the usual failure modes (old kernel,
//! missing privileges) surface as readable errors instead of verifier
//! noise.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use aya::{
    maps::{MapData, RingBuf},
    programs::{xdp::XdpLinkId, Xdp, XdpFlags},
    util::KernelVersion,
    Ebpf,
};
use aya_log::EbpfLogger;
use log::{info, warn};
use tokio::io::unix::AsyncFd;

use crate::error::{FlowatchError, Result};
use crate::probe::Probe;
use crate::stream::RecordSource;

/// XDP flow probe and its kernel state.
pub struct XdpFlowProbe {
    ebpf: Ebpf,
    interface: Option<String>,
    link: Option<XdpLinkId>,
}

impl XdpFlowProbe {
    /// Run pre-flight checks and load the embedded probe object into the
    /// kernel. The program is not attached to anything yet.
    pub fn load() -> Result<Self> {
        run_preflight_checks()?;

        info!("Loading flow probe...");
        let mut ebpf = Ebpf::load(aya::include_bytes_aligned!(concat!(
            env!("OUT_DIR"),
            "/flow_probe"
        )))
        .map_err(|e| FlowatchError::EbpfError(e.to_string()))?;

        if let Err(e) = EbpfLogger::init(&mut ebpf) {
            warn!(
                "Failed to initialize eBPF logger: {}. Probe logs will not be visible.",
                e
            );
        }

        Ok(Self {
            ebpf,
            interface: None,
            link: None,
        })
    }
}

#[async_trait]
impl Probe for XdpFlowProbe {
    type Source = RingBufSource;

    async fn attach(&mut self, interface: &str) -> Result<()> {
        if self.link.is_some() {
            warn!("Flow probe already attached, ignoring attach request");
            return Ok(());
        }

        info!("Attaching flow probe to {}...", interface);

        let program: &mut Xdp = self
            .ebpf
            .program_mut("flow_probe")
            .ok_or_else(|| {
                FlowatchError::ProgramLoadFailed(
                    "flow_probe program not found in eBPF object".to_string(),
                )
            })?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| {
                FlowatchError::ProgramLoadFailed(e.to_string())
            })?;

        program
            .load()
            .map_err(|e| FlowatchError::ProgramLoadFailed(e.to_string()))?;

        let link = program
            .attach(interface, XdpFlags::default())
            .map_err(|e| FlowatchError::AttachFailed {
                interface: interface.to_string(),
                reason: e.to_string(),
            })?;

        self.link = Some(link);
        self.interface = Some(interface.to_string());

        info!("Flow probe attached to {}", interface);
        Ok(())
    }

    async fn open_stream(&mut self) -> Result<Self::Source> {
        // Collect map names first to avoid a borrow conflict in the error path
        let available_maps: Vec<_> = self.ebpf.maps().map(|(name, _)| name.to_string()).collect();
        let map = self.ebpf.take_map("FLOW_EVENTS").ok_or_else(|| {
            FlowatchError::StreamOpenFailed(format!(
                "FLOW_EVENTS map not found in eBPF object. Available maps: {:?}",
                available_maps
            ))
        })?;

        let ring_buf =
            RingBuf::try_from(map).map_err(|e| FlowatchError::StreamOpenFailed(e.to_string()))?;

        Ok(RingBufSource {
            ring_buf: AsyncFd::new(ring_buf)?,
        })
    }

    async fn release(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };

        if let Some(interface) = self.interface.take() {
            info!("Releasing flow probe from {}", interface);
        }

        let Some(program) = self.ebpf.program_mut("flow_probe") else {
            warn!("flow_probe program missing during release");
            return;
        };

        match <&mut Xdp>::try_from(program) {
            Ok(xdp) => {
                if let Err(e) = xdp.detach(link) {
                    warn!("Failed to detach flow probe: {}", e);
                }
            }
            Err(e) => warn!("Failed to detach flow probe: {}", e),
        }
    }

    fn is_attached(&self) -> bool {
        self.link.is_some()
    }
}

/// Async reader over the probe's ring buffer. Waits on the map fd and
/// drains one record per call.
pub struct RingBufSource {
    ring_buf: AsyncFd<RingBuf<MapData>>,
}

#[async_trait]
impl RecordSource for RingBufSource {
    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        loop {
            let mut guard = self.ring_buf.readable_mut().await?;

            if let Some(item) = guard.get_inner_mut().next() {
                return Ok(item.to_vec());
            }

            // Spurious wakeup or another reader got there first; wait for
            // the next readiness edge.
            guard.clear_ready();
        }
    }
}

/// Lift the memlock rlimit so map creation does not fail on kernels that
/// still account BPF memory against it.
pub fn remove_memlock_limit() -> Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };

    // SAFETY: setrlimit reads the struct and touches no other memory.
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        return Err(FlowatchError::MemlockLimit(io::Error::last_os_error()));
    }

    Ok(())
}

/// Validate that the system can run the probe before touching the kernel.
fn run_preflight_checks() -> Result<()> {
    info!("Running pre-flight checks...");

    check_kernel_version()?;
    check_btf();
    check_capabilities();

    info!("Pre-flight checks passed");
    Ok(())
}

/// The ring buffer map type needs 5.8+; refuse to go further on older
/// kernels.
fn check_kernel_version() -> Result<()> {
    let version = match KernelVersion::current() {
        Ok(version) => version,
        Err(e) => {
            warn!("Could not determine kernel version: {}", e);
            return Ok(());
        }
    };

    let min_version = KernelVersion::new(5, 8, 0);
    if version < min_version {
        return Err(FlowatchError::KernelVersionTooOld {
            version: version.to_string(),
            min_version: min_version.to_string(),
        });
    }

    info!("Kernel version: {} (supported)", version);
    Ok(())
}

fn check_btf() {
    if !Path::new("/sys/kernel/btf/vmlinux").exists() {
        warn!("BTF not found at /sys/kernel/btf/vmlinux. Loading may fail on kernels built without CONFIG_DEBUG_INFO_BTF=y");
        return;
    }

    info!("BTF available");
}

fn check_capabilities() {
    // SAFETY: geteuid cannot fail and touches no memory.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        warn!(
            "Not running as root (euid={}). Ensure CAP_BPF and CAP_NET_ADMIN are granted.",
            euid
        );
    } else {
        info!("Running with root privileges");
    }
}
