use anyhow::{anyhow, Context as _};
use aya_build::cargo_metadata;
use std::env;

fn main() -> anyhow::Result<()> {
    // Skip when we are already the nested bpf build to avoid recursing.
    if env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default() == "bpf" {
        return Ok(());
    }

    // eBPF objects only build on Linux; the binary refuses to start
    // elsewhere anyway.
    if env::consts::OS != "linux" {
        println!(
            "cargo:warning=Skipping eBPF probe build on {}",
            env::consts::OS
        );
        return Ok(());
    }

    let cargo_metadata::Metadata { packages, .. } = cargo_metadata::MetadataCommand::new()
        .no_deps()
        .exec()
        .context("MetadataCommand::exec")?;

    let ebpf_package = packages
        .into_iter()
        .find(|pkg| pkg.name == "flowatch-probes")
        .ok_or_else(|| anyhow!("flowatch-probes package not found in workspace"))?;

    // aya-build 0.1.2 always uses the `nightly` toolchain, matching the
    // removed `Toolchain::default()` argument.
    aya_build::build_ebpf([ebpf_package])
}
