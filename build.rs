use anyhow::{anyhow, Context};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const PROBE_PACKAGE: &str = "portdrop-probes";
const PROBE_BINARY: &str = "drop_tcp_packet";

fn main() -> anyhow::Result<()> {
    // Skip eBPF build if we're already building for the eBPF target
    if env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default() == "bpf" {
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let probe_path = out_dir.join(PROBE_BINARY);

    println!("cargo:rerun-if-env-changed=PORTDROP_SKIP_EBPF");

    if let Some(reason) = skip_reason() {
        println!("cargo:warning=eBPF compilation skipped ({reason}). The XDP object will be empty.");
        return write_placeholder(&probe_path);
    }

    if let Err(e) = build_probe() {
        println!("cargo:warning=eBPF compilation failed: {e:#}. The XDP object will be empty.");
        return write_placeholder(&probe_path);
    }

    if !probe_path.exists() {
        return Err(anyhow!(
            "eBPF probe compilation failed: {} not found",
            probe_path.display()
        ));
    }

    Ok(())
}

fn skip_reason() -> Option<String> {
    if env::consts::OS != "linux" {
        return Some(format!("host is {}", env::consts::OS));
    }
    // No bpf-linker in CI runners
    if env::var("CI").is_ok() {
        return Some("CI".to_string());
    }
    if env::var("PORTDROP_SKIP_EBPF").is_ok() {
        return Some("PORTDROP_SKIP_EBPF is set".to_string());
    }
    None
}

fn build_probe() -> anyhow::Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let probe_manifest = manifest_dir.join(PROBE_PACKAGE).join("Cargo.toml");

    let aya_build::cargo_metadata::Metadata { packages, .. } =
        aya_build::cargo_metadata::MetadataCommand::new()
            .manifest_path(&probe_manifest)
            .no_deps()
            .exec()
            .context("MetadataCommand::exec")?;

    let ebpf_package = packages
        .into_iter()
        .find(|pkg| pkg.name == PROBE_PACKAGE)
        .ok_or_else(|| anyhow!("{PROBE_PACKAGE} package not found"))?;

    aya_build::build_ebpf([ebpf_package])
}

fn write_placeholder(path: &Path) -> anyhow::Result<()> {
    fs::write(path, [])
        .with_context(|| format!("failed to write placeholder {}", path.display()))
}
