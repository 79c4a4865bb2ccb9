//! flowatch - per-flow logging for a network interface
//!
//! The binary:
//! - Loads the XDP flow probe into the kernel
//! - Attaches it to the interface named on the command line
//! - Drains the probe's ring buffer and prints one line per flow
//! - Tears everything down again on SIGINT or SIGTERM

use anyhow::Result;

#[cfg(not(target_os = "linux"))]
fn main() -> Result<()> {
    eprintln!("Error: flowatch requires Linux to run eBPF programs");
    std::process::exit(1);
}

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> Result<()> {
    use clap::{CommandFactory, Parser};
    use flowatch::cli::Cli;
    use flowatch::ingest::IngestLoop;
    use flowatch::probe::Probe;
    use flowatch::shutdown::ShutdownCoordinator;
    use flowatch::stream::FlowEventStream;
    use flowatch::xdp::{self, XdpFlowProbe};
    use log::info;
    use tokio::signal::unix::{signal, SignalKind};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Some(interface) = cli.interface else {
        Cli::command().print_help()?;
        std::process::exit(1);
    };

    info!("flowatch v{} starting...", flowatch::VERSION);

    xdp::remove_memlock_limit()?;

    let mut probe = XdpFlowProbe::load()?;
    probe.attach(&interface).await?;
    let source = probe.open_stream().await?;

    let (stream, handle) = FlowEventStream::open(source);
    let ingest = tokio::spawn(IngestLoop::new(stream, std::io::stdout()).run());

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown_signal = async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    };

    info!(
        "Listening for flow events on {}. Press Ctrl+C to exit.",
        interface
    );

    ShutdownCoordinator::new(probe, handle, ingest)
        .run(shutdown_signal)
        .await;

    info!("flowatch stopped");
    Ok(())
}
