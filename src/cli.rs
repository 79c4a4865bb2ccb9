use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "flowatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Print one line per network flow observed on an interface", long_about = None)]
pub struct Cli {
    // Semantically required. Kept optional so main can print usage to
    // stdout and exit 1 when it is missing.
    #[arg(short, long, help = "Network interface to attach the probe to, e.g. eth0")]
    pub interface: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_interface_flag() {
        let cli = Cli::parse_from(["flowatch", "--interface", "eth0"]);
        assert_eq!(cli.interface.as_deref(), Some("eth0"));
    }

    #[test]
    fn parses_short_interface_flag() {
        let cli = Cli::parse_from(["flowatch", "-i", "lo"]);
        assert_eq!(cli.interface.as_deref(), Some("lo"));
    }

    #[test]
    fn interface_is_absent_when_not_given() {
        let cli = Cli::parse_from(["flowatch"]);
        assert!(cli.interface.is_none());
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["flowatch", "--iface", "eth0"]).is_err());
    }
}
