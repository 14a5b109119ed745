use clap::Parser;
use infrastructure::constants::DEFAULT_CONFIG_PATH;

/// Durable audit-log ingest receiver.
#[derive(Debug, Parser)]
#[command(name = "auditlogd", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override the configured log level (error|warn|info|debug|trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the configured log format (text|json).
    #[arg(long)]
    pub log_format: Option<String>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cli = Cli::parse_from(["auditlogd"]);
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert!(cli.log_level.is_none());
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn overrides_parse() {
        let cli = Cli::parse_from([
            "auditlogd",
            "--config",
            "/tmp/receiver.yaml",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.config, "/tmp/receiver.yaml");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
    }
}
