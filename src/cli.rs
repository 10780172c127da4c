use clap::Parser;
use sharefetch::config::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sharefetch")]
#[command(about = "Walk share roots and dispatch their files to a download engine", long_about = None)]
pub struct Cli {
    /// Root identifiers to walk, in order
    pub roots: Vec<String>,

    /// Configuration file (defaults to $SHAREFETCH_CONFIG or config/sharefetch.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Destination directory for downloads
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Intake queue capacity
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Worker count (defaults to the concurrency)
    #[arg(long)]
    pub workers: Option<usize>,

    /// URI resolution calls per second
    #[arg(long)]
    pub rate: Option<u32>,

    /// Job status poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Give up on a root after this many re-walks
    #[arg(long)]
    pub max_rewalks: Option<u32>,

    /// User agent passed to the download engine
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line values on top of file and environment configuration
    pub fn apply(&self, config: &mut Config) {
        if !self.roots.is_empty() {
            config.roots = self.roots.clone();
        }
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.dispatch.concurrency = concurrency;
        }
        if let Some(workers) = self.workers {
            config.dispatch.workers = Some(workers);
        }
        if let Some(rate) = self.rate {
            config.dispatch.resolve_rate_per_sec = rate;
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.dispatch.poll_interval_ms = poll_interval_ms;
        }
        if let Some(max_rewalks) = self.max_rewalks {
            config.walk.max_rewalks = Some(max_rewalks);
        }
        if let Some(user_agent) = &self.user_agent {
            config.output.user_agent = Some(user_agent.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_apply() {
        let cli = Cli::parse_from([
            "sharefetch",
            "share-a",
            "share-b",
            "-c",
            "3",
            "--workers",
            "2",
            "-o",
            "/tmp/out",
            "--max-rewalks",
            "7",
        ]);

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.roots, vec!["share-a", "share-b"]);
        assert_eq!(config.dispatch.concurrency, 3);
        assert_eq!(config.dispatch.worker_count(), 2);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/out"));
        assert_eq!(config.walk.max_rewalks, Some(7));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let cli = Cli::parse_from(["sharefetch"]);
        let mut config = Config {
            roots: vec!["from-file".to_string()],
            ..Default::default()
        };
        config.dispatch.concurrency = 9;

        cli.apply(&mut config);
        assert_eq!(config.roots, vec!["from-file"]);
        assert_eq!(config.dispatch.concurrency, 9);
    }

    #[test]
    fn test_negative_concurrency_rejected() {
        assert!(Cli::try_parse_from(["sharefetch", "r", "-c", "-1"]).is_err());
    }
}
