use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::pool::SelectionPolicy;

#[derive(Debug, Parser)]
#[command(name = "keygate", version, about = "Session-key gateway for an OpenAI-compatible upstream")]
pub struct Cli {
    #[arg(long, env = "KEYGATE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "KEYGATE_PORT", default_value_t = 5000)]
    pub port: u16,

    /// JSON file holding {"sessionKeys":[{"key":...}]}, polled for changes.
    #[arg(long, env = "KEYGATE_KEYS_FILE", default_value = "data/sessionKeys.json")]
    pub keys_file: PathBuf,

    #[arg(
        long,
        env = "KEYGATE_UPSTREAM_URL",
        default_value = "http://localhost:8080/v1/chat/completions"
    )]
    pub upstream_url: String,

    /// Shared secret; clients authenticate with its sha256 hex digest.
    #[arg(long, env = "KEYGATE_SHARED_SECRET", default_value = "xierlove")]
    pub shared_secret: String,

    /// Token sent upstream. Defaults to the shared secret.
    #[arg(long, env = "KEYGATE_UPSTREAM_TOKEN")]
    pub upstream_token: Option<String>,

    #[arg(long, env = "KEYGATE_REFRESH_SECS", default_value_t = 60)]
    pub refresh_secs: u64,

    #[arg(
        long,
        env = "KEYGATE_SELECTION",
        value_enum,
        default_value = "time-round-robin"
    )]
    pub selection: SelectionPolicy,
}

impl Cli {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn upstream_token(&self) -> String {
        self.upstream_token
            .clone()
            .unwrap_or_else(|| self.shared_secret.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_served_surface() {
        let cli = Cli::parse_from(["keygate"]);
        assert_eq!(cli.port, 5000);
        assert_eq!(cli.refresh_secs, 60);
        assert_eq!(cli.selection, SelectionPolicy::TimeRoundRobin);
        assert_eq!(cli.upstream_token(), cli.shared_secret);
    }

    #[test]
    fn selection_policy_parses_both_variants() {
        let cli = Cli::parse_from(["keygate", "--selection", "random"]);
        assert_eq!(cli.selection, SelectionPolicy::Random);
    }
}
