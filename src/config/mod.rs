pub mod toml_config;

use crate::utils::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use toml_config::TomlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "orbit")]
#[command(about = "Follow athletes and keep up with their latest results")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(long, global = true, default_value = "orbit.toml")]
    pub config: String,

    /// Backend URL, overrides [backend].url
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Public anon key, overrides [backend].anon_key
    #[arg(long, global = true)]
    pub anon_key: Option<String>,

    /// Where the signed-in session is kept, overrides [session].dir
    #[arg(long, global = true)]
    pub session_dir: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Recent results from the athletes you follow
    Feed,
    /// Search athletes by name and category
    Search {
        /// Case-insensitive name fragment
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Only athletes you follow, labelled by sport. The mobile app's
        /// orbit screen lists every athlete; this flag narrows it to your follows.
        #[arg(long)]
        following: bool,
    },
    /// Show an athlete profile with recent results
    Athlete { id: String },
    Follow { id: String },
    Unfollow { id: String },
    /// Follow if not following, unfollow otherwise
    Toggle { id: String },
    /// List the category filters
    Categories,
    /// Format a raw result JSON object read from a file or stdin
    Format {
        #[arg(long)]
        file: Option<String>,
    },
}

impl Command {
    /// Commands that never talk to the backend.
    pub fn is_offline(&self) -> bool {
        matches!(self, Command::Categories | Command::Format { .. })
    }
}

impl CliConfig {
    /// Config file, then environment defaults, then command line flags.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = TomlConfig::load_or_default(&self.config)?;
        config.apply_env_defaults();

        if let Some(url) = &self.backend_url {
            config.backend.url = Some(url.clone());
        }
        if let Some(key) = &self.anon_key {
            config.backend.anon_key = Some(key.clone());
        }
        if let Some(dir) = &self.session_dir {
            config.session.dir = Some(dir.clone());
        }
        config.session.dir = Some(config.session_dir_or_default());

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigProvider;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_search_command() {
        let cli = CliConfig::parse_from([
            "orbit", "--format", "json", "search", "gauff", "--category", "tennis",
        ]);

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Search {
                query,
                category,
                following,
            } => {
                assert_eq!(query.as_deref(), Some("gauff"));
                assert_eq!(category.as_deref(), Some("tennis"));
                assert!(!following);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[backend]\nurl = \"https://file.supabase.co\"\nanon_key = \"file-key\"\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from([
            "orbit",
            "--config",
            path.as_str(),
            "--anon-key",
            "flag-key",
            "--session-dir",
            "/tmp/orbit-session",
            "feed",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.backend_url(), "https://file.supabase.co");
        assert_eq!(config.anon_key(), "flag-key");
        assert_eq!(config.session_dir(), "/tmp/orbit-session");
        assert!(!cli.command.is_offline());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = CliConfig::parse_from(["orbit", "format", "--verbose", "--format", "csv"]);
        assert!(cli.verbose);
        assert!(!cli.log_json);
        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(cli.command.is_offline());
    }
}
