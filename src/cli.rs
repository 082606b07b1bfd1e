use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Detect drift between a live EC2 instance and its Terraform state and config",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check for drift continuously until interrupted
    Watch(WatchArgs),

    /// Run a single drift check
    Check(CheckArgs),

    /// Show what a Terraform config file declares for the instance
    Scan(ScanArgs),

    /// Inspect the effective settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// Setting overrides carried by this command, if it uses settings at all.
    pub fn settings_args(&self) -> Option<&SettingsArgs> {
        match self {
            Command::Watch(args) => Some(&args.settings),
            Command::Check(args) => Some(&args.settings),
            Command::Config(ConfigCommand::Show { settings } | ConfigCommand::Validate { settings }) => {
                Some(settings)
            }
            Command::Config(ConfigCommand::Path)
            | Command::Scan(_)
            | Command::Completions { .. } => None,
        }
    }
}

// ============================================================================
// Shared Overrides
// ============================================================================

/// Settings that can be given as flags or environment variables.
///
/// Anything left unset falls back to the settings file, then to defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Terraform state file
    #[arg(long = "state", env = "TFSTATE_PATH", value_name = "FILE")]
    pub tfstate_path: Option<String>,

    /// Terraform config file
    #[arg(long = "tf", env = "MAINTF_PATH", value_name = "FILE")]
    pub maintf_path: Option<String>,

    /// Terraform resource type to compare
    #[arg(long, env = "RESOURCE_TYPE")]
    pub resource_type: Option<String>,

    /// EC2 instance id to describe
    #[arg(long, env = "INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS CLI profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Custom endpoint, e.g. LocalStack
    #[arg(long = "endpoint-url", env = "LOCALSTACK_URL", value_name = "URL")]
    pub localstack_url: Option<String>,

    /// Read the live instance from a saved describe-instances JSON file
    #[arg(long, env = "DESCRIBE_FILE", value_name = "FILE")]
    pub describe_file: Option<String>,

    /// Seconds between checks
    #[arg(long = "interval", env = "CHECK_INTERVAL_SECONDS", value_name = "SECS")]
    pub check_interval_seconds: Option<u64>,

    /// Attempts for the live fetch
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Seconds between fetch attempts
    #[arg(long = "retry-delay", env = "RETRY_DELAY_SECONDS", value_name = "SECS")]
    pub retry_delay_seconds: Option<u64>,

    /// Seconds allowed for the comparison phase
    #[arg(long = "timeout", env = "COMPARISON_TIMEOUT_SECONDS", value_name = "SECS")]
    pub comparison_timeout_seconds: Option<u64>,

    /// Log level when -v/-q are not given (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

// ============================================================================
// Watch / Check
// ============================================================================

#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with status 2 when drift is found
    #[arg(long)]
    pub exit_code: bool,
}

// ============================================================================
// Scan
// ============================================================================

#[derive(Args)]
pub struct ScanArgs {
    /// Terraform config file to scan
    pub file: PathBuf,

    /// Terraform resource type to look for
    #[arg(long, default_value = driftkit::AWS_INSTANCE)]
    pub resource_type: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective settings
    Show {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Validate the effective settings
    Validate {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Print the settings file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_flags() {
        let cli = Cli::try_parse_from([
            "driftwatch",
            "check",
            "--state",
            "prod.tfstate",
            "--interval",
            "30",
            "--json",
            "--exit-code",
        ])
        .unwrap();
        match cli.command {
            Command::Check(args) => {
                assert!(args.json);
                assert!(args.exit_code);
                assert_eq!(args.settings.tfstate_path.as_deref(), Some("prod.tfstate"));
                assert_eq!(args.settings.check_interval_seconds, Some(30));
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["driftwatch", "scan", "main.tf", "-vv", "--config", "x.toml"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Command::Scan(args) => {
                assert_eq!(args.file, PathBuf::from("main.tf"));
                assert_eq!(args.resource_type, "aws_instance");
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_invalid_number_rejected() {
        assert!(Cli::try_parse_from(["driftwatch", "watch", "--interval", "soon"]).is_err());
    }
}
