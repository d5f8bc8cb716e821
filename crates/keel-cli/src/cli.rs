//! Command-line surface of `keelctl`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect and control keel-hosted services.
#[derive(Parser, Debug)]
#[command(name = "keelctl", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Directory holding per-service state. Defaults to `KEEL_HOME` or the
    /// platform data directory.
    #[arg(long, value_name = "DIR", global = true)]
    pub(crate) data_root: Option<PathBuf>,
    /// Connect, read, and write timeout in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 5_000, global = true)]
    pub(crate) timeout_ms: u64,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Checks whether an instance answers the health probe.
    Ping {
        /// Service name.
        name: String,
    },
    /// Asks an instance to shut down.
    Stop {
        /// Service name.
        name: String,
        /// Wait until the instance has removed its port record.
        #[arg(long)]
        wait: bool,
    },
    /// Sends one command line and prints the response.
    Send {
        /// Service name.
        name: String,
        /// Command words, joined with single spaces.
        #[arg(
            value_name = "COMMAND",
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        command: Vec<String>,
    },
    /// Reports whether an instance is running, stale, or stopped.
    Status {
        /// Service name.
        name: String,
    },
    /// Prints the filesystem locations derived for a service.
    Paths {
        /// Service name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("keelctl").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[rstest]
    fn send_joins_trailing_words() {
        let cli = parse(&["send", "demo", "ECHO", "--loud", "hi"]);
        assert_eq!(
            cli.command,
            CliCommand::Send {
                name: "demo".to_owned(),
                command: vec!["ECHO".to_owned(), "--loud".to_owned(), "hi".to_owned()],
            }
        );
    }

    #[rstest]
    fn global_flags_follow_subcommands() {
        let cli = parse(&["stop", "demo", "--wait", "--timeout-ms", "250"]);
        assert_eq!(cli.timeout_ms, 250);
        assert_eq!(
            cli.command,
            CliCommand::Stop {
                name: "demo".to_owned(),
                wait: true,
            }
        );
    }

    #[rstest]
    #[case::missing_name(&["ping"])]
    #[case::missing_command(&["send", "demo"])]
    #[case::unknown(&["restart", "demo"])]
    fn rejects_incomplete_invocations(#[case] args: &[&str]) {
        let result = Cli::try_parse_from(std::iter::once("keelctl").chain(args.iter().copied()));
        assert!(result.is_err());
    }
}
