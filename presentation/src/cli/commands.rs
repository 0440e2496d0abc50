//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Calendar backend selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Google Calendar REST API
    Google,
    /// Process-local store, lost on exit
    Memory,
}

/// CLI arguments for calendar-agent
#[derive(Parser, Debug)]
#[command(name = "calendar-agent")]
#[command(author, version, about = "Calendar assistant that acts through a tool provider")]
#[command(long_about = r#"
calendar-agent answers scheduling requests by calling calendar tools.

The agent spawns a tool provider (by default this same binary with `serve`),
discovers its tools over a framed JSON-RPC channel on the provider's
stdin/stdout, and lets a reasoning model decide which tools to call.

Configuration files are loaded from (in priority order):
1. CALAGENT_* environment variables (e.g. CALAGENT_AGENT__MAX_ITERATIONS=4)
2. --config <path>     Explicit config file
3. ./calendar-agent.toml   Project-level config
4. ~/.config/calendar-agent/config.toml   Global config

Example:
  calendar-agent chat
  calendar-agent ask "Move my 3pm meeting to Friday"
  calendar-agent serve --backend memory
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Maximum reasoning steps per request
    #[arg(long, value_name = "N", global = true)]
    pub max_iterations: Option<usize>,

    /// Reasoning model to use
    #[arg(short, long, value_name = "MODEL", global = true)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the calendar tools over stdin/stdout
    Serve {
        /// Calendar backend (defaults to the configured one)
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Interactive chat session
    Chat {
        /// Suppress progress indicators
        #[arg(short, long)]
        quiet: bool,
    },

    /// Answer a single request and exit
    Ask {
        /// The request, e.g. "what's on my calendar tomorrow?"
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,

        /// Suppress progress indicators
        #[arg(short, long)]
        quiet: bool,
    },

    /// Discover and print the provider's tools
    Tools {
        /// Print the JSON schemas handed to the reasoning model
        #[arg(long)]
        json: bool,
    },

    /// Show configuration file locations and the merged configuration
    ShowConfig,
}

impl Cli {
    /// Whether this invocation speaks the tool protocol on stdout.
    pub fn is_serve(&self) -> bool {
        matches!(self.command, Command::Serve { .. })
    }
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
    fn test_ask_joins_words() {
        let cli = Cli::parse_from(["calendar-agent", "ask", "what's", "on", "friday"]);
        let Command::Ask { request, quiet } = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(request.join(" "), "what's on friday");
        assert!(!quiet);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "calendar-agent",
            "chat",
            "-vv",
            "--max-iterations",
            "3",
            "--no-config",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.max_iterations, Some(3));
        assert!(cli.no_config);
        assert!(!cli.is_serve());
    }

    #[test]
    fn test_serve_backend() {
        let cli = Cli::parse_from(["calendar-agent", "serve", "--backend", "memory"]);
        assert!(cli.is_serve());
        assert!(matches!(
            cli.command,
            Command::Serve {
                backend: Some(BackendArg::Memory)
            }
        ));
    }
}
