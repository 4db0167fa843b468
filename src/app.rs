//! Command-line parsing and command routing.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

use crate::commands::{self, RunOptions};
use crate::logging;
use crate::setup;

/// Animated sine-wave lines in the terminal, driven by your microphone
#[derive(Parser)]
#[command(name = "linewave")]
#[command(version)]
#[command(
    long_about = "Animated sine-wave lines in the terminal, driven by your microphone.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used.\n\nEXAMPLES:\n    # Animate with the configured microphone\n    $ linewave\n\n    # Animate at a fixed volume (Up/Down change it)\n    $ linewave --volume 8\n\n    # Use another input device\n    $ linewave --device 2"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/linewave/linewave.toml\n    Logs:               ~/.local/state/linewave/linewave.log.*"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Animate at a fixed volume instead of listening to the microphone
    #[arg(long, value_name = "V", allow_negative_numbers = true, conflicts_with = "no_mic")]
    volume: Option<f32>,

    /// Do not open the microphone; start at volume 0
    #[arg(long)]
    no_mic: bool,

    /// Input device: "default", an ID or a name from `linewave list-devices`
    #[arg(long, value_name = "NAME")]
    device: Option<String>,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        RunOptions {
            volume: args.volume,
            no_mic: args.no_mic,
            device: args.device,
        }
    }
}

impl Cli {
    /// Whether the selected command needs logging and a config file.
    fn needs_setup(&self) -> bool {
        !matches!(
            self.command,
            Some(Commands::Completions { .. } | Commands::ListDevices | Commands::Logs)
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Animate the waveform (default)
    ///
    /// Press q, Escape or Ctrl+C to quit.
    Run(RunArgs),

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    #[command(name = "list-devices")]
    ListDevices,

    /// Show the last 50 lines of the most recent log file
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   linewave completions bash > linewave.bash
    ///   linewave completions zsh > _linewave
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parses the command line and runs the selected command.
///
/// # Errors
/// - If logging or first-run setup fails
/// - If the command fails
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.needs_setup() {
        logging::init_logging()?;
        setup::ensure_config()?;
    }

    match cli.command {
        None => commands::handle_run(cli.run.into()),
        Some(Commands::Run(args)) => commands::handle_run(args.into()),
        Some(Commands::Config) => commands::handle_config(),
        Some(Commands::ListDevices) => commands::handle_list_devices(),
        Some(Commands::Logs) => commands::handle_logs(),
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "linewave", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_accepts_run_flags() {
        let cli = Cli::try_parse_from(["linewave", "--volume", "-12.5"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.volume, Some(-12.5));

        let cli = Cli::try_parse_from(["linewave", "run", "--no-mic", "--device", "2"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert!(args.no_mic);
                assert_eq!(args.device.as_deref(), Some("2"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_volume_conflicts_with_no_mic() {
        assert!(Cli::try_parse_from(["linewave", "--volume", "3", "--no-mic"]).is_err());
    }

    #[test]
    fn test_only_animation_and_config_need_setup() {
        let needs_setup = |args: &[&str]| Cli::try_parse_from(args).unwrap().needs_setup();

        assert!(needs_setup(&["linewave"]));
        assert!(needs_setup(&["linewave", "--no-mic"]));
        assert!(needs_setup(&["linewave", "run"]));
        assert!(needs_setup(&["linewave", "config"]));
        assert!(needs_setup(&["linewave", "c"]));
        assert!(!needs_setup(&["linewave", "list-devices"]));
        assert!(!needs_setup(&["linewave", "logs"]));
        assert!(!needs_setup(&["linewave", "completions", "bash"]));
    }
}
