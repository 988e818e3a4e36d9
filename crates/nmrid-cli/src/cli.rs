use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nmrid",
    about = "nmrid — pid console over an in-memory NMR project store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with store and project settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a pid and show its parts
    Pid(PidArgs),
    /// List the wrapped classes
    Classes,
    /// Run a console script against a fresh store
    Run(RunArgs),
    /// Read console commands from stdin
    Shell(ShellArgs),
}

#[derive(Args)]
pub struct PidArgs {
    pub pid: String,
    /// Reject full class names as tags
    #[arg(long)]
    pub short_only: bool,
}

#[derive(Args)]
pub struct RunArgs {
    pub script: PathBuf,
    /// Keep going after a failing line
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args)]
pub struct ShellArgs {
    /// Override the store name from the config file
    #[arg(long)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pid() {
        let cli = Cli::try_parse_from(["nmrid", "pid", "MR:A.1.ALA"]).unwrap();
        if let Command::Pid(args) = cli.command {
            assert_eq!(args.pid, "MR:A.1.ALA");
            assert!(!args.short_only);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_run() {
        let cli = Cli::try_parse_from(["nmrid", "run", "setup.nmr", "--keep-going"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.script, PathBuf::from("setup.nmr"));
            assert!(args.keep_going);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_shell_with_name() {
        let cli = Cli::try_parse_from(["nmrid", "shell", "--name", "lysozyme"]).unwrap();
        if let Command::Shell(args) = cli.command {
            assert_eq!(args.name.as_deref(), Some("lysozyme"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "nmrid", "--verbose", "--config", "nmrid.toml", "--format", "json", "classes",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("nmrid.toml")));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Classes));
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["nmrid"]).is_err());
    }
}
