#[cfg(feature = "cli")]
pub mod cli;
pub mod file_config;

pub use file_config::{ConfigOverrides, ConvertConfig};

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "asc-to-csv")]
#[command(about = "Convert Vector ASC CAN logs into grouped, resampled CSV files")]
#[command(version, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub convert: ConvertArgs,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl Cli {
    /// 未指定子命令時視為 convert
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Convert(self.convert))
    }

    /// `--help` and `--version` exit 0, usage errors exit 1 like any other failure.
    pub fn exit_code_for(err: &clap::Error) -> i32 {
        if err.exit_code() == 0 {
            0
        } else {
            1
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode an ASC log and write the CSV files (default)
    Convert(ConvertArgs),
    /// Create config.json and the data/ directory
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Remove blank rows from every CSV file in a directory
    Clean {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Show columns and statistics of a converted CSV file
    Inspect {
        file: PathBuf,
        #[arg(long, help = "Print the statistics as JSON")]
        json: bool,
    },
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct ConvertArgs {
    #[arg(short, long, help = "Config file (JSON or TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub asc: Option<PathBuf>,

    #[arg(long, value_delimiter = ',')]
    pub dbc: Vec<PathBuf>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub sample_interval: Option<f64>,

    #[arg(long)]
    pub group_size: Option<usize>,

    #[arg(long, help = "utf-8 or utf-8-sig")]
    pub encoding: Option<String>,

    #[arg(long, help = "Log undecodable frames")]
    pub debug: bool,

    #[arg(long, help = "Write the effective configuration to this file")]
    pub save_config: Option<PathBuf>,

    #[arg(long, help = "Remove blank rows from the output afterwards")]
    pub clean: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConvertArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            asc_file: self.asc.clone(),
            dbc_files: self.dbc.clone(),
            output_dir: self.output.clone(),
            sample_interval: self.sample_interval,
            group_size: self.group_size,
            csv_encoding: self.encoding.clone(),
            debug: self.debug,
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_bare_flags_mean_convert() {
        let cli = Cli::parse_from([
            "asc-to-csv",
            "--asc",
            "log.asc",
            "--dbc",
            "a.dbc,b.dbc",
            "--group-size",
            "3",
        ]);
        match cli.into_command() {
            Command::Convert(args) => {
                assert_eq!(args.asc, Some(PathBuf::from("log.asc")));
                assert_eq!(args.dbc.len(), 2);
                assert_eq!(args.overrides().group_size, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::parse_from(["asc-to-csv", "clean", "out", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.into_command(), Command::Clean { dir } if dir == PathBuf::from("out")));

        let cli = Cli::parse_from(["asc-to-csv", "init"]);
        assert!(matches!(cli.into_command(), Command::Init { dir } if dir == PathBuf::from(".")));
    }

    #[test]
    fn test_usage_errors_exit_with_one() {
        let err = Cli::try_parse_from(["asc-to-csv", "--group-size", "abc"]).unwrap_err();
        assert_eq!(Cli::exit_code_for(&err), 1);

        let err = Cli::try_parse_from(["asc-to-csv", "bogus-subcommand"]).unwrap_err();
        assert_eq!(Cli::exit_code_for(&err), 1);
    }

    #[test]
    fn test_help_and_version_exit_with_zero() {
        let err = Cli::try_parse_from(["asc-to-csv", "--help"]).unwrap_err();
        assert_eq!(Cli::exit_code_for(&err), 0);

        let err = Cli::try_parse_from(["asc-to-csv", "--version"]).unwrap_err();
        assert_eq!(Cli::exit_code_for(&err), 0);
    }
}
