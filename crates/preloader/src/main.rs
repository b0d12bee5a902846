use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use preloader::{
    compile::{self, CompileRequest},
    config::{Config, PartialConfig, parse_flag},
};

#[derive(Debug, Parser)]
#[command(
    name = "preloader",
    version,
    about = "Compile PHP classes into a single preload file",
    arg_required_else_help = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile the listed files into one bundle
    Compile {
        /// Comma separated list of files, or path of a TOML manifest
        #[arg(long)]
        config: Option<String>,
        /// Path of the bundle to write
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip files that use __DIR__ or __FILE__
        #[arg(long = "skip_dir_file")]
        skip_dir_file: bool,
        /// Replace __DIR__ with the original directory
        #[arg(long = "fix_dir", value_name = "BOOL", value_parser = parse_flag)]
        fix_dir: Option<bool>,
        /// Replace __FILE__ with the original path
        #[arg(long = "fix_file", value_name = "BOOL", value_parser = parse_flag)]
        fix_file: Option<bool>,
        #[arg(long = "strip_comments", value_name = "BOOL", value_parser = parse_flag)]
        strip_comments: Option<bool>,
        /// Remove strict_types declarations from every file
        #[arg(long = "strip_strict_types")]
        strip_strict_types: bool,
        /// Declare strict types once at the top of the bundle
        #[arg(long = "strict_header")]
        strict_header: bool,
        /// Wrap code outside any namespace in a global namespace block
        #[arg(long = "wrap_namespaces")]
        wrap_namespaces: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compile {
            config,
            output,
            skip_dir_file,
            fix_dir,
            fix_file,
            strip_comments,
            strip_strict_types,
            strict_header,
            wrap_namespaces,
        } => {
            let cwd = env::current_dir().context("Failed to determine the working directory")?;
            let mut settings = Config::load(&cwd).context("Failed to load settings")?;
            settings.merge(PartialConfig {
                fix_dir,
                fix_file,
                skip_dir_file: skip_dir_file.then_some(true),
                strip_comments,
                strip_strict_types: strip_strict_types.then_some(true),
                strict_header: strict_header.then_some(true),
                wrap_namespaces: wrap_namespaces.then_some(true),
            });

            let request = CompileRequest {
                config,
                output,
                settings,
                cwd,
            };
            compile::execute(&request, &mut io::stdout().lock())?;
        }
    }
    Ok(())
}
