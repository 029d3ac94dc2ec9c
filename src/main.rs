mod client;
mod commands;
mod config;
mod exitcode;
mod model;
mod render;

use crate::client::ApiError;
use crate::commands::{CliError, CommandRegistry, Context};
use crate::config::{Config, ConfigError};
use crate::render::OutputFormat;
use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::ffi::OsString;
use std::io::{self, Write};
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

#[derive(Parser)]
#[command(
    name = "empowerctl",
    version,
    about = "CLI for managing WiFi slices on an EmPOWER controller",
    after_help = "Run `empowerctl help` to list the available commands."
)]
struct Cli {
    #[arg(
        long,
        env = "EMPOWER_URL",
        value_name = "URL",
        help = "Controller base URL (defaults to http://127.0.0.1:8888)"
    )]
    url: Option<String>,

    #[arg(long, short = 'u', env = "EMPOWER_USERNAME", help = "API username")]
    username: Option<String>,

    #[arg(
        long,
        short = 'p',
        env = "EMPOWER_PASSWORD",
        hide_env_values = true,
        help = "API password"
    )]
    password: Option<String>,

    #[arg(
        long,
        short = 'o',
        value_enum,
        default_value_t = OutputFormat::Pretty,
        help = "Output format"
    )]
    output: OutputFormat,

    #[arg(
        long,
        short = 'd',
        action = ArgAction::Count,
        help = "Increase log verbosity (-d info, -dd debug, -ddd trace)"
    )]
    debug: u8,

    #[command(subcommand)]
    command: Option<Invocation>,
}

#[derive(Subcommand)]
enum Invocation {
    /// Any registered command followed by its arguments
    #[command(external_subcommand)]
    Run(Vec<OsString>),
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let registry = CommandRegistry::new();
    let code = match run(cli, &registry) {
        Ok(()) => exitcode::OK,
        Err(err) => report(&err, &registry),
    };
    process::exit(code);
}

fn run(cli: Cli, registry: &CommandRegistry) -> Result<()> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let overrides = Config {
        url: cli.url,
        username: cli.username,
        password: cli.password,
    };
    let ctx = Context {
        registry,
        config: config::resolve(&cwd, overrides)?,
        cwd,
        output: cli.output,
    };

    let mut stdout = io::stdout().lock();
    let Some(Invocation::Run(tokens)) = cli.command else {
        registry.write_available_commands(&mut stdout)?;
        return Ok(());
    };

    let mut tokens = tokens
        .into_iter()
        .map(|t| t.to_string_lossy().into_owned());
    let name = tokens.next().unwrap_or_default();
    let args: Vec<String> = tokens.collect();

    registry.dispatch(&ctx, &name, &args, &mut stdout)?;
    stdout.flush().context("flushing stdout")?;
    Ok(())
}

fn report(err: &anyhow::Error, registry: &CommandRegistry) -> i32 {
    if let Some(cli_err) = err.chain().find_map(|c| c.downcast_ref::<CliError>()) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{cli_err}");
        let _ = registry.write_available_commands(&mut stderr);
        return exitcode::USAGE;
    }

    eprintln!("Error: {err:#}");
    exit_code(err)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return match api {
                ApiError::Decode { .. } => exitcode::DATAERR,
                ApiError::InvalidBaseUrl { .. } => exitcode::CONFIG,
                _ => exitcode::UNAVAILABLE,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exitcode::CONFIG;
        }
    }
    exitcode::SOFTWARE
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // stdout is reserved for command output
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}
