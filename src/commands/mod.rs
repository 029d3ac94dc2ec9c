// empowerctl - CLI for EmPOWER WiFi slices
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Command registry and the argument plumbing shared by every command.
//!
//! Each command is a pair of functions: a parser that splits recognised
//! flags from positional leftovers, and a handler that runs with the global
//! [`Context`], the parsed flags and the leftovers.

mod settings;
mod wifi_slices;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::config::EffectiveConfig;
use crate::model::Properties;
use crate::render::OutputFormat;

const LEFTOVERS: &str = "leftovers";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid parameter, run help {command} ({reason})")]
    InvalidParameter { command: String, reason: String },
    #[error("Unknown command `{0}`, run help")]
    UnknownCommand(String),
}

impl CliError {
    fn invalid(command: &str, reason: impl Into<String>) -> Self {
        CliError::InvalidParameter {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

/// Everything a handler needs beyond its own arguments.
pub struct Context<'a> {
    pub registry: &'a CommandRegistry,
    pub cwd: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputFormat,
}

impl Context<'_> {
    pub fn client(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(&self.config)?)
    }
}

/// Flags recognised by a command's parser plus the positional leftovers.
#[derive(Debug)]
pub struct ParsedArgs {
    pub matches: ArgMatches,
    pub leftovers: Vec<String>,
}

type ParseFn = fn(&CommandSpec, &[String]) -> Result<ParsedArgs, clap::Error>;
type RunFn = fn(&Context, &ParsedArgs, &mut dyn Write) -> Result<()>;

pub struct CommandSpec {
    pub name: &'static str,
    /// Positional part of the usage line, after the command name
    pub usage: &'static str,
    pub description: &'static str,
    pub parse: ParseFn,
    pub run: RunFn,
}

impl CommandSpec {
    /// Base parser: `-h/--help` plus every other token kept as a leftover.
    pub fn parser(&self) -> clap::Command {
        clap::Command::new(self.name)
            .about(self.description)
            .override_usage(format!("empowerctl {} {}", self.name, self.usage))
            .no_binary_name(true)
            .arg(
                Arg::new(LEFTOVERS)
                    .value_parser(clap::value_parser!(String))
                    .action(ArgAction::Append)
                    .num_args(0..)
                    .trailing_var_arg(true)
                    .allow_hyphen_values(true)
                    .hide(true),
            )
    }
}

/// Parser for commands that take no flags of their own.
pub fn parse_leftovers(spec: &CommandSpec, args: &[String]) -> Result<ParsedArgs, clap::Error> {
    try_matches(spec.parser(), args)
}

/// Runs `cmd` over `args`.
///
/// `-h/--help` is honoured anywhere before the first `--`, even after a
/// positional. The first `--` itself is dropped and every token after it is
/// kept as a leftover verbatim.
pub fn try_matches(cmd: clap::Command, args: &[String]) -> Result<ParsedArgs, clap::Error> {
    let (flags, escaped) = match args.iter().position(|a| a == "--") {
        Some(i) => (&args[..i], &args[i + 1..]),
        None => (args, &[][..]),
    };
    if flags.iter().any(|a| a == "-h" || a == "--help") {
        return cmd.try_get_matches_from(["--help"]).map(split_leftovers);
    }

    let mut parsed = split_leftovers(cmd.try_get_matches_from(flags)?);
    parsed.leftovers.extend(escaped.iter().cloned());
    Ok(parsed)
}

fn split_leftovers(mut matches: ArgMatches) -> ParsedArgs {
    let leftovers: Vec<String> = matches
        .remove_many::<String>(LEFTOVERS)
        .map(|values| values.collect())
        .unwrap_or_default();
    ParsedArgs { matches, leftovers }
}

/// Command name to (parser, handler), built once at startup.
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            commands: HashMap::new(),
        };
        registry.register_all();
        registry
    }

    fn register_all(&mut self) {
        self.register(CommandSpec {
            name: "help",
            usage: "[command]",
            description: "Show available commands or the usage of one command",
            parse: parse_leftovers,
            run: help,
        });
        wifi_slices::register(self);
        settings::register(self);
    }

    fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn write_available_commands(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let width = self.names().iter().map(|n| n.len()).max().unwrap_or(0);
        writeln!(out, "Available commands are:")?;
        for name in self.names() {
            let spec = &self.commands[name];
            writeln!(out, "  {:width$}  {}", name, spec.description)?;
        }
        Ok(())
    }

    /// Runs the parser and handler registered under `name`.
    pub fn dispatch(
        &self,
        ctx: &Context,
        name: &str,
        args: &[String],
        out: &mut dyn Write,
    ) -> Result<()> {
        let spec = self
            .get(name)
            .ok_or_else(|| CliError::UnknownCommand(name.to_string()))?;
        debug!(command = name, ?args, "dispatching");

        let parsed = match (spec.parse)(spec, args) {
            Ok(parsed) => parsed,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                write!(out, "{}", err.render())?;
                return Ok(());
            }
            Err(err) => {
                let rendered = err.to_string();
                let reason = rendered
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error: ");
                return Err(CliError::invalid(name, reason).into());
            }
        };

        (spec.run)(ctx, &parsed, out)
    }
}

fn help(ctx: &Context, parsed: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    match parsed.leftovers.as_slice() {
        [] => ctx.registry.write_available_commands(out)?,
        [name] => {
            let spec = ctx
                .registry
                .get(name)
                .ok_or_else(|| CliError::UnknownCommand(name.clone()))?;
            write!(out, "{}", spec.parser().render_help())?;
        }
        more => {
            return Err(CliError::invalid(
                "help",
                format!("expected at most 1 argument, got {}", more.len()),
            )
            .into());
        }
    }
    Ok(())
}

pub fn parse_project_id(command: &str, token: &str) -> Result<Uuid, CliError> {
    Uuid::parse_str(token)
        .map_err(|e| CliError::invalid(command, format!("project id `{token}`: {e}")))
}

pub fn parse_slice_id(command: &str, token: &str) -> Result<u32, CliError> {
    token
        .parse::<u32>()
        .map_err(|e| CliError::invalid(command, format!("slice id `{token}`: {e}")))
}

/// Turns `key=value` tokens into slice properties, splitting on the first `=`.
pub fn parse_properties(command: &str, tokens: &[String]) -> Result<Properties, CliError> {
    let mut properties = Properties::new();
    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                properties.insert(key.to_string(), Value::String(value.to_string()));
            }
            _ => {
                return Err(CliError::invalid(
                    command,
                    format!("expected key=value, got `{token}`"),
                ));
            }
        }
    }
    Ok(properties)
}
