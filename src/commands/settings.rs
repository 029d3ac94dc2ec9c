use anyhow::Result;
use clap::{Arg, ArgAction};
use std::io::Write;

use super::{CliError, CommandRegistry, CommandSpec, Context, ParsedArgs, try_matches};
use crate::config::{self, Scope};

const CONFIGURE: &str = "configure";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(CommandSpec {
        name: CONFIGURE,
        usage: "--url <URL> [--username <USER>] [--password <PASS>] [--scope local|user]",
        description: "Persist controller connection settings",
        parse: parse_configure,
        run: configure,
    });
    registry.register(CommandSpec {
        name: "config-show",
        usage: "",
        description: "Show the merged configuration (password masked)",
        parse: super::parse_leftovers,
        run: config_show,
    });
}

fn parse_configure(spec: &CommandSpec, args: &[String]) -> Result<ParsedArgs, clap::Error> {
    let cmd = spec
        .parser()
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .required(true)
                .help("Base URL of the controller, e.g. http://127.0.0.1:8888"),
        )
        .arg(Arg::new("username").long("username").value_name("USER"))
        .arg(Arg::new("password").long("password").value_name("PASS"))
        .arg(
            Arg::new("scope")
                .long("scope")
                .value_parser(["local", "user"])
                .default_value("user")
                .action(ArgAction::Set)
                .help("Where to write the config (project dir or user config dir)"),
        );
    try_matches(cmd, args)
}

fn configure(ctx: &Context, parsed: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    if let Some(extra) = parsed.leftovers.first() {
        return Err(CliError::invalid(CONFIGURE, format!("unexpected argument `{extra}`")).into());
    }

    let scope = match parsed.matches.get_one::<String>("scope").map(String::as_str) {
        Some("local") => Scope::Local,
        _ => Scope::User,
    };
    let mut existing = config::load_scope(scope, &ctx.cwd)?;
    if let Some(url) = parsed.matches.get_one::<String>("url") {
        existing.url = Some(url.clone());
    }
    if let Some(username) = parsed.matches.get_one::<String>("username") {
        existing.username = Some(username.clone());
    }
    if let Some(password) = parsed.matches.get_one::<String>("password") {
        existing.password = Some(password.clone());
    }

    let path = config::save(scope, &existing, &ctx.cwd)?;
    writeln!(out, "Saved controller settings to {}", path.display())?;
    Ok(())
}

fn config_show(ctx: &Context, parsed: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    if let Some(extra) = parsed.leftovers.first() {
        return Err(
            CliError::invalid("config-show", format!("unexpected argument `{extra}`")).into(),
        );
    }

    let mut masked = config::load(&ctx.cwd)?;
    if masked.password.is_some() {
        masked.password = Some("*****".into());
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&masked)?)?;
    Ok(())
}
