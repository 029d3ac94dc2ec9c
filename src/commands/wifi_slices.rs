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

use anyhow::Result;
use reqwest::StatusCode;
use std::io::Write;
use tracing::info;
use uuid::Uuid;

use super::{
    CliError, CommandRegistry, CommandSpec, Context, ParsedArgs, parse_leftovers,
    parse_project_id, parse_properties, parse_slice_id,
};
use crate::model::{Project, Slice, SliceCollection, SliceUpsertRequest};
use crate::render;

const LIST_CMD: &str = "list-wifi-slices";
const UPSERT_CMD: &str = "upsert-wifi-slice";
const DELETE_CMD: &str = "delete-wifi-slice";

pub(super) fn register(registry: &mut CommandRegistry) {
    registry.register(CommandSpec {
        name: LIST_CMD,
        usage: "<project_id>",
        description: "List the WiFi slices of a project",
        parse: parse_leftovers,
        run: list_wifi_slices,
    });
    registry.register(CommandSpec {
        name: UPSERT_CMD,
        usage: "<project_id> <slice_id> [key=value ...]",
        description: "Create or update a WiFi slice",
        parse: parse_leftovers,
        run: upsert_wifi_slice,
    });
    registry.register(CommandSpec {
        name: DELETE_CMD,
        usage: "<project_id> <slice_id>",
        description: "Delete a WiFi slice",
        parse: parse_leftovers,
        run: delete_wifi_slice,
    });
}

fn project_path(project_id: &Uuid) -> String {
    format!("/api/v1/projects/{project_id}")
}

fn slices_path(project_id: &Uuid) -> String {
    format!("/api/v1/projects/{project_id}/wifi_slices")
}

fn slice_path(project_id: &Uuid, slice_id: u32) -> String {
    format!("/api/v1/projects/{project_id}/wifi_slices/{slice_id}")
}

fn wrong_count(command: &str, expected: &str, got: usize) -> CliError {
    CliError::invalid(
        command,
        format!("expected {expected} positional arguments, got {got}"),
    )
}

fn list_wifi_slices(ctx: &Context, parsed: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let [project] = parsed.leftovers.as_slice() else {
        return Err(wrong_count(LIST_CMD, "1", parsed.leftovers.len()).into());
    };
    let project_id = parse_project_id(LIST_CMD, project)?;

    let client = ctx.client()?;
    let project: Project = client
        .get(&project_path(&project_id), StatusCode::OK)?
        .decode()?;
    let slices: SliceCollection = client
        .get(&slices_path(&project_id), StatusCode::OK)?
        .decode()?;

    render::slices(out, ctx.output, &project, slices.as_slice())
}

fn upsert_wifi_slice(ctx: &Context, parsed: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let [project, slice, params @ ..] = parsed.leftovers.as_slice() else {
        return Err(wrong_count(UPSERT_CMD, "at least 2", parsed.leftovers.len()).into());
    };
    let project_id = parse_project_id(UPSERT_CMD, project)?;
    let slice_id = parse_slice_id(UPSERT_CMD, slice)?;
    let request = SliceUpsertRequest::new(slice_id, parse_properties(UPSERT_CMD, params)?);

    let client = ctx.client()?;
    client.post_json(&slices_path(&project_id), &request, StatusCode::CREATED)?;
    info!(%project_id, slice_id, "slice written");

    let project: Project = client
        .get(&project_path(&project_id), StatusCode::OK)?
        .decode()?;
    let slice: Slice = client
        .get(&slice_path(&project_id, slice_id), StatusCode::OK)?
        .decode()?;

    render::slices(out, ctx.output, &project, std::slice::from_ref(&slice))
}

fn delete_wifi_slice(ctx: &Context, parsed: &ParsedArgs, out: &mut dyn Write) -> Result<()> {
    let [project, slice] = parsed.leftovers.as_slice() else {
        return Err(wrong_count(DELETE_CMD, "2", parsed.leftovers.len()).into());
    };
    let project_id = parse_project_id(DELETE_CMD, project)?;
    let slice_id = parse_slice_id(DELETE_CMD, slice)?;

    let response = ctx
        .client()?
        .delete(&slice_path(&project_id, slice_id), StatusCode::NO_CONTENT)?;
    info!(%project_id, slice_id, status = response.status, "slice deleted");

    render::deleted(out, ctx.output, slice_id)
}
