use anyhow::Result;
use clap::ValueEnum;
use serde_json::{Value, json};
use std::io::Write;

use crate::model::{Project, Slice};

const UNDEFINED_SSID: &str = "UNDEFINED";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Pretty,
    /// Decoded records as JSON
    Json,
}

/// Writes a project header followed by its slices.
pub fn slices(
    out: &mut dyn Write,
    output: OutputFormat,
    project: &Project,
    slices: &[Slice],
) -> Result<()> {
    match output {
        OutputFormat::Pretty => writeln!(out, "{}", slices_text(project, slices))?,
        OutputFormat::Json => {
            let doc = json!({ "project": project, "slices": slices });
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
    }
    Ok(())
}

pub fn deleted(out: &mut dyn Write, output: OutputFormat, slice_id: u32) -> Result<()> {
    match output {
        OutputFormat::Pretty => writeln!(out, "slice id {slice_id} status DELETED")?,
        OutputFormat::Json => {
            let doc = json!({ "slice_id": slice_id, "status": "DELETED" });
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
    }
    Ok(())
}

fn slices_text(project: &Project, slices: &[Slice]) -> String {
    let mut text = format!(
        "project id {} SSID {}",
        project.project_id,
        project.ssid().unwrap_or(UNDEFINED_SSID)
    );
    for slice in slices {
        text.push_str(&format!("\nSlice ID: {}", slice.slice_id));
        for (key, value) in &slice.properties {
            text.push_str(&format!("\n    {key}: {}", value_to_str(value)));
        }
    }
    text
}

fn value_to_str(value: &Value) -> String {
    match value {
        Value::Null => "".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WifiProps;

    const PROJECT: &str = "3ec1e9a4-8b8e-4cf4-9fb1-2f3c4a0f5d10";

    fn project(ssid: Option<&str>) -> Project {
        Project {
            project_id: PROJECT.to_string(),
            wifi_props: ssid.map(|s| WifiProps {
                ssid: Some(s.to_string()),
            }),
        }
    }

    fn slice(id: u32, props: Value) -> Slice {
        serde_json::from_value(json!({"slice_id": id, "properties": props})).unwrap()
    }

    fn render(output: OutputFormat, project: &Project, items: &[Slice]) -> String {
        let mut buf = Vec::new();
        slices(&mut buf, output, project, items).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn renders_project_and_slices() {
        let text = render(
            OutputFormat::Pretty,
            &project(Some("lab-net")),
            &[slice(1, json!({"amsdu_aggregation": "true"}))],
        );
        assert_eq!(
            text,
            format!("project id {PROJECT} SSID lab-net\nSlice ID: 1\n    amsdu_aggregation: true\n")
        );
    }

    #[test]
    fn missing_ssid_renders_undefined() {
        let text = render(OutputFormat::Pretty, &project(None), &[]);
        assert_eq!(text, format!("project id {PROJECT} SSID UNDEFINED\n"));
    }

    #[test]
    fn project_id_is_printed_as_the_server_sent_it() {
        let project = Project {
            project_id: "3EC1E9A48B8E4CF49FB12F3C4A0F5D10".to_string(),
            wifi_props: None,
        };
        let text = render(OutputFormat::Pretty, &project, &[]);
        assert_eq!(text, "project id 3EC1E9A48B8E4CF49FB12F3C4A0F5D10 SSID UNDEFINED
");
    }

    #[test]
    fn properties_follow_server_order_and_scalar_formatting() {
        let text = render(
            OutputFormat::Pretty,
            &project(Some("lab-net")),
            &[
                slice(0, json!({})),
                slice(
                    5,
                    json!({"sta_scheduler": 1, "quantum": "12000", "amsdu_aggregation": false}),
                ),
            ],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[1..],
            [
                "Slice ID: 0",
                "Slice ID: 5",
                "    sta_scheduler: 1",
                "    quantum: 12000",
                "    amsdu_aggregation: false",
            ]
        );
    }

    #[test]
    fn json_output_carries_records() {
        let text = render(
            OutputFormat::Json,
            &project(Some("lab-net")),
            &[slice(2, json!({"quantum": "10000"}))],
        );
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["project"]["project_id"], PROJECT);
        assert_eq!(doc["project"]["wifi_props"]["ssid"], "lab-net");
        assert_eq!(doc["slices"][0]["slice_id"], 2);
        assert_eq!(doc["slices"][0]["properties"]["quantum"], "10000");
    }

    #[test]
    fn deleted_confirmation() {
        let mut buf = Vec::new();
        deleted(&mut buf, OutputFormat::Pretty, 12).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "slice id 12 status DELETED\n");

        let mut buf = Vec::new();
        deleted(&mut buf, OutputFormat::Json, 12).unwrap();
        let doc: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(doc, json!({"slice_id": 12, "status": "DELETED"}));
    }
}
