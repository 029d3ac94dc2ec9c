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

//! Request and response records for the project and WiFi slice endpoints.
//!
//! Every body the controller returns is decoded into one of these types, so a
//! response with an unexpected shape fails at decode time with a typed error.

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Protocol version sent with every slice upsert.
pub const API_VERSION: &str = "1.0";

/// Slice properties in the order the server (or the command line) gave them.
pub type Properties = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Kept exactly as the server spelled it.
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_props: Option<WifiProps>,
}

impl Project {
    /// SSID of the project, if WiFi properties are configured.
    pub fn ssid(&self) -> Option<&str> {
        self.wifi_props.as_ref().and_then(|p| p.ssid.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub slice_id: u32,
    #[serde(default)]
    pub properties: Properties,
}

/// Body of `POST /api/v1/projects/{project_id}/wifi_slices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceUpsertRequest {
    pub version: &'static str,
    pub slice_id: u32,
    /// Omitted when empty so the server applies its own defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl SliceUpsertRequest {
    pub fn new(slice_id: u32, properties: Properties) -> Self {
        Self {
            version: API_VERSION,
            slice_id,
            properties: (!properties.is_empty()).then_some(properties),
        }
    }
}

/// The slices of a project.
///
/// The controller returns an object keyed by slice id; a plain array of
/// slices is accepted as well. Server order is kept either way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SliceCollection(Vec<Slice>);

impl SliceCollection {
    pub fn as_slice(&self) -> &[Slice] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SliceCollection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SliceCollectionVisitor)
    }
}

struct SliceCollectionVisitor;

impl<'de> Visitor<'de> for SliceCollectionVisitor {
    type Value = SliceCollection;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of slice id to slice, or a list of slices")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut slices = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((_, slice)) = map.next_entry::<String, Slice>()? {
            slices.push(slice);
        }
        Ok(SliceCollection(slices))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut slices = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(slice) = seq.next_element::<Slice>()? {
            slices.push(slice);
        }
        Ok(SliceCollection(slices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_without_wifi_props_has_no_ssid() {
        let missing: Project =
            serde_json::from_value(json!({"project_id": "3ec1e9a4-8b8e-4cf4-9fb1-2f3c4a0f5d10"}))
                .unwrap();
        assert_eq!(missing.ssid(), None);

        let null: Project = serde_json::from_value(json!({
            "project_id": "3ec1e9a4-8b8e-4cf4-9fb1-2f3c4a0f5d10",
            "wifi_props": null,
        }))
        .unwrap();
        assert_eq!(null.ssid(), None);

        let empty: Project = serde_json::from_value(json!({
            "project_id": "3ec1e9a4-8b8e-4cf4-9fb1-2f3c4a0f5d10",
            "wifi_props": {},
            "desc": "ignored",
        }))
        .unwrap();
        assert_eq!(empty.ssid(), None);
    }

    #[test]
    fn project_reports_ssid() {
        let project: Project = serde_json::from_value(json!({
            "project_id": "3ec1e9a4-8b8e-4cf4-9fb1-2f3c4a0f5d10",
            "wifi_props": {"ssid": "lab-net", "bssid_type": "unique"},
        }))
        .unwrap();
        assert_eq!(project.ssid(), Some("lab-net"));
    }

    #[test]
    fn project_requires_an_id() {
        assert!(serde_json::from_value::<Project>(json!({"wifi_props": null})).is_err());
        assert!(serde_json::from_value::<Project>(json!({"project_id": 7})).is_err());
    }

    #[test]
    fn project_id_is_kept_verbatim() {
        let upper: Project =
            serde_json::from_value(json!({"project_id": "3EC1E9A48B8E4CF49FB12F3C4A0F5D10"}))
                .unwrap();
        assert_eq!(upper.project_id, "3EC1E9A48B8E4CF49FB12F3C4A0F5D10");

        let plain: Project = serde_json::from_value(json!({"project_id": "lab"})).unwrap();
        assert_eq!(plain.project_id, "lab");
    }

    #[test]
    fn keyed_collection_keeps_server_order() {
        let body = r#"{
            "7": {"slice_id": 7, "properties": {"quantum": "12000", "sta_scheduler": "1"}},
            "0": {"slice_id": 0, "properties": {}},
            "3": {"slice_id": 3}
        }"#;
        let slices: SliceCollection = serde_json::from_str(body).unwrap();
        let ids: Vec<u32> = slices.as_slice().iter().map(|s| s.slice_id).collect();
        assert_eq!(ids, vec![7, 0, 3]);

        let keys: Vec<&str> = slices.as_slice()[0]
            .properties
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["quantum", "sta_scheduler"]);
        assert!(slices.as_slice()[2].properties.is_empty());
    }

    #[test]
    fn collection_accepts_a_list() {
        let slices: SliceCollection =
            serde_json::from_value(json!([{"slice_id": 1}, {"slice_id": 2}])).unwrap();
        assert_eq!(slices.as_slice().len(), 2);
    }

    #[test]
    fn collection_rejects_malformed_slices() {
        assert!(
            serde_json::from_value::<SliceCollection>(json!({"1": {"slice_id": "one"}})).is_err()
        );
        assert!(serde_json::from_value::<SliceCollection>(json!("slices")).is_err());
    }

    #[test]
    fn upsert_request_omits_empty_properties() {
        let bare = SliceUpsertRequest::new(4, Properties::new());
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({"version": "1.0", "slice_id": 4})
        );

        let mut props = Properties::new();
        props.insert("amsdu_aggregation".into(), Value::String("true".into()));
        let full = SliceUpsertRequest::new(4, props);
        assert_eq!(
            serde_json::to_value(&full).unwrap(),
            json!({"version": "1.0", "slice_id": 4, "properties": {"amsdu_aggregation": "true"}})
        );
    }
}
