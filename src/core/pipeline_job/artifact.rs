use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

const CUSTOM_PROPERTIES: &str = "custom_properties";

/// Artifact type tag understood by the pipelines backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    File,
    Dataset,
    Statistics,
    Schema,
    Model,
    Metrics,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::File => "file",
            ArtifactKind::Dataset => "dataset",
            ArtifactKind::Statistics => "statistics",
            ArtifactKind::Schema => "schema",
            ArtifactKind::Model => "model",
            ArtifactKind::Metrics => "metrics",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "file" => Ok(ArtifactKind::File),
            "dataset" => Ok(ArtifactKind::Dataset),
            "statistics" => Ok(ArtifactKind::Statistics),
            "schema" => Ok(ArtifactKind::Schema),
            "model" => Ok(ArtifactKind::Model),
            "metrics" => Ok(ArtifactKind::Metrics),
            other => Err(format!("unknown artifact kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PropertyValue {
    pub string_value: String,
}

impl PropertyValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: value.into(),
        }
    }
}

/// Output artifact descriptor.
///
/// On the wire the kind is the name of an empty object next to the
/// properties: `{"model": {}, "custom_properties": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ArtifactSpec {
    pub kind: ArtifactKind,
    pub custom_properties: IndexMap<String, PropertyValue>,
}

impl From<ArtifactSpec> for Map<String, Value> {
    fn from(spec: ArtifactSpec) -> Self {
        let mut map = Map::new();
        map.insert(spec.kind.as_str().to_string(), Value::Object(Map::new()));
        let properties = spec
            .custom_properties
            .into_iter()
            .map(|(key, value)| {
                (
                    key,
                    serde_json::json!({ "string_value": value.string_value }),
                )
            })
            .collect();
        map.insert(CUSTOM_PROPERTIES.to_string(), Value::Object(properties));
        map
    }
}

impl TryFrom<Map<String, Value>> for ArtifactSpec {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let custom_properties = match map.remove(CUSTOM_PROPERTIES) {
            Some(value) => serde_json::from_value(value)
                .map_err(|err| format!("invalid artifact custom_properties: {}", err))?,
            None => IndexMap::new(),
        };
        let mut keys = map.keys();
        let kind = match (keys.next(), keys.next()) {
            (Some(kind), None) => kind.parse()?,
            (None, _) => return Err("artifact has no kind".to_string()),
            (Some(_), Some(_)) => return Err("artifact has more than one kind".to_string()),
        };
        Ok(Self {
            kind,
            custom_properties,
        })
    }
}
