use crate::core::component::OutputSpec;
use crate::core::pipeline_job::{ArtifactKind, ArtifactSpec, PropertyValue};
use indexmap::IndexMap;

/// Infer the artifact kind from an output type name. Later rules win, so
/// `ExampleStatistics` is statistics rather than a dataset.
pub fn artifact_kind(type_name: Option<&str>) -> ArtifactKind {
    let Some(type_name) = type_name else {
        return ArtifactKind::File;
    };
    let lowered = type_name.to_lowercase();
    let mut kind = ArtifactKind::File;
    if lowered.ends_with("examples") || lowered == "csv" || lowered == "tsv" {
        kind = ArtifactKind::Dataset;
    }
    if lowered.ends_with("statistics") {
        kind = ArtifactKind::Statistics;
    }
    if lowered.ends_with("schema") {
        kind = ArtifactKind::Schema;
    }
    if lowered.ends_with("model") {
        kind = ArtifactKind::Model;
    }
    if lowered.ends_with("metrics") {
        kind = ArtifactKind::Metrics;
    }
    kind
}

pub fn artifact_for_output(output: &OutputSpec) -> ArtifactSpec {
    let type_name = output.type_name();
    let mut custom_properties = IndexMap::from([(
        "custom:name".to_string(),
        PropertyValue::string(output.name.clone()),
    )]);
    if let Some(ref type_name) = type_name {
        custom_properties.insert(
            "type_name".to_string(),
            PropertyValue::string(type_name.clone()),
        );
    }
    ArtifactSpec {
        kind: artifact_kind(type_name.as_deref()),
        custom_properties,
    }
}
