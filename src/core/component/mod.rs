//! Kubeflow Pipelines component documents: the task graphs this crate translates.
//!
//! A component is either a single container invocation or a graph of tasks,
//! each task referencing another (embedded) component and binding its inputs
//! to constants, graph inputs or outputs of sibling tasks.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while reading a component document from disk.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("failed to read component {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse component {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Root of a component document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputSpec>,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub implementation: Implementation,
}

impl ComponentSpec {
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|output| output.name == name)
    }
}

/// Declared component input.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<Value>,
    #[serde(
        default,
        deserialize_with = "deserialize_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Declared component output.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OutputSpec {
    /// Printable type name; structured types render as compact JSON.
    pub fn type_name(&self) -> Option<String> {
        self.type_spec.as_ref().map(type_name)
    }
}

pub fn type_name(value: &Value) -> String {
    match value {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

/// How a component is implemented.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Implementation {
    Container(ContainerImplementation),
    Graph(GraphSpec),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContainerImplementation {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<CommandLineItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<CommandLineItem>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,
}

/// One element of a container command line.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CommandLineItem {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Placeholder {
    InputValue(String),
    InputPath(String),
    OutputPath(String),
    Concat(Vec<CommandLineItem>),
    If(Box<IfPlaceholder>),
    IsPresent(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IfPlaceholder {
    pub cond: IfCondition,
    #[serde(default)]
    pub then: Vec<CommandLineItem>,
    #[serde(rename = "else", default, skip_serializing_if = "Vec::is_empty")]
    pub otherwise: Vec<CommandLineItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum IfCondition {
    Bool(bool),
    Item(CommandLineItem),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSpec {
    #[serde(default)]
    pub tasks: IndexMap<String, TaskSpec>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output_values: IndexMap<String, Argument>,
}

/// A component invocation inside a graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub component_ref: ComponentReference,
    #[serde(default)]
    pub arguments: IndexMap<String, Argument>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ComponentReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Box<ComponentSpec>>,
}

/// Argument passed to a task input.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Argument {
    Constant(String),
    GraphInput {
        #[serde(rename = "graphInput")]
        graph_input: GraphInputArgument,
    },
    TaskOutput {
        #[serde(rename = "taskOutput")]
        task_output: TaskOutputArgument,
    },
    /// Anything else; rejected during translation.
    Unsupported(Value),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphInputArgument {
    pub input_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputArgument {
    pub task_id: String,
    pub output_name: String,
}

/// Load a component document (YAML or JSON) from disk.
pub fn load_component(path: &Path) -> Result<ComponentSpec, ComponentError> {
    let content = fs::read_to_string(path).map_err(|source| ComponentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_component(&content).map_err(|source| ComponentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a component document from text. JSON parses as YAML.
pub fn parse_component(content: &str) -> Result<ComponentSpec, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

fn deserialize_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "input default must be a scalar, got {}",
            other
        ))),
    }
}
