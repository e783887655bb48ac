//! Translation of component task graphs into managed-pipeline job documents.
//!
//! Only flat graphs are supported: the root component must be a graph whose
//! tasks are all container components. Each task becomes one step whose
//! command line stages its artifacts through cloud storage.

mod artifacts;
mod command_line;
mod graph;
mod resolve;

pub use artifacts::{artifact_for_output, artifact_kind};
pub use command_line::{generate_command_line, input_uri_placeholder, output_uri_placeholder};
pub use graph::execution_order;
pub use resolve::{input_path, output_path, resolve_command_line, ResolvedCommandLine};

use crate::core::component::{Argument, ComponentSpec, GraphSpec, Implementation};
use crate::core::pipeline_job::{
    ContainerSpec, OutputPathConfig, OutputUriConfig, PipelineJob, PipelineSpec, Step, StepInput,
    StepOutput, StepOutputReference, StepTask, DEFAULT_DISPLAY_NAME, UNNAMED_JOB,
};
use crate::core::types::StagingTool;
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub const DEFAULT_PIPELINE_CONTEXT: &str = "Default";

/// Value bound to a task input after graph inputs are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentBinding {
    /// Literal string, inlined into the command line.
    Constant(String),
    /// Output artifact of another step, staged by path.
    Reference(StepOutputReference),
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("pipeline argument '{name}' must be a string, got {value}")]
    NonStringArgument { name: String, value: Value },
    #[error("the root component must be a graph component")]
    UnsupportedRoot,
    #[error("task '{task}' uses a graph component; only container tasks are supported")]
    UnsupportedTaskKind { task: String },
    #[error("task '{task}' has no embedded component spec")]
    MissingComponentSpec { task: String },
    #[error("task '{task}' binds input '{input}' to an unsupported argument: {value}")]
    UnsupportedArgument {
        task: String,
        input: String,
        value: Value,
    },
    #[error(
        "task '{task}' input '{input}' needs pipeline input '{graph_input}', which has no argument or default"
    )]
    MissingGraphArgument {
        task: String,
        input: String,
        graph_input: String,
    },
    #[error("task '{task}' references unknown task '{referenced}'")]
    UnknownTaskReference { task: String, referenced: String },
    #[error("task '{task}' references output '{output}' which task '{referenced}' does not declare")]
    UnknownOutputReference {
        task: String,
        referenced: String,
        output: String,
    },
    #[error("task dependencies form a cycle through '{task}'")]
    Cycle { task: String },
    #[error("task '{task}' passes an argument for unknown input '{input}'")]
    UnknownInput { task: String, input: String },
    #[error("task '{task}' is missing required input '{input}'")]
    MissingRequiredInput { task: String, input: String },
    #[error("task '{task}' uses a task output as the value of input '{input}'; use inputPath")]
    ReferenceAsValue { task: String, input: String },
    #[error("task '{task}' reads input '{input}' as a path but binds it to a constant")]
    ConstantAsPath { task: String, input: String },
    #[error("task '{task}' writes to undeclared output '{output}'")]
    UndeclaredOutput { task: String, output: String },
    #[error("task '{task}' command line refers to undeclared input '{input}'")]
    UndeclaredInput { task: String, input: String },
    #[error("task '{task}' maps '{first}' and '{second}' to the same local path {path}")]
    ConflictingLocalPath {
        task: String,
        first: String,
        second: String,
        path: String,
    },
}

/// Job-level settings that are not part of the component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub pipeline_root: String,
    pub pipeline_context: String,
    pub staging_tool: StagingTool,
}

impl CompileOptions {
    pub fn new(pipeline_root: impl Into<String>) -> Self {
        Self {
            pipeline_root: pipeline_root.into(),
            pipeline_context: DEFAULT_PIPELINE_CONTEXT.to_string(),
            staging_tool: StagingTool::default(),
        }
    }
}

/// Translate a graph component and its top-level arguments into a job
/// document. The job name stays a placeholder until submission.
pub fn compile_pipeline(
    component: &ComponentSpec,
    arguments: &IndexMap<String, Value>,
    options: &CompileOptions,
) -> Result<PipelineJob, TranslateError> {
    let mut root_arguments = IndexMap::new();
    for (name, value) in arguments {
        match value {
            Value::String(text) => {
                root_arguments.insert(name.clone(), text.clone());
            }
            other => {
                return Err(TranslateError::NonStringArgument {
                    name: name.clone(),
                    value: other.clone(),
                })
            }
        }
        if component.input(name).is_none() {
            tracing::warn!(argument = %name, "pipeline argument does not match any declared input");
        }
    }

    let Implementation::Graph(graph) = &component.implementation else {
        return Err(TranslateError::UnsupportedRoot);
    };

    let steps = compile_steps(component, graph, &root_arguments, options.staging_tool)?;
    tracing::debug!(steps = steps.len(), "compiled pipeline steps");

    Ok(PipelineJob {
        name: UNNAMED_JOB.to_string(),
        display_name: component
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        spec: PipelineSpec {
            steps,
            pipeline_context: Some(options.pipeline_context.clone()),
            extra: Map::new(),
        },
        output_path_config: OutputPathConfig {
            pipeline_root: options.pipeline_root.clone(),
        },
        extra: Map::new(),
    })
}

fn compile_steps(
    root: &ComponentSpec,
    graph: &GraphSpec,
    root_arguments: &IndexMap<String, String>,
    staging_tool: StagingTool,
) -> Result<IndexMap<String, Step>, TranslateError> {
    let mut steps = IndexMap::new();

    for task_id in execution_order(graph)? {
        let task = &graph.tasks[&task_id];
        let spec = task.component_ref.spec.as_deref().ok_or_else(|| {
            TranslateError::MissingComponentSpec {
                task: task_id.clone(),
            }
        })?;
        let Implementation::Container(container) = &spec.implementation else {
            return Err(TranslateError::UnsupportedTaskKind { task: task_id });
        };

        let mut bindings = IndexMap::new();
        let mut inputs = IndexMap::new();
        for (input_name, argument) in &task.arguments {
            let binding = match argument {
                Argument::Constant(value) => ArgumentBinding::Constant(value.clone()),
                Argument::GraphInput { graph_input } => {
                    let value = root_arguments
                        .get(&graph_input.input_name)
                        .cloned()
                        .or_else(|| {
                            root.input(&graph_input.input_name)
                                .and_then(|input| input.default.clone())
                        })
                        .ok_or_else(|| TranslateError::MissingGraphArgument {
                            task: task_id.clone(),
                            input: input_name.clone(),
                            graph_input: graph_input.input_name.clone(),
                        })?;
                    ArgumentBinding::Constant(value)
                }
                Argument::TaskOutput { task_output } => {
                    let reference = StepOutputReference {
                        step: task_output.task_id.clone(),
                        output: task_output.output_name.clone(),
                    };
                    inputs.insert(
                        input_name.clone(),
                        StepInput {
                            step_output: reference.clone(),
                        },
                    );
                    ArgumentBinding::Reference(reference)
                }
                Argument::Unsupported(value) => {
                    return Err(TranslateError::UnsupportedArgument {
                        task: task_id.clone(),
                        input: input_name.clone(),
                        value: value.clone(),
                    })
                }
            };
            bindings.insert(input_name.clone(), binding);
        }

        let resolved = resolve_command_line(&task_id, spec, container, &bindings)?;
        let input_path_uris: IndexMap<String, String> = resolved
            .input_paths
            .iter()
            .map(|(name, path)| (path.clone(), input_uri_placeholder(name)))
            .collect();
        let output_path_uris: IndexMap<String, String> = resolved
            .output_paths
            .iter()
            .map(|(name, path)| (path.clone(), output_uri_placeholder(name)))
            .collect();
        let command = generate_command_line(
            &resolved.full_command_line(),
            &input_path_uris,
            &output_path_uris,
            staging_tool,
        );

        if !container.env.is_empty() {
            tracing::warn!(
                task = %task_id,
                variables = container.env.len(),
                "container environment variables are not forwarded to pipeline steps"
            );
        }

        let outputs = spec
            .outputs
            .iter()
            .map(|output| {
                (
                    output.name.clone(),
                    StepOutput {
                        artifact: artifact_for_output(output),
                        output_uri_config: OutputUriConfig { file_path: true },
                    },
                )
            })
            .collect();

        steps.insert(
            task_id,
            Step {
                task: StepTask {
                    container: ContainerSpec {
                        image: container.image.clone(),
                        command,
                        extra: Map::new(),
                    },
                    inputs,
                    outputs,
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
        );
    }

    Ok(steps)
}
