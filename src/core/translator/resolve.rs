//! Placeholder expansion for container command lines.

use super::{ArgumentBinding, TranslateError};
use crate::core::component::{
    CommandLineItem, ComponentSpec, ContainerImplementation, IfCondition, Placeholder,
};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

const INPUTS_DIR: &str = "/tmp/inputs";
const OUTPUTS_DIR: &str = "/tmp/outputs";

/// Command line of one task with its placeholders expanded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCommandLine {
    pub command: Vec<String>,
    pub args: Vec<String>,
    /// Input name to local path, for inputs consumed through `inputPath`.
    pub input_paths: IndexMap<String, String>,
    /// Output name to local path, for outputs produced through `outputPath`.
    pub output_paths: IndexMap<String, String>,
}

impl ResolvedCommandLine {
    pub fn full_command_line(&self) -> Vec<String> {
        self.command.iter().chain(self.args.iter()).cloned().collect()
    }
}

/// Expand every placeholder of `container` using the task's argument bindings.
///
/// Inputs without an argument fall back to their declared default; optional
/// inputs without either expand to nothing.
pub fn resolve_command_line(
    task_id: &str,
    spec: &ComponentSpec,
    container: &ContainerImplementation,
    arguments: &IndexMap<String, ArgumentBinding>,
) -> Result<ResolvedCommandLine, TranslateError> {
    for name in arguments.keys() {
        if spec.input(name).is_none() {
            return Err(TranslateError::UnknownInput {
                task: task_id.to_string(),
                input: name.clone(),
            });
        }
    }

    let mut bindings = IndexMap::new();
    for input in &spec.inputs {
        let binding = arguments
            .get(&input.name)
            .cloned()
            .or_else(|| input.default.clone().map(ArgumentBinding::Constant));
        if binding.is_none() && !input.optional {
            return Err(TranslateError::MissingRequiredInput {
                task: task_id.to_string(),
                input: input.name.clone(),
            });
        }
        bindings.insert(input.name.clone(), binding);
    }

    let mut resolver = Resolver {
        task_id,
        spec,
        bindings,
        input_paths: IndexMap::new(),
        output_paths: IndexMap::new(),
    };
    let command = resolver.expand_list(&container.command)?;
    let args = resolver.expand_list(&container.args)?;

    Ok(ResolvedCommandLine {
        command,
        args,
        input_paths: resolver.input_paths,
        output_paths: resolver.output_paths,
    })
}

/// Local path for an input artifact.
pub fn input_path(input_name: &str) -> String {
    format!("{}/{}/data", INPUTS_DIR, sanitize_file_name(input_name))
}

/// Local path for an output artifact.
pub fn output_path(output_name: &str) -> String {
    format!("{}/{}/data", OUTPUTS_DIR, sanitize_file_name(output_name))
}

fn sanitize_file_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let pattern =
        UNSAFE.get_or_init(|| Regex::new(r"[^-_.0-9a-zA-Z]+").expect("valid file name pattern"));
    pattern.replace_all(name, "_").into_owned()
}

/// Record `name` at `path`; two names sanitized to one path would share a file.
fn claim_path(
    task_id: &str,
    paths: &mut IndexMap<String, String>,
    name: &str,
    path: &str,
) -> Result<(), TranslateError> {
    if let Some((other, _)) = paths
        .iter()
        .find(|(other, existing)| other.as_str() != name && existing.as_str() == path)
    {
        return Err(TranslateError::ConflictingLocalPath {
            task: task_id.to_string(),
            first: other.clone(),
            second: name.to_string(),
            path: path.to_string(),
        });
    }
    paths.insert(name.to_string(), path.to_string());
    Ok(())
}

struct Resolver<'a> {
    task_id: &'a str,
    spec: &'a ComponentSpec,
    bindings: IndexMap<String, Option<ArgumentBinding>>,
    input_paths: IndexMap<String, String>,
    output_paths: IndexMap<String, String>,
}

impl Resolver<'_> {
    fn expand_list(&mut self, items: &[CommandLineItem]) -> Result<Vec<String>, TranslateError> {
        let mut out = Vec::new();
        for item in items {
            out.extend(self.expand(item)?);
        }
        Ok(out)
    }

    /// Zero strings for an absent optional input, several for an `if` branch.
    fn expand(&mut self, item: &CommandLineItem) -> Result<Vec<String>, TranslateError> {
        let placeholder = match item {
            CommandLineItem::Literal(text) => return Ok(vec![text.clone()]),
            CommandLineItem::Placeholder(placeholder) => placeholder,
        };

        match placeholder {
            Placeholder::InputValue(name) => match self.binding(name)? {
                None => Ok(Vec::new()),
                Some(ArgumentBinding::Constant(value)) => Ok(vec![value]),
                Some(ArgumentBinding::Reference(_)) => Err(TranslateError::ReferenceAsValue {
                    task: self.task_id.to_string(),
                    input: name.clone(),
                }),
            },
            Placeholder::InputPath(name) => match self.binding(name)? {
                None => Ok(Vec::new()),
                Some(ArgumentBinding::Reference(_)) => {
                    let path = input_path(name);
                    claim_path(self.task_id, &mut self.input_paths, name, &path)?;
                    Ok(vec![path])
                }
                Some(ArgumentBinding::Constant(_)) => Err(TranslateError::ConstantAsPath {
                    task: self.task_id.to_string(),
                    input: name.clone(),
                }),
            },
            Placeholder::OutputPath(name) => {
                if self.spec.output(name).is_none() {
                    return Err(TranslateError::UndeclaredOutput {
                        task: self.task_id.to_string(),
                        output: name.clone(),
                    });
                }
                let path = output_path(name);
                claim_path(self.task_id, &mut self.output_paths, name, &path)?;
                Ok(vec![path])
            }
            Placeholder::Concat(parts) => {
                let joined = self.expand_list(parts)?.concat();
                Ok(vec![joined])
            }
            Placeholder::IsPresent(name) => {
                let present = self.binding(name)?.is_some();
                Ok(vec![present.to_string()])
            }
            Placeholder::If(branch) => {
                let chosen = if self.condition(&branch.cond)? {
                    &branch.then
                } else {
                    &branch.otherwise
                };
                self.expand_list(chosen)
            }
        }
    }

    fn condition(&mut self, cond: &IfCondition) -> Result<bool, TranslateError> {
        match cond {
            IfCondition::Bool(value) => Ok(*value),
            IfCondition::Item(item) => {
                let text = self.expand(item)?.concat();
                Ok(text.trim().eq_ignore_ascii_case("true"))
            }
        }
    }

    fn binding(&self, name: &str) -> Result<Option<ArgumentBinding>, TranslateError> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| TranslateError::UndeclaredInput {
                task: self.task_id.to_string(),
                input: name.to_string(),
            })
    }
}
