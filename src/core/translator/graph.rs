//! Dependency analysis for graph components.

use super::TranslateError;
use crate::core::component::{Argument, GraphSpec};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Check every `taskOutput` reference and return the task ids in an order
/// where producers precede consumers. Independent tasks keep document order.
pub fn execution_order(graph: &GraphSpec) -> Result<Vec<String>, TranslateError> {
    let mut dependencies: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for task_id in graph.tasks.keys() {
        nodes.insert(task_id.as_str(), dependencies.add_node(task_id.as_str()));
    }

    for (task_id, task) in &graph.tasks {
        for argument in task.arguments.values() {
            let Argument::TaskOutput { task_output } = argument else {
                continue;
            };
            let Some(producer) = graph.tasks.get(&task_output.task_id) else {
                return Err(TranslateError::UnknownTaskReference {
                    task: task_id.clone(),
                    referenced: task_output.task_id.clone(),
                });
            };
            let producer_spec = producer.component_ref.spec.as_deref().ok_or_else(|| {
                TranslateError::MissingComponentSpec {
                    task: task_output.task_id.clone(),
                }
            })?;
            if producer_spec.output(&task_output.output_name).is_none() {
                return Err(TranslateError::UnknownOutputReference {
                    task: task_id.clone(),
                    referenced: task_output.task_id.clone(),
                    output: task_output.output_name.clone(),
                });
            }
            dependencies.update_edge(
                nodes[task_output.task_id.as_str()],
                nodes[task_id.as_str()],
                (),
            );
        }
    }

    for component in tarjan_scc(&dependencies) {
        let node = component[0];
        if component.len() > 1 || dependencies.contains_edge(node, node) {
            let mut members: Vec<NodeIndex> = component;
            members.sort();
            return Err(TranslateError::Cycle {
                task: dependencies[members[0]].to_string(),
            });
        }
    }

    // Kahn's algorithm; node indices follow document order.
    let mut pending: Vec<usize> = dependencies
        .node_indices()
        .map(|node| {
            dependencies
                .neighbors_directed(node, Direction::Incoming)
                .count()
        })
        .collect();
    let mut ready: BinaryHeap<Reverse<NodeIndex>> = dependencies
        .node_indices()
        .filter(|node| pending[node.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(dependencies.node_count());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(dependencies[node].to_string());
        for consumer in dependencies.neighbors_directed(node, Direction::Outgoing) {
            pending[consumer.index()] -= 1;
            if pending[consumer.index()] == 0 {
                ready.push(Reverse(consumer));
            }
        }
    }
    Ok(order)
}
