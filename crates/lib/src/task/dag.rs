//! Prerequisite graph validation and planning.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::{Action, RegistryError, TaskDef};

/// Check that every edge points at a declared task, that fan-out never nests,
/// and that the graph is acyclic.
///
/// A fan-out task gets an edge from its target as well as from its
/// prerequisites, so a target that depends back on its fan-out is a cycle.
pub(crate) fn validate(tasks: &[TaskDef], index: &HashMap<String, usize>) -> Result<(), RegistryError> {
  let mut graph: DiGraph<&str, ()> = DiGraph::new();
  let nodes: Vec<NodeIndex> = tasks.iter().map(|t| graph.add_node(t.name.as_str())).collect();

  for (i, task) in tasks.iter().enumerate() {
    for prerequisite in &task.prerequisites {
      let &dep = index.get(prerequisite).ok_or_else(|| RegistryError::UnknownPrerequisite {
        task: task.name.clone(),
        prerequisite: prerequisite.clone(),
      })?;
      graph.add_edge(nodes[dep], nodes[i], ());
    }

    if let Action::FanOut(fan_out) = &task.action {
      let &target = index.get(&fan_out.task).ok_or_else(|| RegistryError::UnknownFanOutTarget {
        task: task.name.clone(),
        target: fan_out.task.clone(),
      })?;
      graph.add_edge(nodes[target], nodes[i], ());
    }
  }

  toposort(&graph, None).map_err(|cycle| RegistryError::Cycle(graph[cycle.node_id()].to_string()))?;

  for task in tasks {
    if let Action::FanOut(fan_out) = &task.action {
      let reachable = post_order(tasks, index, &fan_out.task);
      if let Some(nested) = reachable.iter().find(|&&i| matches!(tasks[i].action, Action::FanOut(_))) {
        return Err(RegistryError::NestedFanOut {
          task: task.name.clone(),
          target: fan_out.task.clone(),
          nested: tasks[*nested].name.clone(),
        });
      }
    }
  }

  Ok(())
}

/// Depth-first post-order of `root` and everything it requires.
///
/// Prerequisites are visited in declaration order and every task appears
/// once, so a diamond-shaped dependency runs its shared task only once.
/// Expects a validated, acyclic graph.
pub(crate) fn post_order(tasks: &[TaskDef], index: &HashMap<String, usize>, root: &str) -> Vec<usize> {
  fn visit(
    tasks: &[TaskDef],
    index: &HashMap<String, usize>,
    i: usize,
    seen: &mut HashSet<usize>,
    order: &mut Vec<usize>,
  ) {
    if !seen.insert(i) {
      return;
    }
    for prerequisite in &tasks[i].prerequisites {
      if let Some(&dep) = index.get(prerequisite) {
        visit(tasks, index, dep, seen, order);
      }
    }
    order.push(i);
  }

  let mut order = Vec::new();
  if let Some(&root) = index.get(root) {
    visit(tasks, index, root, &mut HashSet::new(), &mut order);
  }
  order
}
