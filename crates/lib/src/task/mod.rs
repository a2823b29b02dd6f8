//! Task registry.
//!
//! Tasks are declared as `(name, description, prerequisites, action)` records
//! and validated once. Dispatch asks the registry for a plan, the ordered
//! list of tasks a run must execute.

mod dag;
pub mod project;
pub mod types;

use std::collections::HashMap;

use crate::util::suggest::suggest_similar;

pub use types::{Action, CommandTemplate, FanOut, RegistryError, RenderedCommand, TaskDef, TaskSummary};

/// A validated, acyclic set of tasks.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
  tasks: Vec<TaskDef>,
  index: HashMap<String, usize>,
}

impl TaskRegistry {
  /// Build a registry, rejecting duplicates, dangling prerequisites,
  /// nested fan-out and cycles.
  pub fn new(tasks: Vec<TaskDef>) -> Result<Self, RegistryError> {
    let mut index = HashMap::new();
    for (i, task) in tasks.iter().enumerate() {
      if index.insert(task.name.clone(), i).is_some() {
        return Err(RegistryError::Duplicate(task.name.clone()));
      }
    }

    dag::validate(&tasks, &index)?;

    Ok(Self { tasks, index })
  }

  pub fn get(&self, name: &str) -> Option<&TaskDef> {
    self.index.get(name).map(|&i| &self.tasks[i])
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  /// Task names in declaration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.tasks.iter().map(|t| t.name.as_str())
  }

  /// Closest declared name to an unknown one.
  pub fn suggest(&self, name: &str) -> Option<String> {
    suggest_similar(name, self.names())
  }

  /// Tasks to execute for `name`, prerequisites first, each once.
  ///
  /// Returns `None` for an undeclared task.
  pub fn plan(&self, name: &str) -> Option<Vec<&TaskDef>> {
    if !self.contains(name) {
      return None;
    }
    Some(
      dag::post_order(&self.tasks, &self.index, name)
        .into_iter()
        .map(|i| &self.tasks[i])
        .collect(),
    )
  }

  /// The introspection view: every declared task in declaration order.
  ///
  /// Reads metadata only.
  pub fn list_tasks(&self) -> Vec<TaskSummary> {
    self
      .tasks
      .iter()
      .map(|t| TaskSummary {
        name: t.name.clone(),
        description: t.description.clone(),
        prerequisites: t.prerequisites.clone(),
      })
      .collect()
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }
}
