//! Target graph for dependency ordering.
//!
//! The graph owns every [`BuildTarget`] and the "depends on" edges between
//! them. Edges point from a dependent to its dependency. Targets refer to each
//! other only by name; the graph is the single source of truth for ordering.

use std::collections::HashMap;
use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::target::BuildTarget;

/// Errors raised while building or ordering the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("duplicate target: {0}")]
  DuplicateTarget(String),

  #[error("unknown target: {0}")]
  UnknownTarget(String),

  #[error("dependency cycle detected: {0}")]
  CyclicDependency(Cycle),
}

/// Members of a dependency cycle, in the order the traversal discovered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(pub Vec<String>);

impl fmt::Display for Cycle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for name in &self.0 {
      write!(f, "{name} -> ")?;
    }
    // close the loop back to where it was entered
    match self.0.first() {
      Some(first) => write!(f, "{first}"),
      None => Ok(()),
    }
  }
}

/// Traversal state for the three-color depth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

/// All targets of a build and the dependency edges between them.
#[derive(Debug, Default, Clone)]
pub struct TargetGraph {
  graph: DiGraph<BuildTarget, ()>,
  nodes: HashMap<String, NodeIndex>,
}

impl TargetGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a target.
  ///
  /// # Errors
  ///
  /// Returns `DuplicateTarget` if a target with the same name is registered.
  pub fn add_target(&mut self, target: BuildTarget) -> Result<(), GraphError> {
    if self.nodes.contains_key(target.name()) {
      return Err(GraphError::DuplicateTarget(target.name().to_string()));
    }

    let name = target.name().to_string();
    let idx = self.graph.add_node(target);
    self.nodes.insert(name, idx);
    Ok(())
  }

  /// Record that `from` depends on `to`. Repeated edges are recorded once.
  ///
  /// # Errors
  ///
  /// Returns `UnknownTarget` naming whichever endpoint is not registered.
  pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
    let from_idx = self.index(from)?;
    let to_idx = self.index(to)?;
    self.graph.update_edge(from_idx, to_idx, ());
    Ok(())
  }

  /// Targets in an order where every target follows all of its dependencies.
  ///
  /// Roots and dependencies are both visited in registration order, so the
  /// result is identical across calls for the same registration sequence.
  ///
  /// # Errors
  ///
  /// Returns `CyclicDependency` with the cycle members if the edges are not
  /// acyclic.
  pub fn topological_order(&self) -> Result<Vec<&BuildTarget>, GraphError> {
    let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
    let mut order = Vec::with_capacity(self.graph.node_count());

    for idx in self.graph.node_indices() {
      self.visit(idx, &mut marks, &mut order)?;
    }

    Ok(order.into_iter().map(|idx| &self.graph[idx]).collect())
  }

  /// Check the graph for cycles without keeping the order.
  pub fn validate(&self) -> Result<(), GraphError> {
    self.topological_order().map(|_| ())
  }

  /// Depth-first search from `root` with an explicit stack, so chain length
  /// is bounded by the heap rather than the thread stack. Each frame holds a
  /// node's dependencies and a cursor into them; the frames form the current
  /// path.
  fn visit(&self, root: NodeIndex, marks: &mut [Mark], order: &mut Vec<NodeIndex>) -> Result<(), GraphError> {
    if marks[root.index()] != Mark::Unvisited {
      return Ok(());
    }

    marks[root.index()] = Mark::InProgress;
    let mut stack = vec![(root, self.sorted_neighbors(root, Direction::Outgoing), 0usize)];

    while let Some((idx, deps, cursor)) = stack.last_mut() {
      let Some(&dep) = deps.get(*cursor) else {
        marks[idx.index()] = Mark::Done;
        order.push(*idx);
        stack.pop();
        continue;
      };
      *cursor += 1;

      match marks[dep.index()] {
        Mark::Done => {}
        Mark::InProgress => {
          // every in-progress node has a frame on the stack
          let start = stack.iter().position(|(p, _, _)| *p == dep).unwrap_or(0);
          let members = stack[start..]
            .iter()
            .map(|(p, _, _)| self.graph[*p].name().to_string())
            .collect();
          return Err(GraphError::CyclicDependency(Cycle(members)));
        }
        Mark::Unvisited => {
          marks[dep.index()] = Mark::InProgress;
          stack.push((dep, self.sorted_neighbors(dep, Direction::Outgoing), 0));
        }
      }
    }

    Ok(())
  }

  /// Neighbors in registration order. petgraph yields them newest edge first.
  fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
    neighbors.sort_unstable();
    neighbors
  }

  fn index(&self, name: &str) -> Result<NodeIndex, GraphError> {
    self
      .nodes
      .get(name)
      .copied()
      .ok_or_else(|| GraphError::UnknownTarget(name.to_string()))
  }

  pub fn get(&self, name: &str) -> Option<&BuildTarget> {
    self.nodes.get(name).map(|&idx| &self.graph[idx])
  }

  pub fn contains(&self, name: &str) -> bool {
    self.nodes.contains_key(name)
  }

  /// Direct dependencies of a target, in registration order.
  pub fn dependencies(&self, name: &str) -> Result<Vec<&BuildTarget>, GraphError> {
    let idx = self.index(name)?;
    Ok(
      self
        .sorted_neighbors(idx, Direction::Outgoing)
        .into_iter()
        .map(|dep| &self.graph[dep])
        .collect(),
    )
  }

  /// Direct dependents of a target, in registration order.
  pub fn dependents(&self, name: &str) -> Result<Vec<&BuildTarget>, GraphError> {
    let idx = self.index(name)?;
    Ok(
      self
        .sorted_neighbors(idx, Direction::Incoming)
        .into_iter()
        .map(|dep| &self.graph[dep])
        .collect(),
    )
  }

  /// All targets in registration order.
  pub fn targets(&self) -> impl Iterator<Item = &BuildTarget> {
    self.graph.node_indices().map(|idx| &self.graph[idx])
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }
}
