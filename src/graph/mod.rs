//! Role-labelled relationship graph between timetabled entities.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt;

/// The role the target of a relationship plays for its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// The target is a group the source is a member of.
    Group,
    /// The target is a member of the source group.
    Member,
    Other(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Group => f.write_str("Group"),
            Role::Member => f.write_str("Member"),
            Role::Other(name) => f.write_str(name),
        }
    }
}

/// Answers "which entities are related to this one under that role".
pub trait RelationshipGraph {
    fn related(&self, entity: &str, role: &Role) -> Vec<String>;
}

/// Directed graph of entity paths. An edge `a -> b` labelled `role` means
/// `b` plays `role` for `a`.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    graph: DiGraph<String, Role>,
    path_to_index: HashMap<String, NodeIndex>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.path_to_index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.path_to_index.insert(path.to_string(), idx);
        idx
    }

    /// Records that `target` plays `role` for `source`. Relating the same
    /// pair twice under one role has no effect.
    pub fn relate(&mut self, source: &str, target: &str, role: Role) {
        let u = self.node(source);
        let v = self.node(target);
        let exists = self
            .graph
            .edges_connecting(u, v)
            .any(|edge| *edge.weight() == role);
        if !exists {
            self.graph.add_edge(u, v, role);
        }
    }

    /// Adds both directions of a group membership.
    pub fn add_membership(&mut self, member: &str, group: &str) {
        self.relate(member, group, Role::Group);
        self.relate(group, member, Role::Member);
    }

    pub fn remove_membership(&mut self, member: &str, group: &str) {
        self.unrelate(member, group, &Role::Group);
        self.unrelate(group, member, &Role::Member);
    }

    pub fn unrelate(&mut self, source: &str, target: &str, role: &Role) {
        let (Some(&u), Some(&v)) = (self.path_to_index.get(source), self.path_to_index.get(target)) else {
            return;
        };
        let edge = self
            .graph
            .edges_connecting(u, v)
            .find(|edge| edge.weight() == role)
            .map(|edge| edge.id());
        if let Some(edge) = edge {
            self.graph.remove_edge(edge);
        }
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl RelationshipGraph for Relationships {
    /// Related entity paths, sorted.
    fn related(&self, entity: &str, role: &Role) -> Vec<String> {
        let Some(&idx) = self.path_to_index.get(entity) else {
            return Vec::new();
        };
        let mut related: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|edge| edge.weight() == role)
            .map(|edge| self.graph[edge.target()].clone())
            .collect();
        related.sort();
        related
    }
}
