//! Callgraph of event-script chunks.
//!
//! Nodes are `(script file, chunk index)` pairs. Edges come from jump tokens
//! and from chunks falling through into the next one.

mod export;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::script::ScriptFile;
use crate::token::Token;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub script: String,
    pub chunk: usize,
}

impl NodeId {
    pub fn new(script: impl Into<String>, chunk: usize) -> Self {
        Self {
            script: script.into(),
            chunk,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.script, self.chunk)
    }
}

/// Edge as produced by a token; missing parts default to the current node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub src: Option<NodeId>,
    pub script: Option<String>,
    pub chunk: Option<usize>,
}

impl Edge {
    /// Edge to another chunk of the same file.
    pub fn local(chunk: usize) -> Self {
        Self {
            src: None,
            script: None,
            chunk: Some(chunk),
        }
    }

    /// Edge to the first chunk of another file.
    pub fn to_script(script: String) -> Self {
        Self {
            src: None,
            script: Some(script),
            chunk: Some(0),
        }
    }

    fn resolve(self, current: &NodeId) -> (NodeId, NodeId) {
        let src = self.src.unwrap_or_else(|| current.clone());
        let dst = NodeId {
            script: self.script.unwrap_or_else(|| current.script.clone()),
            chunk: self.chunk.unwrap_or(current.chunk),
        };
        (src, dst)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub scripts: usize,
    pub dangling_edges: usize,
}

#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    nodes: BTreeSet<NodeId>,
    edges: BTreeSet<(NodeId, NodeId)>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.nodes.insert(node);
    }

    pub fn add_edge(&mut self, current: &NodeId, edge: Edge) {
        self.edges.insert(edge.resolve(current));
    }

    /// Records one tokenized event chunk of `script`.
    pub fn add_chunk(&mut self, script: &ScriptFile, index: usize, tokens: &[Token]) {
        if script.is_blacklisted(index) {
            return;
        }
        let node = self.add_token_edges(script, index, tokens);
        let end_forced = tokens.last().is_some_and(ends_chunk);
        let falls_through = !script.is_blacklisted(index + 1)
            && !end_forced
            && index + 1 < script.event_count();
        if falls_through {
            self.add_edge(&node, Edge::local(index + 1));
        }
        self.nodes.insert(node);
    }

    /// Records a chunk that failed to tokenize, with the tokens read before
    /// the failure. No fall-through edge is assumed.
    pub fn add_partial_chunk(&mut self, script: &ScriptFile, index: usize, tokens: &[Token]) {
        if script.is_blacklisted(index) {
            return;
        }
        let node = self.add_token_edges(script, index, tokens);
        self.nodes.insert(node);
    }

    fn add_token_edges(&mut self, script: &ScriptFile, index: usize, tokens: &[Token]) -> NodeId {
        let node = NodeId::new(script.name().to_lowercase(), index);
        for token in tokens {
            for edge in token.edges(script) {
                self.add_edge(&node, edge);
            }
        }
        node
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.edges.iter().map(|(src, dst)| (src, dst))
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    /// Nodes grouped by script file.
    pub fn by_script(&self) -> BTreeMap<&str, Vec<&NodeId>> {
        let mut groups: BTreeMap<&str, Vec<&NodeId>> = BTreeMap::new();
        for node in &self.nodes {
            groups.entry(node.script.as_str()).or_default().push(node);
        }
        groups
    }

    /// Every node reachable from `start` along recorded edges.
    pub fn reachable_from(&self, start: &NodeId) -> BTreeSet<NodeId> {
        let mut adjacency: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
        for (src, dst) in &self.edges {
            adjacency.entry(src).or_default().push(dst);
        }
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node.clone()) {
                continue;
            }
            if let Some(next) = adjacency.get(node) {
                queue.extend(next.iter().copied());
            }
        }
        seen
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            scripts: self.by_script().len(),
            dangling_edges: self
                .edges
                .iter()
                .filter(|(src, dst)| !self.nodes.contains(src) || !self.nodes.contains(dst))
                .count(),
        }
    }
}

fn ends_chunk(token: &Token) -> bool {
    match token.kind() {
        crate::token::TokenKind::Event(op) => op.def().ends_chunk(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod tests;
