//! Cascading filter chain.
//!
//! Nodes form a DAG over record columns. Resolution walks the nodes in
//! topological order; each node's valid options are the distinct values of
//! its column (first-seen order) among rows matching every upstream node's
//! selected value.

use serde::Serialize;
use tracing::debug;

use crate::dataset::{Dataset, Scope};
use crate::error::FilterError;
use crate::models::Field;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNode {
    pub id: Field,
    pub upstream: Vec<Field>,
}

impl FilterNode {
    pub fn new(id: Field, upstream: &[Field]) -> Self {
        Self {
            id,
            upstream: upstream.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeState {
    pub id: Field,
    pub selected: Option<String>,
    pub options: Vec<String>,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// First node left without any valid option. Everything downstream is
    /// empty too and the scope matches no row.
    pub empty_scope: Option<Field>,
    /// Nodes whose selected value changed during the pass.
    pub changed: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct FilterChain {
    nodes: Vec<FilterNode>,
    selected: Vec<Option<String>>,
    options: Vec<Vec<String>>,
}

pub fn standard_nodes() -> Vec<FilterNode> {
    use Field::*;
    vec![
        FilterNode::new(Faculty, &[]),
        FilterNode::new(Programme, &[Faculty]),
        FilterNode::new(AttendanceType, &[Faculty, Programme]),
        FilterNode::new(AcademicYear, &[Faculty, Programme, AttendanceType]),
        FilterNode::new(
            Semester,
            &[Faculty, Programme, AttendanceType, AcademicYear],
        ),
    ]
}

impl FilterChain {
    /// Validates the graph and orders it topologically. Declaration order
    /// breaks ties between independent nodes.
    pub fn new(nodes: Vec<FilterNode>) -> Result<Self, FilterError> {
        for (i, node) in nodes.iter().enumerate() {
            if nodes[..i].iter().any(|other| other.id == node.id) {
                return Err(FilterError::DuplicateNode(node.id));
            }
        }
        for node in &nodes {
            if let Some(upstream) = node
                .upstream
                .iter()
                .find(|up| !nodes.iter().any(|n| n.id == **up))
            {
                return Err(FilterError::UnknownUpstream {
                    node: node.id,
                    upstream: *upstream,
                });
            }
        }

        let mut pending = nodes;
        let mut sorted: Vec<FilterNode> = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending.iter().position(|node| {
                node.upstream
                    .iter()
                    .all(|up| sorted.iter().any(|done| done.id == *up))
            });
            match ready {
                Some(index) => sorted.push(pending.remove(index)),
                None => return Err(FilterError::Cycle(pending[0].id)),
            }
        }

        Ok(Self::from_sorted(sorted))
    }

    /// faculty → programme → attendance type → academic year → semester
    pub fn standard() -> Self {
        Self::from_sorted(standard_nodes())
    }

    fn from_sorted(nodes: Vec<FilterNode>) -> Self {
        let count = nodes.len();
        Self {
            nodes,
            selected: vec![None; count],
            options: vec![Vec::new(); count],
        }
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    fn index(&self, id: Field) -> Result<usize, FilterError> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or(FilterError::UnknownNode(id))
    }

    /// Records an explicit value without resolving. Call [`resolve`] before
    /// reading anything back.
    ///
    /// [`resolve`]: FilterChain::resolve
    pub fn set(&mut self, id: Field, value: impl Into<String>) -> Result<(), FilterError> {
        let index = self.index(id)?;
        self.selected[index] = Some(value.into());
        Ok(())
    }

    /// Recomputes every node in one pass.
    pub fn resolve(&mut self, dataset: &Dataset) -> Resolution {
        let mut resolution = Resolution::default();

        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            let options = match self.upstream_scope(node) {
                Some(scope) => dataset.restrict(&scope).distinct(node.id),
                None => Vec::new(),
            };

            let current = self.selected[index].take();
            let next = match current {
                Some(value) if options.contains(&value) => Some(value),
                previous => {
                    let reset = options.first().cloned();
                    if previous != reset {
                        debug!(node = %node.id, from = ?previous, to = ?reset, "filter reset");
                        resolution.changed.push(node.id);
                    }
                    reset
                }
            };

            if next.is_none() && resolution.empty_scope.is_none() {
                resolution.empty_scope = Some(node.id);
            }
            self.selected[index] = next;
            self.options[index] = options;
        }

        resolution
    }

    /// `set` followed by `resolve`.
    pub fn change(
        &mut self,
        dataset: &Dataset,
        id: Field,
        value: impl Into<String>,
    ) -> Result<Resolution, FilterError> {
        let index = self.index(id)?;
        let value = value.into();
        let explicit = self.selected[index].as_deref() != Some(value.as_str());
        self.selected[index] = Some(value);

        let mut resolution = self.resolve(dataset);
        if explicit && !resolution.changed.contains(&id) {
            resolution.changed.insert(0, id);
        }
        Ok(resolution)
    }

    /// Upstream constraints for `node`, or `None` when an upstream node has
    /// no value.
    fn upstream_scope(&self, node: &FilterNode) -> Option<Scope> {
        let mut scope = Scope::all();
        for up in &node.upstream {
            let index = self.nodes.iter().position(|n| n.id == *up)?;
            scope = scope.with(*up, self.selected[index].clone()?);
        }
        Some(scope)
    }

    /// Valid options for `id` given explicit upstream values. Upstream nodes
    /// missing from `upstream` are left unconstrained.
    pub fn valid_options(
        &self,
        dataset: &Dataset,
        id: Field,
        upstream: &Scope,
    ) -> Result<Vec<String>, FilterError> {
        let node = &self.nodes[self.index(id)?];
        let mut scope = Scope::all();
        for up in &node.upstream {
            if let Some(value) = upstream.value(*up) {
                scope = scope.with(*up, value);
            }
        }
        Ok(dataset.restrict(&scope).distinct(id))
    }

    pub fn selected(&self, id: Field) -> Option<&str> {
        let index = self.index(id).ok()?;
        self.selected[index].as_deref()
    }

    pub fn options(&self, id: Field) -> &[String] {
        match self.index(id) {
            Ok(index) => &self.options[index],
            Err(_) => &[],
        }
    }

    /// Conjunction of the resolved values of `ids`.
    pub fn scope(&self, ids: &[Field]) -> Scope {
        let mut scope = Scope::all();
        for id in ids {
            match self.selected(*id) {
                Some(value) => scope = scope.with(*id, value),
                None => return Scope::nothing(),
            }
        }
        scope
    }

    pub fn full_scope(&self) -> Scope {
        let ids: Vec<Field> = self.nodes.iter().map(|node| node.id).collect();
        self.scope(&ids)
    }

    pub fn states(&self) -> Vec<NodeState> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| NodeState {
                id: node.id,
                selected: self.selected[i].clone(),
                options: self.options[i].clone(),
            })
            .collect()
    }
}
