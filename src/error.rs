//! Error types for loading and navigating the results table

use thiserror::Error;

use crate::drill::ChartId;
use crate::models::Field;

/// Errors while ingesting the results table. Fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read results file")]
    Io(#[from] std::io::Error),

    #[error("malformed results table")]
    Csv(#[from] csv::Error),

    #[error("results table is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
}

/// Errors while building or addressing a filter chain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter node {0} declared twice")]
    DuplicateNode(Field),

    #[error("filter node {node} depends on unknown node {upstream}")]
    UnknownUpstream { node: Field, upstream: Field },

    #[error("filter dependencies form a cycle through {0}")]
    Cycle(Field),

    #[error("no filter node for {0}")]
    UnknownNode(Field),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no drill chart named {0}")]
    UnknownChart(ChartId),

    #[error(transparent)]
    Filter(#[from] FilterError),
}
