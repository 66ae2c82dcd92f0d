//! Reactive filter-and-drilldown core for student results summaries.
//!
//! A [`Dataset`] is loaded once and shared read-only. A [`Session`] owns the
//! cascading [`FilterChain`], one drill [`Navigator`] per drillable chart and
//! the single [`Selection`], and recomputes all of them for each [`Event`].

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod drill;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod report;
pub mod selection;
pub mod session;

#[cfg(test)]
mod fixtures;

pub use aggregate::{aggregate, AggregationResult, Metric, MetricKind, Query, Rate};
pub use config::DashboardConfig;
pub use dataset::{Dataset, Scope};
pub use drill::{ChartId, LabelMissPolicy, Navigator, NavigatorState};
pub use error::{FilterError, LoadError, SessionError};
pub use filter::FilterChain;
pub use models::{Field, Record, StudentDetail};
pub use selection::Selection;
pub use session::{Dashboard, Event, Session};
