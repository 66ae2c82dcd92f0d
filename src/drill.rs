use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{aggregate, AggregationResult, Query};
use crate::dataset::{Dataset, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    FacultyDecisions,
    ProgrammeDecisions,
}

impl std::fmt::Display for ChartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartId::FacultyDecisions => f.write_str("faculty_decisions"),
            ChartId::ProgrammeDecisions => f.write_str("programme_decisions"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Summary,
    Detail,
}

/// What to do when a detail label is not among the current summary
/// categories, either at click time or after the scope moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelMissPolicy {
    /// Show the first summary category in its place.
    #[default]
    FirstCategory,
    /// Reject the click, or fall back to the summary.
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrillSpec {
    pub primary: Query,
    pub secondary: Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigatorState {
    pub level: Level,
    /// The label stored when the detail was entered. It survives scope
    /// changes, so it can differ from [`DrillView::label`], which is the
    /// category actually rendered after a first-category fallback.
    pub active_label: Option<String>,
    pub back_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillView {
    pub level: Level,
    /// Category the detail is grouped within.
    pub label: Option<String>,
    /// The stored label was missing and another category was substituted.
    pub fallback: bool,
    pub result: AggregationResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Summary,
    Detail { label: String },
}

/// Summary ⇄ Detail state machine for one chart. The stack never holds more
/// than the root summary and one detail frame.
#[derive(Debug, Clone)]
pub struct Navigator {
    chart: ChartId,
    spec: DrillSpec,
    policy: LabelMissPolicy,
    stack: Vec<Frame>,
}

impl Navigator {
    pub fn new(chart: ChartId, spec: DrillSpec, policy: LabelMissPolicy) -> Self {
        Self {
            chart,
            spec,
            policy,
            stack: vec![Frame::Summary],
        }
    }

    pub fn chart(&self) -> ChartId {
        self.chart
    }

    fn detail_label(&self) -> Option<&String> {
        match self.stack.last() {
            Some(Frame::Detail { label }) => Some(label),
            _ => None,
        }
    }

    pub fn state(&self) -> NavigatorState {
        match self.detail_label() {
            None => NavigatorState {
                level: Level::Summary,
                active_label: None,
                back_visible: false,
            },
            Some(label) => NavigatorState {
                level: Level::Detail,
                active_label: Some(label.clone()),
                back_visible: true,
            },
        }
    }

    pub fn primary(&self, dataset: &Dataset, scope: &Scope) -> AggregationResult {
        aggregate(dataset, scope, &self.spec.primary)
    }

    /// Handles a click on a summary category. Returns whether the navigator
    /// entered `Detail`. Clicks on a detail view are ignored.
    pub fn click(&mut self, label: &str, dataset: &Dataset, scope: &Scope) -> bool {
        if self.detail_label().is_some() {
            debug!(chart = %self.chart, label, "click ignored at detail level");
            return false;
        }

        let primary = self.primary(dataset, scope);
        let target = if primary.contains(label) {
            Some(label.to_string())
        } else {
            match self.policy {
                LabelMissPolicy::FirstCategory => {
                    let first = primary.first_label().map(str::to_string);
                    warn!(chart = %self.chart, label, fallback = ?first, "unknown drill label");
                    first
                }
                LabelMissPolicy::Summary => {
                    warn!(chart = %self.chart, label, "unknown drill label rejected");
                    None
                }
            }
        };

        match target {
            Some(label) => {
                debug!(chart = %self.chart, label = %label, "drill to detail");
                self.stack.push(Frame::Detail { label });
                true
            }
            None => false,
        }
    }

    /// Always lands on `Summary`.
    pub fn back(&mut self) {
        if self.stack.len() > 1 {
            debug!(chart = %self.chart, "drill back to summary");
        }
        self.stack.truncate(1);
    }

    /// Re-checks the stored label after a scope change. Under the summary
    /// policy a vanished label drops the navigator back to `Summary`; under
    /// the first-category policy the label is kept.
    pub fn reconcile(&mut self, dataset: &Dataset, scope: &Scope) {
        if self.policy != LabelMissPolicy::Summary {
            return;
        }
        let gone = match self.detail_label() {
            Some(label) => !self.primary(dataset, scope).contains(label),
            None => false,
        };
        if gone {
            debug!(chart = %self.chart, "detail label left scope");
            self.stack.truncate(1);
        }
    }

    pub fn view(&self, dataset: &Dataset, scope: &Scope) -> DrillView {
        let primary = self.primary(dataset, scope);
        let Some(stored) = self.detail_label() else {
            return DrillView {
                level: Level::Summary,
                label: None,
                fallback: false,
                result: primary,
            };
        };

        let (label, fallback) = if primary.contains(stored) {
            (Some(stored.clone()), false)
        } else {
            match self.policy {
                LabelMissPolicy::FirstCategory => {
                    (primary.first_label().map(str::to_string), true)
                }
                LabelMissPolicy::Summary => {
                    return DrillView {
                        level: Level::Summary,
                        label: None,
                        fallback: true,
                        result: primary,
                    };
                }
            }
        };

        let result = match &label {
            Some(label) => aggregate(
                dataset,
                &scope.clone().with(self.spec.primary.dimension, label.as_str()),
                &self.spec.secondary,
            ),
            None => AggregationResult::default(),
        };

        DrillView {
            level: Level::Detail,
            label,
            fallback,
            result,
        }
    }
}
