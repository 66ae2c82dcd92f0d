use serde::{Deserialize, Serialize};

use crate::drill::LabelMissPolicy;

/// Decision value counted as a pass by the gender and grade panels.
pub const PASS_DECISION: &str = "PASS";

pub const DEFAULT_DATA_PATH: &str = "./data/new_data.csv";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Marks at or above this count as a module pass.
    pub pass_mark: f64,
    pub module_top_n: usize,
    pub programme_top_n: usize,
    pub label_miss: LabelMissPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            pass_mark: 50.0,
            module_top_n: 20,
            programme_top_n: 10,
            label_miss: LabelMissPolicy::FirstCategory,
        }
    }
}
