use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Scope};
use crate::models::Field;

/// Exact share of rows meeting a threshold. Rounded only when presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rate {
    pub hits: u64,
    pub total: u64,
}

impl Rate {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> f64 {
        self.ratio() * 100.0
    }

    fn compare(&self, other: &Rate) -> Ordering {
        let lhs = u128::from(self.hits) * u128::from(other.total.max(1));
        let rhs = u128::from(other.hits) * u128::from(self.total.max(1));
        lhs.cmp(&rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricKind {
    /// Distinct students (`regnum`) per group.
    CountDistinctId,
    /// Share of rows whose mark is at least `threshold`.
    RateAboveThreshold { threshold: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Count(u64),
    Rate(Rate),
}

impl Metric {
    pub fn value(&self) -> f64 {
        match self {
            Metric::Count(count) => *count as f64,
            Metric::Rate(rate) => rate.percent(),
        }
    }

    fn compare(&self, other: &Metric) -> Ordering {
        match (self, other) {
            (Metric::Count(a), Metric::Count(b)) => a.cmp(b),
            (Metric::Rate(a), Metric::Rate(b)) => a.compare(b),
            _ => self
                .value()
                .partial_cmp(&other.value())
                .unwrap_or(Ordering::Equal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Dimension values in the order they first appear in the table.
    FirstSeen,
    /// Largest metric first; ties keep first-seen order.
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub dimension: Field,
    pub metric: MetricKind,
    pub order: Order,
    pub top_n: Option<usize>,
}

impl Query {
    pub fn count(dimension: Field) -> Self {
        Self {
            dimension,
            metric: MetricKind::CountDistinctId,
            order: Order::FirstSeen,
            top_n: None,
        }
    }

    pub fn rate(dimension: Field, threshold: f64) -> Self {
        Self {
            dimension,
            metric: MetricKind::RateAboveThreshold { threshold },
            order: Order::FirstSeen,
            top_n: None,
        }
    }

    pub fn descending(mut self) -> Self {
        self.order = Order::Descending;
        self
    }

    pub fn top(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub label: String,
    pub metric: Metric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub entries: Vec<Entry>,
    /// Number of groups before top-N truncation.
    pub total_groups: usize,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|entry| entry.label == label)
    }

    pub fn first_label(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<Metric> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.metric)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.label.as_str()).collect()
    }
}

pub fn aggregate(dataset: &Dataset, scope: &Scope, query: &Query) -> AggregationResult {
    let rows = dataset.restrict(scope);

    let mut entries: Vec<Entry> = match query.metric {
        MetricKind::CountDistinctId => rows
            .group_count_distinct(query.dimension, Field::Regnum)
            .into_iter()
            .map(|(label, count)| Entry {
                label,
                metric: Metric::Count(count),
            })
            .collect(),
        MetricKind::RateAboveThreshold { threshold } => rows
            .group_rate(query.dimension, threshold)
            .into_iter()
            .map(|(label, rate)| Entry {
                label,
                metric: Metric::Rate(rate),
            })
            .collect(),
    };

    let total_groups = entries.len();
    if query.order == Order::Descending {
        entries.sort_by(|a, b| b.metric.compare(&a.metric));
    }
    if let Some(n) = query.top_n {
        entries.truncate(n);
    }

    AggregationResult {
        entries,
        total_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn module_pass_rate_uses_exact_ratios() {
        let dataset = fixtures::dataset();
        let scope = Scope::all()
            .with(Field::Faculty, "Science")
            .with(Field::Programme, "BSc Physics");

        let overall = aggregate(&dataset, &scope, &Query::rate(Field::Programme, 50.0));
        assert_eq!(
            overall.get("BSc Physics"),
            Some(Metric::Rate(Rate { hits: 2, total: 4 }))
        );
        assert_eq!(overall.entries[0].metric.value(), 50.0);

        let by_module = aggregate(
            &dataset,
            &scope,
            &Query::rate(Field::Module, 50.0).descending().top(20),
        );
        assert_eq!(by_module.labels(), vec!["PHY102", "PHY103", "PHY101", "PHY104"]);
    }

    #[test]
    fn rates_sort_without_rounding() {
        let dataset = fixtures::dataset();
        let scope = Scope::all().with(Field::Programme, "BSc Chemistry");
        let result = aggregate(
            &dataset,
            &scope,
            &Query::rate(Field::Module, 50.0).descending(),
        );

        // CHM201 1/1, CHM101 3/5, CHM102 0/1
        assert_eq!(result.labels(), vec!["CHM201", "CHM101", "CHM102"]);
        assert_eq!(
            result.get("CHM101"),
            Some(Metric::Rate(Rate { hits: 3, total: 5 }))
        );
    }

    #[test]
    fn top_n_truncates_and_breaks_ties_by_first_seen() {
        let mut rows = Vec::new();
        for k in 0..25 {
            let students = if k % 5 == 0 { 3 } else { 1 };
            for s in 0..students {
                rows.push(fixtures::row(
                    &format!("S{k}_{s}"),
                    &format!("M{k:02}"),
                    "60",
                    "PASS",
                    "male",
                ));
            }
        }
        let dataset = Dataset::from_reader(fixtures::csv(&rows).as_bytes()).unwrap();

        let result = aggregate(
            &dataset,
            &Scope::all(),
            &Query::count(Field::Module).descending().top(20),
        );

        assert_eq!(result.len(), 20);
        assert_eq!(result.total_groups, 25);
        assert_eq!(
            &result.labels()[..6],
            &["M00", "M05", "M10", "M15", "M20", "M01"]
        );
        assert_eq!(result.labels()[19], "M18");
        assert_eq!(result.entries[0].metric, Metric::Count(3));
    }

    #[test]
    fn first_seen_order_for_distributions() {
        let dataset = fixtures::dataset();
        let scope = Scope::all()
            .with(Field::Faculty, "Science")
            .with(Field::Decision, "PASS");
        let result = aggregate(&dataset, &scope, &Query::count(Field::Gender));

        assert_eq!(result.labels(), vec!["Male", "Female"]);
        assert_eq!(result.get("Male"), Some(Metric::Count(2)));
        assert_eq!(result.get("Female"), Some(Metric::Count(3)));
    }

    #[test]
    fn empty_scope_yields_empty_result() {
        let dataset = fixtures::dataset();
        let scope = Scope::all()
            .with(Field::Faculty, "Science")
            .with(Field::Programme, "BA History");
        let result = aggregate(&dataset, &scope, &Query::count(Field::Decision));

        assert!(result.is_empty());
        assert_eq!(result.total_groups, 0);
        assert!(aggregate(&dataset, &Scope::nothing(), &Query::count(Field::Decision)).is_empty());
    }
}
