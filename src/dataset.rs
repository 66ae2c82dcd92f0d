use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregate::Rate;
use crate::error::LoadError;
use crate::models::{Field, Record};

pub const REQUIRED_COLUMNS: [&str; 16] = [
    "regnum",
    "module",
    "mark",
    "grade",
    "decision",
    "gender",
    "faculty",
    "programme",
    "programmecode",
    "programmetype",
    "attendancetype",
    "academicyear",
    "semester",
    "programmestatus",
    "firstnames",
    "surname",
];

/// Immutable, deduplicated results table.
///
/// Cloning is cheap: records are shared, and every derived dataset points
/// at the same loaded rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Arc<Record>>,
}

/// Conjunction of `field = value` constraints restricting which rows count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    constraints: Vec<(Field, String)>,
    unsatisfiable: bool,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    /// A scope no row satisfies; produced when a filter has no valid option.
    pub fn nothing() -> Self {
        Self {
            constraints: Vec::new(),
            unsatisfiable: true,
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.constraints.push((field, value.into()));
        self
    }

    pub fn is_unsatisfiable(&self) -> bool {
        self.unsatisfiable
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        self.constraints
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn matches(&self, record: &Record) -> bool {
        !self.unsatisfiable
            && self
                .constraints
                .iter()
                .all(|(field, value)| record.get(*field) == value)
    }
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;
        info!(path = %path.display(), rows = dataset.len(), "results table loaded");
        Ok(dataset)
    }

    /// Reads CSV rows, drops extraneous columns, deduplicates on
    /// `(regnum, module)` keeping the last row and normalizes `gender`.
    /// A blank or non-numeric mark loads as missing.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        let headers = reader.headers()?.clone();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|header| header == **column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns { missing });
        }

        let mut raw = Vec::new();
        let mut normalized = 0usize;
        let mut blank_marks = 0usize;
        for result in reader.deserialize::<Record>() {
            let mut record = result?;
            if let Some(fixed) = normalize_gender(&record.gender) {
                record.gender = fixed.to_string();
                normalized += 1;
            }
            if record.mark.is_none() {
                blank_marks += 1;
            }
            raw.push(record);
        }

        let read = raw.len();
        let records = keep_last(raw, |record| (record.regnum.clone(), record.module.clone()));
        debug!(
            read,
            kept = records.len(),
            duplicates = read - records.len(),
            normalized,
            blank_marks,
            "deduplicated results rows"
        );

        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().map(|record| record.as_ref())
    }

    /// Order-preserving restriction.
    pub fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Dataset {
        Dataset {
            records: self
                .records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
        }
    }

    pub fn restrict(&self, scope: &Scope) -> Dataset {
        if scope.is_unsatisfiable() {
            return Dataset::default();
        }
        self.filter(|record| scope.matches(record))
    }

    /// Distinct values of `field` in first-seen order.
    pub fn distinct(&self, field: Field) -> Vec<String> {
        let mut seen = HashSet::new();
        self.iter()
            .map(|record| record.get(field))
            .filter(|value| seen.insert(*value))
            .map(str::to_string)
            .collect()
    }

    pub fn count_distinct(&self, field: Field) -> u64 {
        self.iter()
            .map(|record| record.get(field))
            .collect::<HashSet<_>>()
            .len() as u64
    }

    /// Count of distinct `id` values per `dimension` value, in first-seen
    /// dimension order.
    pub fn group_count_distinct(&self, dimension: Field, id: Field) -> Vec<(String, u64)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, HashSet<&str>)> = Vec::new();

        for record in self.iter() {
            let key = record.get(dimension);
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, HashSet::new()));
                groups.len() - 1
            });
            groups[slot].1.insert(record.get(id));
        }

        groups
            .into_iter()
            .map(|(key, ids)| (key.to_string(), ids.len() as u64))
            .collect()
    }

    /// Share of rows per `dimension` value whose mark is at least `threshold`.
    /// Rows without a mark count toward the total, never as a hit.
    pub fn group_rate(&self, dimension: Field, threshold: f64) -> Vec<(String, Rate)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Rate)> = Vec::new();

        for record in self.iter() {
            let key = record.get(dimension);
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, Rate::default()));
                groups.len() - 1
            });
            let rate = &mut groups[slot].1;
            rate.total += 1;
            if record.mark.is_some_and(|mark| mark >= threshold) {
                rate.hits += 1;
            }
        }

        groups
            .into_iter()
            .map(|(key, rate)| (key.to_string(), rate))
            .collect()
    }

    /// One record per distinct `key`, the last one in table order.
    pub fn unique_by(&self, field: Field) -> Vec<&Record> {
        keep_last(self.iter().collect(), |record: &&Record| {
            record.get(field).to_string()
        })
    }
}

pub fn normalize_gender(value: &str) -> Option<&'static str> {
    match value {
        "female" => Some("Female"),
        "male" => Some("Male"),
        _ => None,
    }
}

/// Keeps the last item for each key, preserving the relative order of the
/// survivors.
fn keep_last<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut last: HashMap<K, usize> = HashMap::new();
    for (position, item) in items.iter().enumerate() {
        last.insert(key(item), position);
    }

    items
        .into_iter()
        .enumerate()
        .filter(|(position, item)| last.get(&key(item)) == Some(position))
        .map(|(_, item)| item)
        .collect()
}
