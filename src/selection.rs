use serde::Serialize;
use tracing::debug;

use crate::dataset::Dataset;
use crate::models::{ModuleResult, StudentDetail, StudentRow};

/// At most one selected student across the session. The detail panel is
/// open exactly when something is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    regnum: Option<String>,
}

impl Selection {
    pub fn selected(&self) -> Option<&str> {
        self.regnum.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.regnum.is_some()
    }

    /// Replaces any previous selection. A student that is not among the
    /// visible rows leaves nothing selected.
    pub fn select(&mut self, regnum: &str, visible: &[StudentRow]) -> bool {
        if visible.iter().any(|row| row.regnum == regnum) {
            self.regnum = Some(regnum.to_string());
            true
        } else {
            debug!(regnum, "selected student is not visible");
            self.regnum = None;
            false
        }
    }

    pub fn clear(&mut self) {
        self.regnum = None;
    }

    /// Drops a selection whose student left the visible rows. Returns
    /// whether it did.
    pub fn reconcile(&mut self, visible: &[StudentRow]) -> bool {
        let stale = match &self.regnum {
            Some(regnum) => !visible.iter().any(|row| &row.regnum == regnum),
            None => false,
        };
        if stale {
            debug!(regnum = ?self.regnum, "selection cleared after scope change");
            self.regnum = None;
        }
        stale
    }

    pub fn detail(&self, dataset: &Dataset) -> Option<StudentDetail> {
        student_detail(dataset, self.selected()?)
    }
}

/// Profile from the student's first record plus every module record.
pub fn student_detail(dataset: &Dataset, regnum: &str) -> Option<StudentDetail> {
    let rows = dataset.filter(|record| record.regnum == regnum);
    let first = rows.iter().next()?;

    Some(StudentDetail {
        regnum: first.regnum.clone(),
        firstnames: first.firstnames.clone(),
        surname: first.surname.clone(),
        programmecode: first.programmecode.clone(),
        decision: first.decision.clone(),
        attendancetype: first.attendancetype.clone(),
        semester: first.semester.clone(),
        academicyear: first.academicyear.clone(),
        programmetype: first.programmetype.clone(),
        programmestatus: first.programmestatus.clone(),
        modules: rows
            .iter()
            .map(|record| ModuleResult {
                module: record.module.clone(),
                mark: record.mark,
                grade: record.grade.clone(),
                gender: record.gender.clone(),
            })
            .collect(),
    })
}
