use serde::{Deserialize, Serialize};

/// One (student, module) observation from the results table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub regnum: String,
    pub module: String,
    /// `None` when the cell is blank or not a number.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub mark: Option<f64>,
    pub grade: String,
    pub decision: String,
    pub gender: String,
    pub faculty: String,
    pub programme: String,
    pub programmecode: String,
    pub programmetype: String,
    pub attendancetype: String,
    pub academicyear: String,
    pub semester: String,
    pub programmestatus: String,
    pub firstnames: String,
    pub surname: String,
}

/// The text columns of a [`Record`] that can be filtered or grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Regnum,
    Module,
    Grade,
    Decision,
    Gender,
    Faculty,
    Programme,
    ProgrammeCode,
    ProgrammeType,
    AttendanceType,
    AcademicYear,
    Semester,
    ProgrammeStatus,
    FirstNames,
    Surname,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Regnum => "regnum",
            Field::Module => "module",
            Field::Grade => "grade",
            Field::Decision => "decision",
            Field::Gender => "gender",
            Field::Faculty => "faculty",
            Field::Programme => "programme",
            Field::ProgrammeCode => "programmecode",
            Field::ProgrammeType => "programmetype",
            Field::AttendanceType => "attendancetype",
            Field::AcademicYear => "academicyear",
            Field::Semester => "semester",
            Field::ProgrammeStatus => "programmestatus",
            Field::FirstNames => "firstnames",
            Field::Surname => "surname",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

impl Record {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Regnum => &self.regnum,
            Field::Module => &self.module,
            Field::Grade => &self.grade,
            Field::Decision => &self.decision,
            Field::Gender => &self.gender,
            Field::Faculty => &self.faculty,
            Field::Programme => &self.programme,
            Field::ProgrammeCode => &self.programmecode,
            Field::ProgrammeType => &self.programmetype,
            Field::AttendanceType => &self.attendancetype,
            Field::AcademicYear => &self.academicyear,
            Field::Semester => &self.semester,
            Field::ProgrammeStatus => &self.programmestatus,
            Field::FirstNames => &self.firstnames,
            Field::Surname => &self.surname,
        }
    }
}

/// A student line in the decision table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRow {
    pub regnum: String,
    pub firstnames: String,
    pub surname: String,
    pub programmecode: String,
    pub decision: String,
    pub gender: String,
    pub academicyear: String,
    pub semester: String,
}

impl From<&Record> for StudentRow {
    fn from(record: &Record) -> Self {
        Self {
            regnum: record.regnum.clone(),
            firstnames: record.firstnames.clone(),
            surname: record.surname.clone(),
            programmecode: record.programmecode.clone(),
            decision: record.decision.clone(),
            gender: record.gender.clone(),
            academicyear: record.academicyear.clone(),
            semester: record.semester.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleResult {
    pub module: String,
    pub mark: Option<f64>,
    pub grade: String,
    pub gender: String,
}

/// Contents of the student detail panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentDetail {
    pub regnum: String,
    pub firstnames: String,
    pub surname: String,
    pub programmecode: String,
    pub decision: String,
    pub attendancetype: String,
    pub semester: String,
    pub academicyear: String,
    pub programmetype: String,
    pub programmestatus: String,
    pub modules: Vec<ModuleResult>,
}

impl ModuleResult {
    pub fn mark_text(&self) -> String {
        match self.mark {
            Some(mark) => mark.to_string(),
            None => "-".to_string(),
        }
    }
}
