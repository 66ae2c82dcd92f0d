//! Event reducer tying the filter chain, the drill navigators and the
//! selection together over one injected dataset.
//!
//! Every event runs a full pass in dependency order: filters resolve first,
//! navigators re-check their detail labels against the new scope, then the
//! selection is reconciled against the decision table.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{aggregate, AggregationResult, Query};
use crate::config::{DashboardConfig, PASS_DECISION};
use crate::dataset::{Dataset, Scope};
use crate::drill::{ChartId, DrillSpec, DrillView, Level, Navigator, NavigatorState};
use crate::error::{FilterError, SessionError};
use crate::filter::{FilterChain, NodeState};
use crate::models::{Field, StudentDetail, StudentRow};
use crate::selection::{student_detail, Selection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    FilterChanged { node: Field, value: String },
    Clicked { chart: ChartId, label: String },
    BackPressed { chart: ChartId },
    RowSelected { regnum: String },
    RowDeselected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    GenderDistribution,
    GradeDistribution,
    ModulePassRate,
    AttendanceTypeDistribution,
    AcademicYearDistribution,
}

impl PanelId {
    pub const ALL: [PanelId; 5] = [
        PanelId::GenderDistribution,
        PanelId::GradeDistribution,
        PanelId::ModulePassRate,
        PanelId::AttendanceTypeDistribution,
        PanelId::AcademicYearDistribution,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PanelId::GenderDistribution => "Gender Distribution",
            PanelId::GradeDistribution => "Grade Distribution",
            PanelId::ModulePassRate => "Pass Rates by Module",
            PanelId::AttendanceTypeDistribution => "Attendance Type Distribution",
            PanelId::AcademicYearDistribution => "Academic Year Distribution",
        }
    }
}

const FACULTY_NODES: &[Field] = &[Field::Faculty];
const PROGRAMME_NODES: &[Field] = &[Field::Faculty, Field::Programme];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub id: PanelId,
    /// Distinct students in the panel's scope.
    pub total: u64,
    pub result: AggregationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillPanel {
    pub chart: ChartId,
    pub total: u64,
    pub state: NavigatorState,
    pub view: DrillView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionTable {
    pub decision: Option<String>,
    pub students: u64,
    pub rows: Vec<StudentRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub filters: Vec<NodeState>,
    pub empty_scope: Option<Field>,
    pub panels: Vec<Panel>,
    pub drills: Vec<DrillPanel>,
    pub table: DecisionTable,
    pub selected: Option<StudentDetail>,
}

#[derive(Debug, Clone)]
pub struct Session {
    dataset: Dataset,
    config: DashboardConfig,
    filters: FilterChain,
    navigators: Vec<Navigator>,
    selection: Selection,
    empty_scope: Option<Field>,
}

impl Session {
    pub fn new(dataset: Dataset, config: DashboardConfig) -> Self {
        let mut filters = FilterChain::standard();
        let resolution = filters.resolve(&dataset);

        let navigators = vec![
            Navigator::new(
                ChartId::FacultyDecisions,
                DrillSpec {
                    primary: Query::count(Field::Decision),
                    secondary: Query::count(Field::ProgrammeCode)
                        .descending()
                        .top(config.programme_top_n),
                },
                config.label_miss,
            ),
            Navigator::new(
                ChartId::ProgrammeDecisions,
                DrillSpec {
                    primary: Query::count(Field::Decision),
                    secondary: Query::count(Field::Module).descending(),
                },
                config.label_miss,
            ),
        ];

        info!(
            rows = dataset.len(),
            empty_scope = ?resolution.empty_scope,
            "dashboard session started"
        );

        Self {
            dataset,
            config,
            filters,
            navigators,
            selection: Selection::default(),
            empty_scope: resolution.empty_scope,
        }
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn apply(&mut self, event: Event) -> Result<(), SessionError> {
        debug!(?event, "applying event");
        match event {
            Event::FilterChanged { node, value } => {
                let resolution = self.filters.change(&self.dataset, node, value)?;
                self.empty_scope = resolution.empty_scope;
                for index in 0..self.navigators.len() {
                    let scope = self.chart_scope(self.navigators[index].chart());
                    self.navigators[index].reconcile(&self.dataset, &scope);
                }
            }
            Event::Clicked { chart, label } => {
                let scope = self.chart_scope(chart);
                let index = self.navigator_index(chart)?;
                self.navigators[index].click(&label, &self.dataset, &scope);
            }
            Event::BackPressed { chart } => {
                let index = self.navigator_index(chart)?;
                self.navigators[index].back();
            }
            Event::RowSelected { regnum } => {
                let table = self.decision_table();
                self.selection.select(&regnum, &table.rows);
            }
            Event::RowDeselected => self.selection.clear(),
        }

        let table = self.decision_table();
        self.selection.reconcile(&table.rows);
        Ok(())
    }

    fn navigator_index(&self, chart: ChartId) -> Result<usize, SessionError> {
        self.navigators
            .iter()
            .position(|nav| nav.chart() == chart)
            .ok_or(SessionError::UnknownChart(chart))
    }

    fn chart_scope(&self, chart: ChartId) -> Scope {
        match chart {
            ChartId::FacultyDecisions => self.filters.scope(FACULTY_NODES),
            ChartId::ProgrammeDecisions => self.filters.full_scope(),
        }
    }

    pub fn valid_options(&self, node: Field, upstream: &Scope) -> Result<Vec<String>, FilterError> {
        self.filters.valid_options(&self.dataset, node, upstream)
    }

    pub fn aggregation(&self, scope: &Scope, query: &Query) -> AggregationResult {
        aggregate(&self.dataset, scope, query)
    }

    pub fn navigator_state(&self, chart: ChartId) -> Result<NavigatorState, SessionError> {
        Ok(self.navigators[self.navigator_index(chart)?].state())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selection.selected()
    }

    pub fn selected_record(&self) -> Option<StudentDetail> {
        self.selection.detail(&self.dataset)
    }

    pub fn student(&self, regnum: &str) -> Option<StudentDetail> {
        student_detail(&self.dataset, regnum)
    }

    pub fn panel(&self, id: PanelId) -> Panel {
        let (scope, query) = match id {
            PanelId::GenderDistribution => (
                self.filters
                    .scope(FACULTY_NODES)
                    .with(Field::Decision, PASS_DECISION),
                Query::count(Field::Gender),
            ),
            PanelId::GradeDistribution => (
                self.filters
                    .scope(FACULTY_NODES)
                    .with(Field::Decision, PASS_DECISION),
                Query::count(Field::Grade),
            ),
            PanelId::ModulePassRate => (
                self.filters.scope(PROGRAMME_NODES),
                Query::rate(Field::Module, self.config.pass_mark)
                    .descending()
                    .top(self.config.module_top_n),
            ),
            PanelId::AttendanceTypeDistribution => (
                self.filters.scope(PROGRAMME_NODES),
                Query::count(Field::AttendanceType),
            ),
            PanelId::AcademicYearDistribution => (
                self.filters.scope(PROGRAMME_NODES),
                Query::count(Field::AcademicYear),
            ),
        };

        Panel {
            id,
            total: self.dataset.restrict(&scope).count_distinct(Field::Regnum),
            result: aggregate(&self.dataset, &scope, &query),
        }
    }

    pub fn drill(&self, chart: ChartId) -> Result<DrillPanel, SessionError> {
        let navigator = &self.navigators[self.navigator_index(chart)?];
        let scope = self.chart_scope(chart);
        Ok(DrillPanel {
            chart,
            total: self.dataset.restrict(&scope).count_distinct(Field::Regnum),
            state: navigator.state(),
            view: navigator.view(&self.dataset, &scope),
        })
    }

    /// Students of the programme chart's active category, or of the first
    /// decision in scope while that chart shows its summary.
    pub fn decision_table(&self) -> DecisionTable {
        let scope = self.filters.full_scope();
        let decision = self
            .navigator_index(ChartId::ProgrammeDecisions)
            .ok()
            .and_then(|index| {
                let view = self.navigators[index].view(&self.dataset, &scope);
                match view.level {
                    Level::Detail => view.label,
                    Level::Summary => view.result.first_label().map(str::to_string),
                }
            });

        let Some(decision) = decision else {
            return DecisionTable {
                decision: None,
                students: 0,
                rows: Vec::new(),
            };
        };

        let rows: Vec<StudentRow> = self
            .dataset
            .restrict(&scope)
            .unique_by(Field::Regnum)
            .into_iter()
            .filter(|record| record.decision == decision)
            .map(StudentRow::from)
            .collect();

        DecisionTable {
            decision: Some(decision),
            students: rows.len() as u64,
            rows,
        }
    }

    pub fn snapshot(&self) -> Dashboard {
        Dashboard {
            filters: self.filters.states(),
            empty_scope: self.empty_scope,
            panels: PanelId::ALL.iter().map(|id| self.panel(*id)).collect(),
            drills: self
                .navigators
                .iter()
                .filter_map(|nav| self.drill(nav.chart()).ok())
                .collect(),
            table: self.decision_table(),
            selected: self.selected_record(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Metric, Rate};
    use crate::drill::LabelMissPolicy;
    use crate::fixtures;

    fn session() -> Session {
        Session::new(fixtures::dataset(), DashboardConfig::default())
    }

    fn filter(node: Field, value: &str) -> Event {
        Event::FilterChanged {
            node,
            value: value.to_string(),
        }
    }

    fn regnums(table: &DecisionTable) -> Vec<&str> {
        table.rows.iter().map(|row| row.regnum.as_str()).collect()
    }

    #[test]
    fn initial_dashboard() {
        let session = session();
        let dashboard = session.snapshot();

        assert_eq!(dashboard.empty_scope, None);
        assert_eq!(dashboard.panels.len(), 5);

        let gender = session.panel(PanelId::GenderDistribution);
        assert_eq!(gender.total, 5);
        assert_eq!(gender.result.labels(), vec!["Male", "Female"]);

        let rates = session.panel(PanelId::ModulePassRate);
        assert_eq!(rates.result.get("PHY102"), Some(Metric::Rate(Rate { hits: 1, total: 1 })));
        assert_eq!(rates.total, 1);

        assert_eq!(dashboard.table.decision.as_deref(), Some("PASS"));
        assert_eq!(regnums(&dashboard.table), vec!["R1"]);
        assert!(dashboard.selected.is_none());
    }

    #[test]
    fn selection_clears_when_scope_excludes_the_student() {
        let mut session = session();
        session
            .apply(filter(Field::Programme, "BSc Chemistry"))
            .unwrap();
        assert_eq!(regnums(&session.decision_table()), vec!["R2", "R4", "R9"]);

        session
            .apply(Event::RowSelected {
                regnum: "R9".to_string(),
            })
            .unwrap();
        assert_eq!(session.selected(), Some("R9"));
        let detail = session.selected_record().unwrap();
        assert_eq!(detail.modules.len(), 1);

        session
            .apply(filter(Field::Programme, "BSc Physics"))
            .unwrap();
        assert_eq!(session.selected(), None);
        assert!(session.snapshot().selected.is_none());
    }

    #[test]
    fn drilling_the_programme_chart_switches_the_table() {
        let mut session = session();
        session
            .apply(filter(Field::Programme, "BSc Chemistry"))
            .unwrap();
        session
            .apply(Event::RowSelected {
                regnum: "R9".to_string(),
            })
            .unwrap();

        session
            .apply(Event::Clicked {
                chart: ChartId::ProgrammeDecisions,
                label: "RETAKE".to_string(),
            })
            .unwrap();
        let table = session.decision_table();
        assert_eq!(table.decision.as_deref(), Some("RETAKE"));
        assert_eq!(regnums(&table), vec!["R3"]);
        assert_eq!(session.selected(), None);

        let drill = session.drill(ChartId::ProgrammeDecisions).unwrap();
        assert_eq!(drill.view.result.labels(), vec!["CHM101", "CHM102"]);

        session
            .apply(Event::BackPressed {
                chart: ChartId::ProgrammeDecisions,
            })
            .unwrap();
        assert_eq!(session.decision_table().decision.as_deref(), Some("PASS"));
    }

    #[test]
    fn navigators_are_independent() {
        let mut session = session();
        session
            .apply(Event::Clicked {
                chart: ChartId::FacultyDecisions,
                label: "PASS".to_string(),
            })
            .unwrap();

        let faculty = session.navigator_state(ChartId::FacultyDecisions).unwrap();
        let programme = session.navigator_state(ChartId::ProgrammeDecisions).unwrap();
        assert_eq!(faculty.level, Level::Detail);
        assert_eq!(programme.level, Level::Summary);
        assert!(!programme.back_visible);
    }

    #[test]
    fn filter_change_keeps_detail_level() {
        let mut session = session();
        session
            .apply(Event::Clicked {
                chart: ChartId::FacultyDecisions,
                label: "RETAKE".to_string(),
            })
            .unwrap();
        session.apply(filter(Field::Faculty, "Arts")).unwrap();

        let drill = session.drill(ChartId::FacultyDecisions).unwrap();
        assert_eq!(drill.state.active_label.as_deref(), Some("RETAKE"));
        assert_eq!(drill.view.label.as_deref(), Some("PASS"));
        assert!(drill.view.fallback);
        assert_eq!(drill.view.result.labels(), vec!["HIS"]);
    }

    #[test]
    fn summary_policy_reverts_on_scope_change() {
        let config = DashboardConfig {
            label_miss: LabelMissPolicy::Summary,
            ..DashboardConfig::default()
        };
        let mut session = Session::new(fixtures::dataset(), config);
        session
            .apply(Event::Clicked {
                chart: ChartId::FacultyDecisions,
                label: "RETAKE".to_string(),
            })
            .unwrap();
        session.apply(filter(Field::Faculty, "Arts")).unwrap();

        let state = session.navigator_state(ChartId::FacultyDecisions).unwrap();
        assert_eq!(state.level, Level::Summary);
        assert_eq!(state.active_label, None);
    }

    #[test]
    fn empty_dataset_renders_no_data() {
        let mut session = Session::new(Dataset::default(), DashboardConfig::default());
        session
            .apply(Event::Clicked {
                chart: ChartId::ProgrammeDecisions,
                label: "PASS".to_string(),
            })
            .unwrap();
        let dashboard = session.snapshot();

        assert_eq!(dashboard.empty_scope, Some(Field::Faculty));
        assert!(dashboard.panels.iter().all(|panel| panel.result.is_empty()));
        assert!(dashboard.drills.iter().all(|drill| drill.view.result.is_empty()));
        assert_eq!(dashboard.table.decision, None);
    }

    #[test]
    fn unmatched_scope_aggregates_to_nothing() {
        let session = session();
        let scope = Scope::all()
            .with(Field::Faculty, "Arts")
            .with(Field::Programme, "BA History")
            .with(Field::AttendanceType, "Part Time")
            .with(Field::AcademicYear, "2022")
            .with(Field::Semester, "1");

        let result = session.aggregation(&scope, &Query::count(Field::Decision));
        assert!(result.is_empty());
        assert_eq!(
            session
                .valid_options(Field::AttendanceType, &scope)
                .unwrap(),
            vec!["Full Time"]
        );
    }

    #[test]
    fn filtering_on_a_non_node_column_is_an_error() {
        let mut session = session();
        let err = session.apply(filter(Field::Module, "PHY101")).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Filter(FilterError::UnknownNode(Field::Module))
        ));
        assert_eq!(session.filters().selected(Field::Programme), Some("BSc Physics"));
    }

    #[test]
    fn events_read_from_json() {
        let events: Vec<Event> = serde_json::from_str(
            r#"[
                {"event": "filter_changed", "node": "programme", "value": "BSc Chemistry"},
                {"event": "clicked", "chart": "programme_decisions", "label": "PASS"},
                {"event": "row_selected", "regnum": "R4"},
                {"event": "back_pressed", "chart": "programme_decisions"},
                {"event": "row_deselected"}
            ]"#,
        )
        .unwrap();

        assert_eq!(events[0], filter(Field::Programme, "BSc Chemistry"));
        assert_eq!(events[4], Event::RowDeselected);

        let mut session = session();
        for event in events.into_iter().take(3) {
            session.apply(event).unwrap();
        }
        assert_eq!(session.selected(), Some("R4"));
        assert_eq!(session.snapshot().selected.unwrap().surname, "SurR4");
    }
}
