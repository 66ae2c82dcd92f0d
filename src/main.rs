use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use results_explorer::config::DEFAULT_DATA_PATH;
use results_explorer::report;
use results_explorer::{
    logging, DashboardConfig, Dataset, Event, Field, LabelMissPolicy, Metric, Session,
};

#[derive(Parser)]
#[command(name = "results-explorer")]
#[command(about = "Faculty and programme summaries of a student results table", long_about = None)]
struct Cli {
    /// Results CSV (falls back to RESULTS_CSV, then ./data/new_data.csv)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Mark at or above which a module counts as passed
    #[arg(long, global = true, default_value_t = 50.0)]
    pass_mark: f64,

    /// Modules shown in the pass-rate chart
    #[arg(long, global = true, default_value_t = 20)]
    module_top: usize,

    /// Programmes shown when drilling into a faculty decision
    #[arg(long, global = true, default_value_t = 10)]
    programme_top: usize,

    /// Behavior when a drill label is not in the current categories
    #[arg(long, global = true, value_enum, default_value_t = LabelMiss::FirstCategory)]
    label_miss: LabelMiss,

    /// Debug logging for this crate
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LabelMiss {
    /// Show the first current category instead
    FirstCategory,
    /// Stay on (or return to) the summary
    Summary,
}

impl From<LabelMiss> for LabelMissPolicy {
    fn from(value: LabelMiss) -> Self {
        match value {
            LabelMiss::FirstCategory => LabelMissPolicy::FirstCategory,
            LabelMiss::Summary => LabelMissPolicy::Summary,
        }
    }
}

#[derive(Args)]
struct ScopeArgs {
    #[arg(long)]
    faculty: Option<String>,
    #[arg(long)]
    programme: Option<String>,
    #[arg(long)]
    attendance: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    semester: Option<String>,
}

impl ScopeArgs {
    fn events(self) -> Vec<Event> {
        [
            (Field::Faculty, self.faculty),
            (Field::Programme, self.programme),
            (Field::AttendanceType, self.attendance),
            (Field::AcademicYear, self.year),
            (Field::Semester, self.semester),
        ]
        .into_iter()
        .filter_map(|(node, value)| value.map(|value| Event::FilterChanged { node, value }))
        .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved filter chain
    Options {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Print every dashboard panel for the resolved scope
    Summary {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        json: bool,
    },
    /// Apply a JSON array of events and print the final dashboard
    Replay {
        #[arg(long)]
        events: PathBuf,
    },
    /// Show one student's detail panel
    Student {
        #[arg(long)]
        regnum: String,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn format_metric(metric: &Metric) -> String {
    match metric {
        Metric::Count(count) => count.to_string(),
        Metric::Rate(rate) => format!("{:.1}%", rate.percent()),
    }
}

fn apply_all(session: &mut Session, events: Vec<Event>) -> anyhow::Result<()> {
    for event in events {
        session.apply(event).context("failed to apply event")?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let data_path = cli
        .data
        .or_else(|| std::env::var_os("RESULTS_CSV").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
    let dataset = Dataset::load(&data_path)
        .with_context(|| format!("failed to load results from {}", data_path.display()))?;

    let config = DashboardConfig {
        pass_mark: cli.pass_mark,
        module_top_n: cli.module_top,
        programme_top_n: cli.programme_top,
        label_miss: cli.label_miss.into(),
    };
    let mut session = Session::new(dataset, config);

    match cli.command {
        Commands::Options { scope } => {
            apply_all(&mut session, scope.events())?;
            for node in session.filters().states() {
                println!(
                    "{}: {} [{}]",
                    node.id,
                    node.selected.as_deref().unwrap_or("-"),
                    node.options.join(", ")
                );
            }
        }
        Commands::Summary { scope, json } => {
            apply_all(&mut session, scope.events())?;
            let dashboard = session.snapshot();

            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
                return Ok(());
            }
            if let Some(node) = dashboard.empty_scope {
                println!("No data: nothing matches the selection at {node}.");
                return Ok(());
            }

            for panel in &dashboard.panels {
                println!("{} ({}):", panel.id.title(), panel.total);
                for entry in &panel.result.entries {
                    println!("- {} {}", entry.label, format_metric(&entry.metric));
                }
            }
            for drill in &dashboard.drills {
                println!("{} ({}):", drill.chart, drill.total);
                for entry in &drill.view.result.entries {
                    println!("- {} {}", entry.label, format_metric(&entry.metric));
                }
            }
            if let Some(decision) = &dashboard.table.decision {
                println!("{decision} ({}):", dashboard.table.students);
                for row in &dashboard.table.rows {
                    println!("- {} {} {}", row.regnum, row.firstnames, row.surname);
                }
            }
        }
        Commands::Replay { events } => {
            let text = std::fs::read_to_string(&events)
                .with_context(|| format!("failed to read {}", events.display()))?;
            let parsed: Vec<Event> =
                serde_json::from_str(&text).context("events file is not a JSON event list")?;
            apply_all(&mut session, parsed)?;
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
        }
        Commands::Student { regnum } => match session.student(&regnum) {
            Some(student) => {
                println!("{} {} ({})", student.firstnames, student.surname, student.regnum);
                println!(
                    "{} | {} | {} | {} semester {}",
                    student.programmecode,
                    student.decision,
                    student.attendancetype,
                    student.academicyear,
                    student.semester
                );
                for module in &student.modules {
                    println!("- {} {} {}", module.module, module.mark_text(), module.grade);
                }
            }
            None => println!("No student with registration number {regnum}."),
        },
        Commands::Report { scope, out } => {
            apply_all(&mut session, scope.events())?;
            let report = report::build_report(
                &session.snapshot(),
                chrono::Local::now().naive_local(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
