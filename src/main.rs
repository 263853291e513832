//! CLI entry point for the Classeviva sync client.
//!
//! Provides subcommands for a full login-and-sync cycle, inspecting the
//! school calendar and checking how a grade string is parsed.

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use classeviva_sync::{
    analytics::AnalyticsSnapshot,
    calendar::AcademicYearWindow,
    config::PortalConfig,
    infra::classeviva::ClassevivaPortal,
    output::{append_subject_averages, print_pretty, to_json},
    records::parse_grade_value,
    sync::{
        AbsenceBundle, Collection, GradeBundle, SyncEvent, SyncInbox, SyncOrchestrator, SyncReport,
    },
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "classeviva_sync")]
#[command(
    about = "Sync grades and absences from Classeviva and compute statistics",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, fetch grades and absences, and report statistics
    Sync {
        /// Portal username (falls back to CLASSEVIVA_USERNAME)
        #[arg(short, long)]
        username: Option<String>,

        /// Portal password (falls back to CLASSEVIVA_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,

        /// Write the full sync report as JSON to this file
        #[arg(long, value_name = "FILE")]
        json: Option<String>,

        /// CSV file to append subject averages to
        #[arg(long, value_name = "FILE")]
        csv: Option<String>,
    },
    /// Show school days for the academic year
    Calendar {
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        today: Option<NaiveDate>,
    },
    /// Show how a grade as displayed by the portal is interpreted
    ParseGrade {
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/classeviva_sync.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("classeviva_sync.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            username,
            password,
            json,
            csv,
        } => {
            let username = credential(username, "CLASSEVIVA_USERNAME")?;
            let password = credential(password, "CLASSEVIVA_PASSWORD")?;
            let report = run_sync(username, password).await?;

            if let Some(path) = json {
                std::fs::write(&path, to_json(&report)?)
                    .with_context(|| format!("writing {path}"))?;
                info!(path = %path, "Sync report written");
            }
            if let (Some(path), Collection::Ready(grades)) = (csv, &report.grades) {
                let rows = append_subject_averages(&path, &grades.analytics, Utc::now())?;
                info!(path = %path, rows, "Subject averages appended");
            }
        }
        Commands::Calendar { today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let window = AcademicYearWindow::containing(today);
            let days = window.school_days(today);

            info!(
                start = %window.start,
                end = %window.end,
                total = days.total,
                elapsed = days.elapsed,
                remaining = days.remaining,
                progress_pct = days.progress_pct(),
                school_day = window.is_school_day(today),
                "Academic year"
            );
        }
        Commands::ParseGrade { value } => {
            let numeric = parse_grade_value(&value);
            info!(value = %value, numeric = ?numeric, "Parsed grade");
        }
    }

    Ok(())
}

fn credential(flag: Option<String>, var: &str) -> Result<String> {
    flag.or_else(|| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("missing credential: pass it as a flag or set {var}"))
}

/// Runs one login-and-sync sequence in the background and consumes its events.
#[tracing::instrument(skip_all, fields(username = %username))]
async fn run_sync(username: String, password: String) -> Result<SyncReport> {
    let config = PortalConfig::from_env()?;
    let portal = ClassevivaPortal::new(&config)?;
    let orchestrator = SyncOrchestrator::new(portal, config.retry);

    let mut inbox = SyncInbox::new(16);
    let today = Local::now().date_naive();
    let handle = inbox.start(orchestrator, username, password, today);

    let mut grades = Collection::NoData;
    let mut absences = Collection::NoData;
    let mut login_error = None;
    let mut finished = false;

    while let Some(event) = inbox.recv().await {
        let terminal = event.is_terminal();
        finished |= terminal;
        match event {
            SyncEvent::Authenticated { user, .. } => {
                info!(display_name = %user.display_name, "Welcome");
            }
            SyncEvent::AuthenticationFailed { message, .. } => {
                error!(error = %message, "Login failed");
                login_error = Some(message);
            }
            SyncEvent::Grades { grades: g, .. } => {
                log_grades(&g);
                grades = g;
            }
            SyncEvent::Absences { absences: a, .. } => {
                log_absences(&a);
                absences = a;
            }
            SyncEvent::Finished { state, .. } => {
                info!(?state, "Sync finished");
            }
        }
        if terminal {
            break;
        }
    }

    if let Err(e) = handle.await {
        error!(error = %e, "Sync task did not shut down cleanly");
        if !finished {
            return Err(anyhow!("sync aborted: {e}"));
        }
    }
    anyhow::ensure!(finished, "sync ended before reporting a result");

    match login_error {
        Some(message) => Err(anyhow!(message)),
        None => Ok(SyncReport { grades, absences }),
    }
}

fn log_grades(grades: &Collection<GradeBundle>) {
    let Collection::Ready(bundle) = grades else {
        warn!("Grades unavailable");
        return;
    };
    let snap: &AnalyticsSnapshot = &bundle.analytics;

    if snap.is_empty() {
        info!(records = bundle.records.len(), "No grades count toward the average");
        return;
    }

    for subject in &snap.subjects {
        info!(
            subject = %subject.subject,
            first_term = ?subject.averages.first,
            second_term = ?subject.averages.second,
            overall = ?subject.averages.overall,
            grades = subject.grade_count,
            "Subject average"
        );
    }

    info!(
        first_term = ?snap.overall.first,
        second_term = ?snap.overall.second,
        overall = ?snap.overall.overall,
        grades = snap.grade_count,
        subjects = snap.subjects.len(),
        best = snap.ranking.first().map(String::as_str),
        below_passing = snap.below_passing.len(),
        "Overall average"
    );

    for (grade, count) in snap.histogram.iter() {
        info!(grade, count, "Distribution");
    }

    let undated = bundle.records.iter().filter(|r| r.term.is_none()).count();
    if undated > 0 {
        info!(undated, "Grades outside both terms");
    }
    print_pretty(snap);
}

fn log_absences(absences: &Collection<AbsenceBundle>) {
    let Collection::Ready(bundle) = absences else {
        warn!("Absences unavailable");
        return;
    };
    let report = &bundle.report;
    let budget = &report.budget;

    info!(
        absences = report.counts.absences,
        late_arrivals = report.counts.late_arrivals,
        early_departures = report.counts.early_departures,
        unjustified = report.counts.unjustified,
        "Attendance"
    );
    info!(
        total = report.school_days.total,
        elapsed = report.school_days.elapsed,
        remaining = report.school_days.remaining,
        "School days"
    );

    if budget.is_over_limit() {
        warn!(
            limit = budget.limit,
            over_by = budget.available.unsigned_abs(),
            "Absence limit exceeded"
        );
    } else {
        info!(
            limit = budget.limit,
            available = budget.available,
            used_pct = ?budget.used_pct,
            status = ?budget.status,
            "Absence budget"
        );
    }
}
