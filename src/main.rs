use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use session_booking_priority::models::StudentSnapshot;
use session_booking_priority::report::{self, BookingRoster};
use session_booking_priority::{classify, db, ranking, snapshots, telemetry, EngineConfig};

#[derive(Parser)]
#[command(name = "session-booking-priority")]
#[command(about = "Booking priority and wait warnings for flight-training students", long_about = None)]
struct Cli {
    /// JSON file with wait thresholds and priority weights
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Course id to load active students from Postgres
    #[arg(long)]
    course: Option<i64>,
    /// CSV file of precomputed student snapshots
    #[arg(long)]
    snapshots: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import student events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank active students by booking priority
    Rank {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Show the wait warning for a number of days since the last session
    Classify {
        #[arg(long, allow_negative_numbers = true)]
        days: i64,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_snapshots(
    source: &SourceArgs,
    config: &EngineConfig,
    today: NaiveDate,
) -> anyhow::Result<(String, Vec<StudentSnapshot>)> {
    match (source.course, source.snapshots.as_deref()) {
        (Some(course_id), _) => {
            let pool = connect().await?;
            let rows =
                db::fetch_snapshots(&pool, course_id, today, config.activity_window_days).await?;
            Ok((format!("course {course_id}"), rows))
        }
        (None, Some(path)) => Ok((describe_path(path), snapshots::load_snapshots(path)?)),
        (None, None) => anyhow::bail!("either --course or --snapshots is required"),
    }
}

fn describe_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_roster(
    config: &EngineConfig,
    label: &str,
    rows: &[StudentSnapshot],
) -> anyhow::Result<Option<BookingRoster>> {
    if rows.is_empty() {
        warn!(source = label, "no active students to rank");
        return Ok(None);
    }

    let calculator = config.calculator()?;
    let ranking = ranking::rank(&calculator, rows)
        .with_context(|| format!("failed to rank students for {label}"))?;
    info!(
        source = label,
        students = ranking.len(),
        average_wait = ranking.average_wait,
        "ranked students"
    );

    Ok(Some(report::build_roster(&ranking, &config.wait)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("BOOKING_LOG_LEVEL")
        .unwrap_or_else(|_| telemetry::DEFAULT_LOG_LEVEL.to_string());
    telemetry::init(&log_level)?;

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("invalid configuration")?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} events from {}.", csv.display());
        }
        Commands::Rank {
            source,
            limit,
            format,
        } => {
            let (label, rows) = load_snapshots(&source, &config, today).await?;
            let Some(roster) = build_roster(&config, &label, &rows)? else {
                println!("No active students found for {label}.");
                return Ok(());
            };

            match format {
                OutputFormat::Text => print!("{}", report::render_text(&roster, limit)),
                OutputFormat::Json => {
                    let mut limited = roster;
                    limited.students.truncate(limit);
                    println!("{}", serde_json::to_string_pretty(&limited)?);
                }
            }
        }
        Commands::Report {
            source,
            limit,
            out,
        } => {
            let (label, rows) = load_snapshots(&source, &config, today).await?;
            let Some(roster) = build_roster(&config, &label, &rows)? else {
                println!("No active students found for {label}.");
                return Ok(());
            };

            let report = report::build_report(&label, today, &roster, limit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Classify { days } => {
            let level = classify(days, &config.wait);
            let (overdue_days, late_days) = config.wait.thresholds();
            println!(
                "{days} days: {level} (overdue from {overdue_days} days, late from {late_days} days)"
            );
        }
    }

    Ok(())
}
