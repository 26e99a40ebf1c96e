//! SMADA - attendance and discipline points for SMAN 2 Tanggul
//!
//! The `smada` command drives the student dashboard's core logic from a
//! terminal.
//!
//! ## Commands
//!
//! - `attend`: Check in or out at the school geofence
//! - `stats` / `history` / `attendance`: Inspect the stored state
//! - `reward` / `violation`: Apply a catalog action from the teacher panel
//! - `insight`: Summarise the student's behavior
//! - `distance`: Great-circle distance between two points

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use smada_geofence::{
    acquire_report, compute_distance, emit_attempt_classified, wib_offset, AttemptSpan,
    AttendanceAttempt, AttendanceOutcome, Direction, FailingLocationSource, FixedLocationSource,
    GeoPoint, Haversine, LocationFailure, LocationReading, LocationReport, LocationSource,
    PresenceClassifier, PresenceSettings,
};
use smada_insight::{
    analyze_or_fallback, BehaviorInsight, FailingInsightProvider, GeminiClient, InsightProvider,
    InsightRequest,
};
use smada_state::{
    AttendanceRecord, JsonFileStateStore, StateContainer, REWARD_TYPES, VIOLATION_TYPES,
};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "smada")]
#[command(author = "SMAN 2 Tanggul Dev Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SMADA attendance and discipline points", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// State document location
    #[arg(
        long,
        global = true,
        env = "SMADA_STATE_FILE",
        default_value = ".smada/state.json"
    )]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distance in meters between a point and the school (or another point)
    Distance {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Second point latitude (default: school anchor)
        #[arg(long, allow_negative_numbers = true, requires = "to_lng")]
        to_lat: Option<f64>,

        /// Second point longitude (default: school anchor)
        #[arg(long, allow_negative_numbers = true, requires = "to_lat")]
        to_lng: Option<f64>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check in or out
    Attend {
        #[arg(value_enum)]
        direction: DirectionArg,

        #[command(flatten)]
        location: LocationArgs,

        /// Attempt time, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show points, violations and attendance count
    Stats {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the point ledger, newest first
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Only entries whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show recorded attendance, newest first
    Attendance {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List reward and violation types
    Catalog {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Apply a reward from the catalog (e.g. R1)
    Reward { code: String },

    /// Apply a violation from the catalog (e.g. V2)
    Violation { code: String },

    /// Summarise the student's behavior
    Insight {
        /// Skip the Gemini call and show the default summary
        #[arg(long)]
        offline: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Discard stored state and start from the demo student
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    In,
    Out,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::In => Direction::In,
            DirectionArg::Out => Direction::Out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LocationErrorArg {
    Denied,
    Unavailable,
}

impl From<LocationErrorArg> for LocationFailure {
    fn from(arg: LocationErrorArg) -> Self {
        match arg {
            LocationErrorArg::Denied => LocationFailure::PermissionDenied,
            LocationErrorArg::Unavailable => LocationFailure::Unavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Where the device position comes from
#[derive(Debug, Clone, Args)]
struct LocationArgs {
    /// Reported latitude
    #[arg(long, allow_negative_numbers = true, requires = "lng", conflicts_with = "location_error")]
    lat: Option<f64>,

    /// Reported longitude
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lng: Option<f64>,

    /// Reported accuracy radius in meters
    #[arg(long)]
    accuracy: Option<f64>,

    /// Simulate a failed location lookup
    #[arg(long, value_enum)]
    location_error: Option<LocationErrorArg>,
}

impl LocationArgs {
    fn source(&self) -> Result<Box<dyn LocationSource>> {
        match (self.lat, self.lng, self.location_error) {
            (_, _, Some(failure)) => Ok(Box::new(FailingLocationSource::new(failure.into()))),
            (Some(lat), Some(lng), None) => {
                let point = GeoPoint::new(lat, lng).context("Invalid reported position")?;
                let mut reading = LocationReading::new(point);
                if let Some(accuracy) = self.accuracy {
                    if !accuracy.is_finite() || accuracy < 0.0 {
                        anyhow::bail!("Invalid --accuracy {accuracy}: must be finite and >= 0");
                    }
                    reading = reading.with_accuracy(accuracy);
                }
                Ok(Box::new(FixedLocationSource::new(reading)))
            }
            _ => anyhow::bail!("Provide --lat and --lng, or --location-error"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    smada_geofence::init_tracing(cli.json, level);

    let settings = PresenceSettings::from_env().context("Invalid presence settings")?;
    let state_file = cli.state_file.as_path();

    match cli.command {
        Commands::Distance {
            lat,
            lng,
            to_lat,
            to_lng,
            format,
        } => cmd_distance(&settings, lat, lng, to_lat.zip(to_lng), format),
        Commands::Attend {
            direction,
            location,
            at,
            format,
        } => {
            cmd_attend(
                state_file,
                &settings,
                direction.into(),
                &location,
                at.as_deref(),
                format,
            )
            .await
        }
        Commands::Stats { format } => cmd_stats(state_file, format).await,
        Commands::History {
            limit,
            search,
            format,
        } => cmd_history(state_file, limit, search.as_deref(), format).await,
        Commands::Attendance { limit, format } => cmd_attendance(state_file, limit, format).await,
        Commands::Catalog { format } => cmd_catalog(format),
        Commands::Reward { code } => cmd_apply(state_file, &code, ActionGroup::Reward).await,
        Commands::Violation { code } => cmd_apply(state_file, &code, ActionGroup::Violation).await,
        Commands::Insight { offline, format } => {
            cmd_insight(state_file, &settings, offline, format).await
        }
        Commands::Reset => cmd_reset(state_file).await,
    }
}

async fn open_state(state_file: &Path) -> Result<StateContainer<JsonFileStateStore>> {
    StateContainer::open(JsonFileStateStore::new(state_file), Utc::now())
        .await
        .with_context(|| format!("Failed to open state file {:?}", state_file))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&wib_offset())
        .format("%Y-%m-%d %H:%M WIB")
        .to_string()
}

fn parse_timestamp(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .with_context(|| format!("Invalid --at timestamp (expected RFC 3339): {}", raw)),
    }
}

#[derive(Serialize)]
struct DistanceOutput {
    from: GeoPoint,
    to: GeoPoint,
    distance_m: f64,
    within_geofence: Option<bool>,
}

fn cmd_distance(
    settings: &PresenceSettings,
    lat: f64,
    lng: f64,
    to: Option<(f64, f64)>,
    format: OutputFormat,
) -> Result<()> {
    let from = GeoPoint::new(lat, lng).context("Invalid first point")?;
    let (target, fence_check) = match to {
        Some((to_lat, to_lng)) => (
            GeoPoint::new(to_lat, to_lng).context("Invalid second point")?,
            false,
        ),
        None => (*settings.geofence.anchor(), true),
    };

    let output = DistanceOutput {
        from,
        to: target,
        distance_m: compute_distance(&from, &target),
        within_geofence: fence_check.then(|| settings.geofence.contains(&from)),
    };

    if format == OutputFormat::Json {
        return print_json(&output);
    }
    println!("{:.1} m", output.distance_m);
    if let Some(within) = output.within_geofence {
        println!(
            "{} geofence of {} ({:.0} m)",
            if within { "Inside" } else { "Outside" },
            settings.geofence.label(),
            settings.geofence.radius_m()
        );
    }
    Ok(())
}

/// Classify one attempt and record it when accepted.
async fn attend(
    container: &mut StateContainer<JsonFileStateStore>,
    settings: &PresenceSettings,
    direction: Direction,
    report: LocationReport,
    timestamp: DateTime<Utc>,
) -> Result<(AttendanceOutcome, Option<AttendanceRecord>)> {
    let reporter_id = container.state().current_user.id.clone();
    let attempt = AttendanceAttempt::new(reporter_id, report, timestamp, direction);

    let classifier = PresenceClassifier::new(Haversine);
    let outcome = classifier.classify(&attempt, &settings.geofence, settings.late_cutoff.as_ref());
    emit_attempt_classified(&attempt, &outcome);

    if !outcome.verdict.is_accepted() {
        return Ok((outcome, None));
    }
    let record = container
        .record_attendance(&attempt, &outcome)
        .await
        .context("Failed to record attendance")?;
    Ok((outcome, Some(record)))
}

async fn cmd_attend(
    state_file: &Path,
    settings: &PresenceSettings,
    direction: Direction,
    location: &LocationArgs,
    at: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let timestamp = parse_timestamp(at)?;
    let source = location.source()?;
    let mut container = open_state(state_file).await?;

    let _span = AttemptSpan::enter(&container.state().current_user.id, &direction.to_string());
    let report = acquire_report(source.as_ref(), settings.location_timeout).await;
    let (outcome, record) = attend(&mut container, settings, direction, report, timestamp).await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "outcome": outcome,
            "record": record,
        }))?,
        OutputFormat::Text => {
            println!("{}", outcome.message());
            if let Some(record) = &record {
                println!(
                    "Recorded {} at {} [{}]",
                    record.direction,
                    local_time(&record.timestamp),
                    record.status
                );
            }
        }
    }

    if !outcome.verdict.is_accepted() {
        anyhow::bail!("Attendance rejected: {}", outcome.verdict);
    }
    Ok(())
}

async fn cmd_stats(state_file: &Path, format: OutputFormat) -> Result<()> {
    let container = open_state(state_file).await?;
    let stats = container.stats();

    if format == OutputFormat::Json {
        return print_json(&stats);
    }

    let student = &container.state().current_user;
    println!("{} ({}) - {}", student.name, student.id, student.class_name);
    println!("Points:     {}", stats.points);
    println!("Violations: {}", stats.violations);
    println!("Attendance: {}", stats.attendance_count);
    match &stats.last_attendance {
        Some(last) => println!(
            "Last:       {} at {} [{}]",
            last.direction,
            local_time(&last.timestamp),
            last.status
        ),
        None => println!("Last:       -"),
    }
    Ok(())
}

async fn cmd_history(
    state_file: &Path,
    limit: usize,
    search: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let container = open_state(state_file).await?;
    let entries: Vec<_> = match search {
        Some(query) => container.search_history(query).into_iter().take(limit).collect(),
        None => container.recent_history(limit).iter().collect(),
    };

    if format == OutputFormat::Json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No history entries found");
        return Ok(());
    }
    for log in entries {
        println!(
            "{}  {:>5}  {}  [{}]",
            local_time(&log.date),
            log.signed_points(),
            log.title,
            log.kind
        );
        if !log.description.is_empty() {
            println!("                          {}", log.description);
        }
    }
    Ok(())
}

async fn cmd_attendance(state_file: &Path, limit: usize, format: OutputFormat) -> Result<()> {
    let container = open_state(state_file).await?;
    let records = container.recent_attendance(limit);

    if format == OutputFormat::Json {
        return print_json(records);
    }
    if records.is_empty() {
        println!("No attendance recorded yet");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {:<3}  {:<7}  {:.0} m  {}",
            local_time(&record.timestamp),
            record.direction,
            record.status,
            record.distance_m,
            record.location
        );
    }
    Ok(())
}

fn cmd_catalog(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "rewards": REWARD_TYPES,
            "violations": VIOLATION_TYPES,
        }));
    }

    println!("Rewards:");
    for action in REWARD_TYPES.iter() {
        println!("  {}  {:>+5}  {}", action.code, action.points, action.label);
    }
    println!("Violations:");
    for action in VIOLATION_TYPES.iter() {
        println!("  {}  {:>+5}  {}", action.code, action.points, action.label);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionGroup {
    Reward,
    Violation,
}

impl ActionGroup {
    fn contains(&self, code: &str) -> bool {
        let group = match self {
            ActionGroup::Reward => &REWARD_TYPES,
            ActionGroup::Violation => &VIOLATION_TYPES,
        };
        group.iter().any(|a| a.code.eq_ignore_ascii_case(code.trim()))
    }
}

async fn cmd_apply(state_file: &Path, code: &str, group: ActionGroup) -> Result<()> {
    if !group.contains(code) {
        anyhow::bail!(
            "Unknown {} code: {} (see `smada catalog`)",
            if group == ActionGroup::Reward { "reward" } else { "violation" },
            code
        );
    }

    let mut container = open_state(state_file).await?;
    let log = container
        .apply_action(code, Utc::now())
        .await
        .context("Failed to apply action")?;

    info!(code = %code, points = log.points, "action applied");
    println!("{} {} ({})", log.signed_points(), log.title, log.description);
    println!("Balance: {} points", container.stats().points);
    Ok(())
}

async fn cmd_insight(
    state_file: &Path,
    settings: &PresenceSettings,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    let container = open_state(state_file).await?;
    let state = container.state();
    let request = InsightRequest::from_student(
        &state.current_user,
        &state.history,
        &settings.geofence.label(),
    );

    let provider: Box<dyn InsightProvider> = if offline {
        Box::new(FailingInsightProvider::offline())
    } else {
        match GeminiClient::from_env() {
            Ok(client) => Box::new(client),
            Err(e) => {
                warn!(error = %e, "Gemini unavailable, using default summary");
                Box::new(FailingInsightProvider::new(e))
            }
        }
    };
    let insight = analyze_or_fallback(provider.as_ref(), &request).await;

    print_insight(&insight, format)
}

fn print_insight(insight: &BehaviorInsight, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(insight);
    }
    println!("Summary: {}", insight.summary);
    println!("Advice:  {}", insight.advice);
    println!("Risk:    {}", insight.risk_level);
    Ok(())
}

async fn cmd_reset(state_file: &Path) -> Result<()> {
    let mut container = open_state(state_file).await?;
    container
        .reset(Utc::now())
        .await
        .context("Failed to reset state")?;
    println!("State reset to the demo student");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smada_geofence::{OnTimeStatus, Verdict, SCHOOL_ANCHOR};
    use smada_state::{AttendanceStatus, StateStore};

    fn wib(h: u32, m: u32) -> DateTime<Utc> {
        wib_offset()
            .with_ymd_and_hms(2024, 8, 5, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_cli_parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "smada", "attend", "in", "--lat", "-8.1565", "--lng", "113.4475",
        ])
        .unwrap();
        match cli.command {
            Commands::Attend { direction, location, .. } => {
                assert_eq!(direction, DirectionArg::In);
                assert_eq!(location.lat, Some(-8.1565));
            }
            _ => panic!("expected attend"),
        }
    }

    #[test]
    fn test_cli_rejects_coordinates_with_location_error() {
        let result = Cli::try_parse_from([
            "smada", "attend", "out", "--lat", "-8.1", "--lng", "113.4", "--location-error",
            "denied",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_location_args_require_a_source() {
        let args = LocationArgs {
            lat: None,
            lng: None,
            accuracy: None,
            location_error: None,
        };
        assert!(args.source().is_err());
    }

    #[test]
    fn test_location_args_reject_bad_accuracy() {
        for accuracy in [-5.0, f64::NAN, f64::INFINITY] {
            let args = LocationArgs {
                lat: Some(-8.16),
                lng: Some(113.45),
                accuracy: Some(accuracy),
                location_error: None,
            };
            assert!(args.source().is_err(), "accuracy {accuracy} should be rejected");
        }

        let args = LocationArgs {
            lat: Some(-8.16),
            lng: Some(113.45),
            accuracy: Some(0.0),
            location_error: None,
        };
        assert!(args.source().is_ok());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(Some("2024-08-05T07:00:00+07:00")).unwrap();
        assert_eq!(ts, wib(7, 0));
        assert!(parse_timestamp(Some("yesterday")).is_err());
    }

    #[test]
    fn test_action_group_membership() {
        assert!(ActionGroup::Reward.contains("r1"));
        assert!(!ActionGroup::Reward.contains("V1"));
        assert!(ActionGroup::Violation.contains("V4"));
    }

    #[tokio::test]
    async fn test_accepted_attempt_is_persisted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_file = temp_dir.path().join("state.json");
        let settings = PresenceSettings::default();
        let mut container = open_state(&state_file).await.unwrap();

        let report = LocationReport::fix(SCHOOL_ANCHOR.destination(90.0, 120.0));
        let (outcome, record) = attend(&mut container, &settings, Direction::In, report, wib(7, 10))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Accepted);
        assert_eq!(outcome.on_time_status, OnTimeStatus::Late);
        assert_eq!(record.unwrap().status, AttendanceStatus::Late);

        let stored = JsonFileStateStore::new(&state_file).load().await.unwrap().unwrap();
        assert_eq!(stored.attendance.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_attempt_is_not_persisted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_file = temp_dir.path().join("state.json");
        let settings = PresenceSettings::default();
        let mut container = open_state(&state_file).await.unwrap();

        let report = LocationReport::failed(LocationFailure::PermissionDenied);
        let (outcome, record) = attend(&mut container, &settings, Direction::In, report, wib(6, 30))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::RejectedPermission);
        assert!(record.is_none());
        assert!(container.state().attendance.is_empty());
    }

    #[tokio::test]
    async fn test_cmd_apply_rejects_code_from_other_group() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_file = temp_dir.path().join("state.json");

        assert!(cmd_apply(&state_file, "V1", ActionGroup::Reward).await.is_err());
        cmd_apply(&state_file, "V1", ActionGroup::Violation).await.unwrap();

        let container = open_state(&state_file).await.unwrap();
        assert_eq!(container.stats().points, 115);
        assert_eq!(container.stats().violations, 3);
    }
}
