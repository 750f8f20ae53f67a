use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use incidash::analytics::{
    aggregate, daily_trend, DashboardFilter, IncidentDuration, IncidentStats, TimeWindow,
};
use incidash::app::{self, AppConfig};
use incidash::incidents::{decode_incidents, Incident, IncidentDraft};
use incidash::server::ApiServer;

/// Incident tracking dashboard
#[derive(Parser)]
#[command(name = "incidash")]
#[command(about = "Report, triage and aggregate operational incidents", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate dashboard statistics from a JSON array of incidents
    Stats {
        /// Incident file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Daily incident counts per platform
    Trend {
        /// Incident file
        #[arg(short, long)]
        input: PathBuf,

        /// Only count this platform ("all" for every platform)
        #[arg(long)]
        platform: Option<String>,

        /// Look-back window: 24h, 7d, 30d or all
        #[arg(long, default_value = "all")]
        window: TimeWindow,

        /// Reference time for the window (RFC 3339, defaults to now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Describe the duration between two timestamps
    Duration {
        /// Start time (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// End time (RFC 3339); omit for an open incident
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
    /// Report a new incident from a JSON draft
    Report {
        /// Draft file
        #[arg(short, long)]
        draft: PathBuf,
    },
    /// Serve the REST API
    Serve {
        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        app::handle_fatal_error(e, verbose);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app_config = AppConfig::new(cli.verbose)?.with_config_file(cli.config);
    let (_app_config, config) = app::initialize_app(app_config).await?;

    match cli.command {
        Commands::Stats { input, format } => run_stats(&input, format),
        Commands::Trend {
            input,
            platform,
            window,
            now,
        } => run_trend(&input, platform, window, now.unwrap_or_else(Utc::now)),
        Commands::Duration { start, end } => {
            println!("{}", IncidentDuration::describe(start, end));
            Ok(())
        }
        Commands::Report { draft } => run_report(&draft, &config).await,
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            run_serve(&config).await
        }
    }
}

fn load_incidents(path: &Path) -> Result<Vec<Incident>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let incidents = decode_incidents(&content)
        .with_context(|| format!("Failed to decode incidents from {}", path.display()))?;
    debug!("Loaded {} incidents from {}", incidents.len(), path.display());
    Ok(incidents)
}

fn run_stats(input: &Path, format: OutputFormat) -> Result<()> {
    let incidents = load_incidents(input)?;
    let stats = aggregate(&incidents, Utc::now());

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => print!("{}", render_text(&stats)),
    }
    Ok(())
}

fn render_text(stats: &IncidentStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total incidents:    {}\n", stats.total_incidents));
    out.push_str(&format!("Critical incidents: {}\n", stats.critical_incidents));
    out.push_str(&format!("MTTR:               {:.2}h\n", stats.mttr));
    out.push_str(&format!("Resolution rate:    {:.1}%\n", stats.resolution_rate));

    if !stats.priority_distribution.is_empty() {
        out.push_str("\nBy priority\n");
        for entry in &stats.priority_distribution {
            out.push_str(&format!("  {:<12} {}\n", entry.priority, entry.count));
        }
        out.push_str("\nBy status\n");
        for entry in &stats.status_distribution {
            out.push_str(&format!("  {:<12} {}\n", entry.status, entry.count));
        }
    }

    if !stats.team_stats.is_empty() {
        out.push_str("\nTeams\n");
        for team in &stats.team_stats {
            out.push_str(&format!(
                "  {:<20} {} incidents, {} resolved, mttr {:.2}h, {:.1}% resolved\n",
                team.name, team.incidents, team.resolved, team.mttr, team.resolution_rate
            ));
        }
    }

    if !stats.recent_incidents.is_empty() {
        out.push_str("\nRecent\n");
        for incident in &stats.recent_incidents {
            out.push_str(&format!(
                "  {} [{} {}] {}\n",
                incident.ticket_label(),
                incident.priority,
                incident.status,
                incident.title
            ));
        }
    }
    out
}

fn run_trend(
    input: &Path,
    platform: Option<String>,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Result<()> {
    let incidents = load_incidents(input)?;
    let filter = DashboardFilter::new(platform, window);
    let trend = daily_trend(&filter.apply(&incidents, now));
    println!("{}", serde_json::to_string_pretty(&trend)?);
    Ok(())
}

async fn run_report(draft_path: &Path, config: &incidash::config::DashboardConfig) -> Result<()> {
    let content = std::fs::read_to_string(draft_path)
        .with_context(|| format!("Failed to read {}", draft_path.display()))?;
    let draft: IncidentDraft = serde_json::from_str(&content)
        .with_context(|| format!("Failed to decode draft from {}", draft_path.display()))?;

    let service = app::build_dashboard(config).await?;
    let incident = service.report_incident(draft).await?;
    service.flush_notifications().await;

    info!("Stored incident {} with id {}", incident.ticket_number, incident.id);
    println!("{}", serde_json::to_string_pretty(&incident)?);
    Ok(())
}

async fn run_serve(config: &incidash::config::DashboardConfig) -> Result<()> {
    let service = app::build_dashboard(config).await?;
    service
        .refresh(Utc::now())
        .await
        .context("Failed to load incidents")?;
    let _listener = service.spawn_change_listener();

    ApiServer::new(service, config.server.bind_address())
        .start()
        .await
        .context("API server stopped")?;
    Ok(())
}
