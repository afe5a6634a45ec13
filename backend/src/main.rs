//! House points CLI - weekly staff summaries from rewards exports
//!
//! # Main Commands
//!
//! ```bash
//! housepoints run rewards.csv --roster staff.csv   # Full weekly run + workbook
//! housepoints serve                                # Start HTTP server (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! housepoints load rewards.csv                     # Show how the file was read
//! housepoints roster staff.csv                     # Show the parsed roster
//! housepoints tracker stats cumulative_tracker.csv # Running averages
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use housepoints::{
    export::{render_markdown, render_table, stats_table, write_csv_dir, write_workbook},
    parse_file_auto, align_headers, normalize, run_file, ConductMeasure, CumulativeTracker,
    PipelineConfig, Roster, TrackerOutcome, DEFAULT_TRACKER_PATH,
};

#[derive(Parser)]
#[command(name = "housepoints")]
#[command(about = "Weekly house and conduct points summaries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by `run` and `serve`.
#[derive(clap::Args)]
struct RunOptions {
    /// Weekly house points target per staff member
    #[arg(short, long)]
    target: Option<i64>,

    /// Cumulative tracker CSV (default: ./cumulative_tracker.csv)
    #[arg(long, conflicts_with = "no_tracker")]
    tracker: Option<PathBuf>,

    /// Do not read or append the cumulative tracker
    #[arg(long)]
    no_tracker: bool,

    /// How conduct events are measured
    #[arg(long, value_enum)]
    conduct_measure: Option<ConductMeasure>,

    /// Never rename columns by position
    #[arg(long)]
    no_positional: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Full weekly run: load, summarize, update tracker, export
    Run {
        /// Rewards export (CSV or other delimited text)
        input: PathBuf,

        /// Staff roster CSV (First Name, Surname, Initials, Dep)
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// Week label (default: today)
        #[arg(short, long)]
        week: Option<String>,

        #[command(flatten)]
        options: RunOptions,

        /// Workbook path (default: weekly_summary_<week>.xlsx)
        #[arg(long, conflicts_with = "no_excel")]
        excel: Option<PathBuf>,

        /// Skip the workbook
        #[arg(long)]
        no_excel: bool,

        /// Also write one CSV per view into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,

        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read and normalize a rewards file, output events as JSON
    Load {
        /// Rewards export
        input: PathBuf,

        /// Never rename columns by position
        #[arg(long)]
        no_positional: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a staff roster and output it as JSON
    Roster {
        /// Staff roster CSV
        file: PathBuf,
    },

    /// Inspect a cumulative tracker
    Tracker {
        #[command(subcommand)]
        action: TrackerAction,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        #[command(flatten)]
        options: RunOptions,
    },
}

#[derive(Subcommand)]
enum TrackerAction {
    /// Running totals and averages per staff member
    Stats {
        /// Tracker CSV
        path: PathBuf,

        /// Weekly house points target
        #[arg(short, long)]
        target: Option<i64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            roster,
            week,
            options,
            excel,
            no_excel,
            csv_dir,
            format,
            output,
        } => {
            let mut config = options.apply(PipelineConfig::from_env());
            if let Some(week) = week {
                config.week_label = week;
            }
            let excel = if no_excel {
                None
            } else {
                Some(excel.unwrap_or_else(|| PathBuf::from(config.export_file_name())))
            };
            cmd_run(
                &input,
                roster.as_deref(),
                &config,
                excel.as_deref(),
                csv_dir.as_deref(),
                format,
                output.as_deref(),
            )
        }

        Commands::Load {
            input,
            no_positional,
            output,
        } => cmd_load(&input, no_positional, output.as_deref()),

        Commands::Roster { file } => cmd_roster(&file),

        Commands::Tracker { action } => cmd_tracker(action),

        Commands::Serve { port, options } => {
            let config = options.apply(PipelineConfig::from_env());
            cmd_serve(port, config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

impl RunOptions {
    /// Overlay CLI flags on an environment-derived config.
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(target) = self.target {
            config.weekly_target = target;
        }
        if let Some(measure) = self.conduct_measure {
            config.conduct_measure = measure;
        }
        config.tracker_path = if self.no_tracker {
            None
        } else {
            self.tracker
                .or(config.tracker_path)
                .or_else(|| Some(PathBuf::from(DEFAULT_TRACKER_PATH)))
        };
        config.allow_positional = !self.no_positional;
        config
    }
}

fn cmd_run(
    input: &Path,
    roster: Option<&Path>,
    config: &PipelineConfig,
    excel: Option<&Path>,
    csv_dir: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = match roster {
        Some(path) => {
            let roster = Roster::from_csv_path(path)?;
            eprintln!("👥 Staff roster: {} entries", roster.len());
            Some(roster)
        }
        None => None,
    };

    let report = run_file(input, roster.as_ref(), config)?;
    let tables = report.tables();

    if let Some(path) = excel {
        write_workbook(&tables, path)?;
        eprintln!("💾 Workbook written to: {}", path.display());
    }
    if let Some(dir) = csv_dir {
        let written = write_csv_dir(&tables, dir)?;
        eprintln!("💾 {} CSV files written to: {}", written.len(), dir.display());
    }

    let content = match format {
        OutputFormat::Markdown => render_markdown(&report),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };
    write_output(&content, output)?;

    if let TrackerOutcome::Failed { message, .. } = &report.tracker {
        eprintln!("⚠️  Cumulative tracker was not updated: {}", message);
    }
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_load(
    input: &Path,
    no_positional: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());
    let config = PipelineConfig {
        allow_positional: !no_positional,
        ..PipelineConfig::from_env()
    };

    let table = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", table.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(table.delimiter));
    eprintln!("   Columns: {}", table.headers.join(", "));

    let aligned = align_headers(
        &table,
        &config.expected_columns,
        &config.optional_columns,
        config.allow_positional,
    );
    eprintln!("   Matched by: {}", aligned.strategy);
    if !aligned.missing.is_empty() {
        eprintln!("   ⚠️  Missing: {}", aligned.missing.join(", "));
    }

    let (events, report) = normalize(&aligned, &config.houses);
    eprintln!("✅ {} events", events.len());
    if report.coerced_points + report.unknown_dates + report.unmapped_houses > 0 {
        eprintln!(
            "   {} bad points, {} unreadable dates, {} unknown houses",
            report.coerced_points, report.unknown_dates, report.unmapped_houses
        );
    }

    write_output(&serde_json::to_string_pretty(&events)?, output)
}

fn cmd_roster(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let roster = Roster::from_csv_path(file)?;
    eprintln!("👥 {} staff", roster.len());
    write_output(&serde_json::to_string_pretty(roster.entries())?, None)
}

fn cmd_tracker(action: TrackerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TrackerAction::Stats {
            path,
            target,
            format,
        } => {
            let target = target.unwrap_or(PipelineConfig::from_env().weekly_target);
            let tracker = CumulativeTracker::new(&path);
            if !path.exists() {
                eprintln!("📒 No tracker at {} yet.", path.display());
            }
            let stats = tracker.stats(target)?;
            let content = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&stats)?,
                OutputFormat::Markdown => render_table(&stats_table(&stats)),
            };
            write_output(&content, None)
        }
    }
}

async fn cmd_serve(port: u16, config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    housepoints::server::start_server(port, config).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
