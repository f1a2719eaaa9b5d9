//! Dashboard Service - Terminal front end for the sales data engine
//!
//! Responsibilities:
//! - Load the orders, customers and products tables (CSV or workbook)
//! - Gate on column validation, reporting every problem per file
//! - Merge off the main task and apply the city filter
//! - Print KPI cards, revenue breakdowns and a row preview (text or JSON)
//! - Append validation and processing failures to the error log
//!
//! Usage:
//!   # Explicit tables:
//!   cargo run --bin dashboard -- --orders o.csv --customers c.csv --products p.xlsx
//!
//!   # Bundled demo tables, filtered to one city:
//!   cargo run --bin dashboard -- --data-dir data --city "תל אביב"

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, ValueEnum};
use engine::numeric::round_half_up;
use engine::{
    load_table, Breakdown, DashboardState, DashboardView, EntityKind, Kpis, MergedRow, ParsedTable,
    UploadSet, ALL_CITIES,
};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PREVIEW_ROWS: usize = 10;
const ERROR_LOG_HEADER: &str = "# Error Log - Digisale Dash\n\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Builds the sales dashboard from orders, customers and products tables")]
struct Args {
    /// Orders table (.csv, .xls, .xlsx, .xlsm, .xlsb, .ods)
    #[arg(long)]
    orders: Option<PathBuf>,

    /// Customers table
    #[arg(long)]
    customers: Option<PathBuf>,

    /// Products table
    #[arg(long)]
    products: Option<PathBuf>,

    /// Directory holding orders_demo.csv, customers_demo.csv and products_demo.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// City to filter on
    #[arg(long, default_value = ALL_CITIES)]
    city: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Number of rows to preview (defaults to DIGISALE_PREVIEW_ROWS or 10)
    #[arg(long)]
    preview: Option<usize>,
}

#[derive(Debug, Clone)]
struct Config {
    error_log: PathBuf,
    preview_rows: usize,
}

impl Config {
    fn from_env() -> Self {
        Self {
            error_log: PathBuf::from(
                std::env::var("DIGISALE_ERROR_LOG").unwrap_or_else(|_| "error_log.md".to_string()),
            ),
            preview_rows: parse_preview_rows(std::env::var("DIGISALE_PREVIEW_ROWS").ok()),
        }
    }
}

fn parse_preview_rows(raw: Option<String>) -> usize {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_PREVIEW_ROWS)
}

// =============================================================================
// ERROR LOG
// =============================================================================

/// Append `[timestamp] [context] ERROR: message` to the markdown error log.
fn log_error(path: &Path, context: &str, message: &str) -> Result<()> {
    let is_new = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open error log {}", path.display()))?;

    if is_new {
        file.write_all(ERROR_LOG_HEADER.as_bytes())?;
    }

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] [{}] ERROR: {}", timestamp, context, message)?;
    Ok(())
}

/// Log to the error file without letting a log failure mask the real one.
fn record_failure(config: &Config, context: &str, message: &str) {
    if let Err(e) = log_error(&config.error_log, context, message) {
        warn!("could not write error log: {:#}", e);
    }
}

// =============================================================================
// LOADING
// =============================================================================

fn demo_file(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Orders => "orders_demo.csv",
        EntityKind::Customers => "customers_demo.csv",
        EntityKind::Products => "products_demo.csv",
    }
}

/// Pick the path for each table: explicit flag first, then the demo directory.
fn resolve_paths(args: &Args) -> Result<Vec<(EntityKind, PathBuf)>> {
    EntityKind::ALL
        .into_iter()
        .map(|kind| -> Result<(EntityKind, PathBuf)> {
            let explicit = match kind {
                EntityKind::Orders => &args.orders,
                EntityKind::Customers => &args.customers,
                EntityKind::Products => &args.products,
            };
            let path = explicit
                .clone()
                .or_else(|| args.data_dir.as_ref().map(|dir| dir.join(demo_file(kind))))
                .with_context(|| format!("No {} table given. Use --{} <path> or --data-dir <dir>", kind, kind))?;
            Ok((kind, path))
        })
        .collect()
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and parse one table on the blocking pool.
async fn load_one(path: PathBuf) -> Result<ParsedTable> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || load_table(&path))
        .await
        .context("Table loader task failed")?
        .with_context(|| format!("Failed to load {}", display))
}

// =============================================================================
// PRESENTATION
// =============================================================================

/// Shekel amount rounded to whole units with thousands separators.
fn format_currency(value: f64) -> String {
    format!("₪{}", format_number(round_half_up(value)))
}

fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn format_number(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    selected_city: &'a str,
    cities: &'a [String],
    kpis: Kpis,
    revenue_by_category: &'a [Breakdown],
    revenue_by_segment: &'a [Breakdown],
    total_rows: usize,
    preview: &'a [MergedRow],
}

fn build_report<'a>(view: &'a DashboardView<'a>, preview_rows: usize) -> Report<'a> {
    let shown = preview_rows.min(view.rows.len());
    Report {
        generated_at: Utc::now(),
        selected_city: view.selected_city,
        cities: &view.cities,
        kpis: view.kpis,
        revenue_by_category: &view.revenue_by_category,
        revenue_by_segment: &view.revenue_by_segment,
        total_rows: view.rows.len(),
        preview: &view.rows[..shown],
    }
}

fn print_breakdown(title: &str, items: &[Breakdown]) {
    println!("\n{}:", title);
    if items.is_empty() {
        println!("  (no completed orders)");
    }
    for item in items {
        let name = if item.name.is_empty() { "(unknown)" } else { item.name.as_str() };
        println!("  {:<24} {}", name, format_currency(item.value as f64));
    }
}

fn print_report(report: &Report<'_>) {
    println!("\n=== DigiSale Dashboard ===");
    println!("City: {}", report.selected_city);
    println!("Available cities: {}", report.cities.join(", "));

    println!("\nTotal revenue:      {}", format_currency(report.kpis.total_revenue));
    println!("Total profit:       {}", format_currency(report.kpis.total_profit));
    println!("Completed orders:   {}", format_number(report.kpis.completed_orders as i64));
    println!("Cancellation rate:  {}", format_percent(report.kpis.cancellation_rate));

    print_breakdown("Revenue by category", report.revenue_by_category);
    print_breakdown("Revenue by segment", report.revenue_by_segment);

    println!(
        "\nPreview ({} of {} rows):",
        report.preview.len(),
        report.total_rows
    );
    println!("{:-<100}", "");
    for row in report.preview {
        println!(
            "  {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {}",
            row.order_id,
            row.order_date,
            row.product_name,
            row.category,
            row.customer_segment,
            row.city,
            row.quantity,
            format_percent(row.discount * 100.0),
            format_currency(row.revenue),
            format_currency(row.profit),
            row.status
        );
    }
    println!("{:-<100}", "");
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let paths = resolve_paths(&args)?;
    for (kind, path) in &paths {
        info!(table = %kind, path = %path.display(), "loading table");
    }

    let (orders, customers, products) = tokio::try_join!(
        load_one(paths[0].1.clone()),
        load_one(paths[1].1.clone()),
        load_one(paths[2].1.clone()),
    )
    .inspect_err(|e| record_failure(&config, "load", &format!("{:#}", e)))?;

    // Gate: all three tables must validate before anything is merged
    let mut uploads = UploadSet::new();
    let mut rejected = 0;
    for ((kind, path), table) in paths.iter().zip([orders, customers, products]) {
        let label = source_label(path);
        if let Err(errors) = uploads.accept(*kind, &label, table.records) {
            rejected += 1;
            for error in &errors {
                eprintln!("  ✗ {}", error);
                record_failure(&config, &label, &error.to_string());
            }
        }
    }

    let tables = match uploads.tables() {
        Some(tables) if rejected == 0 => tables,
        _ => anyhow::bail!("{} table(s) failed validation; dashboard not generated", rejected),
    };

    let state = tokio::task::spawn_blocking(move || DashboardState::default().load(&tables))
        .await
        .map_err(|e| {
            record_failure(&config, "merge", &e.to_string());
            anyhow::anyhow!("failed to process data - check the file contents")
        })?;

    let state = state.select_city(&args.city);
    let view = state
        .view()
        .context("Dashboard has no dataset after loading")?;

    if args.city != ALL_CITIES && !view.cities.contains(&args.city) {
        warn!(city = %args.city, "city not present in the customers table; no rows match");
    }

    info!(rows = view.rows.len(), city = %view.selected_city, "dashboard ready");

    let report = build_report(&view, args.preview.unwrap_or(config.preview_rows));
    match args.format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
