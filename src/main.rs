use chrono::{Days, NaiveDate};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

use allot::engine::{Engine, DEFAULT_DAYS};
use allot::model::SnapshotFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let metrics_port: Option<u16> = std::env::var("ALLOT_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    allot::observability::init(metrics_port)?;

    let path = std::env::var("ALLOT_SNAPSHOT").unwrap_or_else(|_| "./snapshot.json".into());
    let only: Option<Ulid> = std::env::var("ALLOT_CATEGORY")
        .ok()
        .and_then(|s| s.parse().ok());
    let from: Option<NaiveDate> = std::env::var("ALLOT_FROM")
        .ok()
        .and_then(|s| s.parse().ok());
    let to: Option<NaiveDate> = std::env::var("ALLOT_TO")
        .ok()
        .and_then(|s| s.parse().ok());

    let file: SnapshotFile = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let engine = Engine::from_snapshot_file(file)?;
    info!("loaded {path}");
    info!("  categories: {}", engine.list_categories().len());
    info!("  bookings: {}", engine.store().booking_count());

    let snapshot = engine.snapshot()?;
    let start = from
        .or_else(|| snapshot.bookings().iter().map(|b| b.span.start).min())
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let end = to.unwrap_or(start + Days::new(30));

    for category in engine.list_categories() {
        if only.is_some_and(|c| c != category.id) {
            continue;
        }
        let title = category.name.as_deref().unwrap_or("");
        println!("== {} {title}", category.id);
        println!("{}", engine.render(category.id, from, DEFAULT_DAYS)?);

        match engine.availability_between_dates(category.id, start, end) {
            Ok(report) => {
                println!("total units: {}", report.total_units);
                for d in &report.per_day {
                    println!("{}  {:>3}", d.date, d.allotment);
                }
            }
            Err(e) => warn!("category {}: {e}", category.id),
        }
        println!();
    }

    Ok(())
}
