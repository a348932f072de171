use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── Allocation ──────────────────────────────────────────────────

/// Counter: top-level allocation runs. Labels: status.
pub const ALLOCATIONS_TOTAL: &str = "allot_allocations_total";

/// Histogram: top-level allocation latency in seconds.
pub const ALLOCATION_DURATION_SECONDS: &str = "allot_allocation_duration_seconds";

/// Counter: bookings left without a unit by infeasible runs.
pub const BOOKINGS_UNPLACED_TOTAL: &str = "allot_bookings_unplaced_total";

// ── Availability ────────────────────────────────────────────────

/// Counter: availability probes. Labels: result.
pub const PROBES_TOTAL: &str = "allot_probes_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Label for a boolean outcome.
pub fn outcome_label(ok: bool) -> &'static str {
    if ok { "ok" } else { "infeasible" }
}

/// Label for an availability probe result.
pub fn probe_label(available: bool) -> &'static str {
    if available { "available" } else { "unavailable" }
}
