use std::collections::HashMap;

use tracing::debug;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::allocate::allocate_in;
use super::conflict::validate_span;
use super::hierarchy::Session;
use super::snapshot::Snapshot;
use super::EngineError;

// ── Probe ─────────────────────────────────────────────────────────

/// Can one more booking of `category` over `span` be placed?
///
/// `probe` supplies identity, lock and label (e.g. an existing booking being
/// moved); its span and category are overridden. Without one a fresh id is
/// used.
///
/// When the category holds composite units, every leaf category beneath them
/// must also stay assignable with the probe added. The probe never enters a
/// leaf pool; it reaches the leaves through their composites' bookings.
pub fn available_between(
    snapshot: &Snapshot,
    category: CategoryId,
    span: Span,
    probe: Option<&Booking>,
) -> Result<bool, EngineError> {
    if !snapshot.contains_category(category) {
        return Err(EngineError::NotFound(category));
    }
    validate_span(&span)?;
    let probe = match probe {
        Some(b) => Booking {
            category,
            span,
            ..b.clone()
        },
        None => Booking::new(Ulid::new(), category, span),
    };
    snapshot.validate_probe(&probe)?;

    let mut session = Session::new(snapshot);
    let available = probe_fits(&mut session, category, &probe);

    debug!(category = %category, start = %span.start, end = %span.end, available, "probe");
    metrics::counter!(
        observability::PROBES_TOTAL,
        "result" => observability::probe_label(available)
    )
    .increment(1);
    Ok(available)
}

fn fits(session: &mut Session<'_>, category: CategoryId, extra: Booking) -> bool {
    allocate_in(session, category, &[extra]).is_some_and(|a| a.success)
}

fn probe_fits(session: &mut Session<'_>, category: CategoryId, probe: &Booking) -> bool {
    if !fits(session, category, probe.clone()) {
        return false;
    }
    for leaf in leaf_categories(session.snapshot, category) {
        if !fits(session, leaf, probe.clone()) {
            debug!(category = %category, leaf = %leaf, "leaf category rejects probe");
            return false;
        }
    }
    true
}

/// Categories of the leaf units under this category's composites, in
/// first-seen order, excluding `category` itself.
pub(crate) fn leaf_categories(snapshot: &Snapshot, category: CategoryId) -> Vec<CategoryId> {
    let mut out = Vec::new();
    let mut stack: Vec<UnitId> = Vec::new();
    for &unit in snapshot.category_units(category) {
        stack.extend(snapshot.children(unit).iter().rev());
        while let Some(u) = stack.pop() {
            let parts = snapshot.children(u);
            if !parts.is_empty() {
                stack.extend(parts.iter().rev());
                continue;
            }
            if let Some(leaf) = snapshot.unit(u).map(|u| u.category)
                && leaf != category
                && !out.contains(&leaf)
            {
                out.push(leaf);
            }
        }
    }
    out
}

// ── Per-day report ────────────────────────────────────────────────

/// Allocate the category once, then count free units for every day in
/// `[start, end]` (inclusive).
///
/// Parts of the same composite share one slot: on any given day only the
/// first part of each group is considered, with its siblings' bookings
/// counted against it.
pub fn availability_between_dates(
    snapshot: &Snapshot,
    category: CategoryId,
    start: Day,
    end: Day,
) -> Result<AvailabilityReport, EngineError> {
    if !snapshot.contains_category(category) {
        return Err(EngineError::NotFound(category));
    }
    if end < start {
        return Err(EngineError::InvalidSpan { start, end });
    }
    if (end - start).num_days() + 1 > MAX_QUERY_WINDOW_DAYS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }

    let mut session = Session::new(snapshot);
    let allocation = match allocate_in(&mut session, category, &[]) {
        Some(a) if a.success => a,
        _ => return Err(EngineError::Unassignable(category)),
    };
    let assignment = &allocation.assignment;

    let mut group_size: HashMap<UnitId, usize> = HashMap::new();
    for unit in assignment.units() {
        if let Some(parent) = snapshot.unit(unit).and_then(|u| u.parent) {
            *group_size.entry(parent).or_default() += 1;
        }
    }

    struct Row {
        unit: UnitId,
        group: Option<UnitId>,
        own: Vec<Span>,
        blocked: Vec<Span>,
    }
    let mut rows = Vec::new();
    for unit in assignment.units() {
        let own: Vec<Span> = assignment.bookings_for(unit).iter().map(|b| b.span).collect();
        let connected = session
            .connected_bookings(unit, category, assignment, &[])
            .ok_or(EngineError::Unassignable(category))?;
        let mut blocked = own.clone();
        blocked.extend(connected.iter().map(|b| b.span));
        let group = snapshot
            .unit(unit)
            .and_then(|u| u.parent)
            .filter(|p| group_size.get(p).is_some_and(|&n| n >= 2));
        rows.push(Row {
            unit,
            group,
            own,
            blocked,
        });
    }

    let mut per_day = Vec::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let mut seen_groups: Vec<UnitId> = Vec::new();
        let mut available_unit_ids = Vec::new();
        let mut occupying_unit_ids = Vec::new();
        for row in &rows {
            if row.own.iter().any(|s| s.covers_day(date)) {
                occupying_unit_ids.push(row.unit);
            }
            if let Some(group) = row.group {
                if seen_groups.contains(&group) {
                    continue;
                }
                seen_groups.push(group);
            }
            if !row.blocked.iter().any(|s| s.covers_day(date)) {
                available_unit_ids.push(row.unit);
            }
        }
        per_day.push(DayAllotment {
            date,
            allotment: available_unit_ids.len(),
            available_unit_ids,
            occupying_unit_ids,
        });
    }

    Ok(AvailabilityReport {
        category,
        total_units: snapshot.category_units(category).len(),
        start_date: start,
        end_date: end,
        per_day,
    })
}
