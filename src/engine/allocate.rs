use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::model::*;
use crate::observability;

use super::hierarchy::Session;
use super::scheduler::{schedule_unit, Pass};
use super::snapshot::Snapshot;
use super::EngineError;

/// Assign every booking of `category` (plus what-if `extras`) to a unit.
///
/// Extras replace stored bookings with the same id; extras of other
/// categories only matter to connected categories resolved along the way.
/// An infeasible run is reported through `Allocation::success`, not as an
/// error.
pub fn allocate(
    snapshot: &Snapshot,
    category: CategoryId,
    extras: &[Booking],
) -> Result<Allocation, EngineError> {
    if !snapshot.contains_category(category) {
        return Err(EngineError::NotFound(category));
    }
    for extra in extras {
        snapshot.validate_probe(extra)?;
    }

    let started = Instant::now();
    let mut session = Session::new(snapshot);
    let allocation = match allocate_in(&mut session, category, extras) {
        Some(a) => Rc::unwrap_or_clone(a),
        // The stack is empty at the top level, so this cannot be a re-entry.
        None => return Err(EngineError::Unassignable(category)),
    };

    metrics::counter!(
        observability::ALLOCATIONS_TOTAL,
        "status" => observability::outcome_label(allocation.success)
    )
    .increment(1);
    metrics::histogram!(observability::ALLOCATION_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    if !allocation.success {
        metrics::counter!(observability::BOOKINGS_UNPLACED_TOTAL)
            .increment(allocation.leftover.len() as u64);
    }

    Ok(allocation)
}

/// Memoized allocation inside one session. `None` means the same
/// `(category, extras)` is already being allocated further up the stack.
pub(crate) fn allocate_in(
    session: &mut Session<'_>,
    category: CategoryId,
    extras: &[Booking],
) -> Option<Rc<Allocation>> {
    let key = (category, extras.to_vec());
    if let Some(hit) = session.cached(&key) {
        return Some(hit);
    }
    if session.is_in_progress(&key) {
        return None;
    }
    session.enter(key);
    let allocation = run(session, category, extras);
    Some(session.leave(allocation))
}

/// Units in processing order: free-standing units first, then parts grouped
/// by their composite. Snapshot order within each group.
pub(crate) fn ordered_units(snapshot: &Snapshot, category: CategoryId) -> Vec<Unit> {
    let mut units: Vec<Unit> = snapshot
        .category_units(category)
        .iter()
        .filter_map(|&id| snapshot.unit(id).cloned())
        .collect();
    units.sort_by_key(|u| u.parent);
    units
}

/// Stored bookings of the category that no extra replaces, then the
/// category's extras, sorted by start day (stable).
fn build_pool(snapshot: &Snapshot, category: CategoryId, extras: &[Booking]) -> Vec<Booking> {
    let mut pool: Vec<Booking> = snapshot
        .category_bookings(category)
        .filter(|b| !extras.iter().any(|e| e.id == b.id))
        .cloned()
        .collect();
    pool.extend(extras.iter().filter(|e| e.category == category).cloned());
    pool.sort_by_key(|b| b.span.start);
    pool
}

fn run(session: &mut Session<'_>, category: CategoryId, extras: &[Booking]) -> Allocation {
    let snapshot = session.snapshot;
    let units = ordered_units(snapshot, category);
    let mut assignment = Assignment::with_units(units.iter().map(|u| u.id));
    let mut pool = build_pool(snapshot, category, extras);

    let failed = |assignment: Assignment, leftover: Vec<Booking>| {
        warn!(
            category = %category,
            leftover = leftover.len(),
            "bookings cannot be assigned"
        );
        Allocation {
            category,
            success: false,
            assignment,
            leftover,
        }
    };

    for unit in &units {
        if pool.is_empty() {
            break;
        }

        let Some(connected) = session.connected_bookings(unit.id, category, &assignment, extras)
        else {
            return failed(assignment, pool);
        };

        let chain = match schedule_unit(session, unit, &pool, &connected) {
            Pass::Chain(chain) => chain,
            Pass::Irreconcilable(booking) => {
                debug!(unit = %unit.id, booking = %booking, "overlapping locks");
                return failed(assignment, pool);
            }
        };

        debug!(
            category = %category,
            unit = %unit.id,
            placed = chain.len(),
            remaining = pool.len() - chain.len(),
            "unit pass"
        );

        // Chain indices are ascending; remove back to front.
        let mut taken = Vec::with_capacity(chain.len());
        for &j in chain.iter().rev() {
            taken.push(pool.remove(j));
        }
        taken.reverse();
        assignment.assign(unit.id, taken);
    }

    if !pool.is_empty() {
        return failed(assignment, pool);
    }
    Allocation {
        category,
        success: true,
        assignment,
        leftover: pool,
    }
}
