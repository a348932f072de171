use std::collections::{HashMap, HashSet};

use crate::limits::*;
use crate::model::*;

use super::conflict::validate_span;
use super::EngineError;

/// Read-only view of every category, unit and booking for one engine call.
///
/// Records live in flat vectors; everything else refers to them by id.
/// Construction validates the data, so the allocator itself never has to
/// deal with dangling parents, cycles or inverted spans.
#[derive(Debug, Clone)]
pub struct Snapshot {
    categories: Vec<Category>,
    units: Vec<Unit>,
    bookings: Vec<Booking>,
    unit_index: HashMap<UnitId, usize>,
    booking_ids: HashSet<BookingId>,
    /// Parent → parts, in snapshot order.
    children: HashMap<UnitId, Vec<UnitId>>,
    units_by_category: HashMap<CategoryId, Vec<UnitId>>,
    bookings_by_category: HashMap<CategoryId, Vec<usize>>,
}

impl Snapshot {
    pub fn new(
        categories: Vec<Category>,
        units: Vec<Unit>,
        bookings: Vec<Booking>,
    ) -> Result<Self, EngineError> {
        let mut units_by_category: HashMap<CategoryId, Vec<UnitId>> = HashMap::new();
        for c in &categories {
            if units_by_category.insert(c.id, Vec::new()).is_some() {
                return Err(EngineError::AlreadyExists(c.id));
            }
        }

        let mut unit_index = HashMap::with_capacity(units.len());
        for (i, u) in units.iter().enumerate() {
            if unit_index.insert(u.id, i).is_some() {
                return Err(EngineError::AlreadyExists(u.id));
            }
            units_by_category
                .get_mut(&u.category)
                .ok_or(EngineError::NotFound(u.category))?
                .push(u.id);
        }

        let mut children: HashMap<UnitId, Vec<UnitId>> = HashMap::new();
        for u in &units {
            if let Some(parent) = u.parent {
                if !unit_index.contains_key(&parent) {
                    return Err(EngineError::UnknownParent { unit: u.id, parent });
                }
                children.entry(parent).or_default().push(u.id);
            }
        }
        for u in &units {
            check_parent_chain(u, &units, &unit_index)?;
        }

        let mut booking_ids = HashSet::with_capacity(bookings.len());
        let mut bookings_by_category: HashMap<CategoryId, Vec<usize>> = HashMap::new();
        for (i, b) in bookings.iter().enumerate() {
            if !booking_ids.insert(b.id) {
                return Err(EngineError::AlreadyExists(b.id));
            }
            validate_span(&b.span)?;
            if !units_by_category.contains_key(&b.category) {
                return Err(EngineError::NotFound(b.category));
            }
            if let Some(lock) = b.unit {
                check_lock(lock, b.category, &units, &unit_index)?;
            }
            bookings_by_category.entry(b.category).or_default().push(i);
        }

        Ok(Self {
            categories,
            units,
            bookings,
            unit_index,
            booking_ids,
            children,
            units_by_category,
            bookings_by_category,
        })
    }

    pub fn from_file(file: SnapshotFile) -> Result<Self, EngineError> {
        Self::new(file.categories, file.units, file.bookings)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn contains_category(&self, id: CategoryId) -> bool {
        self.units_by_category.contains_key(&id)
    }

    /// True if the booking is already on record (as opposed to a what-if probe).
    pub fn contains_booking(&self, id: BookingId) -> bool {
        self.booking_ids.contains(&id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.unit_index.get(&id).map(|&i| &self.units[i])
    }

    pub fn children(&self, id: UnitId) -> &[UnitId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_composite(&self, id: UnitId) -> bool {
        !self.children(id).is_empty()
    }

    pub fn category_units(&self, category: CategoryId) -> &[UnitId] {
        self.units_by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn category_bookings(&self, category: CategoryId) -> impl Iterator<Item = &Booking> {
        self.bookings_by_category
            .get(&category)
            .into_iter()
            .flatten()
            .map(|&i| &self.bookings[i])
    }

    /// Checks a booking that is not part of the snapshot (a probe or a write
    /// under validation) against the same rules stored bookings obey.
    pub fn validate_probe(&self, booking: &Booking) -> Result<(), EngineError> {
        validate_span(&booking.span)?;
        if !self.contains_category(booking.category) {
            return Err(EngineError::NotFound(booking.category));
        }
        if let Some(lock) = booking.unit {
            check_lock(lock, booking.category, &self.units, &self.unit_index)?;
        }
        Ok(())
    }
}

/// Walk up from `unit`; a repeated id means a cycle.
fn check_parent_chain(
    unit: &Unit,
    units: &[Unit],
    index: &HashMap<UnitId, usize>,
) -> Result<(), EngineError> {
    let mut visited = HashSet::new();
    visited.insert(unit.id);
    let mut depth = 0usize;
    let mut current = unit.parent;
    while let Some(pid) = current {
        depth += 1;
        if !visited.insert(pid) {
            return Err(EngineError::CycleDetected(pid));
        }
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(EngineError::LimitExceeded("hierarchy too deep"));
        }
        current = index.get(&pid).and_then(|&i| units[i].parent);
    }
    Ok(())
}

/// A lock must point at a unit of the booking's own category.
fn check_lock(
    lock: UnitId,
    category: CategoryId,
    units: &[Unit],
    index: &HashMap<UnitId, usize>,
) -> Result<(), EngineError> {
    match index.get(&lock) {
        Some(&i) if units[i].category == category => Ok(()),
        _ => Err(EngineError::NotFound(lock)),
    }
}
