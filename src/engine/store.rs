use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::snapshot::Snapshot;
use super::EngineError;

/// Live categories, units and bookings. Allocation never reads this
/// directly; it works on a [`Snapshot`] taken from it.
pub struct InMemoryStore {
    categories: DashMap<Ulid, Category>,
    units: DashMap<Ulid, Unit>,
    bookings: DashMap<Ulid, Booking>,
    children: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            categories: DashMap::new(),
            units: DashMap::new(),
            bookings: DashMap::new(),
            children: DashMap::new(),
        }
    }

    /// Load a snapshot file after validating it as a whole.
    pub fn import(file: SnapshotFile) -> Result<Self, EngineError> {
        let snapshot = Snapshot::from_file(file)?;
        let store = Self::new();
        for c in snapshot.categories() {
            store.insert_category(c.clone());
        }
        for u in snapshot.units() {
            store.insert_unit(u.clone());
        }
        for b in snapshot.bookings() {
            store.insert_booking(b.clone());
        }
        Ok(store)
    }

    pub fn export(&self) -> SnapshotFile {
        SnapshotFile {
            categories: sorted(&self.categories),
            units: sorted(&self.units),
            bookings: sorted(&self.bookings),
        }
    }

    /// Consistent read-only view, records ordered by id.
    pub fn snapshot(&self) -> Result<Snapshot, EngineError> {
        let file = self.export();
        Snapshot::new(file.categories, file.units, file.bookings)
    }

    // ── Categories ───────────────────────────────────────────

    pub fn contains_category(&self, id: &Ulid) -> bool {
        self.categories.contains_key(id)
    }

    pub fn insert_category(&self, category: Category) {
        self.categories.insert(category.id, category);
    }

    // ── Units ────────────────────────────────────────────────

    pub fn contains_unit(&self, id: &Ulid) -> bool {
        self.units.contains_key(id)
    }

    pub fn get_unit(&self, id: &Ulid) -> Option<Unit> {
        self.units.get(id).map(|e| e.value().clone())
    }

    /// Inserts the unit and links it under its parent.
    pub fn insert_unit(&self, unit: Unit) {
        if let Some(parent) = unit.parent {
            self.add_child(parent, unit.id);
        }
        self.units.insert(unit.id, unit);
    }

    pub fn remove_unit(&self, id: &Ulid) -> Option<Unit> {
        let (_, unit) = self.units.remove(id)?;
        if let Some(parent) = unit.parent {
            self.remove_child(&parent, id);
        }
        Some(unit)
    }

    pub fn units_in(&self, category: &Ulid) -> Vec<Unit> {
        let mut units: Vec<Unit> = self
            .units
            .iter()
            .filter(|e| e.value().category == *category)
            .map(|e| e.value().clone())
            .collect();
        units.sort_by_key(|u| u.id);
        units
    }

    // ── Children index ───────────────────────────────────────

    pub fn add_child(&self, parent_id: Ulid, child_id: Ulid) {
        self.children.entry(parent_id).or_default().push(child_id);
    }

    pub fn remove_child(&self, parent_id: &Ulid, child_id: &Ulid) {
        if let Some(mut kids) = self.children.get_mut(parent_id) {
            kids.retain(|c| c != child_id);
        }
    }

    pub fn get_children(&self, parent_id: &Ulid) -> Vec<Ulid> {
        self.children
            .get(parent_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn has_children(&self, parent_id: &Ulid) -> bool {
        self.children
            .get(parent_id)
            .is_some_and(|kids| !kids.is_empty())
    }

    // ── Bookings ─────────────────────────────────────────────

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn get_booking(&self, id: &Ulid) -> Option<Booking> {
        self.bookings.get(id).map(|e| e.value().clone())
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn remove_booking(&self, id: &Ulid) -> Option<Booking> {
        self.bookings.remove(id).map(|(_, b)| b)
    }

    pub fn bookings_in(&self, category: &Ulid) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().category == *category)
            .map(|e| e.value().clone())
            .collect();
        bookings.sort_by_key(|b| (b.span.start, b.id));
        bookings
    }

    pub fn has_locked_bookings(&self, unit: &Ulid) -> bool {
        self.bookings
            .iter()
            .any(|e| e.value().unit.as_ref() == Some(unit))
    }
}

fn sorted<T: Clone>(map: &DashMap<Ulid, T>) -> Vec<T> {
    let mut entries: Vec<(Ulid, T)> = map
        .iter()
        .map(|e| (*e.key(), e.value().clone()))
        .collect();
    entries.sort_by_key(|(id, _)| *id);
    entries.into_iter().map(|(_, v)| v).collect()
}
