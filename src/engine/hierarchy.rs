use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::model::*;

use super::allocate::allocate_in;
use super::snapshot::Snapshot;

/// Allocation results are cached per category and the extra bookings it was
/// asked to fit.
pub(crate) type AllocationKey = (CategoryId, Vec<Booking>);

/// Memo tables for one top-level engine call. Dropped on return.
pub(crate) struct Session<'a> {
    pub(crate) snapshot: &'a Snapshot,
    connected: HashMap<UnitId, Rc<[UnitId]>>,
    allocations: HashMap<AllocationKey, Rc<Allocation>>,
    /// Allocations currently on the call stack.
    in_progress: Vec<AllocationKey>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            connected: HashMap::new(),
            allocations: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    pub(crate) fn cached(&self, key: &AllocationKey) -> Option<Rc<Allocation>> {
        self.allocations.get(key).cloned()
    }

    pub(crate) fn is_in_progress(&self, key: &AllocationKey) -> bool {
        self.in_progress.contains(key)
    }

    pub(crate) fn enter(&mut self, key: AllocationKey) {
        self.in_progress.push(key);
    }

    pub(crate) fn leave(&mut self, allocation: Allocation) -> Rc<Allocation> {
        let allocation = Rc::new(allocation);
        if let Some(key) = self.in_progress.pop() {
            self.allocations.insert(key, allocation.clone());
        }
        allocation
    }

    /// Units that share physical space with `unit`: its siblings, its
    /// composite parent, and recursively the same for the parent.
    /// Never contains `unit` itself. Order is stable (siblings, parent,
    /// then the parent's connections).
    pub(crate) fn connected_units(&mut self, unit: UnitId) -> Rc<[UnitId]> {
        if let Some(hit) = self.connected.get(&unit) {
            return hit.clone();
        }

        let mut out: Vec<UnitId> = Vec::new();
        if let Some(parent) = self.snapshot.unit(unit).and_then(|u| u.parent) {
            out.extend(self.snapshot.children(parent).iter().filter(|&&c| c != unit));
            out.push(parent);
            for &c in self.connected_units(parent).iter() {
                if c != unit && !out.contains(&c) {
                    out.push(c);
                }
            }
        }

        let out: Rc<[UnitId]> = out.into();
        self.connected.insert(unit, out.clone());
        out
    }

    /// Bookings currently held by the units connected to `unit`.
    ///
    /// Connected units of `category` are read from `placed`, the assignment
    /// being built for that category. Units of other categories are resolved
    /// by allocating their category. Returns `None` when one of those
    /// allocations is itself infeasible.
    pub(crate) fn connected_bookings(
        &mut self,
        unit: UnitId,
        category: CategoryId,
        placed: &Assignment,
        extras: &[Booking],
    ) -> Option<Vec<Booking>> {
        let snapshot = self.snapshot;
        let mut out = Vec::new();
        for &c in self.connected_units(unit).iter() {
            let Some(other_category) = snapshot.unit(c).map(|u| u.category) else {
                continue;
            };
            if other_category == category {
                out.extend(placed.bookings_for(c).iter().cloned());
                continue;
            }
            match allocate_in(self, other_category, extras) {
                // Same allocation already running further up the stack.
                None => continue,
                Some(allocation) if !allocation.success => {
                    debug!(
                        unit = %unit,
                        connected = %c,
                        category = %other_category,
                        "connected category cannot be assigned"
                    );
                    return None;
                }
                Some(allocation) => {
                    out.extend(allocation.assignment.bookings_for(c).iter().cloned());
                }
            }
        }
        Some(out)
    }
}
