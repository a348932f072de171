use std::collections::HashSet;

use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::available_between;
use super::conflict::validate_span;
use super::{Engine, EngineError};

impl Engine {
    pub fn create_category(&self, id: Ulid, name: Option<String>) -> Result<(), EngineError> {
        if let Some(ref n) = name
            && n.len() > MAX_NAME_LEN
        {
            return Err(EngineError::LimitExceeded("category name too long"));
        }
        let _guard = self.write_guard();
        if self.store.contains_category(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        self.store.insert_category(Category { id, name });
        info!(category = %id, "category created");
        Ok(())
    }

    pub fn create_unit(
        &self,
        id: Ulid,
        category: Ulid,
        parent: Option<Ulid>,
        name: Option<String>,
    ) -> Result<(), EngineError> {
        if let Some(ref n) = name
            && n.len() > MAX_NAME_LEN
        {
            return Err(EngineError::LimitExceeded("unit name too long"));
        }
        let _guard = self.write_guard();
        if self.store.contains_unit(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if !self.store.contains_category(&category) {
            return Err(EngineError::NotFound(category));
        }
        if let Some(pid) = parent {
            if pid == id {
                return Err(EngineError::CycleDetected(id));
            }
            if !self.store.contains_unit(&pid) {
                return Err(EngineError::UnknownParent { unit: id, parent: pid });
            }
            let mut visited = HashSet::new();
            visited.insert(id);
            let mut depth = 0usize;
            let mut cur = Some(pid);
            while let Some(cid) = cur {
                depth += 1;
                if depth > MAX_HIERARCHY_DEPTH {
                    return Err(EngineError::LimitExceeded("hierarchy too deep"));
                }
                if !visited.insert(cid) {
                    return Err(EngineError::CycleDetected(cid));
                }
                cur = self.store.get_unit(&cid).and_then(|u| u.parent);
            }
        }

        self.store.insert_unit(Unit {
            id,
            category,
            parent,
            name,
        });
        info!(unit = %id, category = %category, parent = ?parent, "unit created");
        Ok(())
    }

    pub fn delete_unit(&self, id: Ulid) -> Result<Unit, EngineError> {
        let _guard = self.write_guard();
        if !self.store.contains_unit(&id) {
            return Err(EngineError::NotFound(id));
        }
        if self.store.has_children(&id) {
            return Err(EngineError::HasChildren(id));
        }
        if self.store.has_locked_bookings(&id) {
            return Err(EngineError::HasLockedBookings(id));
        }
        let unit = self.store.remove_unit(&id).ok_or(EngineError::NotFound(id))?;
        info!(unit = %id, "unit deleted");
        Ok(unit)
    }

    /// Store a booking if its category can still absorb it. A booking with
    /// the same id is replaced.
    pub fn book(&self, booking: Booking) -> Result<(), EngineError> {
        if let Some(ref l) = booking.label
            && l.len() > MAX_LABEL_LEN
        {
            return Err(EngineError::LimitExceeded("booking label too long"));
        }
        validate_span(&booking.span)?;
        let _guard = self.write_guard();
        self.admit(booking)
    }

    /// Move a stored booking to new dates, keeping its id, lock and label.
    pub fn reschedule(&self, id: Ulid, span: Span) -> Result<Booking, EngineError> {
        validate_span(&span)?;
        let _guard = self.write_guard();
        let existing = self.store.get_booking(&id).ok_or(EngineError::NotFound(id))?;
        let moved = Booking { span, ..existing };
        self.admit(moved.clone())?;
        Ok(moved)
    }

    pub fn cancel(&self, id: Ulid) -> Result<Booking, EngineError> {
        let _guard = self.write_guard();
        let booking = self.store.remove_booking(&id).ok_or(EngineError::NotFound(id))?;
        info!(booking = %id, category = %booking.category, "booking cancelled");
        Ok(booking)
    }

    /// Caller holds the write guard.
    fn admit(&self, booking: Booking) -> Result<(), EngineError> {
        let snapshot = self.store.snapshot()?;
        if !available_between(&snapshot, booking.category, booking.span, Some(&booking))? {
            return Err(EngineError::Unavailable {
                category: booking.category,
                span: booking.span,
            });
        }
        info!(
            booking = %booking.id,
            category = %booking.category,
            start = %booking.span.start,
            end = %booking.span.end,
            "booking stored"
        );
        self.store.insert_booking(booking);
        Ok(())
    }
}
