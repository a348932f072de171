use ulid::Ulid;

use crate::model::*;

use super::{allocate, availability_between_dates, available_between, render_timeline};
use super::{Engine, EngineError};

impl Engine {
    /// Allocate a category against the current store contents.
    pub fn allocate(&self, category: Ulid, extras: &[Booking]) -> Result<Allocation, EngineError> {
        allocate(&self.snapshot()?, category, extras)
    }

    pub fn available_between(
        &self,
        category: Ulid,
        span: Span,
        probe: Option<&Booking>,
    ) -> Result<bool, EngineError> {
        available_between(&self.snapshot()?, category, span, probe)
    }

    pub fn availability_between_dates(
        &self,
        category: Ulid,
        start: Day,
        end: Day,
    ) -> Result<AvailabilityReport, EngineError> {
        availability_between_dates(&self.snapshot()?, category, start, end)
    }

    /// Allocate `category` and render the result. The grid starts at
    /// `origin` when given, else at the category's earliest booking, else
    /// today.
    pub fn render(&self, category: Ulid, origin: Option<Day>, days: usize) -> Result<String, EngineError> {
        let snapshot = self.snapshot()?;
        let allocation = allocate(&snapshot, category, &[])?;
        let origin = origin
            .or_else(|| snapshot.category_bookings(category).map(|b| b.span.start).min())
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        Ok(render_timeline(&snapshot, &allocation.assignment, origin, days))
    }

    pub fn list_categories(&self) -> Vec<Category> {
        self.store.export().categories
    }

    pub fn list_units(&self, category: Ulid) -> Result<Vec<Unit>, EngineError> {
        if !self.store.contains_category(&category) {
            return Err(EngineError::NotFound(category));
        }
        Ok(self.store.units_in(&category))
    }

    pub fn list_bookings(&self, category: Ulid) -> Result<Vec<Booking>, EngineError> {
        if !self.store.contains_category(&category) {
            return Err(EngineError::NotFound(category));
        }
        Ok(self.store.bookings_in(&category))
    }

    pub fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        self.store.get_booking(&id).ok_or(EngineError::NotFound(id))
    }
}
