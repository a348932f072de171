use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Calendar day. Bookings are whole nights, so no finer time type exists.
pub type Day = NaiveDate;

pub type UnitId = Ulid;
pub type BookingId = Ulid;
pub type CategoryId = Ulid;

/// Half-open interval `[start, end)` of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Day,
    pub end: Day,
}

impl Span {
    pub fn new(start: Day, end: Day) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Number of nights covered.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if the night starting on `day` is inside the span.
    pub fn covers_day(&self, day: Day) -> bool {
        self.start <= day && day < self.end
    }

    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// A request for one unit of a category over a span.
///
/// `unit` pins the booking to a specific unit ("reserved"); the allocator
/// never moves a pinned booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub category: CategoryId,
    pub span: Span,
    #[serde(default)]
    pub unit: Option<UnitId>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Booking {
    pub fn new(id: BookingId, category: CategoryId, span: Span) -> Self {
        Self {
            id,
            category,
            span,
            unit: None,
            label: None,
        }
    }

    pub fn locked_to(mut self, unit: UnitId) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_locked(&self) -> bool {
        self.unit.is_some()
    }
}

/// One allocatable resource. `parent` is the composite unit this one is a
/// part of; the composite usually lives in another category ("A+B" double
/// room made of two singles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub category: CategoryId,
    #[serde(default)]
    pub parent: Option<UnitId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Unit {
    pub fn new(id: UnitId, category: CategoryId) -> Self {
        Self {
            id,
            category,
            parent: None,
            name: None,
        }
    }

    pub fn part_of(mut self, parent: UnitId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A group of interchangeable units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: Option<String>,
}

impl Category {
    pub fn new(id: CategoryId) -> Self {
        Self { id, name: None }
    }
}

/// Snapshot wire format: everything the engine reads for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

// ── Allocation results ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSchedule {
    pub unit: UnitId,
    /// Ascending by start day, pairwise non-overlapping.
    pub bookings: Vec<Booking>,
}

/// Unit → ordered bookings, rows in unit processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub rows: Vec<UnitSchedule>,
}

impl Assignment {
    pub fn with_units(units: impl IntoIterator<Item = UnitId>) -> Self {
        Self {
            rows: units
                .into_iter()
                .map(|unit| UnitSchedule {
                    unit,
                    bookings: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.rows.iter().map(|r| r.unit)
    }

    /// Bookings placed on `unit`; empty if the unit is not part of this assignment.
    pub fn bookings_for(&self, unit: UnitId) -> &[Booking] {
        self.rows
            .iter()
            .find(|r| r.unit == unit)
            .map(|r| r.bookings.as_slice())
            .unwrap_or(&[])
    }

    pub fn unit_of(&self, booking: BookingId) -> Option<UnitId> {
        self.rows
            .iter()
            .find(|r| r.bookings.iter().any(|b| b.id == booking))
            .map(|r| r.unit)
    }

    /// Append bookings to a unit's row, creating the row if needed.
    pub fn assign(&mut self, unit: UnitId, bookings: impl IntoIterator<Item = Booking>) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.unit == unit) {
            row.bookings.extend(bookings);
        } else {
            self.rows.push(UnitSchedule {
                unit,
                bookings: bookings.into_iter().collect(),
            });
        }
    }

    pub fn booking_count(&self) -> usize {
        self.rows.iter().map(|r| r.bookings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of one allocation run over a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub category: CategoryId,
    /// True iff `leftover` is empty.
    pub success: bool,
    pub assignment: Assignment,
    /// Bookings no unit could take, ascending by start day.
    pub leftover: Vec<Booking>,
}

// ── Availability results ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAllotment {
    pub date: Day,
    pub allotment: usize,
    pub available_unit_ids: Vec<UnitId>,
    pub occupying_unit_ids: Vec<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub category: CategoryId,
    pub total_units: usize,
    pub start_date: Day,
    pub end_date: Day,
    pub per_day: Vec<DayAllotment>,
}
