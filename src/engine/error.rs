use ulid::Ulid;

use crate::model::{CategoryId, Day, Span, UnitId};

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    InvalidSpan {
        start: Day,
        end: Day,
    },
    UnknownParent {
        unit: UnitId,
        parent: UnitId,
    },
    CycleDetected(UnitId),
    HasChildren(UnitId),
    HasLockedBookings(UnitId),
    LimitExceeded(&'static str),
    Unavailable {
        category: CategoryId,
        span: Span,
    },
    Unassignable(CategoryId),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::InvalidSpan { start, end } => {
                write!(f, "invalid span [{start}, {end}): start must be before end")
            }
            EngineError::UnknownParent { unit, parent } => {
                write!(f, "unit {unit} is part of unknown unit {parent}")
            }
            EngineError::CycleDetected(id) => write!(f, "cycle detected at unit: {id}"),
            EngineError::HasChildren(id) => {
                write!(f, "cannot delete unit {id}: has parts")
            }
            EngineError::HasLockedBookings(id) => {
                write!(f, "cannot delete unit {id}: bookings are locked to it")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Unavailable { category, span } => write!(
                f,
                "category {category} has no unit available for [{}, {})",
                span.start, span.end
            ),
            EngineError::Unassignable(id) => {
                write!(f, "existing bookings of category {id} cannot be assigned")
            }
        }
    }
}

impl std::error::Error for EngineError {}
