use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Two half-open spans conflict iff each starts before the other ends.
pub fn conflicts(a: &Span, b: &Span) -> bool {
    a.start < b.end && b.start < a.end
}

/// Whole days between `a.end` and `b.start`. Caller guarantees `a.end <= b.start`.
pub fn gap_days(a: &Span, b: &Span) -> u64 {
    days_until(a.end, b)
}

/// Whole days from `boundary` to `b.start`. Caller guarantees `boundary <= b.start`.
pub(crate) fn days_until(boundary: Day, b: &Span) -> u64 {
    debug_assert!(boundary <= b.start, "gap measured backwards");
    (b.start - boundary).num_days() as u64
}

pub(crate) fn conflicts_any<'a>(span: &Span, others: impl IntoIterator<Item = &'a Booking>) -> bool {
    others.into_iter().any(|o| conflicts(&o.span, span))
}

pub fn validate_span(span: &Span) -> Result<(), EngineError> {
    if span.start >= span.end {
        return Err(EngineError::InvalidSpan {
            start: span.start,
            end: span.end,
        });
    }
    if span.nights() > MAX_SPAN_DAYS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(())
}
