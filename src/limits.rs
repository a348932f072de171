/// Longest parent chain a unit may sit under (composite of composite of ...).
pub const MAX_HIERARCHY_DEPTH: usize = 16;

/// Longest single booking, in nights.
pub const MAX_SPAN_DAYS: i64 = 3 * 366;

/// Widest per-day availability report, in days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 2 * 366;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_LABEL_LEN: usize = 256;
