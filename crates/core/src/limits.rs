//! Read limits
//!
//! History reads are capped so one request cannot pull an unbounded number
//! of versions. Requested limits are clamped, never rejected.

/// Limit applied when a read does not ask for one
pub const DEFAULT_HISTORY_LIMIT: usize = 1_000;

/// Largest limit a read may ask for
pub const MAX_HISTORY_LIMIT: usize = 100_000;

/// Smallest effective limit
pub const MIN_HISTORY_LIMIT: usize = 1;

/// Clamp a requested history limit into `[MIN_HISTORY_LIMIT, MAX_HISTORY_LIMIT]`
///
/// `None` yields `default`, itself clamped.
pub fn clamp_history_limit(requested: Option<usize>, default: usize) -> usize {
    requested
        .unwrap_or(default)
        .clamp(MIN_HISTORY_LIMIT, MAX_HISTORY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_history_limit() {
        assert_eq!(clamp_history_limit(None, DEFAULT_HISTORY_LIMIT), 1_000);
        assert_eq!(clamp_history_limit(Some(0), DEFAULT_HISTORY_LIMIT), 1);
        assert_eq!(clamp_history_limit(Some(50), DEFAULT_HISTORY_LIMIT), 50);
        assert_eq!(clamp_history_limit(Some(1_000_000), DEFAULT_HISTORY_LIMIT), 100_000);
        assert_eq!(clamp_history_limit(None, 500_000), 100_000);
    }
}
