//! Epoch-second deadlines

use crate::domain::{GateError, Result};
use std::time::Duration;

/// Returns `now + span` in epoch seconds
///
/// # Errors
///
/// Returns [`GateError::Validation`] if the deadline does not fit in an `i64`.
pub fn deadline(now: i64, span: Duration) -> Result<i64> {
    i64::try_from(span.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| {
            GateError::Validation(format!(
                "deadline {now} + {}s is out of range",
                span.as_secs()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_adds_span() {
        assert_eq!(deadline(1_000, Duration::from_secs(900)).unwrap(), 1_900);
    }

    #[test]
    fn test_deadline_out_of_range() {
        assert!(matches!(
            deadline(1_000, Duration::from_secs(u64::MAX)),
            Err(GateError::Validation(_))
        ));
        assert!(matches!(
            deadline(i64::MAX, Duration::from_secs(1)),
            Err(GateError::Validation(_))
        ));
    }
}
