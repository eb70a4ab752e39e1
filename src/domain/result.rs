//! Result type alias for Compaction Gate

use super::errors::GateError;

/// Result type alias for Compaction Gate operations
///
/// # Examples
///
/// ```
/// use compaction_gate::domain::result::Result;
/// use compaction_gate::domain::errors::GateError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(GateError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(GateError::Validation("test error".to_string()));
        assert!(result.is_err());
    }
}
