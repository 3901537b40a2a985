//! Result type alias for Stager
//!
//! This module provides a convenient Result type alias that uses StagerError
//! as the error type.

use super::errors::StagerError;

/// Result type alias for Stager operations
///
/// This is a convenience type alias that uses `StagerError` as the error type.
/// Use this throughout the codebase for fallible operations.
///
/// # Examples
///
/// ```
/// use stager::domain::result::Result;
/// use stager::domain::errors::StagerError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(StagerError::Configuration("scan.location is not set".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, StagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::StagerError;

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
        if let Ok(value) = result {
            assert_eq!(value, 42);
        }
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(StagerError::Lock("port 9999 in use".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
