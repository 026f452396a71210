//! Result type alias for examsync

use super::errors::ExamSyncError;

/// Result type alias for examsync operations
///
/// # Examples
///
/// ```
/// use examsync::domain::result::Result;
/// use examsync::domain::errors::ExamSyncError;
///
/// fn failing_function() -> Result<()> {
///     Err(ExamSyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ExamSyncError>;

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
}
