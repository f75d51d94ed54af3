//! Result type alias for repository operations

use super::errors::RepositoryError;

/// Result type alias using [`RepositoryError`]
///
/// # Examples
///
/// ```
/// use docrepo::domain::result::Result;
/// use docrepo::domain::errors::RepositoryError;
///
/// fn failing_function() -> Result<()> {
///     Err(RepositoryError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<u64> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(RepositoryError::Disposed);
        assert!(result.is_err());
    }
}
