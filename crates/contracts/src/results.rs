//! Per-record outcome model shared by every bulk writer.

use crate::{root_cause_message, ContractError, ErrorCause};

/// A record that could not be written, with the cause and a human readable message.
#[derive(Debug, Clone)]
pub struct WriteFailure<T> {
    pub item: T,
    pub cause: ErrorCause,
    pub message: String,
}

impl<T> WriteFailure<T> {
    pub fn new(item: T, cause: ErrorCause, message: impl Into<String>) -> Self {
        Self {
            item,
            cause,
            message: message.into(),
        }
    }

    /// Failure whose message is the root cause of `cause`.
    pub fn from_cause(item: T, cause: ErrorCause) -> Self {
        let message = root_cause_message(cause.as_ref());
        Self {
            item,
            cause,
            message,
        }
    }

    /// Replace the failed item, keeping cause and message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WriteFailure<U> {
        WriteFailure {
            item: f(self.item),
            cause: self.cause,
            message: self.message,
        }
    }
}

/// Terminal outcome of one submitted record.
#[derive(Debug, Clone)]
pub enum WriteOutcome<T> {
    Success(T),
    Failure(WriteFailure<T>),
}

impl<T> WriteOutcome<T> {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn item(&self) -> &T {
        match self {
            Self::Success(item) => item,
            Self::Failure(failure) => &failure.item,
        }
    }
}

/// Results aggregate of one bulk submission.
///
/// Successes and failures each keep submission order.
#[derive(Debug, Clone)]
pub struct BulkWriterResults<T> {
    successes: Vec<T>,
    failures: Vec<WriteFailure<T>>,
}

impl<T> Default for BulkWriterResults<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BulkWriterResults<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every item succeeded.
    pub fn all_succeeded(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            successes: items.into_iter().collect(),
            failures: Vec::new(),
        }
    }

    /// Every item failed with the same cause (total transport failure).
    pub fn all_failed(items: impl IntoIterator<Item = T>, cause: ErrorCause) -> Self {
        let message = root_cause_message(cause.as_ref());
        Self {
            successes: Vec::new(),
            failures: items
                .into_iter()
                .map(|item| WriteFailure::new(item, cause.clone(), message.clone()))
                .collect(),
        }
    }

    pub fn add_success(&mut self, item: T) {
        self.successes.push(item);
    }

    pub fn add_failure(&mut self, item: T, cause: ErrorCause, message: impl Into<String>) {
        self.failures.push(WriteFailure::new(item, cause, message));
    }

    pub fn push(&mut self, outcome: WriteOutcome<T>) {
        match outcome {
            WriteOutcome::Success(item) => self.successes.push(item),
            WriteOutcome::Failure(failure) => self.failures.push(failure),
        }
    }

    pub fn successes(&self) -> &[T] {
        &self.successes
    }

    pub fn failures(&self) -> &[WriteFailure<T>] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<WriteFailure<T>>) {
        (self.successes, self.failures)
    }

    /// Convert into an aggregate error when anything failed.
    ///
    /// The error carries the first failure's cause; callers are expected to have
    /// logged each individual failure already.
    pub fn into_result(self) -> Result<Vec<T>, ContractError> {
        match self.failures.first() {
            None => Ok(self.successes),
            Some(first) => Err(ContractError::BatchUpdate {
                message: format!(
                    "Failed to update all documents; {} successes, {} failures",
                    self.successes.len(),
                    self.failures.len()
                ),
                source: first.cause.clone(),
            }),
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> BulkWriterResults<U> {
        BulkWriterResults {
            successes: self.successes.into_iter().map(&mut f).collect(),
            failures: self.failures.into_iter().map(|x| x.map(&mut f)).collect(),
        }
    }
}

impl<T> FromIterator<WriteOutcome<T>> for BulkWriterResults<T> {
    fn from_iter<I: IntoIterator<Item = WriteOutcome<T>>>(iter: I) -> Self {
        let mut results = Self::new();
        for outcome in iter {
            results.push(outcome);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_shares_cause() {
        let cause = ContractError::transport("es", "connection reset").into_cause();
        let results = BulkWriterResults::all_failed(vec![1, 2, 3], cause.clone());

        assert!(results.successes().is_empty());
        assert_eq!(results.failures().len(), 3);
        for failure in results.failures() {
            assert!(std::sync::Arc::ptr_eq(&failure.cause, &cause));
            assert!(failure.message.contains("connection reset"));
        }
    }

    #[test]
    fn test_into_result_reports_counts_and_first_cause() {
        let mut results = BulkWriterResults::new();
        results.add_success("a");
        results.add_failure(
            "b",
            ContractError::writer_failure("es", "mapper_parsing_exception").into_cause(),
            "mapper_parsing_exception",
        );
        results.add_failure(
            "c",
            ContractError::writer_failure("es", "version_conflict").into_cause(),
            "version_conflict",
        );

        let err = results.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to update all documents; 1 successes, 2 failures"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("mapper_parsing_exception"));
    }

    #[test]
    fn test_collect_outcomes_keeps_order() {
        let cause = ContractError::writer_failure("es", "boom").into_cause();
        let results: BulkWriterResults<u32> = vec![
            WriteOutcome::Success(1),
            WriteOutcome::Failure(WriteFailure::new(2, cause, "boom")),
            WriteOutcome::Success(3),
        ]
        .into_iter()
        .collect();

        assert_eq!(results.successes(), &[1, 3]);
        assert_eq!(results.failures()[0].item, 2);
        assert_eq!(results.len(), 3);
    }
}
