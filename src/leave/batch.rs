use std::future::Future;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Outcome of a best-effort bulk operation. A failing item lands in
/// `failed` and processing carries on; only a failure of the batch as a
/// whole is reported as an error.
#[derive(Debug, Serialize)]
pub struct BatchResult<S, F> {
    pub succeeded: Vec<S>,
    pub failed: Vec<F>,
}

impl<S, F> Default for BatchResult<S, F> {
    fn default() -> Self {
        BatchResult {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<S, F> BatchResult<S, F> {
    pub fn push_ok(&mut self, item: S) {
        self.succeeded.push(item);
    }

    pub fn push_err(&mut self, item: F) {
        self.failed.push(item);
    }

    /// Runs `op` on every item in order. An error is turned into a
    /// failure by `on_err` and the loop moves on to the next item. `Ok(None)`
    /// means the item needed no work and is recorded nowhere.
    pub async fn run_each<'a, T, O, Fut>(
        &mut self,
        items: &'a [T],
        mut op: impl FnMut(&'a T) -> Fut,
        mut on_err: impl FnMut(&'a T, AppError) -> F,
    ) where
        Fut: Future<Output = AppResult<O>>,
        O: Into<Option<S>>,
    {
        for item in items {
            match op(item).await {
                Ok(done) => {
                    if let Some(done) = done.into() {
                        self.push_ok(done);
                    }
                }
                Err(e) => {
                    let failure = on_err(item, e);
                    self.push_err(failure);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BatchFailure {
    /// Employee id or code the item referred to
    pub subject: String,
    pub reason: String,
}

impl BatchFailure {
    pub fn new(subject: impl ToString, reason: impl ToString) -> Self {
        BatchFailure {
            subject: subject.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_do_not_hide_successes() {
        let mut result: BatchResult<u64, BatchFailure> = BatchResult::default();
        result.push_ok(1);
        result.push_err(BatchFailure::new("EMP-404", "Employee not found"));
        result.push_ok(3);

        assert_eq!(result.succeeded, vec![1, 3]);
        assert_eq!(result.failed.len(), 1);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["failed"][0]["reason"], "Employee not found");
    }

    #[actix_web::test]
    async fn failing_item_does_not_stop_the_batch() {
        let codes = ["EMP-001", "EMP-404", "EMP-003"];
        let mut result: BatchResult<String, BatchFailure> = BatchResult::default();
        result
            .run_each(
                &codes[..],
                |code| async move {
                    if *code == "EMP-404" {
                        Err(AppError::not_found("Employee not found"))
                    } else {
                        Ok(code.to_string())
                    }
                },
                |code, e| BatchFailure::new(code, e),
            )
            .await;

        assert_eq!(result.succeeded, vec!["EMP-001", "EMP-003"]);
        assert_eq!(
            result.failed,
            vec![BatchFailure::new("EMP-404", "Employee not found")]
        );
    }

    #[actix_web::test]
    async fn skipped_items_are_not_reported() {
        let items = [1u64, 2, 3];
        let mut result: BatchResult<u64, BatchFailure> = BatchResult::default();
        result
            .run_each(
                &items[..],
                |n| async move { Ok::<_, AppError>((*n != 2).then_some(*n)) },
                |n, e| BatchFailure::new(n, e),
            )
            .await;

        assert_eq!(result.succeeded, vec![1, 3]);
        assert!(result.failed.is_empty());
    }
}
