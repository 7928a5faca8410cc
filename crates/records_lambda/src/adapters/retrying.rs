//! Timeout and bounded-retry decorator for any `RecordStore`.

use std::future::Future;

use async_trait::async_trait;
use records_core::cursor::Cursor;
use records_core::record::{Attributes, Record};
use records_core::retry::RetryPolicy;

use super::record_store::{Page, RecordStore, StoreError};

pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: RecordStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        self.run_tracked(operation, call).await.result
    }

    async fn run_tracked<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Attempts<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let result = match tokio::time::timeout(self.policy.attempt_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Unavailable(format!(
                    "{operation} timed out after {:?}",
                    self.policy.attempt_timeout
                ))),
            };

            match result {
                Err(error) if error.is_transient() && self.policy.should_retry(attempts) => {
                    let delay = self.policy.next_delay(attempts);
                    tracing::warn!(
                        operation,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying transient store failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => {
                    return Attempts {
                        result,
                        retried: attempts > 1,
                    }
                }
            }
        }
    }
}

/// Final result of a retried call. When `retried` is set, an earlier attempt
/// failed without a response and may still have been applied.
struct Attempts<T> {
    result: Result<T, StoreError>,
    retried: bool,
}

#[async_trait]
impl<S: RecordStore> RecordStore for RetryingStore<S> {
    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        self.run("get", || self.inner.get(id)).await
    }

    async fn put(&self, record: Record) -> Result<Record, StoreError> {
        self.run("put", || self.inner.put(record.clone())).await
    }

    async fn insert(&self, record: Record) -> Result<Record, StoreError> {
        let attempts = self.run_tracked("insert", || self.inner.insert(record.clone())).await;
        match attempts.result {
            // The conflicting record may be our own write from a lost attempt.
            Err(StoreError::AlreadyExists) if attempts.retried => {
                match self.run("get", || self.inner.get(&record.id)).await {
                    Ok(stored) if stored == record => {
                        tracing::info!(id = %record.id, "insert landed on an earlier attempt");
                        Ok(stored)
                    }
                    Ok(_) | Err(StoreError::NotFound) => Err(StoreError::AlreadyExists),
                    Err(error) => Err(error),
                }
            }
            result => result,
        }
    }

    // Replace and merge are idempotent under retry.
    async fn replace(&self, record: Record) -> Result<Record, StoreError> {
        self.run("replace", || self.inner.replace(record.clone())).await
    }

    async fn merge(&self, id: &str, patch: Attributes) -> Result<Record, StoreError> {
        self.run("merge", || self.inner.merge(id, patch.clone())).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let attempts = self.run_tracked("delete", || self.inner.delete(id)).await;
        match attempts.result {
            Err(StoreError::NotFound) if attempts.retried => {
                tracing::info!(id, "delete landed on an earlier attempt");
                Ok(())
            }
            result => result,
        }
    }

    async fn list(&self, limit: usize, cursor: Option<&Cursor>) -> Result<Page, StoreError> {
        self.run("list", || self.inner.list(limit, cursor)).await
    }
}
