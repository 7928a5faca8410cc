//! In-memory record store for tests and local runs.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use records_core::contract::validate_record;
use records_core::cursor::Cursor;
use records_core::record::{Attributes, Record};
use tokio::sync::RwLock;

use super::record_store::{Page, RecordStore, StoreError};

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<String, Record>>,
    /// Number of upcoming calls that fail with `Unavailable`.
    injected_failures: AtomicU32,
    calls: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.records.write().await;
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        store
    }

    pub fn fail_next(&self, calls: u32) {
        self.injected_failures.store(calls, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn begin_call(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            });
        match injected {
            Ok(_) => Err(StoreError::Unavailable("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        self.begin_call()?;
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn put(&self, record: Record) -> Result<Record, StoreError> {
        self.begin_call()?;
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn insert(&self, record: Record) -> Result<Record, StoreError> {
        self.begin_call()?;
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn replace(&self, record: Record) -> Result<Record, StoreError> {
        self.begin_call()?;
        let mut records = self.records.write().await;
        let Some(existing) = records.get_mut(&record.id) else {
            return Err(StoreError::NotFound);
        };
        *existing = record.clone();
        Ok(record)
    }

    async fn merge(&self, id: &str, patch: Attributes) -> Result<Record, StoreError> {
        self.begin_call()?;
        let mut records = self.records.write().await;
        let Some(existing) = records.get_mut(id) else {
            return Err(StoreError::NotFound);
        };
        let mut merged = existing.clone();
        merged.merge(patch);
        validate_record(&merged).map_err(|error| StoreError::Invalid(error.to_string()))?;
        *existing = merged.clone();
        Ok(merged)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.begin_call()?;
        self.records
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, limit: usize, cursor: Option<&Cursor>) -> Result<Page, StoreError> {
        self.begin_call()?;
        let records = self.records.read().await;
        let lower = match cursor {
            Some(cursor) => Bound::Excluded(cursor.last_id().to_string()),
            None => Bound::Unbounded,
        };

        let mut remaining = records.range((lower, Bound::Unbounded)).map(|(_, r)| r);
        let page: Vec<Record> = remaining.by_ref().take(limit).cloned().collect();
        let next_cursor = match (page.last(), remaining.next()) {
            (Some(last), Some(_)) => Some(Cursor::after(last.id.clone())),
            _ => None,
        };

        Ok(Page {
            records: page,
            next_cursor,
        })
    }
}
