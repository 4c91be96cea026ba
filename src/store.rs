use crate::api::RemoteTasks;
use crate::error::Result;
use crate::models::{ListFilter, TaskRecord};
use tracing::{info, warn};

/// Local copy of the remote list. Only ever replaced wholesale by `load`;
/// individual records are never patched in place.
#[derive(Debug, Default)]
pub struct ListStore {
    records: Vec<TaskRecord>,
    filter: ListFilter,
    stale: bool,
}

impl ListStore {
    pub fn new(filter: ListFilter) -> Self {
        ListStore {
            records: Vec::new(),
            filter,
            stale: false,
        }
    }

    /// Fetches the current list. On failure the previous records are kept
    /// and the store is marked stale until the next successful load.
    pub async fn load<R>(&mut self, remote: &R) -> Result<&[TaskRecord]>
    where
        R: RemoteTasks + ?Sized,
    {
        match remote.list(&self.filter).await {
            Ok(records) => {
                info!(count = records.len(), "task list loaded");
                self.records = records;
                self.stale = false;
                Ok(&self.records)
            }
            Err(err) => {
                warn!(error = %err, "task list load failed");
                self.stale = true;
                Err(err)
            }
        }
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn get(&self, id: u64) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn filter(&self) -> ListFilter {
        self.filter
    }

    /// Takes effect on the next `load`.
    pub fn set_filter(&mut self, filter: ListFilter) {
        self.filter = filter;
    }
}
