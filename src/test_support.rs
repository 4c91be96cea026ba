use crate::api::{FileUploader, RemoteTasks, UploadReceipt};
use crate::error::{AppError, Result};
use crate::models::{ListFilter, NewTask, TaskRecord, TaskUpdate};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    List(ListFilter),
    Create(NewTask),
    Update(TaskUpdate),
    Delete(u64),
    Finish(u64),
    Upload(String),
}

#[derive(Default)]
struct State {
    records: Vec<TaskRecord>,
    next_id: u64,
    calls: Vec<Call>,
    fail_next: bool,
}

/// In-memory remote collection that records every call it receives.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        FakeRemote {
            state: Mutex::new(State {
                records,
                next_id,
                ..State::default()
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// The next call of any kind fails with a 500.
    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    pub fn stored(&self, id: u64) -> Option<TaskRecord> {
        let state = self.state.lock().unwrap();
        state.records.iter().find(|r| r.id == id).cloned()
    }

    fn begin(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail_next {
            state.fail_next = false;
            return Err(AppError::Remote {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(state)
    }
}

// Server-side filtering as the remote collection applies it
fn matches_filter(filter: &ListFilter, record: &TaskRecord) -> bool {
    filter.is_finished.map_or(true, |f| record.is_finished == f)
}

fn live_mut(state: &mut State, id: u64) -> Result<&mut TaskRecord> {
    state
        .records
        .iter_mut()
        .find(|r| r.id == id && !r.is_deleted)
        .ok_or(AppError::StaleReference { id })
}

#[async_trait]
impl RemoteTasks for FakeRemote {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<TaskRecord>> {
        let state = self.begin(Call::List(*filter))?;
        Ok(state
            .records
            .iter()
            .filter(|r| !r.is_deleted && matches_filter(filter, r))
            .cloned()
            .collect())
    }

    async fn create(&self, task: &NewTask) -> Result<TaskRecord> {
        let mut state = self.begin(Call::Create(task.clone()))?;
        let id = state.next_id.max(1);
        state.next_id = id + 1;
        let record = TaskRecord {
            id,
            summary: task.summary().to_string(),
            details: task.details().map(str::to_string),
            is_finished: task.is_finished(),
            is_deleted: task.is_deleted(),
            created_at: Some(Utc::now()),
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, task: &TaskUpdate) -> Result<TaskRecord> {
        let mut state = self.begin(Call::Update(task.clone()))?;
        let record = live_mut(&mut state, task.id)?;
        record.summary = task.summary.clone();
        record.details = task.details.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let mut state = self.begin(Call::Delete(id))?;
        live_mut(&mut state, id)?.is_deleted = true;
        Ok(())
    }

    async fn finish(&self, id: u64) -> Result<()> {
        let mut state = self.begin(Call::Finish(id))?;
        live_mut(&mut state, id)?.is_finished = true;
        Ok(())
    }
}

#[async_trait]
impl FileUploader for FakeRemote {
    async fn upload_file(&self, path: &Path) -> Result<UploadReceipt> {
        let name = path.display().to_string();
        let _state = self.begin(Call::Upload(name.clone()))?;
        Ok(UploadReceipt { file_name: name })
    }
}

pub fn record(id: u64, summary: &str) -> TaskRecord {
    TaskRecord {
        id,
        summary: summary.to_string(),
        created_at: Some(Utc::now()),
        ..TaskRecord::default()
    }
}
