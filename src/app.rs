use crate::api::{FileUploader, RemoteTasks};
use crate::error::{AppError, Result};
use crate::models::{ListFilter, TaskRecord};
use crate::session::{EditSession, SubmitIntent};
use crate::store::ListStore;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct App<R> {
    remote: R,
    pub store: ListStore,
    pub session: EditSession,
    pub state: ListState,
    pub input_mode: InputMode,
    pub status: Option<Status>,
    pub upload_path: String,
}

/// Modes outside the task form. While `session` is open it takes every key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    ConfirmDelete(u64),
    Upload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl<R> App<R>
where
    R: RemoteTasks + FileUploader,
{
    pub fn new(remote: R, store: ListStore) -> App<R> {
        let mut state = ListState::default();
        if !store.is_empty() {
            state.select(Some(0));
        }
        App {
            remote,
            store,
            session: EditSession::new(),
            state,
            input_mode: InputMode::Normal,
            status: None,
            upload_path: String::new(),
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    fn error(&mut self, err: &AppError) {
        self.status = Some(Status {
            kind: StatusKind::Error,
            text: err.to_string(),
        });
    }

    pub fn selected(&self) -> Option<&TaskRecord> {
        self.state
            .selected()
            .and_then(|i| self.store.records().get(i))
    }

    pub fn next(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.store.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.store.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.store.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Reloads the list from the remote store, keeping the cursor in range.
    pub async fn refresh(&mut self) -> Result<()> {
        let loaded = self.store.load(&self.remote).await.map(|_| ());
        if let Err(err) = loaded {
            self.error(&err);
            return Err(err);
        }
        let len = self.store.len();
        let selected = match self.state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.state.select(selected);
        Ok(())
    }

    pub async fn toggle_hide_finished(&mut self) -> Result<()> {
        let filter = match self.store.filter().is_finished {
            Some(false) => ListFilter::default(),
            _ => ListFilter::unfinished(),
        };
        self.store.set_filter(filter);
        self.refresh().await
    }

    pub fn open_new(&mut self) {
        self.session.open(None);
    }

    /// Opens the form on a copy of the record. Finished records are not editable.
    pub fn open_edit(&mut self, id: u64) -> Result<()> {
        let record = match self.store.get(id) {
            Some(record) => record,
            None => return Err(AppError::StaleReference { id }),
        };
        if !record.actions().can_edit {
            return Err(AppError::NotEditable { id });
        }
        self.session.open(Some(record));
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.session.cancel();
    }

    /// Sends the form as exactly one create or update call, then reloads.
    /// A failed call leaves the form open with its drafts.
    pub async fn submit(&mut self) -> Result<()> {
        let intent = self.session.begin_submit()?;

        let outcome = match &intent {
            SubmitIntent::Create(task) => self.remote.create(task).await,
            SubmitIntent::Update(task) => self.remote.update(task).await,
        };

        match outcome {
            Ok(saved) => {
                info!(id = saved.id, "task saved");
                self.session.complete();
                self.refresh().await?;
                self.info(format!("Saved \"{}\"", saved.summary));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "save failed");
                self.session.fail(err.to_string());
                self.error(&err);
                Err(err)
            }
        }
    }

    pub async fn finish(&mut self, id: u64) -> Result<()> {
        if let Some(record) = self.store.get(id) {
            if !record.actions().can_finish {
                return Err(AppError::AlreadyFinished { id });
            }
        }
        if let Err(err) = self.remote.finish(id).await {
            self.error(&err);
            return Err(err);
        }
        info!(id, "task finished");
        self.refresh().await?;
        self.info("Marked complete");
        Ok(())
    }

    pub async fn delete(&mut self, id: u64) -> Result<()> {
        if let Err(err) = self.remote.delete(id).await {
            self.error(&err);
            return Err(err);
        }
        info!(id, "task deleted");
        self.refresh().await?;
        self.info("Deleted");
        Ok(())
    }

    pub async fn upload(&mut self, path: PathBuf) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match self.remote.upload_file(&path).await {
            Ok(receipt) => {
                info!(file = %receipt.file_name, "file uploaded");
                self.info(format!("{} uploaded", receipt.file_name));
                Ok(())
            }
            Err(err) => {
                warn!(file = %name, error = %err, "upload failed");
                self.status = Some(Status {
                    kind: StatusKind::Error,
                    text: format!("{} upload failed: {}", name, err),
                });
                Err(err)
            }
        }
    }

    /// Reports a rejected action on the status line. Remote failures have
    /// already been reported where they happened.
    fn report(&mut self, result: Result<()>) {
        if let Err(err) = result {
            if !err.is_remote() {
                self.error(&err);
            }
        }
    }

    async fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => self.session.next_field(),
            KeyCode::Enter => {
                let result = self.submit().await;
                self.report(result);
            }
            KeyCode::Esc => self.cancel_edit(),
            KeyCode::Backspace => self.session.pop_char(),
            KeyCode::Char(c) => self.session.push_char(c),
            _ => {}
        }
    }

    pub async fn handle_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        if self.session.is_open() {
            self.handle_form_key(key).await;
            return Ok(false);
        }
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('a') => self.open_new(),
                KeyCode::Char('e') => {
                    if let Some(id) = self.selected().map(|r| r.id) {
                        let result = self.open_edit(id);
                        self.report(result);
                    }
                }
                KeyCode::Char('f') => {
                    if let Some(id) = self.selected().map(|r| r.id) {
                        let result = self.finish(id).await;
                        self.report(result);
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = self.selected().map(|r| r.id) {
                        self.input_mode = InputMode::ConfirmDelete(id);
                    }
                }
                KeyCode::Char('r') => {
                    let result = self.refresh().await;
                    self.report(result);
                }
                KeyCode::Char('t') => {
                    let result = self.toggle_hide_finished().await;
                    self.report(result);
                }
                KeyCode::Char('u') => {
                    self.upload_path.clear();
                    self.input_mode = InputMode::Upload;
                }
                _ => {}
            },

            InputMode::ConfirmDelete(id) => {
                self.input_mode = InputMode::Normal;
                if let KeyCode::Char('y') = key.code {
                    let result = self.delete(id).await;
                    self.report(result);
                }
            }

            InputMode::Upload => match key.code {
                KeyCode::Enter => {
                    self.input_mode = InputMode::Normal;
                    let path = self.upload_path.trim().to_string();
                    if !path.is_empty() {
                        // upload reports its own outcome, including local I/O errors
                        let _ = self.upload(PathBuf::from(path)).await;
                    }
                }
                KeyCode::Esc => self.input_mode = InputMode::Normal,
                KeyCode::Backspace => {
                    self.upload_path.pop();
                }
                KeyCode::Char(c) => self.upload_path.push(c),
                _ => {}
            },
        }
        Ok(false)
    }
}

#[cfg(test)]
impl<R> App<R> {
    pub fn remote(&self) -> &R {
        &self.remote
    }
}
