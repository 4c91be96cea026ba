use crate::error::{AppError, Result};
use crate::models::{NewTask, TaskRecord, TaskUpdate};
use std::collections::BTreeMap;
use std::fmt;

pub const SUMMARY_MAX_CHARS: usize = 40;
pub const DETAILS_MAX_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Summary,
    Details,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Summary => "summary",
            Field::Details => "details",
        }
    }

    fn max_chars(&self) -> usize {
        match self {
            Field::Summary => SUMMARY_MAX_CHARS,
            Field::Details => DETAILS_MAX_CHARS,
        }
    }
}

/// Field-level validation messages, empty when the form is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msg)| format!("{}: {}", field.name(), msg))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedFields {
    pub summary: String,
    pub details: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditTarget {
    #[default]
    New,
    Existing(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitIntent {
    Create(NewTask),
    Update(TaskUpdate),
}

/// Transient state of the task form. Holds copies of the record's fields,
/// never a reference into the list.
#[derive(Debug, Default)]
pub struct EditSession {
    target: EditTarget,
    pub summary_draft: String,
    pub details_draft: String,
    is_open: bool,
    active: Option<Field>,
    errors: ValidationErrors,
    remote_error: Option<String>,
    in_flight: bool,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, record: Option<&TaskRecord>) {
        *self = EditSession::default();
        if let Some(record) = record {
            if record.id > 0 {
                self.target = EditTarget::Existing(record.id);
            }
            self.summary_draft = record.summary.clone();
            self.details_draft = record.details.clone().unwrap_or_default();
        }
        self.active = Some(Field::Summary);
        self.is_open = true;
    }

    pub fn cancel(&mut self) {
        *self = EditSession::default();
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn target(&self) -> EditTarget {
        self.target
    }

    pub fn active_field(&self) -> Field {
        self.active.unwrap_or(Field::Summary)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn remote_error(&self) -> Option<&str> {
        self.remote_error.as_deref()
    }

    pub fn next_field(&mut self) {
        self.active = Some(match self.active_field() {
            Field::Summary => Field::Details,
            Field::Details => Field::Summary,
        });
    }

    /// Types into the active field. Input past the field's limit is dropped.
    pub fn push_char(&mut self, c: char) {
        let field = self.active_field();
        let draft = self.draft_mut(field);
        if draft.chars().count() < field.max_chars() {
            draft.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        let field = self.active_field();
        self.draft_mut(field).pop();
    }

    fn draft_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Summary => &mut self.summary_draft,
            Field::Details => &mut self.details_draft,
        }
    }

    pub fn validate(&self) -> std::result::Result<ValidatedFields, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let summary = self.summary_draft.trim();
        if summary.is_empty() {
            errors.insert(Field::Summary, "Summary is required");
        } else if summary.chars().count() > SUMMARY_MAX_CHARS {
            errors.insert(
                Field::Summary,
                format!("Summary must be at most {} characters", SUMMARY_MAX_CHARS),
            );
        }

        if self.details_draft.chars().count() > DETAILS_MAX_CHARS {
            errors.insert(
                Field::Details,
                format!("Details must be at most {} characters", DETAILS_MAX_CHARS),
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let details = match self.details_draft.trim() {
            "" => None,
            trimmed => Some(trimmed.to_string()),
        };

        Ok(ValidatedFields {
            summary: summary.to_string(),
            details,
        })
    }

    /// Validates the drafts and picks the remote call for them. On success the
    /// session is marked in flight until `complete` or `fail` is called.
    pub fn begin_submit(&mut self) -> Result<SubmitIntent> {
        if self.in_flight {
            return Err(AppError::SubmitInFlight);
        }

        let fields = match self.validate() {
            Ok(fields) => fields,
            Err(errors) => {
                self.errors = errors.clone();
                return Err(AppError::Validation(errors));
            }
        };

        self.errors = ValidationErrors::default();
        self.remote_error = None;
        self.in_flight = true;

        Ok(match self.target {
            EditTarget::New => SubmitIntent::Create(NewTask::new(fields.summary, fields.details)),
            EditTarget::Existing(id) => SubmitIntent::Update(TaskUpdate {
                id,
                summary: fields.summary,
                details: fields.details,
            }),
        })
    }

    pub fn complete(&mut self) {
        *self = EditSession::default();
    }

    /// Keeps the form open with the drafts intact so the user can retry.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.in_flight = false;
        self.remote_error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session_with_summary(summary: &str) -> EditSession {
        let mut session = EditSession::new();
        session.open(None);
        session.summary_draft = summary.to_string();
        session
    }

    #[test]
    fn test_open_without_record_targets_new() {
        let mut session = EditSession::new();
        session.open(None);

        assert!(session.is_open());
        assert_eq!(session.target(), EditTarget::New);
        assert_eq!(session.summary_draft, "");
        assert_eq!(session.details_draft, "");
    }

    #[test]
    fn test_open_with_record_preloads_drafts() {
        let record = TaskRecord {
            id: 5,
            summary: "Old".to_string(),
            details: Some("x".to_string()),
            ..Default::default()
        };
        let mut session = EditSession::new();
        session.open(Some(&record));

        assert_eq!(session.target(), EditTarget::Existing(5));
        assert_eq!(session.summary_draft, "Old");
        assert_eq!(session.details_draft, "x");
    }

    #[test]
    fn test_open_with_missing_details_gives_empty_draft() {
        let record = TaskRecord {
            id: 2,
            summary: "Only summary".to_string(),
            ..Default::default()
        };
        let mut session = EditSession::new();
        session.open(Some(&record));
        assert_eq!(session.details_draft, "");
    }

    #[test]
    fn test_open_with_unpersisted_record_targets_new() {
        let record = TaskRecord {
            id: 0,
            summary: "Draft".to_string(),
            ..Default::default()
        };
        let mut session = EditSession::new();
        session.open(Some(&record));
        assert_eq!(session.target(), EditTarget::New);
    }

    #[test]
    fn test_reopen_for_new_discards_previous_target() {
        let record = TaskRecord {
            id: 7,
            summary: "Old".to_string(),
            ..Default::default()
        };
        let mut session = EditSession::new();
        session.open(Some(&record));
        session.open(None);
        assert_eq!(session.target(), EditTarget::New);
        assert_eq!(session.summary_draft, "");
    }

    #[test]
    fn test_blank_summary_is_rejected() {
        for summary in ["", "   ", "\t"] {
            let errors = session_with_summary(summary).validate().unwrap_err();
            assert_eq!(errors.get(Field::Summary), Some("Summary is required"));
            assert_eq!(errors.get(Field::Details), None);
        }
    }

    #[test]
    fn test_summary_length_boundary() {
        assert!(session_with_summary(&"a".repeat(40)).validate().is_ok());
        let errors = session_with_summary(&"a".repeat(41)).validate().unwrap_err();
        assert!(errors.get(Field::Summary).is_some());
    }

    #[test]
    fn test_details_length_boundary() {
        let mut session = session_with_summary("ok");
        session.details_draft = "d".repeat(200);
        assert!(session.validate().is_ok());
        session.details_draft.push('d');
        let errors = session.validate().unwrap_err();
        assert!(errors.get(Field::Details).is_some());
    }

    #[test]
    fn test_validated_fields_trim_summary_and_drop_empty_details() {
        let fields = session_with_summary("  Buy milk ").validate().unwrap();
        assert_eq!(
            fields,
            ValidatedFields {
                summary: "Buy milk".to_string(),
                details: None,
            }
        );
    }

    #[test]
    fn test_blank_details_are_sent_as_absent() {
        let mut session = session_with_summary("Buy milk");
        session.details_draft = "   ".to_string();
        assert_eq!(session.validate().unwrap().details, None);

        session.details_draft = "  2 litres ".to_string();
        assert_eq!(session.validate().unwrap().details.as_deref(), Some("2 litres"));
    }

    #[test]
    fn test_details_limit_counts_surrounding_spaces() {
        let mut session = session_with_summary("Buy milk");
        session.details_draft = format!(" {} ", "d".repeat(199));
        assert!(session.validate().unwrap_err().get(Field::Details).is_some());
    }

    #[test]
    fn test_cancel_resets_to_closed_and_empty() {
        let record = TaskRecord {
            id: 5,
            summary: "Old".to_string(),
            ..Default::default()
        };
        let mut session = EditSession::new();
        session.open(Some(&record));
        session.cancel();

        assert!(!session.is_open());
        assert_eq!(session.target(), EditTarget::New);
        assert_eq!(session.summary_draft, "");
        assert!(session.errors().is_empty());
    }

    #[test]
    fn test_begin_submit_dispatches_create_for_new() {
        let mut session = session_with_summary("Buy milk");
        let intent = session.begin_submit().unwrap();
        assert_eq!(intent, SubmitIntent::Create(NewTask::new("Buy milk", None)));
        assert!(session.is_in_flight());
    }

    #[test]
    fn test_begin_submit_dispatches_update_for_existing() {
        let record = TaskRecord {
            id: 5,
            summary: "Old".to_string(),
            details: Some("x".to_string()),
            ..Default::default()
        };
        let mut session = EditSession::new();
        session.open(Some(&record));
        session.summary_draft = "New".to_string();

        let intent = session.begin_submit().unwrap();
        assert_eq!(
            intent,
            SubmitIntent::Update(TaskUpdate {
                id: 5,
                summary: "New".to_string(),
                details: Some("x".to_string()),
            })
        );
    }

    #[test]
    fn test_begin_submit_rejects_second_submit() {
        let mut session = session_with_summary("Buy milk");
        session.begin_submit().unwrap();
        assert!(matches!(session.begin_submit(), Err(AppError::SubmitInFlight)));
    }

    #[test]
    fn test_invalid_submit_records_errors_and_stays_open() {
        let mut session = session_with_summary("");
        assert!(matches!(session.begin_submit(), Err(AppError::Validation(_))));
        assert!(session.is_open());
        assert!(!session.is_in_flight());
        assert!(session.errors().get(Field::Summary).is_some());
    }

    #[test]
    fn test_fail_keeps_drafts() {
        let mut session = session_with_summary("Buy milk");
        session.details_draft = "2 litres".to_string();
        session.begin_submit().unwrap();
        session.fail("Server responded 500: boom");

        assert!(session.is_open());
        assert!(!session.is_in_flight());
        assert_eq!(session.summary_draft, "Buy milk");
        assert_eq!(session.details_draft, "2 litres");
        assert_eq!(session.remote_error(), Some("Server responded 500: boom"));
    }

    #[test]
    fn test_typing_stops_at_field_limit() {
        let mut session = session_with_summary(&"a".repeat(40));
        session.push_char('b');
        assert_eq!(session.summary_draft.chars().count(), 40);

        session.next_field();
        session.push_char('z');
        session.pop_char();
        session.push_char('y');
        assert_eq!(session.details_draft, "y");
    }
}
