use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const DETAILS_PREVIEW_CHARS: usize = 50;

// Task record as returned by the remote collection
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, with = "flag")]
    pub is_finished: bool,
    #[serde(default, rename = "is_del", with = "flag")]
    pub is_deleted: bool,
    #[serde(default, rename = "createTime", deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Actions the list view may offer for this record. A finished record
    /// can only be deleted.
    pub fn actions(&self) -> RowActions {
        RowActions {
            can_edit: !self.is_finished,
            can_finish: !self.is_finished,
            finished_label: self.is_finished,
            can_delete: true,
        }
    }

    pub fn details_preview(&self) -> String {
        let details = self.details.as_deref().unwrap_or("");
        if details.chars().count() <= DETAILS_PREVIEW_CHARS {
            details.to_string()
        } else {
            let head: String = details.chars().take(DETAILS_PREVIEW_CHARS).collect();
            format!("{}...", head)
        }
    }

    pub fn created_label(&self) -> String {
        match self.created_at {
            Some(ts) => ts.with_timezone(&Local).format("%Y/%m/%d %H:%M").to_string(),
            None => "-".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowActions {
    pub can_edit: bool,
    pub can_finish: bool,
    pub finished_label: bool,
    pub can_delete: bool,
}

/// Payload for creating a record. The completion and deletion flags are
/// always written as false; there is no other way to build one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewTask {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(with = "flag")]
    is_finished: bool,
    #[serde(rename = "is_del", with = "flag")]
    is_deleted: bool,
}

impl NewTask {
    pub fn new(summary: impl Into<String>, details: Option<String>) -> Self {
        NewTask {
            summary: summary.into(),
            details,
            is_finished: false,
            is_deleted: false,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

// Payload for editing an existing record; flags are not part of it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskUpdate {
    pub id: u64,
    pub summary: String,
    pub details: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TaskRef {
    pub id: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub is_finished: Option<bool>,
}

impl ListFilter {
    pub fn unfinished() -> Self {
        ListFilter {
            is_finished: Some(false),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(finished) = self.is_finished {
            params.push(("is_finished", u8::from(finished).to_string()));
        }
        params
    }
}

// The remote store writes flags as 0/1 integers; older rows may carry booleans.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(false),
            Some(Raw::Bool(b)) => Ok(b),
            Some(Raw::Int(n)) => Ok(n != 0),
            Some(Raw::Text(s)) => match s.trim() {
                "" | "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                other => Err(D::Error::custom(format!("invalid flag value: {}", other))),
            },
        }
    }
}

mod timestamp {
    use super::*;
    use serde::de::Error;
    use serde::Deserializer;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = match Option::<Raw>::deserialize(deserializer)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match raw {
            Raw::Millis(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", ms))),
            Raw::Text(text) => parse_text(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", text))),
        }
    }

    fn parse_text(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        // MySQL style, stored in server local time
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
