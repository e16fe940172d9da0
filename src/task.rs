//! Task and suggestion data structures.
//!
//! `Task` is the unit the store persists; `AiSuggestion` is the ephemeral
//! advisory produced by an analysis run and never written to disk.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A user-created unit of work filed under exactly one quadrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    pub quadrant: QuadrantType,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Google Calendar "create event" endpoint.
const CALENDAR_TEMPLATE_URL: &str = "https://calendar.google.com/calendar/render?action=TEMPLATE";

impl Task {
    /// Google Calendar link that pre-fills an event with this task's name
    /// and description.
    pub fn calendar_url(&self) -> String {
        format!(
            "{}&text={}&details={}",
            CALENDAR_TEMPLATE_URL,
            urlencoding::encode(&self.name),
            urlencoding::encode(&self.description)
        )
    }
}

/// An advisory message returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_quadrant: Option<QuadrantType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serialises_with_camel_case_keys() {
        let task = Task {
            id: "abc".into(),
            name: "Write report".into(),
            description: String::new(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            labels: vec![],
            completed: false,
            quadrant: QuadrantType::DoNow,
            created_at: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["dueDate"], "2026-03-01");
        assert_eq!(value["createdAt"], 1_700_000_000_000i64);
        assert_eq!(value["quadrant"], "DO_NOW");
    }

    #[test]
    fn calendar_url_encodes_name_and_description() {
        let task = Task {
            id: "abc".into(),
            name: "Renew passport & visa".into(),
            description: "Bring 2 photos/ID\nto desk #4".into(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            labels: vec![],
            completed: false,
            quadrant: QuadrantType::DoNow,
            created_at: 0,
        };
        assert_eq!(
            task.calendar_url(),
            "https://calendar.google.com/calendar/render?action=TEMPLATE\
             &text=Renew%20passport%20%26%20visa\
             &details=Bring%202%20photos%2FID%0Ato%20desk%20%234"
        );

        let bare = Task {
            description: String::new(),
            ..task
        };
        assert!(bare.calendar_url().ends_with("&details="));
    }

    #[test]
    fn suggestion_optional_fields_may_be_absent() {
        let s: AiSuggestion =
            serde_json::from_str(r#"{"type":"TAG","message":"Add a label"}"#).unwrap();
        assert_eq!(s.kind, SuggestionKind::Tag);
        assert!(s.task_id.is_none());
        assert!(s.target_quadrant.is_none());
    }

    #[test]
    fn suggestion_without_message_is_rejected() {
        assert!(serde_json::from_str::<AiSuggestion>(r#"{"type":"GROUP"}"#).is_err());
    }
}
