//! Suggestion engine: asks an external model for advice about the board.
//!
//! The engine is best effort. Whatever goes wrong between building the
//! request and validating the reply is logged and turned into an empty
//! suggestion list; callers never see an error. Each call is independent
//! and works only from the snapshot it is handed.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::fields::{QuadrantType, SuggestionKind};
use crate::task::{AiSuggestion, Task};

/// Number of tasks above which a quadrant counts as bloated.
pub const BLOAT_THRESHOLD: usize = 5;

/// Something that can run a prompt against a generative model with a
/// declared JSON response schema.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Returns the response text, or `None` when the service sent no body.
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Option<String>>;
}

#[async_trait]
impl<B: AnalysisBackend + ?Sized> AnalysisBackend for Box<B> {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Option<String>> {
        (**self).generate(prompt, schema).await
    }
}

/// The slice of a task that leaves the machine. Description and labels stay local.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskDigest<'a> {
    id: &'a str,
    name: &'a str,
    quadrant: QuadrantType,
    due_date: NaiveDate,
}

/// Turns a task snapshot into a list of suggestions via an [`AnalysisBackend`].
pub struct SuggestionEngine<B> {
    backend: B,
}

impl<B: AnalysisBackend> SuggestionEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Analyse `tasks` relative to today's (UTC) date.
    pub async fn analyze(&self, tasks: &[Task]) -> Vec<AiSuggestion> {
        self.analyze_on(tasks, Utc::now().date_naive()).await
    }

    /// Analyse `tasks` as if today were `today`.
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn analyze_on(&self, tasks: &[Task], today: NaiveDate) -> Vec<AiSuggestion> {
        if tasks.is_empty() {
            debug!("No tasks, skipping analysis");
            return Vec::new();
        }

        match self.try_analyze(tasks, today).await {
            Ok(suggestions) => {
                info!(count = suggestions.len(), "Analysis finished");
                suggestions
            }
            Err(e) => {
                warn!(error = %e, "AI analysis failed");
                Vec::new()
            }
        }
    }

    async fn try_analyze(&self, tasks: &[Task], today: NaiveDate) -> Result<Vec<AiSuggestion>> {
        let prompt = build_prompt(tasks, today)?;
        let schema = response_schema();
        let text = self.backend.generate(&prompt, &schema).await?;
        parse_suggestions(text.as_deref().unwrap_or("[]"))
    }
}

/// Build the analysis prompt for `tasks`, with `today` anchoring "tomorrow".
pub fn build_prompt(tasks: &[Task], today: NaiveDate) -> Result<String> {
    let digest: Vec<TaskDigest<'_>> = tasks
        .iter()
        .map(|t| TaskDigest {
            id: &t.id,
            name: &t.name,
            quadrant: t.quadrant,
            due_date: t.due_date,
        })
        .collect();
    let payload = serde_json::to_string(&digest)?;
    let tomorrow = today + Duration::days(1);

    Ok(format!(
        "Analyze these tasks from an Eisenhower Matrix productivity perspective:\n\
         {payload}\n\
         \n\
         Today is {today}. Provide 2-3 specific suggestions:\n\
         1. Check if any quadrant has more than {BLOAT_THRESHOLD} tasks (type {bloat}).\n\
         2. Group similar tasks by name/intent (type {group}).\n\
         3. Suggest relevant tags for untagged tasks (type {tag}).\n\
         4. Alert if a task is due tomorrow ({tomorrow}) but is not in {do_now} (type {urgent}).\n\
         Reference tasks by their id in taskId and proposed moves by quadrant name in targetQuadrant.",
        bloat = SuggestionKind::Bloat.as_str(),
        group = SuggestionKind::Group.as_str(),
        tag = SuggestionKind::Tag.as_str(),
        urgent = SuggestionKind::Urgent.as_str(),
        do_now = QuadrantType::DoNow.as_str(),
    ))
}

/// Response schema declared to the service: an array of suggestion objects.
pub fn response_schema() -> Value {
    let kinds = [
        SuggestionKind::Bloat,
        SuggestionKind::Group,
        SuggestionKind::Tag,
        SuggestionKind::Urgent,
    ]
    .map(SuggestionKind::as_str);
    let quadrants = QuadrantType::ALL.map(QuadrantType::as_str);

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "type": { "type": "STRING", "format": "enum", "enum": kinds },
                "message": { "type": "STRING" },
                "taskId": { "type": "STRING" },
                "targetQuadrant": { "type": "STRING", "format": "enum", "enum": quadrants }
            },
            "required": ["type", "message"]
        }
    })
}

/// Validate response text against the suggestion shape.
///
/// Blank text counts as an empty array. Any element missing `type` or
/// `message`, or naming an unknown kind or quadrant, rejects the whole reply.
pub fn parse_suggestions(text: &str) -> Result<Vec<AiSuggestion>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).map_err(|e| Error::Schema(format!("invalid suggestion list: {e}")))
}

/// Suggestions currently shown to the user. Lives only in memory.
#[derive(Debug, Clone, Default)]
pub struct SuggestionTray {
    items: Vec<AiSuggestion>,
}

impl SuggestionTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the result of a new analysis run.
    pub fn replace(&mut self, suggestions: Vec<AiSuggestion>) {
        self.items = suggestions;
    }

    /// Dismiss the suggestion at `index`.
    pub fn dismiss(&mut self, index: usize) -> Option<AiSuggestion> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AiSuggestion> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&AiSuggestion> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
