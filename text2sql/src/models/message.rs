//! Message model representing one entry in a chat transcript.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Reply produced by the assistant.
    Assistant,
}

impl MessageRole {
    /// Convert role to its wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tabular result attached to an assistant message.
///
/// Rows are keyed by column name; `columns` fixes the display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub columns: Vec<String>,
    pub data: Vec<Map<String, Value>>,
}

impl QueryResults {
    /// Build a result set, dropping repeated column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        Self {
            columns: unique,
            data: Vec::new(),
        }
    }

    /// Append a row given as `(column, value)` pairs.
    #[must_use]
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.data
            .push(cells.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Cell lookup in display order; missing cells come back as `Null`.
    pub fn row_values(&self, index: usize) -> Option<Vec<&Value>> {
        let row = self.data.get(index)?;
        Some(
            self.columns
                .iter()
                .map(|col| row.get(col).unwrap_or(&Value::Null))
                .collect(),
        )
    }

    /// Label shown above the result grid.
    pub fn row_count_label(&self) -> String {
        match self.data.len() {
            1 => "1 row found".to_string(),
            n => format!("{n} rows found"),
        }
    }
}

/// A message in a chat transcript. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Position in the owning transcript, starting at 1.
    pub id: u64,
    /// Who sent the message.
    pub role: MessageRole,
    /// Text of the message.
    pub content: String,
    /// Generated query, for assistant messages that carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_code: Option<String>,
    /// Result set, for assistant messages that carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<QueryResults>,
}

impl Message {
    /// Create a user message.
    pub fn user(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            sql_code: None,
            results: None,
        }
    }

    /// Create a plain assistant message.
    pub fn assistant(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: content.into(),
            sql_code: None,
            results: None,
        }
    }

    /// Attach a generated query.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_code = Some(sql.into());
        self
    }

    /// Attach a result set.
    #[must_use]
    pub fn with_results(mut self, results: QueryResults) -> Self {
        self.results = Some(results);
        self
    }

    /// Same message renumbered for a different position.
    #[must_use]
    pub fn renumbered(self, id: u64) -> Self {
        Self { id, ..self }
    }
}
