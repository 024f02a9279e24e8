//! SQL execution payloads
//!
//! Tabular results shared by the ReAct stream, the direct SQL endpoint and
//! the format-with-AI stream.

use serde::{Deserialize, Serialize};

/// Tabular query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Ordered column names
    #[serde(default)]
    pub columns: Vec<String>,
    /// Ordered rows, each an ordered list of scalar cells
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Row count reported by the server
    #[serde(default, alias = "rowCount")]
    pub row_count: u64,
    /// Execution time in milliseconds
    #[serde(default, alias = "executionTimeMs")]
    pub execution_time_ms: f64,
}

impl ResultSet {
    /// Whether the result has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// Body of a direct SQL execution request
#[derive(Debug, Clone, Serialize)]
pub struct SqlRequest {
    /// Raw SQL text
    pub sql: String,
    /// Target database dialect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbms: Option<String>,
}

/// Outcome of a direct SQL execution
///
/// Execution errors are a normal outcome here, shown inline next to the SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExecution {
    /// Query ran and returned rows
    Succeeded(ResultSet),
    /// Query was rejected or failed on the server
    Failed {
        /// Server-provided error message
        error: String,
    },
}

impl SqlExecution {
    /// Interpret a raw response body from the execute endpoint
    ///
    /// # Errors
    /// Returns a JSON error if the body is neither an error nor a result set
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        if let Some(error) = value.get("error").and_then(|e| e.as_str())
            && !error.is_empty()
        {
            return Ok(Self::Failed {
                error: error.to_string(),
            });
        }
        if value.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
            let error = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("SQL execution failed")
                .to_string();
            return Ok(Self::Failed { error });
        }
        let payload = value.get("result").cloned().unwrap_or(value);
        Ok(Self::Succeeded(serde_json::from_value(payload)?))
    }

    /// The result set, if the query succeeded
    #[must_use]
    pub const fn result(&self) -> Option<&ResultSet> {
        match self {
            Self::Succeeded(result) => Some(result),
            Self::Failed { .. } => None,
        }
    }
}
