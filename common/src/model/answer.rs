use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The JSON envelope returned by `POST /upload`.
///
/// The backend runs the whole ingestion-and-query pipeline and reports its
/// outcome through this single shape:
/// - on success, `sql` carries the dialect query the model produced for the
///   user's question and `result` carries one object per row, keyed by the
///   column names of the executed query;
/// - on failure, `error` carries the failure message and `sql` carries
///   whatever dialect query had been produced before the failure (or `null`
///   if the pipeline failed earlier), so a caller can tell whether the
///   question was misunderstood or the translation/execution went wrong.
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Map<String, Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerResponse {
    pub fn success(sql: String, result: Vec<Map<String, Value>>) -> Self {
        Self {
            sql: Some(sql),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(sql: Option<String>, error: String) -> Self {
        Self {
            sql,
            result: None,
            error: Some(error),
        }
    }
}
