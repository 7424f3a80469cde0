//! Query Synthesis Protocol: two sequential completion round trips.
//!
//! Stage 1 turns the question and the combined schema into a query in
//! the caller's declared dialect. Stage 2 turns that query into one
//! SQLite will accept. Neither stage validates the output semantically;
//! correctness is delegated to store execution, which lets the caller
//! diagnose whether a failure was in intent-capture (stage 1) or in
//! dialect translation (stage 2).
//!
//! Both prompts forbid commentary and markdown, and both outputs are
//! still stripped of code fences defensively, since models ignore that
//! instruction often enough.

use crate::error::CapabilityError;
use async_trait::async_trait;

/// The single capability the pipeline needs from a language-model
/// provider. Everything else (model selection, auth, transport) is the
/// implementation's concern.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError>;
}

fn dialect_prompt(dialect: &str, schema: &str, question: &str) -> String {
    format!(
        "You are an expert ***{dialect}*** developer.\n\
         Given the table schemas below, generate a ***{dialect}*** query to answer the question.\n\
         Only output the ***{dialect}*** query — no explanation or markdown.\n\
         \n\
         {schema}\n\
         Question: {question}\n\
         Query:\n"
    )
}

fn translation_prompt(dialect: &str, query: &str, schema: &str) -> String {
    format!(
        "You are an expert SQL developer.\n\
         Convert the following ***{dialect}*** SQL query into a valid **SQLite-compatible SQL query** using the given schema.\n\
         Only output the final SQLite SQL query — no explanation, no markdown.\n\
         \n\
         Query: {query}\n\
         Schema:\n\
         {schema}\n"
    )
}

/// Removes surrounding code-fence markers and whitespace.
fn strip_fences(raw: &str) -> String {
    raw.trim()
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Fence-strips a completion and rejects empty output as a distinct,
/// reportable failure rather than passing it to store execution.
fn clean(raw: String) -> Result<String, CapabilityError> {
    let cleaned = strip_fences(&raw);
    if cleaned.is_empty() {
        Err(CapabilityError::Empty)
    } else {
        Ok(cleaned)
    }
}

/// Stage 1: natural-language question + schema -> dialect query.
pub async fn dialect_query(
    model: &dyn Completion,
    schema: &str,
    question: &str,
    dialect: &str,
) -> Result<String, CapabilityError> {
    clean(model.complete(&dialect_prompt(dialect, schema, question)).await?)
}

/// Stage 2: dialect query + schema -> store-native query.
pub async fn sqlite_query(
    model: &dyn Completion,
    schema: &str,
    dialect: &str,
    query: &str,
) -> Result<String, CapabilityError> {
    clean(model.complete(&translation_prompt(dialect, query, schema)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_fences("  SELECT 1  "), "SELECT 1");
        assert_eq!(strip_fences("```\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn whitespace_only_output_is_empty() {
        assert!(matches!(
            clean("```sql\n```".to_string()),
            Err(CapabilityError::Empty)
        ));
    }

    #[tokio::test]
    async fn stage_one_embeds_dialect_schema_and_question() {
        let model = ScriptedModel::new(vec!["SELECT * FROM sales".to_string()]);
        let sql = dialect_query(&model, "Table: sales(id, amount)", "total amount", "PostgreSQL")
            .await
            .unwrap();
        assert_eq!(sql, "SELECT * FROM sales");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("***PostgreSQL***"));
        assert!(prompts[0].contains("Table: sales(id, amount)"));
        assert!(prompts[0].contains("Question: total amount"));
    }

    #[tokio::test]
    async fn stage_two_embeds_the_stage_one_query() {
        let model = ScriptedModel::new(vec!["SELECT 1".to_string()]);
        let sql = sqlite_query(&model, "Table: t(a)", "SQL", "SELECT TOP 1 * FROM t")
            .await
            .unwrap();
        assert_eq!(sql, "SELECT 1");
        assert!(model.prompts()[0].contains("Query: SELECT TOP 1 * FROM t"));
        assert!(model.prompts()[0].contains("SQLite-compatible"));
    }

    #[tokio::test]
    async fn empty_completion_is_no_query_produced() {
        let model = ScriptedModel::new(vec![String::new()]);
        let err = dialect_query(&model, "Table: t(a)", "anything", "SQL")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no query produced");
    }
}
