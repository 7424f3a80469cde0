//! Request Orchestrator: sequences decode, load, synthesis and execution
//! for one request and maps every outcome onto the response envelope.
//!
//! The ephemeral store is created before the first table load and torn
//! down when this function returns, success or failure, via its `Drop`.
//! No step is retried; the first failure aborts the request, and a
//! failure after stage 1 still carries the stage-1 query so the caller
//! can see what the model understood.

use crate::config::AppConfig;
use crate::decode::decode_table;
use crate::error::PipelineError;
use crate::schema::{combine_schemas, table_name_for, TableSchema};
use crate::store::EphemeralStore;
use crate::synthesis::{self, Completion};
use log::info;
use serde_json::{Map, Value};

/// One uploaded file, owned by the request and discarded after decode.
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct PipelineAnswer {
    /// The stage-1 dialect query, as shown to the caller.
    pub sql: String,
    /// One object per result row, keyed by column name.
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug)]
pub struct PipelineFailure {
    /// The stage-1 query if it was produced before the failure.
    pub sql: Option<String>,
    pub error: PipelineError,
}

fn fail(sql: Option<String>, error: PipelineError) -> PipelineFailure {
    PipelineFailure { sql, error }
}

/// Runs the whole ingestion-and-query pipeline for one request.
///
/// Files are processed strictly in upload order; a later file whose
/// sanitized table name matches an earlier one replaces that table.
pub async fn answer_question(
    config: &AppConfig,
    model: &dyn Completion,
    files: &[UploadedFile],
    question: &str,
    dialect: &str,
) -> Result<PipelineAnswer, PipelineFailure> {
    let mut store = EphemeralStore::create().map_err(|err| fail(None, err))?;

    let mut schemas = Vec::with_capacity(files.len());
    for file in files {
        let table = decode_table(&file.name, &file.bytes, config.sniff_window)
            .map_err(|err| fail(None, err.into()))?;
        let name = table_name_for(&file.name);
        store
            .load_table(&name, &table)
            .map_err(|err| fail(None, PipelineError::Store(err)))?;
        info!(
            "loaded {} row(s) from {} into table {} ({} encoding)",
            table.rows.len(),
            file.name,
            name,
            table.encoding
        );
        schemas.push(TableSchema::introspect(&store, &name).map_err(|err| fail(None, err))?);
    }

    let schema_text = combine_schemas(&schemas);

    let dialect_sql = synthesis::dialect_query(model, &schema_text, question, dialect)
        .await
        .map_err(|err| fail(None, err.into()))?;

    let sqlite_sql = synthesis::sqlite_query(model, &schema_text, dialect, &dialect_sql)
        .await
        .map_err(|err| fail(Some(dialect_sql.clone()), err.into()))?;

    let (columns, rows) = store
        .execute(&sqlite_sql)
        .map_err(|err| fail(Some(dialect_sql.clone()), PipelineError::Execution(err)))?;

    let rows = rows
        .into_iter()
        .map(|row| columns.iter().cloned().zip(row).collect::<Map<_, _>>())
        .collect();

    Ok(PipelineAnswer {
        sql: dialect_sql,
        rows,
    })
}
