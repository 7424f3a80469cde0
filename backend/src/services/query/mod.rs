//! HTTP surface of the ingestion-and-query pipeline.
//!
//! The provided route is:
//! - `POST /upload`: Handles multipart/form-data submissions. It expects one
//!   or more `files` parts carrying CSV data (filename required), a
//!   `question` text part with the natural-language question, and an
//!   optional `database_type` part naming the dialect the answer query
//!   should be written in (defaults to a generic "SQL" label).
//!
//!   Request-shape problems (no file, no question, a non-CSV upload) are
//!   answered with `400` and a plain-text reason. Everything past that
//!   point, including decode, model and execution failures, is answered
//!   with `200` and an `AnswerResponse` JSON body whose `error` field
//!   carries the failure, so API clients only ever parse one shape for
//!   pipeline outcomes.

use actix_web::web::{post, scope};
use actix_web::Scope;

mod ask;

const API_PATH: &str = "/upload";

/// Configures and returns the Actix scope for the query route.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", post().to(ask::process))
}
