use crate::config::DEFAULT_DIALECT;
use crate::pipeline::{self, UploadedFile};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::answer::AnswerResponse;
use futures_util::StreamExt;

const MISSING_PARTS: &str = "CSV files and question required";

/// The parsed multipart request: at least one CSV file and a question.
struct AskRequest {
    files: Vec<UploadedFile>,
    question: String,
    dialect: String,
}

/// HTTP handler for `POST /upload`.
///
/// Request-shape validation failures are the only non-200 responses;
/// every pipeline outcome is a 200 with an `AnswerResponse` body.
pub(crate) async fn process(state: web::Data<AppState>, payload: Multipart) -> impl Responder {
    let request = match collect_request(payload).await {
        Ok(request) => request,
        Err(reason) => return HttpResponse::BadRequest().body(reason),
    };

    let response = match pipeline::answer_question(
        &state.config,
        state.model.as_ref(),
        &request.files,
        &request.question,
        &request.dialect,
    )
    .await
    {
        Ok(answer) => AnswerResponse::success(answer.sql, answer.rows),
        Err(failure) => AnswerResponse::failure(failure.sql, failure.error.to_string()),
    };

    HttpResponse::Ok().json(response)
}

/// Drains the multipart stream into an `AskRequest`.
async fn collect_request(mut payload: Multipart) -> Result<AskRequest, String> {
    let mut files = Vec::new();
    let mut question: Option<String> = None;
    let mut dialect: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|err| format!("invalid multipart payload: {}", err))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("files") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();

                if !filename.ends_with(".csv") {
                    return Err("The file must end with .csv".to_string());
                }

                let bytes = read_field(&mut field).await?;
                files.push(UploadedFile {
                    name: filename,
                    bytes,
                });
            }
            Some("question") => question = Some(read_text_field(&mut field).await?),
            Some("database_type") => dialect = Some(read_text_field(&mut field).await?),
            _ => {}
        }
    }

    let question = question
        .filter(|q| !q.is_empty())
        .ok_or_else(|| MISSING_PARTS.to_string())?;
    if files.is_empty() {
        return Err(MISSING_PARTS.to_string());
    }

    Ok(AskRequest {
        files,
        question,
        dialect: dialect
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DIALECT.to_string()),
    })
}

async fn read_field(field: &mut actix_multipart::Field) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|err| format!("failed to read upload: {}", err))?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_text_field(field: &mut actix_multipart::Field) -> Result<String, String> {
    let bytes = read_field(field).await?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services;
    use crate::test_support::ScriptedModel;
    use actix_web::{test, App};
    use std::sync::Arc;

    const BOUNDARY: &str = "------------------------testboundary";

    fn state(replies: Vec<&str>) -> AppState {
        AppState {
            config: AppConfig::default(),
            model: Arc::new(ScriptedModel::new(
                replies.into_iter().map(String::from).collect(),
            )),
        }
    }

    fn part(name: &str, filename: Option<&str>, content: &str) -> String {
        match filename {
            Some(filename) => format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
            ),
            None => format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{content}\r\n"
            ),
        }
    }

    fn multipart_body(parts: &[String]) -> String {
        format!("{}--{BOUNDARY}--\r\n", parts.concat())
    }

    async fn call(
        state: AppState,
        body: String,
    ) -> actix_web::dev::ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(services::query::configure_routes()),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();

        test::call_service(&app, request).await
    }

    #[actix_web::test]
    async fn answers_an_upload_with_a_question() {
        let body = multipart_body(&[
            part("files", Some("sales.csv"), "id,amount\n1,10.5\n2,20"),
            part("question", None, "total amount"),
        ]);
        let response = call(
            state(vec![
                "SELECT SUM(amount) FROM sales",
                "SELECT SUM(amount) FROM sales",
            ]),
            body,
        )
        .await;

        assert!(response.status().is_success());
        let answer: AnswerResponse = test::read_body_json(response).await;
        assert_eq!(answer.sql.as_deref(), Some("SELECT SUM(amount) FROM sales"));
        assert!(answer.error.is_none());
        let rows = answer.result.unwrap();
        assert_eq!(rows[0].get("SUM(amount)"), Some(&serde_json::json!(30.5)));
    }

    #[actix_web::test]
    async fn missing_question_is_a_client_error() {
        let body = multipart_body(&[part("files", Some("sales.csv"), "id,amount\n1,2")]);
        let response = call(state(vec![]), body).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn empty_completion_maps_to_the_error_envelope() {
        let body = multipart_body(&[
            part("files", Some("sales.csv"), "id,amount\n1,2"),
            part("question", None, "total amount"),
        ]);
        let response = call(state(vec![""]), body).await;

        assert!(response.status().is_success());
        let answer: AnswerResponse = test::read_body_json(response).await;
        assert!(answer.sql.is_none());
        assert_eq!(answer.error.as_deref(), Some("no query produced"));
        assert!(answer.result.is_none());
    }

    #[actix_web::test]
    async fn non_csv_upload_is_rejected() {
        let body = multipart_body(&[
            part("files", Some("sales.xlsx"), "binary"),
            part("question", None, "total amount"),
        ]);
        let response = call(state(vec![]), body).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
