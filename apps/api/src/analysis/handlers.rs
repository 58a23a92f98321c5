//! Axum route handlers for the Analysis API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::analysis::pipeline::{
    analyze_resume, rephrase, skill_gap, AnalysisOutcome, FragmentsOutcome,
};
use crate::errors::AppError;
use crate::export::{export_feedback_pdf_blocking, EXPORT_FILENAME};
use crate::ingest::{DocumentFormat, UploadedDocument};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RephraseRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub feedback: String,
}

/// The resume + job description pair shared by analyze and skill-gap.
#[derive(Debug)]
pub struct ResumeForm {
    pub document: UploadedDocument,
    pub job_description: String,
}

impl ResumeForm {
    /// Reads `job_description` (text) and `resume` (file) parts. Unknown parts are drained.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut job_description = None;
        let mut document = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Invalid multipart body", e))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "job_description" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| multipart_error("Invalid job_description", e))?;
                    job_description = Some(text);
                }
                "resume" => {
                    let filename = field.file_name().unwrap_or("").to_string();
                    let format = DocumentFormat::from_filename(&filename).ok_or_else(|| {
                        AppError::UnsupportedFormat(format!(
                            "'{filename}' is not one of: {}",
                            DocumentFormat::ALLOWED_EXTENSIONS.join(", ")
                        ))
                    })?;
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error("Invalid resume upload", e))?;
                    document = Some(UploadedDocument {
                        filename,
                        format,
                        bytes,
                    });
                }
                _ => {
                    field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error("Invalid multipart body", e))?;
                }
            }
        }

        let job_description = job_description
            .filter(|jd| !jd.trim().is_empty())
            .ok_or_else(|| AppError::Validation("job_description cannot be empty".to_string()))?;
        let document = document
            .filter(|doc| !doc.bytes.is_empty())
            .ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;

        Ok(Self {
            document,
            job_description,
        })
    }
}

/// Keeps the body-limit rejection distinct from malformed input.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {}", err.body_text()))
    } else {
        AppError::Validation(format!("{context}: {}", err.body_text()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze
///
/// Multipart: `job_description`, `resume` (.pdf or .docx).
/// Returns rendered fragments, the match percentage if one was found, and the export feedback.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let form = ResumeForm::from_multipart(multipart).await?;
    info!(filename = %form.document.filename, "Analyze requested");

    let outcome = analyze_resume(state.llm.as_ref(), form.document, &form.job_description).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/rephrase
pub async fn handle_rephrase(
    State(state): State<AppState>,
    Json(request): Json<RephraseRequest>,
) -> Result<Json<FragmentsOutcome>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let outcome = rephrase(state.llm.as_ref(), &request.text).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/skill-gap
///
/// Multipart: `job_description`, `resume` (.pdf or .docx).
pub async fn handle_skill_gap(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FragmentsOutcome>, AppError> {
    let form = ResumeForm::from_multipart(multipart).await?;
    info!(filename = %form.document.filename, "Skill gap requested");

    let outcome = skill_gap(state.llm.as_ref(), form.document, &form.job_description).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/export
///
/// Renders feedback text as `resume_feedback.pdf`.
pub async fn handle_export(
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = export_feedback_pdf_blocking(request.feedback).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use docx_rs::{Docx, Paragraph, Run};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::pipeline::tests::StubGenerator;
    use crate::config::Config;
    use crate::routes::build_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "jobwise-test-boundary";

    fn app(llm: Arc<StubGenerator>) -> Router {
        app_with_limit(llm, None)
    }

    fn app_with_limit(llm: Arc<StubGenerator>, max_upload_bytes: Option<&str>) -> Router {
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("test-key".to_string()),
            "MAX_UPLOAD_BYTES" => max_upload_bytes.map(str::to_string),
            _ => None,
        })
        .unwrap();
        build_router(AppState { llm, config })
    }

    fn resume_docx() -> Vec<u8> {
        let docx = Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Alice Smith")))
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Software Engineer")));
        let mut cursor = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    fn multipart_body(job_description: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(jd) = job_description {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{jd}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_docx_returns_rendered_analysis() {
        let llm = Arc::new(StubGenerator::with_parts(&[
            "Match Percentage: 82% based on backend work",
            "Missing keywords: Kafka",
        ]));
        let docx = resume_docx();
        let request = multipart_request(
            "/api/v1/analyze",
            multipart_body(Some("Looking for a backend engineer"), Some(("cv.DOCX", docx.as_slice()))),
        );

        let response = app(llm.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["match_percentage"], 82);
        assert_eq!(body["fragments"][0]["match_indicator"]["percent"], 82);
        assert!(body["fragments"][1].get("match_indicator").is_none());
        assert_eq!(
            body["feedback"],
            "Match Percentage: 82% based on backend work\nMissing keywords: Kafka\n"
        );
        assert!(body["analysis_id"].is_string());
        assert!(body["created_at"].is_string());

        let prompt = llm.last_prompt();
        assert!(prompt.contains("Resume: Alice Smith\nSoftware Engineer"));
        assert!(prompt.contains("Job Description: Looking for a backend engineer"));
    }

    #[tokio::test]
    async fn test_analyze_without_candidates_reports_no_analysis() {
        let llm = Arc::new(StubGenerator::new(r#"{"candidates": []}"#));
        let docx = resume_docx();
        let request = multipart_request(
            "/api/v1/analyze",
            multipart_body(Some("JD"), Some(("cv.docx", docx.as_slice()))),
        );

        let response = app(llm).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "NO_ANALYSIS");
        assert_eq!(body["error"]["message"], "No analysis response received.");
    }

    #[tokio::test]
    async fn test_analyze_rejects_unsupported_extension() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let request = multipart_request(
            "/api/v1/analyze",
            multipart_body(Some("JD"), Some(("cv.txt", &b"plain text resume"[..]))),
        );

        let response = app(llm.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_requires_job_description() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let docx = resume_docx();
        let request = multipart_request(
            "/api/v1/analyze",
            multipart_body(Some("   "), Some(("cv.docx", docx.as_slice()))),
        );

        let response = app(llm).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analyze_requires_resume() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let request = multipart_request("/api/v1/analyze", multipart_body(Some("JD"), None));

        let response = app(llm).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_payload_too_large() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let oversized = vec![b'x'; 4096];
        let request = multipart_request(
            "/api/v1/analyze",
            multipart_body(Some("JD"), Some(("cv.pdf", oversized.as_slice()))),
        );

        let response = app_with_limit(llm.clone(), Some("1024"))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skill_gap_returns_fragments() {
        let llm = Arc::new(StubGenerator::with_parts(&["Matched: Rust", "Missing: Kafka"]));
        let docx = resume_docx();
        let request = multipart_request(
            "/api/v1/skill-gap",
            multipart_body(Some("Rust, Kafka"), Some(("cv.docx", docx.as_slice()))),
        );

        let response = app(llm).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["fragments"], json!(["Matched: Rust", "Missing: Kafka"]));
    }

    #[tokio::test]
    async fn test_rephrase_returns_fragments() {
        let llm = Arc::new(StubGenerator::with_parts(&["Shipped 3 services to production"]));
        let response = app(llm.clone())
            .oneshot(json_request("/api/v1/rephrase", json!({"text": "did backend"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["fragments"], json!(["Shipped 3 services to production"]));
        assert!(llm.last_prompt().ends_with("\ndid backend"));
    }

    #[tokio::test]
    async fn test_rephrase_rejects_blank_text() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let response = app(llm)
            .oneshot(json_request("/api/v1/rephrase", json!({"text": " "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_returns_pdf_attachment() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let response = app(llm)
            .oneshot(json_request(
                "/api/v1/export",
                json!({"feedback": "Match Percentage: 82%\nMissing keywords: Kafka\n"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/pdf");
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"resume_feedback.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_export_rejects_text_outside_latin1() {
        let llm = Arc::new(StubGenerator::with_parts(&["unused"]));
        let response = app(llm)
            .oneshot(json_request("/api/v1/export", json!({"feedback": "“Strong” fit"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "EXPORT_ERROR");
    }
}
