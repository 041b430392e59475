use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::form::Submission;
use crate::records::summarize;
use crate::workbook::Workbook;

/// Read an uploaded workbook and report its sheets, course rows and
/// participant count so the form can be prefilled.
pub async fn inspect_workbook(multipart: Multipart) -> Response {
    let upload = match Submission::read(multipart).await {
        Ok(s) => s.workbook,
        Err(e) => return bad_request(e.to_string()),
    };
    let Some(upload) = upload else {
        return bad_request("No workbook uploaded.".to_string());
    };

    match Workbook::from_upload(&upload.filename, &upload.bytes) {
        Ok(workbook) => {
            let summary = summarize(&workbook);
            tracing::debug!(
                "Inspected {}: {} course row(s), {} participant(s)",
                upload.filename,
                summary.courses.len(),
                summary.participants
            );
            Json(summary).into_response()
        }
        Err(e) => {
            tracing::warn!("Could not inspect {}: {}", upload.filename, e);
            bad_request(e.to_string())
        }
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
