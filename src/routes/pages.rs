use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context;

use super::form::{FormValues, RunConfig, Submission};
use crate::batch::assemble;
use crate::error::{CertError, Result};
use crate::state::AppState;
use crate::storage::{archive_name, generate_batch_id, write_archive};

pub async fn index(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    let today = chrono::Local::now().date_naive();
    render_form(&FormValues::initial(today), None)
}

pub async fn generate(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let submission = match Submission::read(multipart).await {
        Ok(s) => s,
        Err(e) => return failure_page(&FormValues::default(), &e),
    };
    let values = submission.values();
    let today = chrono::Local::now().date_naive();

    let run = match RunConfig::build(submission, &state.config, today) {
        Ok(run) => run,
        Err(e) => return failure_page(&values, &e),
    };

    match build_archive(&state, run).await {
        Ok(zip_data) => {
            let download_name = archive_name(&chrono::Local::now());
            (
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", download_name),
                    ),
                ],
                zip_data,
            )
                .into_response()
        }
        Err(e) => failure_page(&values, &e),
    }
}

/// Rendering is CPU-bound, so the whole batch runs off the async workers.
async fn build_archive(state: &AppState, run: RunConfig) -> Result<Vec<u8>> {
    let batch_id = generate_batch_id();
    let fonts = state.fonts;
    tracing::info!(
        "Batch {}: {} certificate(s) for {:?}",
        batch_id,
        run.people.len(),
        run.course.title
    );

    let zip_data = tokio::task::spawn_blocking(move || {
        let artifacts = assemble(
            &run.people,
            &run.course,
            &run.options,
            &run.template,
            &fonts,
        )?;
        write_archive(&artifacts)
    })
    .await
    .map_err(|e| CertError::Render(e.to_string()))??;

    tracing::info!("Batch {} finished, archive is {} bytes", batch_id, zip_data.len());
    Ok(zip_data)
}

fn failure_page(values: &FormValues, err: &CertError) -> Response {
    if err.is_validation() {
        tracing::warn!("Rejected submission: {}", err);
        let body = render_form(values, Some((err.to_string(), None)));
        return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
    }
    tracing::error!("Generation failed: {}", err);
    let body = render_form(
        values,
        Some(("Error processing files".to_string(), Some(err.to_string()))),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

fn render_form(values: &FormValues, error: Option<(String, Option<String>)>) -> Html<String> {
    let mut ctx = Context::new();
    ctx.insert("form", values);
    if let Some((message, detail)) = error {
        ctx.insert("error", &message);
        if let Some(detail) = detail {
            ctx.insert("error_detail", &detail);
        }
    }
    render_template("index.html", ctx)
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera.render(name, &ctx).unwrap_or_else(|e| {
        tracing::error!("Template {} failed: {}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn body(html: Html<String>) -> String {
        html.0
    }

    #[test]
    fn initial_form_has_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let page = body(render_form(&FormValues::initial(today), None));
        assert!(page.contains("2024-04-01"));
        assert!(!page.contains("Error processing files"));
    }

    #[test]
    fn validation_error_is_inline() {
        let values = FormValues::default();
        let resp = failure_page(&values, &CertError::validation("Course title is required."));
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generation_error_uses_banner() {
        let page = body(render_form(
            &FormValues::default(),
            Some((
                "Error processing files".into(),
                Some("render failed: boom".into()),
            )),
        ));
        assert!(page.contains("Error processing files"));
        assert!(page.contains("render failed: boom"));
        let resp = failure_page(&FormValues::default(), &CertError::Render("boom".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
