use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::errors::{job_error_to_response, json_error};
use super::AppState;
use crate::jobs::{JobId, JobState, ProgressSink};
use crate::loader::{load_holdings, InputError};
use crate::pipeline::{JobError, JobRunner};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const UPLOAD_FIELD: &str = "file";

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ── Jobs & progress ───────────────────────────────────────────────────────────

pub async fn create_job(Extension(state): Extension<Arc<AppState>>) -> Response {
    let handle = state.jobs.create().await;
    (StatusCode::CREATED, Json(json!({ "job_id": handle.id() }))).into_response()
}

/// Progress of whichever job started last.
pub async fn progress(Extension(state): Extension<Arc<AppState>>) -> Response {
    Json(json!({ "value": state.jobs.latest_progress().await })).into_response()
}

pub async fn job_progress(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Response {
    match state.jobs.get(id).await {
        Some(handle) => Json(handle.snapshot()).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "not_found", format!("unknown job {id}")),
    }
}

// ── Upload ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub job_id: Option<JobId>,
}

struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, InputError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InputError::Unreadable(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        if file_name.as_deref() == Some("") {
            return Err(InputError::EmptyFile);
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| InputError::Unreadable(e.to_string()))?;
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(InputError::MissingFile)
}

/// Accept a holdings table and answer with the generated report.
///
/// Runs the job inside the request; progress is visible meanwhile through
/// `/progress` and `/jobs/:id/progress`.
pub async fn upload(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Response {
    let handle = match params.job_id {
        Some(id) => match state.jobs.get(id).await {
            Some(handle) => handle,
            None => {
                return json_error(StatusCode::NOT_FOUND, "not_found", format!("unknown job {id}"));
            }
        },
        None => state.jobs.create().await,
    };

    // Claimed before the body is read; stays Running until `run` settles it.
    if !handle.try_start() {
        return json_error(
            StatusCode::CONFLICT,
            "job_running",
            format!("job {} is already running", handle.id()),
        );
    }

    handle.set_progress(0.0);
    state.jobs.mark_latest(&handle).await;

    let holdings = match read_upload(&mut multipart)
        .await
        .and_then(|upload| load_holdings(upload.file_name.as_deref(), &upload.bytes))
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("job {}: rejected upload: {}", handle.id(), e);
            handle.set_state(JobState::Failed);
            return job_error_to_response(JobError::from(e));
        }
    };

    info!("job {}: {} holdings", handle.id(), holdings.len());
    let runner = JobRunner::new(state.source.as_ref(), &state.report, state.business_days);

    match runner.run(&holdings, &handle).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"output.xlsx\"".to_string(),
                ),
                (header::HeaderName::from_static("x-job-id"), handle.id().to_string()),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => job_error_to_response(e),
    }
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Dividend Tracker</title></head>
<body>
  <h1>Dividend Tracker</h1>
  <p>Upload a spreadsheet with <code>Stock Name</code> and <code>Number of Stocks</code> columns.</p>
  <form id="upload">
    <input type="file" name="file" accept=".xlsx,.xls,.ods,.csv">
    <button type="submit">Generate report</button>
  </form>
  <progress id="bar" max="100" value="0"></progress> <span id="pct">0%</span>
  <script>
    const form = document.getElementById('upload');
    form.addEventListener('submit', async (ev) => {
      ev.preventDefault();
      const job = await (await fetch('/jobs', { method: 'POST' })).json();
      const timer = setInterval(async () => {
        const p = await (await fetch('/jobs/' + job.job_id + '/progress')).json();
        document.getElementById('bar').value = p.value;
        document.getElementById('pct').textContent = Math.round(p.value) + '%';
      }, 500);
      const resp = await fetch('/upload?job_id=' + job.job_id, { method: 'POST', body: new FormData(form) });
      clearInterval(timer);
      if (!resp.ok) { alert((await resp.json()).message); return; }
      const link = document.createElement('a');
      link.href = URL.createObjectURL(await resp.blob());
      link.download = 'output.xlsx';
      link.click();
    });
  </script>
</body>
</html>
"#;
