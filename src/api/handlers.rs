use crate::models::ImportReport;
use crate::service::ImportService;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;

/// Odpowiedź importu
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub report: Option<ImportReport>,
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET / - strona z formularzem wgrywania i wynikiem importu
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// POST /api/import - przyjmuje plik (pole multipart "file") i zwraca raport
pub async fn import_file(
    State(service): State<Arc<ImportService>>,
    mut multipart: Multipart,
) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Brak pliku w żądaniu (oczekiwano pola \"file\")".to_string(),
            );
        }
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match service.import_file(&upload.filename, &upload.bytes).await {
        Ok(report) => {
            let message = if report.is_clean() {
                format!("Zaimportowano {} wierszy do bazy.", report.inserted)
            } else {
                format!(
                    "Zaimportowano {} z {} wierszy ({} odrzuconych przy walidacji, {} odrzuconych przez bazę).",
                    report.inserted,
                    report.total_rows,
                    report.rejected.len(),
                    report.db_failures.len()
                )
            };
            let response = ImportResponse {
                success: true,
                message,
                report: Some(report),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) if e.is_structural() => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, format!("Błąd importu: {e}"))
        }
        Err(e) => {
            tracing::error!("Import \"{}\" failed: {e}", upload.filename);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Błąd importu: {e}"),
            )
        }
    }
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Wyciąga pole "file" z żądania multipart
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Niepoprawne żądanie multipart: {e}"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Nie udało się odczytać pliku: {e}"))?;
        return Ok(Some(Upload {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

fn error_response(status: StatusCode, message: String) -> Response {
    let response = ImportResponse {
        success: false,
        message,
        report: None,
    };
    (status, Json(response)).into_response()
}
