use axum::extract::Multipart;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::{self, elevation};
use crate::types::activity::CanonicalMetrics;

pub fn router() -> Router {
    Router::new().route("/api/parse", post(parse))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseResponse {
    upload_id: String,
    file_type: String,
    metrics: CanonicalMetrics,
}

async fn parse(mut multipart: Multipart) -> Result<Json<ParseResponse>, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().map(|s| s.to_string());
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file bytes: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let upload_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("parse", upload_id = %upload_id);

    async move {
        tracing::info!(
            "Received {} bytes ({})",
            bytes.len(),
            filename.as_deref().unwrap_or("unnamed")
        );

        let current = tracing::Span::current();
        let (format, mut metrics) = tokio::task::spawn_blocking(move || {
            let _entered = current.enter();
            pipeline::parse_detected(&bytes, filename.as_deref())
        })
        .await
        .map_err(|e| AppError::Internal(format!("Parse task failed: {}", e)))??;

        elevation::annotate(&mut metrics);

        Ok::<_, AppError>(Json(ParseResponse {
            upload_id,
            file_type: format.name().to_lowercase(),
            metrics,
        }))
    }
    .instrument(span)
    .await
}
