//! Axum route handlers for the Infographic API.

use std::io::Cursor;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{EditRequest, Layout};
use crate::graph::render_graph;
use crate::infographic::content::{build_queues, resolve_contents, ContentMap};
use crate::layout::{fit_text, paint_layout, CanvasSize, FittedText, NormalizedBox};
use crate::models::event::EventRecord;
use crate::state::AppState;

/// Largest canvas edge accepted, in pixels.
const MAX_CANVAS_EDGE: u32 = 8192;

/// Longest text accepted by the fit preview.
const MAX_FIT_TEXT_BYTES: usize = 1024;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct InfographicRequest {
    pub canvas: CanvasSize,
    pub num_label: Vec<u32>,
    pub label: Vec<u32>,
    pub contents: ContentMap,
}

#[derive(Debug, Deserialize)]
pub struct EditInfographicRequest {
    pub canvas: CanvasSize,
    pub num_label: Vec<u32>,
    pub label: Vec<u32>,
    pub contents: ContentMap,
    pub id_a: u32,
    pub id_b: u32,
    pub relation: String,
    pub bbox: Vec<NormalizedBox>,
}

#[derive(Debug, Serialize)]
pub struct InfographicResponse {
    pub key: String,
    pub bboxes: Vec<NormalizedBox>,
    pub labels: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub request_id: String,
    pub key: String,
    pub event: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct FitTextRequest {
    pub width: u32,
    pub height: u32,
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/infographics
///
/// Generates a fresh layout, paints the supplied content into it and uploads the PNG.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<InfographicRequest>,
) -> Result<Json<InfographicResponse>, AppError> {
    validate_canvas(request.canvas)?;
    let layout = state
        .generator
        .generate(&request.num_label, &request.label)
        .await?;
    let response = compose_and_upload(&state, request.canvas, layout, request.contents).await?;
    Ok(Json(response))
}

/// POST /api/v1/infographics/edit
///
/// Re-generates a layout under an edit constraint between two elements, then
/// paints and uploads it like `handle_generate`.
pub async fn handle_edit(
    State(state): State<AppState>,
    Json(request): Json<EditInfographicRequest>,
) -> Result<Json<InfographicResponse>, AppError> {
    let EditInfographicRequest {
        canvas,
        num_label,
        label,
        contents,
        id_a,
        id_b,
        relation,
        bbox,
    } = request;
    validate_canvas(canvas)?;
    if let Some(index) = bbox.iter().position(|b| !b.is_normalized()) {
        return Err(AppError::Validation(format!(
            "bbox {index} must have all values finite and within [0, 1]"
        )));
    }

    let edit = EditRequest {
        id_a,
        id_b,
        relation,
        bbox,
        num_label,
        label,
    };
    let layout = state.generator.edit(&edit).await?;
    let response = compose_and_upload(&state, canvas, layout, contents).await?;
    Ok(Json(response))
}

/// POST /api/v1/graphs
///
/// Renders the event's entity graph, uploads it as a PNG and returns the
/// event as a flat record with `image` pointing at the upload.
pub async fn handle_render_graph(
    State(state): State<AppState>,
    Json(event): Json<EventRecord>,
) -> Result<Json<GraphResponse>, AppError> {
    let typesetter = state.typesetter.clone();
    let (mut event, png) =
        tokio::task::spawn_blocking(move || -> Result<(EventRecord, Vec<u8>), AppError> {
            let image = render_graph(
                &event.adj_list,
                &event.node_occurrences,
                &event.entity_labels,
                &typesetter,
            )?;
            let png = encode_png(&image)?;
            Ok((event, png))
        })
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed rendering graph: {e}"))
        })??;

    let key = object_key("graphs");
    upload(&state, png, &key).await?;
    info!(request_id = %event.request_id, key = %key, "Rendered entity graph");

    event.image = Some(key.clone());
    Ok(Json(GraphResponse {
        request_id: event.request_id.clone(),
        key,
        event: event
            .to_flat_map()
            .map_err(|e| AppError::Internal(e.into()))?,
    }))
}

/// POST /api/v1/text/fit
///
/// Previews the auto-fit result for a pixel box without painting anything.
pub async fn handle_fit_text(
    State(state): State<AppState>,
    Json(request): Json<FitTextRequest>,
) -> Result<Json<FittedText>, AppError> {
    if request.text.len() > MAX_FIT_TEXT_BYTES {
        return Err(AppError::Validation(format!(
            "text must be at most {MAX_FIT_TEXT_BYTES} bytes, got {}",
            request.text.len()
        )));
    }

    let typesetter = state.typesetter.clone();
    let fitted = tokio::task::spawn_blocking(move || {
        fit_text(
            &typesetter,
            &request.text,
            request.width as f32,
            request.height as f32,
        )
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed fitting text: {e}")))?;

    Ok(Json(fitted))
}

/// GET /api/v1/blobs/*key
pub async fn handle_download(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state
        .store
        .download(&state.bucket, &key)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Object {key} not found")))?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&key))], bytes))
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

async fn compose_and_upload(
    state: &AppState,
    canvas: CanvasSize,
    layout: Layout,
    contents: ContentMap,
) -> Result<InfographicResponse, AppError> {
    let resolved = resolve_contents(contents, state.store.as_ref(), &state.bucket).await?;

    // Decode, paint and encode are CPU-bound.
    let typesetter = state.typesetter.clone();
    let boxes = layout.bboxes.clone();
    let labels = layout.labels.clone();
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let mut queues = build_queues(resolved)?;
        let image = paint_layout(canvas, &boxes, &labels, &mut queues, &typesetter)?;
        Ok(encode_png(&image)?)
    })
    .await
    .map_err(|e| {
        AppError::Internal(anyhow::anyhow!("spawn_blocking failed painting layout: {e}"))
    })??;

    let key = object_key("infographics");
    upload(state, png, &key).await?;
    info!(
        key = %key,
        elements = layout.bboxes.len(),
        "Composited infographic"
    );

    Ok(InfographicResponse {
        key,
        bboxes: layout.bboxes,
        labels: layout.labels,
    })
}

async fn upload(state: &AppState, png: Vec<u8>, key: &str) -> Result<(), AppError> {
    if state.store.upload(Bytes::from(png), &state.bucket, key).await {
        Ok(())
    } else {
        Err(AppError::Storage(format!(
            "upload to s3://{}/{key} failed",
            state.bucket
        )))
    }
}

fn validate_canvas(canvas: CanvasSize) -> Result<(), AppError> {
    let valid = |edge: u32| (1..=MAX_CANVAS_EDGE).contains(&edge);
    if valid(canvas.width) && valid(canvas.height) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "canvas must be between 1 and {MAX_CANVAS_EDGE} pixels per edge, got {}x{}",
            canvas.width, canvas.height
        )))
    }
}

pub(crate) fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// `<prefix>/YYYY/MM/DD/<uuid>.png`
fn object_key(prefix: &str) -> String {
    format!(
        "{prefix}/{}/{}.png",
        Utc::now().format("%Y/%m/%d"),
        Uuid::new_v4()
    )
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "json" => "application/json",
        _ => "application/octet-stream",
    }
}
