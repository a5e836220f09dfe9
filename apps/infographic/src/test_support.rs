//! Shared fixtures for unit tests.

use std::io::Cursor;

use axum::Router;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A solid-color PNG.
pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Bytes {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

/// A `/generate` endpoint that always answers with `response`.
pub(crate) fn layout_service(response: serde_json::Value) -> Router {
    Router::new().route(
        "/generate",
        axum::routing::post(move || {
            let response = response.clone();
            async move { axum::Json(response) }
        }),
    )
}
