//! Web API integration tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

#![cfg(feature = "web")]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use image::{ImageFormat, Rgba, RgbaImage};
use image_border_processor::web::METADATA_HEADER;
use image_border_processor::{AppState, ServerConfig, WebServer};
use std::io::Cursor;
use tower::ServiceExt;

const BOUNDARY: &str = "image-border-test-boundary";

fn sticker_png() -> Vec<u8> {
    let image = RgbaImage::from_fn(30, 30, |x, y| {
        if (5..25).contains(&x) && (5..25).contains(&y) {
            Rgba([250, 200, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Multipart body with an optional file part and text fields
fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"sticker.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn app() -> axum::Router {
    WebServer::new(ServerConfig::default(), AppState::default()).router()
}

fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    // TC-WEB-001: root endpoint greets
    #[tokio::test]
    async fn test_root_endpoint() {
        let router = app();
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("Welcome"));
    }

    // TC-WEB-002: health check endpoint
    #[tokio::test]
    async fn test_health_endpoint() {
        let router = app();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    // TC-WEB-003: upload returns the bordered PNG and its metadata
    #[tokio::test]
    async fn test_process_image_query_params() {
        let router = app();
        let body = multipart_body(Some(&sticker_png()), &[]);
        let response = router
            .oneshot(upload(
                "/process-image/?border_thickness=9&border_color=0,0,0,255",
                body,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

        let metadata: serde_json::Value = serde_json::from_str(
            response.headers()[METADATA_HEADER].to_str().unwrap(),
        )
        .unwrap();
        // margin defaults to thickness + 20
        assert_eq!(metadata["width"], 20 + 2 * 29);
        assert_eq!(metadata["format"], "PNG");
        let history = metadata["processing_history"].as_array().unwrap();
        assert_eq!(
            history.last().unwrap()["operation"],
            "add_margin_and_border"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let image = image::load_from_memory(&body).unwrap();
        assert_eq!(image.width(), 78);
    }

    // TC-WEB-004: parameters may come as form fields
    #[tokio::test]
    async fn test_process_image_form_fields() {
        let router = app();
        let body = multipart_body(
            Some(&sticker_png()),
            &[("margin_size", "2"), ("border_thickness", "3")],
        );
        let response = router
            .oneshot(upload("/process-image/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let image = image::load_from_memory(&body).unwrap();
        assert_eq!((image.width(), image.height()), (24, 24));
    }

    // TC-WEB-005: malformed color is a client error
    #[tokio::test]
    async fn test_process_image_bad_color() {
        let router = app();
        let body = multipart_body(Some(&sticker_png()), &[]);
        let response = router
            .oneshot(upload("/process-image/?border_color=255,0,0", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // TC-WEB-006: missing file is a client error
    #[tokio::test]
    async fn test_process_image_missing_file() {
        let router = app();
        let body = multipart_body(None, &[("border_thickness", "10")]);
        let response = router
            .oneshot(upload("/process-image/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // TC-WEB-007: non-image upload is a client error
    #[tokio::test]
    async fn test_process_image_not_an_image() {
        let router = app();
        let body = multipart_body(Some(b"plain text, not pixels"), &[]);
        let response = router
            .oneshot(upload("/process-image/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
