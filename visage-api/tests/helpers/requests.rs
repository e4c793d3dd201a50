//! Request builders and response readers

use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use std::io::Cursor;

pub const TEST_API_KEY: &str = "test-key-0123456789";

const BOUNDARY: &str = "visage-test-boundary-7MA4YWxkTrZu0gW";

/// Solid-colour image of the given size, encoded in `format`
pub fn encoded_image(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(width, height, image::Rgb([182, 140, 120]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

/// Smallest images that pass the geometry checks
pub fn jpeg_bytes() -> Vec<u8> {
    encoded_image(image::ImageFormat::Jpeg, 240, 240)
}

pub fn png_bytes() -> Vec<u8> {
    encoded_image(image::ImageFormat::Png, 240, 240)
}

pub fn webp_bytes() -> Vec<u8> {
    encoded_image(image::ImageFormat::WebP, 240, 240)
}

/// Multipart body with a single field
pub fn multipart_body(
    field: &str,
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, name
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n", field).as_bytes(),
        ),
    }
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// POST /api/analysis with an arbitrary multipart body
pub fn upload_request(api_key: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/analysis")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

/// POST /api/analysis with a `file` field
pub fn upload(api_key: Option<&str>, content_type: &str, data: &[u8]) -> Request<Body> {
    upload_request(
        api_key,
        multipart_body("file", Some("face.jpg"), Some(content_type), data),
    )
}

/// GET/DELETE with the test credential in X-API-Key
pub fn get(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
