use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gateway::{metrics::Metrics, routes::router, state::AppState};
use image::{GrayImage, Luma};
use pipeline::classifier::stub::StubClassifier;
use pipeline::{ClassList, PipelineService};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "test-boundary-7b1c";

fn test_state(probabilities: Vec<f32>) -> AppState<StubClassifier> {
    AppState {
        service: Arc::new(PipelineService::new(
            StubClassifier::new(probabilities),
            ClassList::default(),
            224,
        )),
        model_loaded: true,
        metrics: Arc::new(Metrics::init("gateway-test")),
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + 2 * y) % 256) as u8]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn multipart_body(field_name: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"scan.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn predict_request(field_name: &str, payload: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field_name, payload)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_loaded_model_without_inference() {
    let app = router(test_state(vec![0.1, 0.2, 0.3]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], true);
}

#[tokio::test]
async fn predict_returns_full_diagnostic_payload() {
    let app = router(test_state(vec![0.05, 0.92, 0.2]));

    let response = app
        .oneshot(predict_request("image", &png_bytes(128, 96)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["success"], true);
    assert_eq!(json["primary_diagnosis"], "Pneumonia");
    assert_eq!(json["severity"], "high");
    assert!((json["primary_confidence"].as_f64().unwrap() - 92.0).abs() < 1e-3);

    let predictions = json["predictions"].as_object().unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.contains_key("no_finding_confidence"));
    assert!(predictions.contains_key("pneumonia_confidence"));
    assert!(predictions.contains_key("other_disease_confidence"));

    assert!(!json["heatmap_base64"].as_str().unwrap().is_empty());
    assert!(json["processing_time_ms"].is_u64());
}

#[tokio::test]
async fn missing_image_field_is_a_server_error() {
    let app = router(test_state(vec![0.1, 0.2, 0.3]));

    let response = app
        .oneshot(predict_request("not_image", b"whatever"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn undecodable_payload_is_a_server_error() {
    let app = router(test_state(vec![0.1, 0.2, 0.3]));

    let response = app
        .oneshot(predict_request("image", b"not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("decode"));
}
