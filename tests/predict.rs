use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ml_platform_comparison::{
    api::{router, AppState},
    model::LogisticModel,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn model(n_features: usize) -> LogisticModel {
    LogisticModel {
        feature_names: (0..n_features).map(|i| format!("feature_{i}")).collect(),
        coefficients: vec![0.5; n_features],
        intercept: -1.0,
        positive_class: 1,
        negative_class: 0,
    }
}

async fn post_predict(app: Router, features: Vec<f64>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "features": features }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn missing_model_returns_error_object() {
    let app = router(AppState::default());
    let (status, body) = post_predict(app, vec![0.0; 20]).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "Model not loaded" }));
}

#[tokio::test]
async fn loaded_model_returns_class_and_probability() {
    let app = router(AppState::with_model(Arc::new(model(20))));
    let (status, body) = post_predict(app, vec![1.0; 20]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], json!(1));
    let probability = body["probability"].as_f64().unwrap();
    assert!(probability > 0.5 && probability <= 1.0);
}

#[tokio::test]
async fn wrong_vector_length_is_rejected() {
    let app = router(AppState::with_model(Arc::new(model(20))));
    let (status, body) = post_predict(app, vec![1.0; 3]).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("expected 20"));
}
