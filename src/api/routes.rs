//! HTTP route handlers for Axum.

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::{
    api::types::{ErrorBody, PredictRequest, PredictResponse},
    model::ModelError,
};

use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

pub const MODEL_NOT_LOADED: &str = "Model not loaded";

pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<PredictResponse> {
    let Some(model) = state.model.as_ref() else {
        warn!("prediction requested without a loaded model");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new(MODEL_NOT_LOADED)),
        ));
    };

    match model.predict(&request.features) {
        Ok(p) => Ok(Json(PredictResponse {
            prediction: p.prediction,
            probability: p.probability,
        })),
        Err(err @ ModelError::FeatureCount { .. }) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody::new(err.to_string())),
        )),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(err.to_string())),
        )),
    }
}
