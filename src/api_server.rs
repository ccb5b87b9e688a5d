// Axum API Server Module
//
// Purpose: REST API over the crop model, attribution explainer,
// sustainability analyzer and AI advisory gateway.
// CPU-bound work (forest evaluation, TreeSHAP) runs on the blocking pool.

#[cfg(feature = "api")]
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use anyhow::Context;

#[cfg(feature = "api")]
use serde_json::{json, Map, Value};

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use crate::advisory::AdvisoryGateway;

#[cfg(feature = "api")]
use crate::config::Config;

#[cfg(feature = "api")]
use crate::error::{ServiceError, ValidationError};

#[cfg(feature = "api")]
use crate::explanation::{explain, global_importance_chart};

#[cfg(feature = "api")]
use crate::features::FeatureVector;

#[cfg(feature = "api")]
use crate::model::CropModel;

#[cfg(feature = "api")]
use crate::sustainability::{analyze, CropTables};

#[cfg(feature = "api")]
use crate::validation::{
    validate, validate_crop, validate_duration, validate_soil_sample, validate_top_k,
};

#[cfg(feature = "api")]
const SERVICE_NAME: &str = "Crop Recommendation API";

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<CropModel>,
    pub tables: Arc<CropTables>,
    pub advisor: Arc<AdvisoryGateway>,
    pub config: Arc<Config>,
}

#[cfg(feature = "api")]
impl AppState {
    /// Load the model artifact and crop tables; any failure aborts startup
    pub fn new(config: Config) -> anyhow::Result<Self> {
        tracing::info!("Loading crop model from {:?}...", config.model_path);
        let model = CropModel::load(&config.model_path)?;

        tracing::info!("Loading crop tables from {:?}...", config.data_dir);
        let tables = CropTables::load(&config.data_dir)
            .with_context(|| format!("Failed to load crop tables from {:?}", config.data_dir))?;

        tracing::info!("Initializing advisory gateway...");
        let advisor = AdvisoryGateway::from_config(&config);

        Ok(Self::from_parts(model, tables, advisor, config))
    }

    pub fn from_parts(
        model: CropModel,
        tables: CropTables,
        advisor: AdvisoryGateway,
        config: Config,
    ) -> Self {
        Self {
            model: Arc::new(model),
            tables: Arc::new(tables),
            advisor: Arc::new(advisor),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/api/crops", get(list_crops))
        .route("/api/feature-importance", get(feature_importance))

        .route("/api/predict", post(predict))
        .route("/api/explain", post(explain_prediction))
        .route("/api/soil-impact", post(soil_impact))
        .route("/api/ai-advice", post(ai_advice))

        .fallback(not_found)

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(cors)
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

#[cfg(feature = "api")]
fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.cors_allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn index() -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /api/health",
            "crops": "GET /api/crops",
            "feature_importance": "GET /api/feature-importance",
            "predict": "POST /api/predict",
            "explain": "POST /api/explain",
            "soil_impact": "POST /api/soil-impact",
            "ai_advice": "POST /api/ai-advice"
        }
    }))
}

#[cfg(feature = "api")]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "advisory_configured": state.advisor.is_configured(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(feature = "api")]
async fn list_crops(State(state): State<AppState>) -> impl IntoResponse {
    let crops = state.model.labels();
    Json(json!({
        "success": true,
        "crops": crops,
        "count": crops.len()
    }))
}

#[cfg(feature = "api")]
async fn feature_importance(State(state): State<AppState>) -> impl IntoResponse {
    let chart = global_importance_chart(&state.model);
    let by_feature: Map<String, Value> = chart
        .iter()
        .map(|e| (e.feature.name().to_string(), json!(e.importance)))
        .collect();

    Json(json!({
        "success": true,
        "feature_importance": by_feature,
        "chart_data": chart
    }))
}

#[cfg(feature = "api")]
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(raw) = payload?;
    let vector = validate(&raw)?;
    let top_k = validate_top_k(&raw, state.config.default_top_k)?;

    let model = state.model.clone();
    let result = tokio::task::spawn_blocking(move || model.predict(&vector, top_k))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    if let Some(best) = result.predictions.first() {
        tracing::info!("Predicted {} ({}) from {} candidates", best.crop, best.confidence_percent, top_k);
    }

    Ok(Json(json!({
        "success": true,
        "predictions": result.predictions,
        "input": vector,
        "warnings": training_range_warnings(&vector)
    })))
}

#[cfg(feature = "api")]
async fn explain_prediction(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(raw) = payload?;
    let vector = validate(&raw)?;
    let crop = validate_crop(&raw, state.model.labels().iter().map(String::as_str))?;

    let model = state.model.clone();
    let attribution = tokio::task::spawn_blocking(move || explain(&model, &vector, &crop))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(json!({
        "success": true,
        "explanation": attribution
    })))
}

#[cfg(feature = "api")]
async fn soil_impact(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(raw) = payload?;
    let crop = validate_crop(&raw, state.tables.crops())?;
    let sample = validate_soil_sample(&raw)?;
    let duration = validate_duration(&raw)?;

    let report = analyze(&state.tables, &crop, &sample, duration)?;
    tracing::debug!("Soil impact for {}: score {}", crop, report.sustainability_score);

    Ok(Json(json!({
        "success": true,
        "analysis": report
    })))
}

#[cfg(feature = "api")]
async fn ai_advice(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(raw) = payload?;
    let vector = validate(&raw)?;
    let crop = validate_crop(&raw, state.model.labels().iter().map(String::as_str))?;
    let location = raw.get("location").and_then(Value::as_str);

    let advice = state.advisor.get_advice(&crop, &vector, location).await?;

    Ok(Json(json!({
        "success": true,
        "crop": crop,
        "advice": advice
    })))
}

#[cfg(feature = "api")]
async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}

/// Extrapolation notices for values inside physical bounds but outside training data
#[cfg(feature = "api")]
fn training_range_warnings(vector: &FeatureVector) -> Vec<String> {
    vector
        .outside_training_range()
        .into_iter()
        .map(|f| {
            let (min, max) = f.training_range();
            format!(
                "{} = {} is outside the training range ({} to {}); prediction may be less reliable",
                f.name(),
                vector.get(f),
                min,
                max
            )
        })
        .collect()
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    UnknownCrop(String),
    AdviceUnavailable(String),
    ModelUnavailable(String),
    Internal(String),
    NotFound(String),
}

#[cfg(feature = "api")]
impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Validation(_) => AppError::Validation(message),
            ServiceError::UnknownCrop { .. } => AppError::UnknownCrop(message),
            ServiceError::ModelUnavailable(_) => AppError::ModelUnavailable(message),
            ServiceError::AdviceUnavailable { .. } => AppError::AdviceUnavailable(message),
        }
    }
}

#[cfg(feature = "api")]
impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(feature = "api")]
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UnknownCrop(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AdviceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::ModelUnavailable(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
