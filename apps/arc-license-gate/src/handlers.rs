use std::sync::Arc;

use arc_licensing::{
    LicenseError, LicenseLimits, LicenseManager, LicenseType, PlanTier, UsageTracker,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::enforcement::{enforce_license, tenant_id};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LicenseManager>,
    pub tracker: Arc<dyn UsageTracker>,
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Serialize)]
pub struct LicenseSummary {
    pub license_id: String,
    pub customer_name: String,
    #[serde(rename = "type")]
    pub license_type: &'static str,
    pub plan_tier: PlanTier,
    pub expires_at: Option<String>,
    pub features: Vec<String>,
    pub limits: LicenseLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_api_requests_used: Option<i64>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/license", get(license_status))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_license))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Summary of the active license. SaaS deployments also report the calling
/// tenant's usage for the current month.
async fn license_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let license = match state.manager.license() {
        Ok(license) => license,
        Err(err) => return license_error_response(&err),
    };

    let monthly_api_requests_used = if license.license_type == LicenseType::Saas {
        let tenant = tenant_id(&headers);
        state.tracker.get_api_request_count(&tenant).await.ok()
    } else {
        None
    };

    Json(LicenseSummary {
        license_id: license.license_id.to_string(),
        customer_name: license.customer_name.clone(),
        license_type: license.license_type.as_str(),
        plan_tier: license.plan_tier,
        expires_at: license.expires_at.map(|t| t.to_rfc3339()),
        features: license.features.iter().cloned().collect(),
        limits: license.limits,
        monthly_api_requests_used,
    })
    .into_response()
}

/// Map a license decision onto an HTTP response.
pub fn license_error_response(err: &LicenseError) -> Response {
    let (status, reason) = match err {
        LicenseError::NoLicense => (StatusCode::PAYMENT_REQUIRED, "license_required"),
        LicenseError::Expired => (StatusCode::PAYMENT_REQUIRED, "license_expired"),
        LicenseError::LimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "limit_exceeded"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "license_unavailable"),
    };
    (
        status,
        Json(json!({
            "success": false,
            "reason": reason,
            "message": err.to_string(),
        })),
    )
        .into_response()
}
