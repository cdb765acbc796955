use arc_licensing::{LicenseError, LicenseType, SaasMetric};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{debug, warn};

use crate::handlers::{license_error_response, AppState};

pub const TENANT_HEADER: &str = "x-tenant-id";
const DEFAULT_TENANT: &str = "global";

/// Paths that stay reachable without a license.
pub fn is_unmetered(path: &str) -> bool {
    path == "/health"
        || path == "/metrics"
        || path == "/swagger.json"
        || path.starts_with("/docs")
        || path.starts_with("/api/v1/auth/")
        || path.starts_with("/auth/sso/")
}

pub fn tenant_id(headers: &HeaderMap) -> String {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TENANT)
        .to_string()
}

pub async fn enforce_license(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_unmetered(request.uri().path()) {
        return next.run(request).await;
    }

    let license = match state.manager.license() {
        Ok(license) => license,
        Err(err) => return deny(&err),
    };

    // A license that was valid at load time can lapse while the process runs.
    if license.is_expired() {
        return deny(&LicenseError::Expired);
    }

    if license.license_type == LicenseType::Saas {
        let tenant = tenant_id(request.headers());
        match state.tracker.increment_api_request(&tenant).await {
            Ok(count) => {
                if let Err(err) = state.manager.check_saas(SaasMetric::ApiRequests, count) {
                    debug!(
                        target: "arc-license-gate::enforcement",
                        tenant = %tenant,
                        count,
                        error = %err,
                        "api request quota reached"
                    );
                    return deny(&err);
                }
            }
            Err(err) => {
                // Fail open: a metering outage must not take the API down.
                warn!(
                    target: "arc-license-gate::enforcement",
                    tenant = %tenant,
                    error = %err,
                    "usage tracking unavailable; allowing request unmetered"
                );
                counter!("arc_license_gate_metering_failures_total", 1);
            }
        }
    }

    next.run(request).await
}

fn deny(err: &LicenseError) -> Response {
    counter!(
        "arc_license_gate_requests_denied_total",
        1,
        "reason" => err.metric_label()
    );
    license_error_response(err)
}
