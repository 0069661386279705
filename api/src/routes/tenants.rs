//! Tenant management endpoints.

use crate::middleware::trace_request;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use shared::context::RequestContext;
use shared::models::{NewTenant, Tenant, TenantStatistics, TenantUpdate, TenantUser};
use shared::service::{TenantError, TenantService};

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: &TenantError) -> ApiError {
    let (status, code) = match err {
        TenantError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        TenantError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
        TenantError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        TenantError::IsolationViolation { .. } => (StatusCode::FORBIDDEN, "forbidden"),
        TenantError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Tenant request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

fn invalid_json(rejection: &JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid_json".to_string(),
            message: rejection.body_text(),
        }),
    )
}

/// Creates the tenant routes.
pub fn tenants_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tenants", post(create_tenant))
        .route(
            "/api/v1/tenants/{name}",
            get(get_tenant).patch(update_tenant),
        )
        .route("/api/v1/tenants/{name}/users", get(get_tenant_users))
        .route("/api/v1/tenants/{name}/stats", get(get_tenant_stats))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

/// Runs a tenant service call on the blocking pool, inside a span of the
/// request's tracer. The service may block on Redis round trips.
async fn run_service<T, F>(
    state: AppState,
    ctx: RequestContext,
    operation: &'static str,
    call: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TenantService) -> Result<T, TenantError> + Send + 'static,
{
    let joined = tokio::task::spawn_blocking(move || {
        let tenants: &TenantService = state.tenants();
        match ctx.current_trace() {
            Some(tracer) => tracer.in_span(operation, &[], |_| call(tenants)),
            None => call(tenants),
        }
    })
    .await;

    match joined {
        Ok(result) => result.map_err(|e| error_response(&e)),
        Err(err) => {
            tracing::error!(error = %err, operation, "Tenant task failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Internal server error".to_string(),
                }),
            ))
        }
    }
}

async fn create_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<NewTenant>, JsonRejection>,
) -> Result<(StatusCode, Json<Tenant>), ApiError> {
    let Json(request) = payload.map_err(|rejection| invalid_json(&rejection))?;

    let tenant = run_service(state, ctx, "tenant.create", move |tenants| {
        tenants.create_tenant(request)
    })
    .await?;

    tracing::debug!(tenant = %tenant.name, "Created tenant");
    Ok((StatusCode::CREATED, Json(tenant)))
}

async fn get_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
) -> Result<Json<Tenant>, ApiError> {
    run_service(state, ctx, "tenant.get", move |tenants| tenants.get_tenant(&name))
        .await
        .map(Json)
}

async fn update_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
    payload: Result<Json<TenantUpdate>, JsonRejection>,
) -> Result<Json<Tenant>, ApiError> {
    let Json(update) = payload.map_err(|rejection| invalid_json(&rejection))?;

    run_service(state, ctx, "tenant.update", move |tenants| {
        tenants.update_tenant(&name, update)
    })
    .await
    .map(Json)
}

async fn get_tenant_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
) -> Result<Json<Vec<TenantUser>>, ApiError> {
    run_service(state, ctx, "tenant.users", move |tenants| {
        tenants.get_tenant_users(&name)
    })
    .await
    .map(Json)
}

async fn get_tenant_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(name): Path<String>,
) -> Result<Json<TenantStatistics>, ApiError> {
    run_service(state, ctx, "tenant.stats", move |tenants| {
        tenants.tenant_statistics(&name)
    })
    .await
    .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::storage::RepositoryError;

    #[test]
    fn test_error_response_status_mapping() {
        let cases = [
            (TenantError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (TenantError::AlreadyExists("a".into()), StatusCode::CONFLICT),
            (TenantError::NotFound("a".into()), StatusCode::NOT_FOUND),
            (
                TenantError::IsolationViolation {
                    user_tenant: "a".into(),
                    document_tenant: "b".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                TenantError::Repository(RepositoryError::LockError),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, body) = error_response(&err);
            assert_eq!(status, expected);
            assert_eq!(body.message, err.to_string());
        }
    }
}
