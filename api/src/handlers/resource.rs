//! Resource pull callbacks the policy authority calls back into

use authz::provider::{PullResourceRequest, PullResult};
use authz::RequestContext;
use axum::{extract::State, response::Json, Extension};
use tracing::debug;

use crate::{
    error::{ApiErrorResponse, ApiResult},
    middleware_hooks::RequestId,
    models::PullResourceBody,
    AppState,
};

/// List or describe CMDB instances for the authority
#[utoipa::path(
    post,
    path = "/api/v1/auth/find/resource",
    request_body = PullResourceBody,
    responses(
        (status = 200, description = "Instance page or instance attributes"),
        (status = 400, description = "Unsupported type or invalid filter", body = ApiErrorResponse)
    ),
    tag = "resource"
)]
pub async fn find_resource(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<PullResourceRequest>,
) -> ApiResult<Json<PullResult>> {
    let ctx = RequestContext::new(rid.0).with_timeout(state.authorizer.config().request_timeout());
    debug!(
        rid = %ctx.rid,
        "Pulling {} instances with {:?}",
        req.resource_type,
        req.method
    );
    let result = state.provider.pull(&ctx, req).await?;
    Ok(Json(result))
}
