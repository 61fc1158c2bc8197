//! Authorization handlers under `/api/v1/auth`

use authz::authority::{BatchCreatorActionRequest, CreatorActionRequest};
use authz::{
    AuthorizeList, Decision, IamPermission, ListAuthorizedResourcesRequest, RequestContext,
    ResourceAttribute,
};
use axum::{extract::State, response::Json, Extension};
use tracing::{debug, info};

use crate::{
    error::{ApiErrorResponse, ApiResult},
    middleware_hooks::RequestId,
    models::{
        ActionPolicyBody, AuthorizeBatchRequest, AuthorizeListBody, BatchCreatorActionBody,
        CountResponse, CreatorActionBody, CreatorActionResponse, DecisionBody,
        ListAuthorizedResourcesBody, PoliciesQueryRequest, PolicyQueryRequest, PolicyResponse,
        SkipUrlResponse,
    },
    AppState,
};

fn request_context(state: &AppState, rid: RequestId) -> RequestContext {
    RequestContext::new(rid.0).with_timeout(state.authorizer.config().request_timeout())
}

/// Decide every resource against the subject's policy
#[utoipa::path(
    post,
    path = "/api/v1/auth/authorize/batch",
    request_body = AuthorizeBatchRequest,
    responses(
        (status = 200, description = "One decision per resource, in order", body = [DecisionBody]),
        (status = 400, description = "Invalid resource", body = ApiErrorResponse),
        (status = 502, description = "Policy authority failure", body = ApiErrorResponse)
    ),
    tag = "authorize"
)]
pub async fn authorize_batch(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<AuthorizeBatchRequest>,
) -> ApiResult<Json<Vec<Decision>>> {
    let ctx = request_context(&state, rid);
    debug!(rid = %ctx.rid, "Authorizing {} resources", req.resources.len());
    let decisions = state
        .authorizer
        .authorize_batch(&ctx, &req.subject.id, &req.resources)
        .await?;
    Ok(Json(decisions))
}

/// Decide whether the subject holds each action on any instance
#[utoipa::path(
    post,
    path = "/api/v1/auth/authorize/any/batch",
    request_body = AuthorizeBatchRequest,
    responses(
        (status = 200, description = "One decision per resource, in order", body = [DecisionBody]),
        (status = 400, description = "Invalid resource", body = ApiErrorResponse),
        (status = 502, description = "Policy authority failure", body = ApiErrorResponse)
    ),
    tag = "authorize"
)]
pub async fn authorize_any_batch(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<AuthorizeBatchRequest>,
) -> ApiResult<Json<Vec<Decision>>> {
    let ctx = request_context(&state, rid);
    let decisions = state
        .authorizer
        .authorize_any_batch(&ctx, &req.subject.id, &req.resources)
        .await?;
    Ok(Json(decisions))
}

/// List the instance ids a user may act on
#[utoipa::path(
    post,
    path = "/api/v1/auth/authorized/resources",
    request_body = ListAuthorizedResourcesBody,
    responses(
        (status = 200, description = "Authorized ids", body = AuthorizeListBody),
        (status = 400, description = "Invalid request or policy", body = ApiErrorResponse)
    ),
    tag = "authorize"
)]
pub async fn list_authorized_resources(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<ListAuthorizedResourcesRequest>,
) -> ApiResult<Json<AuthorizeList>> {
    let ctx = request_context(&state, rid);
    let list = state
        .authorizer
        .list_authorized_resources(&ctx, &req)
        .await?;
    info!(
        rid = %ctx.rid,
        "Listed {} authorized {} instances, is_any: {}",
        list.ids.len(),
        req.resource_type,
        list.is_any
    );
    Ok(Json(list))
}

/// Count the instances a user may act on
#[utoipa::path(
    post,
    path = "/api/v1/auth/authorized/resources/count",
    request_body = ListAuthorizedResourcesBody,
    responses(
        (status = 200, description = "Authorized instance count", body = CountResponse),
        (status = 400, description = "Invalid request or policy", body = ApiErrorResponse)
    ),
    tag = "authorize"
)]
pub async fn count_authorized_resources(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<ListAuthorizedResourcesRequest>,
) -> ApiResult<Json<CountResponse>> {
    let ctx = request_context(&state, rid);
    let count = state
        .authorizer
        .count_authorized_resources(&ctx, &req)
        .await?;
    Ok(Json(CountResponse { count }))
}

/// Link to the application page for a missing permission
#[utoipa::path(
    post,
    path = "/api/v1/auth/permission/skip-url",
    responses(
        (status = 200, description = "Application url", body = SkipUrlResponse),
        (status = 502, description = "Policy authority failure", body = ApiErrorResponse)
    ),
    tag = "permission"
)]
pub async fn get_no_auth_skip_url(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(permission): Json<IamPermission>,
) -> ApiResult<Json<SkipUrlResponse>> {
    let ctx = request_context(&state, rid);
    let url = state
        .authorizer
        .get_no_auth_skip_url(&ctx, &permission)
        .await?;
    Ok(Json(SkipUrlResponse { url }))
}

/// Describe the permission a user would need for the resources
#[utoipa::path(
    post,
    path = "/api/v1/auth/permission/to-apply",
    responses(
        (status = 200, description = "Permission to apply for"),
        (status = 400, description = "Unsupported resource", body = ApiErrorResponse)
    ),
    tag = "permission"
)]
pub async fn get_permission_to_apply(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(attributes): Json<Vec<ResourceAttribute>>,
) -> ApiResult<Json<IamPermission>> {
    let ctx = request_context(&state, rid);
    let permission = state
        .authorizer
        .get_permission_to_apply(&ctx, &attributes)
        .await?;
    Ok(Json(permission))
}

/// Grant a creator the creator actions on a new instance
#[utoipa::path(
    post,
    path = "/api/v1/auth/resource-creator-action",
    request_body = CreatorActionBody,
    responses(
        (status = 200, description = "Granted policies", body = CreatorActionResponse),
        (status = 400, description = "Missing creator, type or id", body = ApiErrorResponse)
    ),
    tag = "creator"
)]
pub async fn register_resource_creator_action(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<CreatorActionRequest>,
) -> ApiResult<Json<CreatorActionResponse>> {
    let ctx = request_context(&state, rid);
    let policies = state
        .authorizer
        .register_resource_creator_action(&ctx, req)
        .await?;
    Ok(Json(CreatorActionResponse { policies }))
}

/// Grant a creator the creator actions on many new instances
#[utoipa::path(
    post,
    path = "/api/v1/auth/resource-creator-action/batch",
    request_body = BatchCreatorActionBody,
    responses(
        (status = 200, description = "Granted policies", body = CreatorActionResponse),
        (status = 400, description = "Missing creator or type", body = ApiErrorResponse)
    ),
    tag = "creator"
)]
pub async fn batch_register_resource_creator_action(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<BatchCreatorActionRequest>,
) -> ApiResult<Json<CreatorActionResponse>> {
    let ctx = request_context(&state, rid);
    let policies = state
        .authorizer
        .batch_register_resource_creator_action(&ctx, req)
        .await?;
    Ok(Json(CreatorActionResponse { policies }))
}

/// Raw policy of one action
#[utoipa::path(
    post,
    path = "/api/v1/auth/policy",
    request_body = PolicyQueryRequest,
    responses(
        (status = 200, description = "Policy tree or null", body = PolicyResponse),
        (status = 502, description = "Policy authority failure", body = ApiErrorResponse)
    ),
    tag = "policy"
)]
pub async fn get_policy(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<PolicyQueryRequest>,
) -> ApiResult<Json<PolicyResponse>> {
    let ctx = request_context(&state, rid);
    let policy = state
        .authorizer
        .get_policy(&ctx, &req.subject.id, &req.action, req.resources)
        .await?;
    Ok(Json(PolicyResponse::from(policy)))
}

/// Raw policies of several actions
#[utoipa::path(
    post,
    path = "/api/v1/auth/policies",
    request_body = PoliciesQueryRequest,
    responses(
        (status = 200, description = "Policy per action", body = [ActionPolicyBody]),
        (status = 400, description = "No actions given", body = ApiErrorResponse)
    ),
    tag = "policy"
)]
pub async fn list_policies(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(req): Json<PoliciesQueryRequest>,
) -> ApiResult<Json<Vec<ActionPolicyBody>>> {
    let ctx = request_context(&state, rid);
    let policies = state
        .authorizer
        .list_policies(&ctx, &req.subject.id, &req.actions)
        .await?;
    Ok(Json(policies.into_iter().map(ActionPolicyBody::from).collect()))
}

