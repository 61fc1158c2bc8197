use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

pub mod error;
pub mod handlers;
pub mod middleware_hooks;
pub mod models;
pub mod server;

// Re-export server functions for convenience
pub use server::{start_server_with_config, ApiConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<authz::Authorizer>,
    pub provider: Arc<authz::ResourceProvider>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::authorize_batch,
        handlers::auth::authorize_any_batch,
        handlers::auth::list_authorized_resources,
        handlers::auth::count_authorized_resources,
        handlers::auth::get_no_auth_skip_url,
        handlers::auth::get_permission_to_apply,
        handlers::auth::register_resource_creator_action,
        handlers::auth::batch_register_resource_creator_action,
        handlers::auth::get_policy,
        handlers::auth::list_policies,
        handlers::resource::find_resource,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::AuthorizeBatchRequest,
            models::DecisionBody,
            models::AuthorizeListBody,
            models::ListAuthorizedResourcesBody,
            models::CountResponse,
            models::SkipUrlResponse,
            models::PolicyQueryRequest,
            models::PolicyResponse,
            models::PoliciesQueryRequest,
            models::ActionPolicyBody,
            models::CreatorActionBody,
            models::BatchCreatorActionBody,
            models::CreatorActionResponse,
            models::PullResourceBody,
            models::HealthResponse,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "authorize", description = "Authorization decisions and listings"),
        (name = "permission", description = "Permission application helpers"),
        (name = "creator", description = "Creator action registration"),
        (name = "policy", description = "Raw policy queries"),
        (name = "resource", description = "Resource pull callbacks"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "CMDB Auth API",
        version = "1.0.0",
        description = "Authorization service for CMDB resources",
    ),
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/authorize/batch", post(handlers::auth::authorize_batch))
        .route(
            "/authorize/any/batch",
            post(handlers::auth::authorize_any_batch),
        )
        .route(
            "/authorized/resources",
            post(handlers::auth::list_authorized_resources),
        )
        .route(
            "/authorized/resources/count",
            post(handlers::auth::count_authorized_resources),
        )
        .route(
            "/permission/skip-url",
            post(handlers::auth::get_no_auth_skip_url),
        )
        .route(
            "/permission/to-apply",
            post(handlers::auth::get_permission_to_apply),
        )
        .route(
            "/resource-creator-action",
            post(handlers::auth::register_resource_creator_action),
        )
        .route(
            "/resource-creator-action/batch",
            post(handlers::auth::batch_register_resource_creator_action),
        )
        .route("/policy", post(handlers::auth::get_policy))
        .route("/policies", post(handlers::auth::list_policies))
        .route("/find/resource", post(handlers::resource::find_resource));

    let api_v1 = Router::new()
        .nest("/auth", auth)
        .route("/health", get(handlers::health::health_check))
        .route("/openapi.json", get(openapi_json));

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(middleware_hooks::request_id_middleware)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use authz::authority::{
        ActionRef, BatchCreatorActionRequest, CreatorActionPolicy, CreatorActionRequest,
        PolicyByActionsRequest, PolicyRequest,
    };
    use authz::policy::{Field, Operator};
    use authz::{
        ActionId, ActionPolicy, AuthConfig, AuthzError, IamPermission, Policy, PolicyAuthority,
        RequestContext, TypeId,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use database::{AuthResourceStore, Database};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FixedAuthority {
        policies: HashMap<String, Policy>,
        fail: bool,
    }

    #[async_trait]
    impl PolicyAuthority for FixedAuthority {
        async fn query_policy(
            &self,
            ctx: &RequestContext,
            request: &PolicyRequest,
        ) -> authz::Result<Option<Policy>> {
            if self.fail {
                return Err(AuthzError::remote(ctx.rid.clone(), "authority down"));
            }
            Ok(self.policies.get(&request.action.id).cloned())
        }

        async fn query_policies_by_actions(
            &self,
            _ctx: &RequestContext,
            request: &PolicyByActionsRequest,
        ) -> authz::Result<Vec<ActionPolicy>> {
            Ok(request
                .actions
                .iter()
                .map(|action| ActionPolicy {
                    action: action.id.clone(),
                    policy: self.policies.get(&action.id).cloned(),
                })
                .collect())
        }

        async fn get_system_token(&self, _ctx: &RequestContext) -> authz::Result<String> {
            Ok("token".to_string())
        }

        async fn get_no_auth_skip_url(
            &self,
            _ctx: &RequestContext,
            permission: &IamPermission,
        ) -> authz::Result<String> {
            Ok(format!("http://apply/{}", permission.system_id))
        }

        async fn register_creator_action(
            &self,
            _ctx: &RequestContext,
            _request: &CreatorActionRequest,
        ) -> authz::Result<Vec<CreatorActionPolicy>> {
            Ok(vec![CreatorActionPolicy {
                action: ActionRef::new("edit_business"),
                policy_id: 7,
            }])
        }

        async fn batch_register_creator_action(
            &self,
            _ctx: &RequestContext,
            request: &BatchCreatorActionRequest,
        ) -> authz::Result<Vec<CreatorActionPolicy>> {
            Ok(request
                .instances
                .iter()
                .map(|_| CreatorActionPolicy {
                    action: ActionRef::new("edit_business"),
                    policy_id: 8,
                })
                .collect())
        }
    }

    fn business_policy() -> Policy {
        Policy::leaf(
            Field::new(TypeId::BUSINESS, "id"),
            Operator::In,
            json!(["1", "3"]),
        )
    }

    async fn app_with(authority: FixedAuthority, config: AuthConfig) -> Router {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let store = AuthResourceStore::new(Arc::new(db));
        for id in 1..=3 {
            store
                .insert_document(
                    "cc_ApplicationBase",
                    json!({"bk_biz_id": id, "bk_biz_name": format!("biz-{}", id)})
                        .as_object()
                        .unwrap(),
                )
                .await
                .unwrap();
        }
        let store = Arc::new(store);
        let authorizer = authz::Authorizer::new(config, Arc::new(authority), store.clone());
        create_router(AppState {
            authorizer: Arc::new(authorizer),
            provider: Arc::new(authz::ResourceProvider::new(store)),
        })
    }

    async fn app() -> Router {
        let mut policies = HashMap::new();
        policies.insert(ActionId::EDIT_BUSINESS.to_string(), business_policy());
        policies.insert(ActionId::FIND_BUSINESS.to_string(), business_policy());
        app_with(
            FixedAuthority {
                policies,
                fail: false,
            },
            AuthConfig::default(),
        )
        .await
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .header("x-request-id", "rid-test")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        assert_eq!(response.headers()["x-request-id"], "rid-test");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_authorize_batch() {
        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/authorize/batch",
            json!({
                "subject": {"type": "user", "id": "admin"},
                "resources": [
                    {"type": "business", "action": "update", "instance_id": 1},
                    {"type": "business", "action": "update", "instance_id": 2},
                ]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["authorized"], json!(true));
        assert_eq!(body[1]["authorized"], json!(false));
        assert_eq!(body[1]["resource"]["instance_id"], json!(2));
    }

    #[tokio::test]
    async fn test_empty_subject_is_bad_request() {
        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/authorize/batch",
            json!({
                "subject": {"id": ""},
                "resources": [{"type": "business", "action": "update", "instance_id": 1}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_authority_failure_is_bad_gateway() {
        let app = app_with(
            FixedAuthority {
                policies: HashMap::new(),
                fail: true,
            },
            AuthConfig::default(),
        )
        .await;
        let (status, body) = post_json(
            app,
            "/api/v1/auth/authorize/batch",
            json!({
                "subject": {"id": "admin"},
                "resources": [{"type": "business", "action": "update", "instance_id": 1}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["details"]["rid"], json!("rid-test"));
    }

    #[tokio::test]
    async fn test_list_and_count_authorized_resources() {
        let request = json!({
            "resource_type": "biz",
            "action": "find_business",
            "user_name": "admin"
        });

        let (status, body) =
            post_json(app().await, "/api/v1/auth/authorized/resources", request.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ids": ["1", "3"], "is_any": false}));

        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/authorized/resources/count",
            request,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"count": 2}));
    }

    #[tokio::test]
    async fn test_disabled_auth_lists_any() {
        let app = app_with(FixedAuthority::default(), AuthConfig::disabled()).await;
        let (_, body) = post_json(
            app,
            "/api/v1/auth/authorized/resources",
            json!({"resource_type": "biz", "action": "find_business", "user_name": "admin"}),
        )
        .await;
        assert_eq!(body["is_any"], json!(true));
    }

    #[tokio::test]
    async fn test_policy_queries() {
        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/policy",
            json!({"subject": {"id": "admin"}, "action": "edit_business"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["policy"]["op"], json!("in"));
        assert_eq!(body["policy"]["field"], json!("biz.id"));

        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/policies",
            json!({"subject": {"id": "admin"}, "actions": ["edit_business", "archive_business"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["action"], json!("edit_business"));
        assert!(body[1]["policy"].is_null());
    }

    #[tokio::test]
    async fn test_creator_action_registration() {
        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/resource-creator-action",
            json!({"type": "biz", "id": "5", "name": "new", "creator": "admin"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["policies"][0]["policy_id"], json!(7));

        let (status, _) = post_json(
            app().await,
            "/api/v1/auth/resource-creator-action",
            json!({"type": "biz", "id": "5", "creator": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_permission_to_apply_and_skip_url() {
        let (status, permission) = post_json(
            app().await,
            "/api/v1/auth/permission/to-apply",
            json!([{"type": "business", "action": "update", "instance_id": 2}]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(permission["system_id"], json!("bk_cmdb"));
        assert_eq!(permission["actions"][0]["id"], json!("edit_business"));
        assert_eq!(
            permission["actions"][0]["related_resource_types"][0]["instances"][0][0]["name"],
            json!("biz-2")
        );

        let (status, body) =
            post_json(app().await, "/api/v1/auth/permission/skip-url", permission).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], json!("http://apply/bk_cmdb"));
    }

    #[tokio::test]
    async fn test_find_resource_lists_instances() {
        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/find/resource",
            json!({
                "type": "biz",
                "method": "list_instance",
                "filter": {"search": {"biz": ["biz-2"]}},
                "page": {"limit": 10, "offset": 0}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(1));
        assert_eq!(body["results"][0], json!({"id": "2", "display_name": "biz-2"}));

        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/find/resource",
            json!({
                "type": "biz",
                "method": "fetch_instance_info",
                "filter": {"ids": ["1", "3"], "attrs": ["display_name"]}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[1], json!({"id": "3", "display_name": "biz-3"}));
    }

    #[tokio::test]
    async fn test_find_resource_rejects_unknown_type() {
        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/find/resource",
            json!({"type": "nothing", "method": "list_instance", "page": {"limit": 10}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("UNSUPPORTED"));

        let (status, body) = post_json(
            app().await,
            "/api/v1/auth/find/resource",
            json!({"type": "biz", "method": "list_instance", "page": {"limit": 0}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_health_and_openapi() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["auth_enabled"], json!(true));

        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/api/v1/auth/authorize/batch"].is_object());
        assert!(doc["paths"]["/api/v1/auth/find/resource"].is_object());
    }
}
