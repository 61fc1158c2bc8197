//! Client side of the external policy authority.

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::permission::IamPermission;
use crate::policy::{ActionPolicy, Policy};
use crate::resource::Resource;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const HEADER_APP_CODE: &str = "X-Bk-App-Code";
pub const HEADER_APP_SECRET: &str = "X-Bk-App-Secret";
pub const HEADER_REQUEST_ID: &str = "X-Request-Id";

const SUBJECT_TYPE_USER: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "type", default = "default_subject_type")]
    pub subject_type: String,
    pub id: String,
}

fn default_subject_type() -> String {
    SUBJECT_TYPE_USER.to_string()
}

impl Subject {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            subject_type: default_subject_type(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    pub id: String,
}

impl ActionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Body of `POST /api/v1/policy/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub system: String,
    pub subject: Subject,
    pub action: ActionRef,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Body of `POST /api/v1/policy/query_by_actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyByActionsRequest {
    pub system: String,
    pub subject: Subject,
    pub actions: Vec<ActionRef>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAncestor {
    pub system: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

/// A newly created instance whose creator gets the creator actions on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorActionRequest {
    #[serde(default)]
    pub system: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<InstanceAncestor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorInstance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<InstanceAncestor>,
}

/// Several instances of one type created by the same user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCreatorActionRequest {
    #[serde(default)]
    pub system: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub creator: String,
    pub instances: Vec<CreatorInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorActionPolicy {
    pub action: ActionRef,
    pub policy_id: i64,
}

#[async_trait]
pub trait PolicyAuthority: Send + Sync {
    async fn query_policy(&self, ctx: &RequestContext, request: &PolicyRequest)
        -> Result<Option<Policy>>;

    async fn query_policies_by_actions(
        &self,
        ctx: &RequestContext,
        request: &PolicyByActionsRequest,
    ) -> Result<Vec<ActionPolicy>>;

    async fn get_system_token(&self, ctx: &RequestContext) -> Result<String>;

    async fn get_no_auth_skip_url(
        &self,
        ctx: &RequestContext,
        permission: &IamPermission,
    ) -> Result<String>;

    async fn register_creator_action(
        &self,
        ctx: &RequestContext,
        request: &CreatorActionRequest,
    ) -> Result<Vec<CreatorActionPolicy>>;

    async fn batch_register_creator_action(
        &self,
        ctx: &RequestContext,
        request: &BatchCreatorActionRequest,
    ) -> Result<Vec<CreatorActionPolicy>>;
}

/// Response envelope shared by every authority endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) message: String,
    pub(crate) data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RawActionPolicy {
    action: ActionRef,
    #[serde(default)]
    condition: Value,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct UrlData {
    url: String,
}

/// [`PolicyAuthority`] over HTTP.
pub struct HttpPolicyAuthority {
    client: reqwest::Client,
    iam_address: String,
    apply_address: String,
    app_code: String,
    app_secret: String,
    system_id: String,
}

impl HttpPolicyAuthority {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AuthzError::Store(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            iam_address: config.iam_address.trim_end_matches('/').to_string(),
            apply_address: config.apply_address.trim_end_matches('/').to_string(),
            app_code: config.app_code.clone(),
            app_secret: config.app_secret.clone(),
            system_id: config.system_id.clone(),
        })
    }

    pub(crate) fn system_id(&self) -> &str {
        &self.system_id
    }

    pub(crate) fn iam_address(&self) -> &str {
        &self.iam_address
    }

    pub(crate) fn request(
        &self,
        ctx: &RequestContext,
        method: reqwest::Method,
        url: String,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(HEADER_APP_CODE, &self.app_code)
            .header(HEADER_APP_SECRET, &self.app_secret)
            .header(HEADER_REQUEST_ID, &ctx.rid)
    }

    /// Sends the request and decodes the envelope without judging its code.
    pub(crate) async fn send_envelope<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>> {
        let call = async {
            let response = builder
                .send()
                .await
                .map_err(|e| AuthzError::remote(ctx.rid.clone(), format!("{}: {}", path, e)))?;
            let status = response.status();
            if !status.is_success() {
                return Err(AuthzError::remote(
                    ctx.rid.clone(),
                    format!("{} returned status {}", path, status),
                ));
            }
            response.json::<Envelope<T>>().await.map_err(|e| {
                AuthzError::remote(ctx.rid.clone(), format!("{} invalid response: {}", path, e))
            })
        };

        let result = ctx.run(call).await;
        if let Err(e) = &result {
            warn!(rid = %ctx.rid, path, error = %e, "policy authority call failed");
        }
        result
    }

    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<Option<T>> {
        let envelope: Envelope<T> = self.send_envelope(ctx, path, builder).await?;
        if envelope.code != 0 {
            warn!(rid = %ctx.rid, path, code = envelope.code, "policy authority rejected call");
            return Err(AuthzError::remote(
                ctx.rid.clone(),
                format!(
                    "{} failed, code: {}, message: {}",
                    path, envelope.code, envelope.message
                ),
            ));
        }
        Ok(envelope.data)
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        base: &str,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        debug!(rid = %ctx.rid, path, "calling policy authority");
        let builder = self
            .request(ctx, reqwest::Method::POST, format!("{}{}", base, path))
            .json(body);
        self.send(ctx, path, builder).await
    }
}

#[async_trait]
impl PolicyAuthority for HttpPolicyAuthority {
    async fn query_policy(
        &self,
        ctx: &RequestContext,
        request: &PolicyRequest,
    ) -> Result<Option<Policy>> {
        let data: Option<Value> = self
            .post(ctx, &self.iam_address, "/api/v1/policy/query", request)
            .await?;
        match data {
            Some(value) => Policy::from_value(value),
            None => Ok(None),
        }
    }

    async fn query_policies_by_actions(
        &self,
        ctx: &RequestContext,
        request: &PolicyByActionsRequest,
    ) -> Result<Vec<ActionPolicy>> {
        let data: Option<Vec<RawActionPolicy>> = self
            .post(ctx, &self.iam_address, "/api/v1/policy/query_by_actions", request)
            .await?;
        data.unwrap_or_default()
            .into_iter()
            .map(|raw| {
                Ok(ActionPolicy {
                    action: raw.action.id,
                    policy: Policy::from_value(raw.condition)?,
                })
            })
            .collect()
    }

    async fn get_system_token(&self, ctx: &RequestContext) -> Result<String> {
        let path = format!("/api/v1/model/systems/{}/token", self.system_id);
        let builder = self.request(
            ctx,
            reqwest::Method::GET,
            format!("{}{}", self.iam_address, path),
        );
        let data: Option<TokenData> = self.send(ctx, &path, builder).await?;
        data.map(|d| d.token)
            .ok_or_else(|| AuthzError::remote(ctx.rid.clone(), "system token is empty"))
    }

    async fn get_no_auth_skip_url(
        &self,
        ctx: &RequestContext,
        permission: &IamPermission,
    ) -> Result<String> {
        let data: Option<UrlData> = self
            .post(ctx, &self.apply_address, "/api/v1/open/application/", permission)
            .await?;
        data.map(|d| d.url)
            .ok_or_else(|| AuthzError::remote(ctx.rid.clone(), "skip url is empty"))
    }

    async fn register_creator_action(
        &self,
        ctx: &RequestContext,
        request: &CreatorActionRequest,
    ) -> Result<Vec<CreatorActionPolicy>> {
        let data: Option<Vec<CreatorActionPolicy>> = self
            .post(
                ctx,
                &self.iam_address,
                "/api/v1/open/authorization/resource_creator_action/",
                request,
            )
            .await?;
        Ok(data.unwrap_or_default())
    }

    async fn batch_register_creator_action(
        &self,
        ctx: &RequestContext,
        request: &BatchCreatorActionRequest,
    ) -> Result<Vec<CreatorActionPolicy>> {
        let data: Option<Vec<CreatorActionPolicy>> = self
            .post(
                ctx,
                &self.iam_address,
                "/api/v1/open/authorization/batch_resource_creator_action/",
                request,
            )
            .await?;
        Ok(data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::time::Duration;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn authority(address: &str) -> HttpPolicyAuthority {
        HttpPolicyAuthority::new(&AuthConfig {
            iam_address: address.to_string(),
            apply_address: address.to_string(),
            app_secret: "secret".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn policy_request() -> PolicyRequest {
        PolicyRequest {
            system: "bk_cmdb".into(),
            subject: Subject::user("admin"),
            action: ActionRef::new("edit_business"),
            resources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_query_policy_parses_condition() {
        let router = Router::new().route(
            "/api/v1/policy/query",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers[HEADER_APP_CODE], "bk_cmdb");
                assert_eq!(headers[HEADER_APP_SECRET], "secret");
                assert_eq!(headers[HEADER_REQUEST_ID], "rid-7");
                assert_eq!(body["subject"]["type"], "user");
                Json(json!({
                    "code": 0,
                    "message": "ok",
                    "data": {"op": "in", "field": "biz.id", "value": ["1", "2"]}
                }))
            }),
        );
        let address = spawn(router).await;

        let policy = authority(&address)
            .query_policy(&RequestContext::new("rid-7"), &policy_request())
            .await
            .unwrap();
        assert!(matches!(policy, Some(Policy::Leaf(_))));
    }

    #[tokio::test]
    async fn test_error_code_becomes_remote_error() {
        let router = Router::new().route(
            "/api/v1/policy/query",
            post(|| async { Json(json!({"code": 1901, "message": "bad subject", "data": null})) }),
        );
        let address = spawn(router).await;

        let err = authority(&address)
            .query_policy(&RequestContext::new("rid-8"), &policy_request())
            .await
            .unwrap_err();
        match err {
            AuthzError::Remote { rid, message } => {
                assert_eq!(rid, "rid-8");
                assert!(message.contains("bad subject"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_by_actions_and_token() {
        let router = Router::new()
            .route(
                "/api/v1/policy/query_by_actions",
                post(|| async {
                    Json(json!({"code": 0, "data": [
                        {"action": {"id": "edit_business"}, "condition": {"op": "any", "field": "biz.id", "value": []}},
                        {"action": {"id": "delete_business"}, "condition": {}}
                    ]}))
                }),
            )
            .route(
                "/api/v1/model/systems/:system/token",
                get(|Path(system): Path<String>| async move {
                    Json(json!({"code": 0, "data": {"token": format!("token-{}", system)}}))
                }),
            );
        let address = spawn(router).await;
        let authority = authority(&address);
        let ctx = RequestContext::new("rid-9");

        let policies = authority
            .query_policies_by_actions(
                &ctx,
                &PolicyByActionsRequest {
                    system: "bk_cmdb".into(),
                    subject: Subject::user("admin"),
                    actions: vec![ActionRef::new("edit_business"), ActionRef::new("delete_business")],
                    resources: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0].policy, Some(Policy::Any));
        assert_eq!(policies[1].policy, None);

        let token = authority.get_system_token(&ctx).await.unwrap();
        assert_eq!(token, "token-bk_cmdb");
    }

    #[tokio::test]
    async fn test_slow_authority_is_cancelled() {
        let router = Router::new().route(
            "/api/v1/policy/query",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"code": 0, "data": null}))
            }),
        );
        let address = spawn(router).await;

        let ctx = RequestContext::new("rid-10").with_timeout(Duration::from_millis(50));
        let err = authority(&address)
            .query_policy(&ctx, &policy_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_authority() {
        let err = authority("http://127.0.0.1:1")
            .get_system_token(&RequestContext::new("rid-11"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Remote { .. }));
    }
}
