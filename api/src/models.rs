use authz::authority::CreatorActionPolicy;
use authz::{ActionId, ActionPolicy, Policy, Resource, ResourceAttribute, Subject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Batch authorization request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeBatchRequest {
    #[schema(value_type = Object)]
    pub subject: Subject,
    /// Resources to decide, answered in the same order.
    #[serde(alias = "batch", default)]
    #[schema(value_type = Vec<Object>)]
    pub resources: Vec<ResourceAttribute>,
}

/// One decision of a batch
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecisionBody {
    #[schema(value_type = Object)]
    pub resource: Value,
    pub authorized: bool,
}

/// Authorized instance ids, or `is_any` when every instance is allowed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeListBody {
    pub ids: Vec<String>,
    pub is_any: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListAuthorizedResourcesBody {
    pub resource_type: String,
    pub action: String,
    #[serde(default)]
    pub bk_biz_id: i64,
    pub user_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SkipUrlResponse {
    pub url: String,
}

/// Raw policy query
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolicyQueryRequest {
    #[schema(value_type = Object)]
    pub subject: Subject,
    #[schema(value_type = String)]
    pub action: ActionId,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PolicyResponse {
    /// Policy tree in wire form, `null` when nothing is granted.
    #[schema(value_type = Object, nullable)]
    pub policy: Option<Value>,
}

impl From<Option<Policy>> for PolicyResponse {
    fn from(policy: Option<Policy>) -> Self {
        Self {
            policy: policy.map(|p| p.to_value()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PoliciesQueryRequest {
    #[schema(value_type = Object)]
    pub subject: Subject,
    #[schema(value_type = Vec<String>)]
    pub actions: Vec<ActionId>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionPolicyBody {
    pub action: String,
    #[schema(value_type = Object, nullable)]
    pub policy: Option<Value>,
}

impl From<ActionPolicy> for ActionPolicyBody {
    fn from(policy: ActionPolicy) -> Self {
        Self {
            action: policy.action,
            policy: policy.policy.map(|p| p.to_value()),
        }
    }
}

/// Creator action registration result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatorActionResponse {
    #[schema(value_type = Vec<Object>)]
    pub policies: Vec<CreatorActionPolicy>,
}

/// Documented shape of a creator action registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatorActionBody {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    pub name: String,
    pub creator: String,
    #[schema(value_type = Vec<Object>)]
    pub ancestors: Vec<Value>,
}

/// Documented shape of a batch creator action registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchCreatorActionBody {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub creator: String,
    #[schema(value_type = Vec<Object>)]
    pub instances: Vec<Value>,
}

/// Documented shape of a resource pull callback
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PullResourceBody {
    #[serde(rename = "type")]
    pub resource_type: String,
    /// `list_instance`, `fetch_instance_info` or `list_instance_by_policy`.
    pub method: String,
    #[schema(value_type = Object)]
    pub filter: Value,
    /// `{"limit": n, "offset": m}`, required by the listing methods.
    #[schema(value_type = Object)]
    pub page: Value,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub auth_enabled: bool,
    pub timestamp: DateTime<Utc>,
}
