//! Model registration endpoints of the policy authority.

use super::{
    ActionGroup, CommonAction, InstanceSelection, RegisteredSystemInfo, ResourceAction,
    ResourceCreatorActions, ResourceType, SysConfig, System, SystemQueryField,
};
use crate::authority::HttpPolicyAuthority;
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::iam::{ActionId, TypeId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// Code the authority answers with when the system is not registered.
pub const CODE_SYSTEM_NOT_FOUND: i64 = 1901404;

#[async_trait]
pub trait IamModelClient: Send + Sync {
    async fn register_system(&self, ctx: &RequestContext, system: &System) -> Result<()>;

    /// `None` when the system is not registered yet.
    async fn get_system_info(
        &self,
        ctx: &RequestContext,
        fields: &[SystemQueryField],
    ) -> Result<Option<RegisteredSystemInfo>>;

    async fn update_system_config(&self, ctx: &RequestContext, config: &SysConfig) -> Result<()>;

    async fn register_resource_types(
        &self,
        ctx: &RequestContext,
        types: &[ResourceType],
    ) -> Result<()>;

    async fn update_resource_type(&self, ctx: &RequestContext, resource: &ResourceType)
        -> Result<()>;

    async fn delete_resource_types(&self, ctx: &RequestContext, ids: &[TypeId]) -> Result<()>;

    async fn register_instance_selections(
        &self,
        ctx: &RequestContext,
        selections: &[InstanceSelection],
    ) -> Result<()>;

    async fn update_instance_selection(
        &self,
        ctx: &RequestContext,
        selection: &InstanceSelection,
    ) -> Result<()>;

    async fn delete_instance_selections(&self, ctx: &RequestContext, ids: &[String])
        -> Result<()>;

    async fn register_actions(&self, ctx: &RequestContext, actions: &[ResourceAction])
        -> Result<()>;

    async fn update_action(&self, ctx: &RequestContext, action: &ResourceAction) -> Result<()>;

    async fn delete_actions(&self, ctx: &RequestContext, ids: &[ActionId]) -> Result<()>;

    /// Drops every policy granted on an action; required before deleting it.
    async fn delete_action_policies(&self, ctx: &RequestContext, id: &ActionId) -> Result<()>;

    async fn register_action_groups(&self, ctx: &RequestContext, groups: &[ActionGroup])
        -> Result<()>;

    async fn update_action_groups(&self, ctx: &RequestContext, groups: &[ActionGroup])
        -> Result<()>;

    async fn register_resource_creator_actions(
        &self,
        ctx: &RequestContext,
        actions: &ResourceCreatorActions,
    ) -> Result<()>;

    async fn update_resource_creator_actions(
        &self,
        ctx: &RequestContext,
        actions: &ResourceCreatorActions,
    ) -> Result<()>;

    async fn register_common_actions(&self, ctx: &RequestContext, actions: &[CommonAction])
        -> Result<()>;

    async fn update_common_actions(&self, ctx: &RequestContext, actions: &[CommonAction])
        -> Result<()>;
}

fn id_list<S: Serialize>(ids: &[S]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
}

impl HttpPolicyAuthority {
    fn model_path(&self, suffix: &str) -> String {
        format!("/api/v1/model/systems/{}{}", self.system_id(), suffix)
    }

    async fn model_call<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        method: reqwest::Method,
        path: String,
        body: &B,
    ) -> Result<()> {
        debug!(rid = %ctx.rid, path = %path, %method, "calling model registration");
        let builder = self
            .request(ctx, method, format!("{}{}", self.iam_address(), path))
            .json(body);
        let _: Option<Value> = self.send(ctx, &path, builder).await?;
        Ok(())
    }
}

#[async_trait]
impl IamModelClient for HttpPolicyAuthority {
    async fn register_system(&self, ctx: &RequestContext, system: &System) -> Result<()> {
        let path = "/api/v1/model/systems".to_string();
        self.model_call(ctx, reqwest::Method::POST, path, system).await
    }

    async fn get_system_info(
        &self,
        ctx: &RequestContext,
        fields: &[SystemQueryField],
    ) -> Result<Option<RegisteredSystemInfo>> {
        let fields: Vec<&str> = fields.iter().map(SystemQueryField::as_str).collect();
        let path = self.model_path("/query");
        let url = format!("{}{}?fields={}", self.iam_address(), path, fields.join(","));
        let builder = self.request(ctx, reqwest::Method::GET, url);
        let envelope = self
            .send_envelope::<RegisteredSystemInfo>(ctx, &path, builder)
            .await?;
        match envelope.code {
            0 => Ok(Some(envelope.data.unwrap_or_default())),
            CODE_SYSTEM_NOT_FOUND => Ok(None),
            code => Err(AuthzError::remote(
                ctx.rid.clone(),
                format!("{} failed, code: {}, message: {}", path, code, envelope.message),
            )),
        }
    }

    async fn update_system_config(&self, ctx: &RequestContext, config: &SysConfig) -> Result<()> {
        let body = json!({ "provider_config": config });
        self.model_call(ctx, reqwest::Method::PUT, self.model_path(""), &body)
            .await
    }

    async fn register_resource_types(
        &self,
        ctx: &RequestContext,
        types: &[ResourceType],
    ) -> Result<()> {
        let path = self.model_path("/resource-types");
        self.model_call(ctx, reqwest::Method::POST, path, types).await
    }

    async fn update_resource_type(
        &self,
        ctx: &RequestContext,
        resource: &ResourceType,
    ) -> Result<()> {
        let path = self.model_path(&format!("/resource-types/{}", resource.id));
        self.model_call(ctx, reqwest::Method::PUT, path, resource).await
    }

    async fn delete_resource_types(&self, ctx: &RequestContext, ids: &[TypeId]) -> Result<()> {
        let path = self.model_path("/resource-types");
        self.model_call(ctx, reqwest::Method::DELETE, path, &id_list(ids))
            .await
    }

    async fn register_instance_selections(
        &self,
        ctx: &RequestContext,
        selections: &[InstanceSelection],
    ) -> Result<()> {
        let path = self.model_path("/instance-selections");
        self.model_call(ctx, reqwest::Method::POST, path, selections)
            .await
    }

    async fn update_instance_selection(
        &self,
        ctx: &RequestContext,
        selection: &InstanceSelection,
    ) -> Result<()> {
        let path = self.model_path(&format!("/instance-selections/{}", selection.id));
        self.model_call(ctx, reqwest::Method::PUT, path, selection)
            .await
    }

    async fn delete_instance_selections(
        &self,
        ctx: &RequestContext,
        ids: &[String],
    ) -> Result<()> {
        let path = self.model_path("/instance-selections");
        self.model_call(ctx, reqwest::Method::DELETE, path, &id_list(ids))
            .await
    }

    async fn register_actions(
        &self,
        ctx: &RequestContext,
        actions: &[ResourceAction],
    ) -> Result<()> {
        let path = self.model_path("/actions");
        self.model_call(ctx, reqwest::Method::POST, path, actions).await
    }

    async fn update_action(&self, ctx: &RequestContext, action: &ResourceAction) -> Result<()> {
        let path = self.model_path(&format!("/actions/{}", action.id));
        self.model_call(ctx, reqwest::Method::PUT, path, action).await
    }

    async fn delete_actions(&self, ctx: &RequestContext, ids: &[ActionId]) -> Result<()> {
        let path = self.model_path("/actions");
        self.model_call(ctx, reqwest::Method::DELETE, path, &id_list(ids))
            .await
    }

    async fn delete_action_policies(&self, ctx: &RequestContext, id: &ActionId) -> Result<()> {
        let path = self.model_path(&format!("/actions/{}/policies", id));
        self.model_call(ctx, reqwest::Method::DELETE, path, &json!({}))
            .await
    }

    async fn register_action_groups(
        &self,
        ctx: &RequestContext,
        groups: &[ActionGroup],
    ) -> Result<()> {
        let path = self.model_path("/configs/action_groups");
        self.model_call(ctx, reqwest::Method::POST, path, groups).await
    }

    async fn update_action_groups(
        &self,
        ctx: &RequestContext,
        groups: &[ActionGroup],
    ) -> Result<()> {
        let path = self.model_path("/configs/action_groups");
        self.model_call(ctx, reqwest::Method::PUT, path, groups).await
    }

    async fn register_resource_creator_actions(
        &self,
        ctx: &RequestContext,
        actions: &ResourceCreatorActions,
    ) -> Result<()> {
        let path = self.model_path("/configs/resource_creator_actions");
        self.model_call(ctx, reqwest::Method::POST, path, actions).await
    }

    async fn update_resource_creator_actions(
        &self,
        ctx: &RequestContext,
        actions: &ResourceCreatorActions,
    ) -> Result<()> {
        let path = self.model_path("/configs/resource_creator_actions");
        self.model_call(ctx, reqwest::Method::PUT, path, actions).await
    }

    async fn register_common_actions(
        &self,
        ctx: &RequestContext,
        actions: &[CommonAction],
    ) -> Result<()> {
        let path = self.model_path("/configs/common_actions");
        self.model_call(ctx, reqwest::Method::POST, path, actions).await
    }

    async fn update_common_actions(
        &self,
        ctx: &RequestContext,
        actions: &[CommonAction],
    ) -> Result<()> {
        let path = self.model_path("/configs/common_actions");
        self.model_call(ctx, reqwest::Method::PUT, path, actions).await
    }
}
