//! The authorizer: adapts CMDB requests, asks the authority and decides.

use crate::adaptor::convert_resource;
use crate::authority::{
    ActionRef, BatchCreatorActionRequest, CreatorActionPolicy, CreatorActionRequest,
    PolicyAuthority, PolicyByActionsRequest, PolicyRequest, Subject,
};
use crate::compiler::{HostPathResolver, PolicyCompiler, StoreHostPathResolver};
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::fields::{
    resource_id_field, resource_table, stores_business_id, FIELD_HOST_ID, FIELD_OBJ_ID,
};
use crate::generator::gen_iam_resource;
use crate::iam::{ActionId, TypeId};
use crate::meta::Action;
use crate::permission::{IamPermission, PermissionBuilder};
use crate::policy::{evaluate, ActionPolicy, Policy};
use crate::resource::{Resource, ResourceAttribute};
use crate::store::{model_object_id, Document, Filter, ResourceStore, SearchParam};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome for one requested resource, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub resource: ResourceAttribute,
    pub authorized: bool,
}

/// Instances a subject may act on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeList {
    pub ids: Vec<String>,
    /// Every instance of the type is allowed; `ids` is then empty.
    pub is_any: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListAuthorizedResourcesRequest {
    pub resource_type: TypeId,
    pub action: ActionId,
    #[serde(rename = "bk_biz_id", default)]
    pub business_id: i64,
    pub user_name: String,
}

/// An item that still needs a decision from the authority.
struct Pending {
    index: usize,
    action: ActionId,
    resources: Vec<Resource>,
}

pub struct Authorizer {
    config: AuthConfig,
    authority: Arc<dyn PolicyAuthority>,
    store: Arc<dyn ResourceStore>,
    compiler: PolicyCompiler,
    hosts: Arc<dyn HostPathResolver>,
    permissions: PermissionBuilder,
}

impl Authorizer {
    pub fn new(
        config: AuthConfig,
        authority: Arc<dyn PolicyAuthority>,
        store: Arc<dyn ResourceStore>,
    ) -> Self {
        let resolver: Arc<dyn HostPathResolver> =
            Arc::new(StoreHostPathResolver::new(store.clone()));
        let permissions =
            PermissionBuilder::new(store.clone()).with_max_concurrency(config.max_concurrency());
        Self {
            compiler: PolicyCompiler::new(resolver.clone()),
            hosts: resolver,
            permissions,
            config,
            authority,
            store,
        }
    }

    pub fn with_host_resolver(mut self, resolver: Arc<dyn HostPathResolver>) -> Self {
        self.compiler = PolicyCompiler::new(resolver.clone());
        self.hosts = resolver;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn subject(&self, user: &str) -> Result<Subject> {
        if user.trim().is_empty() {
            return Err(AuthzError::Validation("subject can not be empty".to_string()));
        }
        Ok(Subject::user(user))
    }

    /// Splits a batch into decided items and items that need the authority.
    fn prepare(&self, attributes: &[ResourceAttribute]) -> Result<(Vec<Decision>, Vec<Pending>)> {
        let mut decisions: Vec<Decision> = attributes
            .iter()
            .map(|attribute| Decision {
                resource: attribute.clone(),
                authorized: false,
            })
            .collect();

        if !self.config.enabled {
            decisions.iter_mut().for_each(|d| d.authorized = true);
            return Ok((decisions, Vec::new()));
        }

        let mut pending = Vec::new();
        for (index, attribute) in attributes.iter().enumerate() {
            if attribute.action == Action::Skip {
                decisions[index].authorized = true;
                continue;
            }
            let (type_id, action) = convert_resource(attribute)?;
            if action == ActionId::SKIP {
                debug!(resource_type = %attribute.resource_type, "skip authorization");
                decisions[index].authorized = true;
                continue;
            }
            let resources = gen_iam_resource(&action, &type_id, attribute)?;
            pending.push(Pending {
                index,
                action,
                resources,
            });
        }
        Ok((decisions, pending))
    }

    /// Authorizes every item against its own resources.
    pub async fn authorize_batch(
        &self,
        ctx: &RequestContext,
        user: &str,
        attributes: &[ResourceAttribute],
    ) -> Result<Vec<Decision>> {
        let subject = self.subject(user)?;
        let (mut decisions, pending) = self.prepare(attributes)?;
        if pending.is_empty() {
            return Ok(decisions);
        }

        let system = self.config.system_id.clone();
        let outcomes: Vec<(usize, bool)> = stream::iter(pending)
            .map(|item| {
                let index = item.index;
                let request = PolicyRequest {
                    system: system.clone(),
                    subject: subject.clone(),
                    action: ActionRef::new(item.action.as_str()),
                    resources: item.resources,
                };
                async move {
                    let policy = self.authority.query_policy(ctx, &request).await?;
                    let authorized = policy
                        .as_ref()
                        .is_some_and(|policy| evaluate(policy, &request.resources));
                    Ok::<_, AuthzError>((index, authorized))
                }
            })
            .buffered(self.config.max_concurrency())
            .try_collect()
            .await?;

        for (index, authorized) in outcomes {
            if !authorized {
                warn!(
                    rid = %ctx.rid,
                    user,
                    resource_type = %decisions[index].resource.resource_type,
                    action = %decisions[index].resource.action,
                    "not authorized"
                );
            }
            decisions[index].authorized = authorized;
        }
        info!(rid = %ctx.rid, user, count = decisions.len(), "authorized batch");
        Ok(decisions)
    }

    /// Authorizes every item whose action the subject holds on any instance.
    pub async fn authorize_any_batch(
        &self,
        ctx: &RequestContext,
        user: &str,
        attributes: &[ResourceAttribute],
    ) -> Result<Vec<Decision>> {
        let subject = self.subject(user)?;
        let (mut decisions, pending) = self.prepare(attributes)?;
        if pending.is_empty() {
            return Ok(decisions);
        }

        let mut actions: Vec<ActionRef> = Vec::new();
        for item in &pending {
            if !actions.iter().any(|a| a.id == item.action.as_str()) {
                actions.push(ActionRef::new(item.action.as_str()));
            }
        }
        let request = PolicyByActionsRequest {
            system: self.config.system_id.clone(),
            subject,
            actions,
            resources: Vec::new(),
        };
        let granted: HashMap<String, bool> = self
            .authority
            .query_policies_by_actions(ctx, &request)
            .await?
            .into_iter()
            .map(|p| (p.action, p.policy.is_some()))
            .collect();

        for item in pending {
            decisions[item.index].authorized = granted
                .get(item.action.as_str())
                .copied()
                .unwrap_or(false);
        }
        info!(rid = %ctx.rid, user, count = decisions.len(), "authorized any batch");
        Ok(decisions)
    }

    async fn authorized_filter(
        &self,
        ctx: &RequestContext,
        request: &ListAuthorizedResourcesRequest,
    ) -> Result<Option<Filter>> {
        let subject = self.subject(&request.user_name)?;
        if request.action.as_str().is_empty() {
            return Err(AuthzError::Validation("action can not be empty".to_string()));
        }
        if request.resource_type.as_str().is_empty() {
            return Err(AuthzError::Validation("resource type can not be empty".to_string()));
        }
        let policy_request = PolicyRequest {
            system: self.config.system_id.clone(),
            subject,
            action: ActionRef::new(request.action.as_str()),
            resources: Vec::new(),
        };
        let policy = self.authority.query_policy(ctx, &policy_request).await?;
        self.compiler
            .compile(ctx, policy.as_ref(), &request.resource_type)
            .await
    }

    /// Collection and filter selecting what `filter` grants, narrowed to a
    /// business and to the model of dynamic types.
    async fn scoped_query(
        &self,
        ctx: &RequestContext,
        request: &ListAuthorizedResourcesRequest,
        filter: Filter,
    ) -> Result<(&'static str, &'static str, Filter)> {
        let type_id = &request.resource_type;
        let (table, id_field) = match (resource_table(type_id), resource_id_field(type_id)) {
            (Some(table), Some(id_field)) => (table, id_field),
            _ => return Err(AuthzError::ParamInvalid(format!("resource type {}", type_id))),
        };

        let mut conditions = Vec::new();
        if !filter.is_empty() {
            conditions.push(Value::Object(filter));
        }
        if request.business_id > 0 {
            let mut business = Filter::new();
            business.insert("bk_biz_id".to_string(), json!({ "$eq": request.business_id }));
            if *type_id == TypeId::HOST {
                let host_ids = ctx.run(self.hosts.host_ids_by_path(ctx, business)).await?;
                debug!(
                    rid = %ctx.rid,
                    business_id = request.business_id,
                    count = host_ids.len(),
                    "resolved business hosts"
                );
                let mut hosts = Filter::new();
                hosts.insert(FIELD_HOST_ID.to_string(), json!({ "$in": host_ids }));
                conditions.push(Value::Object(hosts));
            } else if stores_business_id(type_id) {
                conditions.push(Value::Object(business));
            }
        }
        if type_id.is_sys_instance() {
            let object_id = model_object_id(self.store.as_ref(), ctx, type_id).await?;
            let mut model = Filter::new();
            model.insert(FIELD_OBJ_ID.to_string(), Value::String(object_id));
            conditions.push(Value::Object(model));
        }

        let mut scoped = Filter::new();
        match conditions.len() {
            0 => {}
            1 => {
                if let Some(Value::Object(only)) = conditions.pop() {
                    scoped = only;
                }
            }
            _ => {
                scoped.insert("$and".to_string(), Value::Array(conditions));
            }
        }
        Ok((table, id_field, scoped))
    }

    /// Ids of the instances `request.user_name` may act on.
    pub async fn list_authorized_resources(
        &self,
        ctx: &RequestContext,
        request: &ListAuthorizedResourcesRequest,
    ) -> Result<AuthorizeList> {
        if !self.config.enabled {
            return Ok(AuthorizeList {
                ids: Vec::new(),
                is_any: true,
            });
        }
        let Some(filter) = self.authorized_filter(ctx, request).await? else {
            return Ok(AuthorizeList::default());
        };
        if filter.is_empty() && request.business_id <= 0 {
            return Ok(AuthorizeList {
                ids: Vec::new(),
                is_any: true,
            });
        }

        let (table, id_field, scoped) = self.scoped_query(ctx, request, filter).await?;
        let param = SearchParam::new(table, scoped).with_fields([id_field]);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        let ids = documents
            .iter()
            .filter_map(|document| id_text(document, id_field))
            .collect();
        Ok(AuthorizeList { ids, is_any: false })
    }

    /// Number of instances `request.user_name` may act on.
    pub async fn count_authorized_resources(
        &self,
        ctx: &RequestContext,
        request: &ListAuthorizedResourcesRequest,
    ) -> Result<u64> {
        let filter = if self.config.enabled {
            match self.authorized_filter(ctx, request).await? {
                Some(filter) => filter,
                None => return Ok(0),
            }
        } else {
            Filter::new()
        };
        let (table, _, scoped) = self.scoped_query(ctx, request, filter).await?;
        let counts = ctx
            .run(self.store.count_by_filter(ctx, table, &[scoped]))
            .await?;
        Ok(counts.first().copied().unwrap_or(0))
    }

    pub async fn get_policy(
        &self,
        ctx: &RequestContext,
        user: &str,
        action: &ActionId,
        resources: Vec<Resource>,
    ) -> Result<Option<Policy>> {
        let request = PolicyRequest {
            system: self.config.system_id.clone(),
            subject: self.subject(user)?,
            action: ActionRef::new(action.as_str()),
            resources,
        };
        self.authority.query_policy(ctx, &request).await
    }

    pub async fn list_policies(
        &self,
        ctx: &RequestContext,
        user: &str,
        actions: &[ActionId],
    ) -> Result<Vec<ActionPolicy>> {
        if actions.is_empty() {
            return Err(AuthzError::Validation("actions can not be empty".to_string()));
        }
        let request = PolicyByActionsRequest {
            system: self.config.system_id.clone(),
            subject: self.subject(user)?,
            actions: actions.iter().map(|a| ActionRef::new(a.as_str())).collect(),
            resources: Vec::new(),
        };
        self.authority.query_policies_by_actions(ctx, &request).await
    }

    pub async fn get_permission_to_apply(
        &self,
        ctx: &RequestContext,
        attributes: &[ResourceAttribute],
    ) -> Result<IamPermission> {
        self.permissions.build(ctx, attributes).await
    }

    pub async fn get_no_auth_skip_url(
        &self,
        ctx: &RequestContext,
        permission: &IamPermission,
    ) -> Result<String> {
        self.authority.get_no_auth_skip_url(ctx, permission).await
    }

    pub async fn get_system_token(&self, ctx: &RequestContext) -> Result<String> {
        self.authority.get_system_token(ctx).await
    }

    /// Grants the creator of a new instance the creator actions on it.
    pub async fn register_resource_creator_action(
        &self,
        ctx: &RequestContext,
        mut request: CreatorActionRequest,
    ) -> Result<Vec<CreatorActionPolicy>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        if request.creator.is_empty() || request.resource_type.is_empty() || request.id.is_empty()
        {
            return Err(AuthzError::Validation(
                "creator, type and id can not be empty".to_string(),
            ));
        }
        if request.system.is_empty() {
            request.system = self.config.system_id.clone();
        }
        self.authority.register_creator_action(ctx, &request).await
    }

    pub async fn batch_register_resource_creator_action(
        &self,
        ctx: &RequestContext,
        mut request: BatchCreatorActionRequest,
    ) -> Result<Vec<CreatorActionPolicy>> {
        if !self.config.enabled || request.instances.is_empty() {
            return Ok(Vec::new());
        }
        if request.creator.is_empty() || request.resource_type.is_empty() {
            return Err(AuthzError::Validation(
                "creator and type can not be empty".to_string(),
            ));
        }
        if request.system.is_empty() {
            request.system = self.config.system_id.clone();
        }
        self.authority
            .batch_register_creator_action(ctx, &request)
            .await
    }
}

fn id_text(document: &Document, field: &str) -> Option<String> {
    match document.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ResourceType;
    use crate::policy::{Field, Operator};
    use crate::resource::{Layer, IAM_PATH_KEY};
    use crate::testing::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Authority answering from a fixed action -> policy table.
    #[derive(Default)]
    struct FixedAuthority {
        policies: HashMap<String, Policy>,
        queries: Mutex<Vec<PolicyRequest>>,
        registered: Mutex<Vec<CreatorActionRequest>>,
    }

    impl FixedAuthority {
        fn with(mut self, action: ActionId, policy: Policy) -> Self {
            self.policies.insert(action.to_string(), policy);
            self
        }
    }

    #[async_trait]
    impl PolicyAuthority for FixedAuthority {
        async fn query_policy(
            &self,
            _ctx: &RequestContext,
            request: &PolicyRequest,
        ) -> Result<Option<Policy>> {
            self.queries.lock().unwrap().push(request.clone());
            Ok(self.policies.get(&request.action.id).cloned())
        }

        async fn query_policies_by_actions(
            &self,
            _ctx: &RequestContext,
            request: &PolicyByActionsRequest,
        ) -> Result<Vec<ActionPolicy>> {
            Ok(request
                .actions
                .iter()
                .map(|action| ActionPolicy {
                    action: action.id.clone(),
                    policy: self.policies.get(&action.id).cloned(),
                })
                .collect())
        }

        async fn get_system_token(&self, _ctx: &RequestContext) -> Result<String> {
            Ok("token".to_string())
        }

        async fn get_no_auth_skip_url(
            &self,
            _ctx: &RequestContext,
            permission: &IamPermission,
        ) -> Result<String> {
            Ok(format!("https://apply/{}", permission.actions.len()))
        }

        async fn register_creator_action(
            &self,
            _ctx: &RequestContext,
            request: &CreatorActionRequest,
        ) -> Result<Vec<CreatorActionPolicy>> {
            self.registered.lock().unwrap().push(request.clone());
            Ok(vec![CreatorActionPolicy {
                action: ActionRef::new("edit_biz_dynamic_query"),
                policy_id: 1,
            }])
        }

        async fn batch_register_creator_action(
            &self,
            _ctx: &RequestContext,
            request: &BatchCreatorActionRequest,
        ) -> Result<Vec<CreatorActionPolicy>> {
            Ok(request
                .instances
                .iter()
                .enumerate()
                .map(|(i, _)| CreatorActionPolicy {
                    action: ActionRef::new("edit_biz_set_template"),
                    policy_id: i as i64,
                })
                .collect())
        }
    }

    fn leaf(type_id: TypeId, attribute: &str, op: Operator, value: Value) -> Policy {
        Policy::leaf(Field::new(type_id, attribute), op, value)
    }

    fn authorizer(authority: FixedAuthority, store: Arc<MemoryStore>) -> (Authorizer, Arc<FixedAuthority>) {
        let authority = Arc::new(authority);
        let authorizer = Authorizer::new(AuthConfig::default(), authority.clone(), store);
        (authorizer, authority)
    }

    fn ctx() -> RequestContext {
        RequestContext::new("test")
    }

    #[tokio::test]
    async fn test_batch_decisions_keep_request_order() {
        let authority = FixedAuthority::default().with(
            ActionId::EDIT_BUSINESS,
            leaf(TypeId::BUSINESS, "id", Operator::In, json!(["1", "3"])),
        );
        let (authorizer, _) = authorizer(authority, Arc::new(MemoryStore::new()));

        let attributes: Vec<ResourceAttribute> = [1, 2, 3]
            .into_iter()
            .map(|id| ResourceAttribute::new(ResourceType::Business, Action::Update).with_instance(id))
            .collect();
        let decisions = authorizer
            .authorize_batch(&ctx(), "admin", &attributes)
            .await
            .unwrap();

        let outcome: Vec<bool> = decisions.iter().map(|d| d.authorized).collect();
        assert_eq!(outcome, vec![true, false, true]);
        assert_eq!(decisions[1].resource.instance_id, 2);
    }

    #[tokio::test]
    async fn test_skip_items_need_no_authority() {
        let (authorizer, authority) = authorizer(FixedAuthority::default(), Arc::new(MemoryStore::new()));
        let attributes = vec![
            ResourceAttribute::new(ResourceType::Business, Action::Skip),
            ResourceAttribute::new(ResourceType::HostInstance, Action::Find),
        ];
        let decisions = authorizer
            .authorize_batch(&ctx(), "admin", &attributes)
            .await
            .unwrap();
        assert!(decisions.iter().all(|d| d.authorized));
        assert!(authority.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_auth_allows_everything() {
        let authorizer = Authorizer::new(
            AuthConfig::disabled(),
            Arc::new(FixedAuthority::default()),
            Arc::new(MemoryStore::new()),
        );
        let attributes =
            vec![ResourceAttribute::new(ResourceType::Business, Action::Delete).with_instance(9)];
        let decisions = authorizer
            .authorize_batch(&ctx(), "admin", &attributes)
            .await
            .unwrap();
        assert!(decisions[0].authorized);

        let list = authorizer
            .list_authorized_resources(
                &ctx(),
                &ListAuthorizedResourcesRequest {
                    resource_type: TypeId::HOST,
                    action: ActionId::EDIT_BUSINESS_HOST,
                    business_id: 0,
                    user_name: "admin".into(),
                },
            )
            .await
            .unwrap();
        assert!(list.is_any);
    }

    #[tokio::test]
    async fn test_empty_subject_is_rejected() {
        let (authorizer, _) = authorizer(FixedAuthority::default(), Arc::new(MemoryStore::new()));
        let attributes = vec![ResourceAttribute::new(ResourceType::Business, Action::Update)];
        assert!(matches!(
            authorizer.authorize_batch(&ctx(), " ", &attributes).await,
            Err(AuthzError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_mapping_errors_are_not_grants() {
        let (authorizer, _) = authorizer(FixedAuthority::default(), Arc::new(MemoryStore::new()));
        let attributes = vec![ResourceAttribute::new(ResourceType::HostInstance, Action::MoveResPoolHostToBizIdleModule)];
        assert!(matches!(
            authorizer.authorize_batch(&ctx(), "admin", &attributes).await,
            Err(AuthzError::NotEnoughLayer(_))
        ));
    }

    #[tokio::test]
    async fn test_host_path_policy_is_evaluated_locally() {
        let authority = FixedAuthority::default().with(
            ActionId::EDIT_BUSINESS_HOST,
            leaf(TypeId::HOST, IAM_PATH_KEY, Operator::StartsWith, json!("/biz,3/")),
        );
        let (authorizer, _) = authorizer(authority, Arc::new(MemoryStore::new()));

        let in_biz = ResourceAttribute::new(ResourceType::HostInstance, Action::Update)
            .with_business(3)
            .with_instance(7)
            .with_layers(vec![Layer::new(ResourceType::Business, 3)]);
        let other_biz = ResourceAttribute::new(ResourceType::HostInstance, Action::Update)
            .with_business(4)
            .with_instance(8)
            .with_layers(vec![Layer::new(ResourceType::Business, 4)]);
        let decisions = authorizer
            .authorize_batch(&ctx(), "admin", &[in_biz, other_biz])
            .await
            .unwrap();
        assert!(decisions[0].authorized);
        assert!(!decisions[1].authorized);
    }

    #[tokio::test]
    async fn test_any_batch_needs_only_some_policy() {
        let authority = FixedAuthority::default().with(
            ActionId::EDIT_BUSINESS,
            leaf(TypeId::BUSINESS, "id", Operator::Eq, json!("100")),
        );
        let (authorizer, _) = authorizer(authority, Arc::new(MemoryStore::new()));
        let attributes = vec![
            ResourceAttribute::new(ResourceType::Business, Action::Update).with_instance(1),
            ResourceAttribute::new(ResourceType::Business, Action::Archive).with_instance(1),
        ];
        let decisions = authorizer
            .authorize_any_batch(&ctx(), "admin", &attributes)
            .await
            .unwrap();
        assert!(decisions[0].authorized);
        assert!(!decisions[1].authorized);
    }

    #[tokio::test]
    async fn test_list_and_count_authorized_resources() {
        let store = Arc::new(MemoryStore::new());
        for id in 1..=3 {
            store.insert(
                "cc_HostBase",
                json!({"bk_host_id": id, "bk_host_innerip": format!("10.0.0.{}", id)}),
            );
        }
        for (host, module, biz) in [(1, 10, 3), (2, 10, 3), (3, 20, 4)] {
            store.insert(
                "cc_ModuleHostConfig",
                json!({"bk_host_id": host, "bk_module_id": module, "bk_biz_id": biz}),
            );
        }
        let authority = FixedAuthority::default().with(
            ActionId::EDIT_BUSINESS_HOST,
            leaf(TypeId::HOST, "id", Operator::In, json!([1, 3])),
        );
        let (authorizer, _) = authorizer(authority, store);

        let request = ListAuthorizedResourcesRequest {
            resource_type: TypeId::HOST,
            action: ActionId::EDIT_BUSINESS_HOST,
            business_id: 0,
            user_name: "admin".into(),
        };
        let list = authorizer
            .list_authorized_resources(&ctx(), &request)
            .await
            .unwrap();
        assert!(!list.is_any);
        assert_eq!(list.ids, vec!["1".to_string(), "3".to_string()]);

        let in_biz = ListAuthorizedResourcesRequest {
            business_id: 3,
            ..request.clone()
        };
        let list = authorizer
            .list_authorized_resources(&ctx(), &in_biz)
            .await
            .unwrap();
        assert!(!list.is_any);
        assert_eq!(list.ids, vec!["1".to_string()]);
        let count = authorizer
            .count_authorized_resources(&ctx(), &in_biz)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_list_without_policy_is_empty() {
        let (authorizer, _) = authorizer(FixedAuthority::default(), Arc::new(MemoryStore::new()));
        let request = ListAuthorizedResourcesRequest {
            resource_type: TypeId::BUSINESS,
            action: ActionId::EDIT_BUSINESS,
            business_id: 0,
            user_name: "admin".into(),
        };
        let list = authorizer
            .list_authorized_resources(&ctx(), &request)
            .await
            .unwrap();
        assert_eq!(list, AuthorizeList::default());
        assert_eq!(
            authorizer
                .count_authorized_resources(&ctx(), &request)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_any_policy_lists_everything() {
        let authority = FixedAuthority::default().with(ActionId::EDIT_BUSINESS, Policy::Any);
        let (authorizer, _) = authorizer(authority, Arc::new(MemoryStore::new()));
        let request = ListAuthorizedResourcesRequest {
            resource_type: TypeId::BUSINESS,
            action: ActionId::EDIT_BUSINESS,
            business_id: 0,
            user_name: "admin".into(),
        };
        let list = authorizer
            .list_authorized_resources(&ctx(), &request)
            .await
            .unwrap();
        assert!(list.is_any);
    }

    #[tokio::test]
    async fn test_creator_action_fills_system() {
        let (authorizer, authority) = authorizer(FixedAuthority::default(), Arc::new(MemoryStore::new()));
        let policies = authorizer
            .register_resource_creator_action(
                &ctx(),
                CreatorActionRequest {
                    system: String::new(),
                    resource_type: "biz_custom_query".into(),
                    id: "abc".into(),
                    name: "web hosts".into(),
                    creator: "admin".into(),
                    ancestors: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(authority.registered.lock().unwrap()[0].system, "bk_cmdb");

        let empty = authorizer
            .batch_register_resource_creator_action(
                &ctx(),
                BatchCreatorActionRequest {
                    system: String::new(),
                    resource_type: "biz_set_template".into(),
                    creator: "admin".into(),
                    instances: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_permission_and_skip_url() {
        let (authorizer, _) = authorizer(FixedAuthority::default(), Arc::new(MemoryStore::new()));
        let permission = authorizer
            .get_permission_to_apply(
                &ctx(),
                &[ResourceAttribute::new(ResourceType::Business, Action::Create)],
            )
            .await
            .unwrap();
        let url = authorizer
            .get_no_auth_skip_url(&ctx(), &permission)
            .await
            .unwrap();
        assert_eq!(url, "https://apply/1");
    }
}
