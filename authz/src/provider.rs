//! Resource pull callbacks.
//!
//! While a user picks instances for a permission, the authority calls back
//! into CMDB to list instances of a type, describe a set of instances or list
//! the instances a policy expression covers. [`ResourceProvider::pull_methods`]
//! decides per type which listing applies and which extra condition scopes
//! it; [`ResourceProvider::pull`] serves one callback request.

use crate::compiler::{HostPathResolver, PolicyCompiler, StoreHostPathResolver};
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::fields::{
    is_resource_id_string_type, resource_id_field, resource_name_field, resource_table,
    FIELD_BIZ_ID, FIELD_DEFAULT, FIELD_HOST_ID, FIELD_MODULE_ID, FIELD_OBJ_ID, FIELD_OBJ_NAME,
    FIELD_SET_ID, POLICY_ID_ATTRIBUTE, POLICY_NAME_ATTRIBUTE, TABLE_BUSINESS,
    TABLE_MODULE, TABLE_MODULE_HOST_CONFIG, TABLE_OBJECT_ASSOCIATION, TABLE_OBJECT_DES, TABLE_SET,
};
use crate::iam::TypeId;
use crate::model::ResourceChain;
use crate::policy::Policy;
use crate::resource::{format_path, IAM_PATH_KEY};
use crate::store::{Document, Filter, ResourceStore, SearchParam};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Largest page a callback may ask for.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Workload kinds offered as `kube_workload_event` instances.
pub const KUBE_WORKLOAD_KINDS: [&str; 3] = ["deployment", "statefulSet", "daemonSet"];

const MAINLINE_ASSOCIATION: &str = "bk_mainline";
const INNER_OBJECTS: [&str; 6] = ["biz", "set", "module", "host", "process", "plat"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { limit, offset }
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(AuthzError::Validation("page.limit must be set".to_string()));
        }
        if self.limit > MAX_PAGE_SIZE {
            return Err(AuthzError::Validation(format!(
                "page.limit {} exceeds the maximum {}",
                self.limit, MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentFilter {
    #[serde(rename = "type")]
    pub resource_type: TypeId,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInstanceFilter {
    #[serde(default)]
    pub parent: Option<ParentFilter>,
    /// Keywords per type, matched against id and display name.
    #[serde(default)]
    pub search: BTreeMap<TypeId, Vec<String>>,
    /// Ancestors to report in each result's `path`.
    #[serde(default)]
    pub resource_type_chain: Vec<ResourceChain>,
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePath {
    #[serde(rename = "type")]
    pub resource_type: TypeId,
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceResource {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<InstancePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInstanceResult {
    pub count: u64,
    pub results: Vec<InstanceResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchInstanceInfoFilter {
    pub ids: Vec<String>,
    /// `id` and `display_name` name the type's id and name fields.
    #[serde(default)]
    pub attrs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListInstanceByPolicyFilter {
    #[serde(default)]
    pub expression: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullMethod {
    ListInstance,
    FetchInstanceInfo,
    ListInstanceByPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResourceRequest {
    #[serde(rename = "type")]
    pub resource_type: TypeId,
    pub method: PullMethod,
    #[serde(default)]
    pub filter: Value,
    #[serde(default)]
    pub page: Page,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PullResult {
    Instances(ListInstanceResult),
    Info(Vec<Document>),
}

/// How the instances of one type are pulled.
#[derive(Debug, Clone, PartialEq)]
pub enum PullMethods {
    /// The type has no instances of its own.
    Unrelated,
    /// Flat listing, narrowed by `extra` when set.
    System { extra: Option<Filter> },
    /// Instances that live inside a business.
    Business,
    Host,
    /// Instances of the model behind a `sys_instance_<id>` type.
    ModelInstance {
        model_id: i64,
        object_id: String,
        object_name: String,
    },
    KubeWorkload,
}

type AncestorNames = HashMap<TypeId, HashMap<String, String>>;

pub struct ResourceProvider {
    store: Arc<dyn ResourceStore>,
    hosts: Arc<dyn HostPathResolver>,
    compiler: PolicyCompiler,
}

impl ResourceProvider {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        let hosts: Arc<dyn HostPathResolver> = Arc::new(StoreHostPathResolver::new(store.clone()));
        let compiler = PolicyCompiler::new(hosts.clone());
        Self {
            store,
            hosts,
            compiler,
        }
    }

    pub async fn pull(&self, ctx: &RequestContext, request: PullResourceRequest) -> Result<PullResult> {
        debug!(
            rid = %ctx.rid,
            resource_type = %request.resource_type,
            method = ?request.method,
            "pull resource"
        );
        let methods = self.pull_methods(ctx, &request.resource_type).await?;
        let type_id = &request.resource_type;
        match request.method {
            PullMethod::ListInstance => {
                let filter = decode_filter::<ListInstanceFilter>(request.filter)?;
                self.list_instance(ctx, type_id, &methods, filter, request.page)
                    .await
                    .map(PullResult::Instances)
            }
            PullMethod::FetchInstanceInfo => {
                let filter = decode_filter::<FetchInstanceInfoFilter>(request.filter)?
                    .ok_or_else(|| AuthzError::ParamInvalid("filter".to_string()))?;
                self.fetch_instance_info(ctx, type_id, &methods, filter)
                    .await
                    .map(PullResult::Info)
            }
            PullMethod::ListInstanceByPolicy => {
                let filter = decode_filter::<ListInstanceByPolicyFilter>(request.filter)?
                    .unwrap_or_default();
                self.list_instance_by_policy(ctx, type_id, &methods, filter, request.page)
                    .await
                    .map(PullResult::Instances)
            }
        }
    }

    pub async fn pull_methods(&self, ctx: &RequestContext, type_id: &TypeId) -> Result<PullMethods> {
        let methods = match type_id.as_str() {
            "host" => PullMethods::Host,
            "biz" | "biz_for_host_trans" => system(field_filter(FIELD_DEFAULT, json!({ "$ne": 1 }))),
            "sys_cloud_area" => system(field_filter("bk_cloud_id", json!({ "$ne": 0 }))),
            "biz_custom_query" | "biz_process_service_template" | "biz_set_template" => {
                PullMethods::Business
            }
            "sys_model_group" | "sys_cloud_account" | "sys_cloud_resource_task"
            | "inst_asst_event" | "business_set" => PullMethods::System { extra: None },
            "sys_model" | "sys_instance_model" | "sys_model_event" | "mainline_model_event" => {
                system(self.model_condition(ctx, type_id).await?)
            }
            "sys_association_type" => system(field_filter("ispre", json!({ "$ne": true }))),
            "sys_resource_pool_directory" | "sys_host_rsc_pool_directory" => {
                let business = self.resource_pool_business(ctx).await?;
                system(field_filter(FIELD_BIZ_ID, json!({ "$eq": business })))
            }
            "sys_operation_statistic" | "sys_audit_log" | "biz_custom_field" | "biz_host_apply"
            | "biz_topology" | "sys_event_watch" | "biz_process_service_category"
            | "biz_process_service_instance" => PullMethods::Unrelated,
            "kube_workload_event" => PullMethods::KubeWorkload,
            _ if type_id.is_sys_instance() => self.model_of(ctx, type_id).await?,
            _ => {
                return Err(AuthzError::Unsupported(format!(
                    "resource type {} has no pull methods",
                    type_id
                )))
            }
        };
        Ok(methods)
    }

    pub async fn list_instance(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        methods: &PullMethods,
        filter: Option<ListInstanceFilter>,
        page: Page,
    ) -> Result<ListInstanceResult> {
        page.validate()?;
        match methods {
            PullMethods::Unrelated => Ok(ListInstanceResult::default()),
            PullMethods::System { extra } => {
                self.list_system_instance(ctx, type_id, filter, page, extra.as_ref())
                    .await
            }
            PullMethods::Business => self.list_business_instance(ctx, type_id, filter, page).await,
            PullMethods::Host => self.list_host_instance(ctx, filter, page).await,
            PullMethods::ModelInstance {
                model_id,
                object_id,
                object_name,
            } => {
                let model = ModelRef {
                    id: *model_id,
                    object_id: object_id.as_str(),
                    object_name: object_name.as_str(),
                };
                self.list_model_instance(ctx, type_id, model, filter, page)
                    .await
            }
            PullMethods::KubeWorkload => Ok(list_kube_workload_kinds(filter.as_ref(), page)),
        }
    }

    /// Requested attributes of the instances in `filter.ids`. Each result
    /// carries `id`; unknown ids are left out.
    pub async fn fetch_instance_info(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        methods: &PullMethods,
        filter: FetchInstanceInfoFilter,
    ) -> Result<Vec<Document>> {
        let extra = match methods {
            PullMethods::Unrelated => return Ok(Vec::new()),
            PullMethods::KubeWorkload => return Ok(fetch_kube_workload_kinds(&filter)),
            PullMethods::System { extra } => extra.clone(),
            PullMethods::ModelInstance { object_id, .. } => {
                Some(field_filter(FIELD_OBJ_ID, json!({ "$eq": object_id })))
            }
            PullMethods::Business | PullMethods::Host => None,
        };
        let (table, id_field, name_field) = type_fields(type_id)?;
        let ids: Vec<Value> = filter
            .ids
            .iter()
            .filter_map(|id| typed_id(type_id, id))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conditions: Vec<Filter> = extra.into_iter().collect();
        conditions.push(field_filter(id_field, json!({ "$in": ids })));
        let wants_path = *type_id == TypeId::HOST && filter.attrs.iter().any(|a| a == IAM_PATH_KEY);
        let mut fields = vec![id_field.to_string()];
        for attr in &filter.attrs {
            let physical = match attr.as_str() {
                POLICY_ID_ATTRIBUTE => id_field,
                POLICY_NAME_ATTRIBUTE => name_field,
                IAM_PATH_KEY if wants_path => continue,
                other => other,
            };
            if !fields.iter().any(|field| field == physical) {
                fields.push(physical.to_string());
            }
        }

        let param = SearchParam::new(table, and_filters(conditions)).with_fields(fields);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        let paths = if wants_path {
            self.host_paths(ctx, &documents).await?
        } else {
            HashMap::new()
        };

        let mut infos = Vec::with_capacity(documents.len());
        for document in &documents {
            let id = document.get(id_field).map(value_text).unwrap_or_default();
            let mut info = Document::new();
            for attr in &filter.attrs {
                let value = match attr.as_str() {
                    POLICY_ID_ATTRIBUTE => continue,
                    POLICY_NAME_ATTRIBUTE => document.get(name_field).cloned(),
                    IAM_PATH_KEY if wants_path => paths.get(&id).map(|paths| json!(paths)),
                    other => document.get(other).cloned(),
                };
                if let Some(value) = value {
                    info.insert(attr.clone(), value);
                }
            }
            info.insert(POLICY_ID_ATTRIBUTE.to_string(), Value::String(id));
            infos.push(info);
        }
        Ok(infos)
    }

    /// Instances of `type_id` covered by a policy expression.
    pub async fn list_instance_by_policy(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        methods: &PullMethods,
        filter: ListInstanceByPolicyFilter,
        page: Page,
    ) -> Result<ListInstanceResult> {
        page.validate()?;
        let extra = match methods {
            PullMethods::Unrelated => return Ok(ListInstanceResult::default()),
            PullMethods::KubeWorkload => {
                return Err(AuthzError::Unsupported(format!(
                    "{} does not support list_instance_by_policy",
                    type_id
                )))
            }
            PullMethods::System { extra } => extra.clone(),
            PullMethods::ModelInstance { object_id, .. } => {
                Some(field_filter(FIELD_OBJ_ID, json!({ "$eq": object_id })))
            }
            PullMethods::Business | PullMethods::Host => None,
        };
        let policy = Policy::from_value(filter.expression)?;
        let Some(compiled) = self.compiler.compile(ctx, policy.as_ref(), type_id).await? else {
            return Ok(ListInstanceResult::default());
        };

        let (_, id_field, name_field) = type_fields(type_id)?;
        let mut conditions: Vec<Filter> = extra.into_iter().collect();
        conditions.push(compiled);
        let (count, documents) = self.search_page(ctx, type_id, conditions, page, &[]).await?;
        Ok(ListInstanceResult {
            count,
            results: to_instances(&documents, id_field, name_field),
        })
    }

    async fn list_system_instance(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        filter: Option<ListInstanceFilter>,
        page: Page,
        extra: Option<&Filter>,
    ) -> Result<ListInstanceResult> {
        let (_, id_field, name_field) = type_fields(type_id)?;
        let mut conditions: Vec<Filter> = extra.into_iter().cloned().collect();
        if let Some(filter) = &filter {
            if filter.parent.is_some() || !filter.resource_type_chain.is_empty() {
                return Ok(ListInstanceResult::default());
            }
            if filter.search.keys().any(|search_type| search_type != type_id) {
                return Ok(ListInstanceResult::default());
            }
            let keywords = own_keywords(filter, type_id);
            if !keywords.is_empty() {
                conditions.push(keyword_filter(id_field, name_field, &keywords));
            }
        }

        let (count, documents) = self.search_page(ctx, type_id, conditions, page, &[]).await?;
        Ok(ListInstanceResult {
            count,
            results: to_instances(&documents, id_field, name_field),
        })
    }

    async fn list_business_instance(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        filter: Option<ListInstanceFilter>,
        page: Page,
    ) -> Result<ListInstanceResult> {
        let (_, id_field, name_field) = type_fields(type_id)?;
        let filter = filter.unwrap_or_default();
        let mut conditions = Vec::new();
        let mut names = AncestorNames::new();

        if let Some(parent) = &filter.parent {
            let parent_field = resource_id_field(&parent.resource_type)
                .ok_or_else(|| AuthzError::ParamInvalid("filter.parent.type".to_string()))?;
            let Some(parent_id) = typed_id(&parent.resource_type, &parent.id) else {
                return Ok(ListInstanceResult::default());
            };
            conditions.push(field_filter(parent_field, parent_id));
        }

        for (search_type, keywords) in &filter.search {
            if search_type == type_id {
                continue;
            }
            let Some((table, ancestor_id, ancestor_name)) = ancestor_fields(search_type) else {
                return Ok(ListInstanceResult::default());
            };
            let ancestors = self
                .search_ancestors(ctx, table, ancestor_id, ancestor_name, keywords)
                .await?;
            let ids = record_ancestors(&mut names, search_type, &ancestors, ancestor_id, ancestor_name);
            if ids.is_empty() {
                return Ok(ListInstanceResult::default());
            }
            conditions.push(field_filter(ancestor_id, json!({ "$in": ids })));
        }

        let keywords = own_keywords(&filter, type_id);
        if !keywords.is_empty() {
            conditions.push(keyword_filter(id_field, name_field, &keywords));
        }

        let chain = filter.resource_type_chain;
        let mut chain_fields = Vec::with_capacity(chain.len());
        for hop in &chain {
            let field = resource_id_field(&hop.id).ok_or_else(|| {
                AuthzError::ParamInvalid(format!("resource_type_chain {}", hop.id))
            })?;
            chain_fields.push(field);
        }

        let (count, documents) = self
            .search_page(ctx, type_id, conditions, page, &chain_fields)
            .await?;
        let mut results = to_instances(&documents, id_field, name_field);
        if !chain.is_empty() {
            for (hop, field) in chain.iter().zip(&chain_fields) {
                let ids = documents.iter().filter_map(|d| d.get(*field).cloned()).collect();
                let known = names.entry(hop.id.clone()).or_default();
                self.fill_names(ctx, &hop.id, ids, known).await?;
            }
            for (instance, document) in results.iter_mut().zip(&documents) {
                for (hop, field) in chain.iter().zip(&chain_fields) {
                    let id = document.get(*field).map(value_text).unwrap_or_default();
                    instance.path.push(ancestor_path(&names, &hop.id, id));
                }
            }
        }
        Ok(ListInstanceResult { count, results })
    }

    async fn list_host_instance(
        &self,
        ctx: &RequestContext,
        filter: Option<ListInstanceFilter>,
        page: Page,
    ) -> Result<ListInstanceResult> {
        let type_id = TypeId::HOST;
        let (_, id_field, name_field) = type_fields(&type_id)?;
        let filter = filter.unwrap_or_default();
        let mut conditions = Vec::new();
        let mut names = AncestorNames::new();
        // None leaves hosts unconstrained.
        let mut host_ids: Option<Vec<i64>> = None;

        if let Some(parent) = &filter.parent {
            let Some(relation) = host_relation_field(&parent.resource_type) else {
                return Ok(ListInstanceResult::default());
            };
            let Ok(parent_id) = parent.id.parse::<i64>() else {
                return Ok(ListInstanceResult::default());
            };
            let ids = self
                .hosts_by_relation(ctx, relation, json!({ "$eq": parent_id }))
                .await?;
            if ids.is_empty() {
                return Ok(ListInstanceResult::default());
            }
            host_ids = Some(ids);
        }

        for (search_type, keywords) in &filter.search {
            if *search_type == type_id {
                continue;
            }
            let (Some(relation), Some((table, ancestor_id, ancestor_name))) =
                (host_relation_field(search_type), ancestor_fields(search_type))
            else {
                return Ok(ListInstanceResult::default());
            };
            let ancestors = self
                .search_ancestors(ctx, table, ancestor_id, ancestor_name, keywords)
                .await?;
            let ids = record_ancestors(&mut names, search_type, &ancestors, ancestor_id, ancestor_name);
            if ids.is_empty() {
                return Ok(ListInstanceResult::default());
            }
            let matched = self
                .hosts_by_relation(ctx, relation, json!({ "$in": ids }))
                .await?;
            let narrowed: Vec<i64> = match host_ids {
                Some(current) => current.into_iter().filter(|id| matched.contains(id)).collect(),
                None => matched,
            };
            if narrowed.is_empty() {
                return Ok(ListInstanceResult::default());
            }
            host_ids = Some(narrowed);
        }

        let keywords = own_keywords(&filter, &type_id);
        if !keywords.is_empty() {
            conditions.push(keyword_filter(id_field, name_field, &keywords));
        }
        if let Some(ids) = &host_ids {
            conditions.push(field_filter(FIELD_HOST_ID, json!({ "$in": ids })));
        }

        let chain = filter.resource_type_chain;
        let mut relation_fields = Vec::with_capacity(chain.len());
        for hop in &chain {
            let field = host_relation_field(&hop.id).ok_or_else(|| {
                AuthzError::ParamInvalid(format!("resource_type_chain {}", hop.id))
            })?;
            relation_fields.push(field);
        }

        let (count, documents) = self.search_page(ctx, &type_id, conditions, page, &[]).await?;
        let mut results = to_instances(&documents, id_field, name_field);
        if !chain.is_empty() {
            let page_hosts: Vec<i64> = documents
                .iter()
                .filter_map(|d| d.get(FIELD_HOST_ID).and_then(as_i64))
                .collect();
            let mut relations: HashMap<i64, Document> = HashMap::new();
            for relation in self.host_relations(ctx, &page_hosts).await? {
                if let Some(host_id) = relation.get(FIELD_HOST_ID).and_then(as_i64) {
                    relations.entry(host_id).or_insert(relation);
                }
            }
            for (hop, field) in chain.iter().zip(&relation_fields) {
                let ids = relations.values().filter_map(|r| r.get(*field).cloned()).collect();
                let known = names.entry(hop.id.clone()).or_default();
                self.fill_names(ctx, &hop.id, ids, known).await?;
            }
            for (instance, document) in results.iter_mut().zip(&documents) {
                let relation = document
                    .get(FIELD_HOST_ID)
                    .and_then(as_i64)
                    .and_then(|host_id| relations.get(&host_id));
                for (hop, field) in chain.iter().zip(&relation_fields) {
                    let id = relation
                        .and_then(|r| r.get(*field))
                        .map(value_text)
                        .unwrap_or_default();
                    instance.path.push(ancestor_path(&names, &hop.id, id));
                }
            }
        }
        Ok(ListInstanceResult { count, results })
    }

    async fn list_model_instance(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        model: ModelRef<'_>,
        filter: Option<ListInstanceFilter>,
        page: Page,
    ) -> Result<ListInstanceResult> {
        let (_, id_field, name_field) = type_fields(type_id)?;
        let filter = filter.unwrap_or_default();
        let model_id = model.id.to_string();
        let mut conditions = vec![field_filter(FIELD_OBJ_ID, json!({ "$eq": model.object_id }))];

        if let Some(parent) = &filter.parent {
            if parent.resource_type != TypeId::SYS_MODEL || parent.id != model_id {
                return Ok(ListInstanceResult::default());
            }
        }
        for (search_type, keywords) in &filter.search {
            if search_type == type_id {
                continue;
            }
            if *search_type != TypeId::SYS_MODEL {
                return Ok(ListInstanceResult::default());
            }
            let regex = keyword_regex(keywords)?;
            if !(regex.is_match(&model_id)
                || regex.is_match(model.object_id)
                || regex.is_match(model.object_name))
            {
                return Ok(ListInstanceResult::default());
            }
        }
        let keywords = own_keywords(&filter, type_id);
        if !keywords.is_empty() {
            conditions.push(keyword_filter(id_field, name_field, &keywords));
        }

        let (count, documents) = self.search_page(ctx, type_id, conditions, page, &[]).await?;
        let mut results = to_instances(&documents, id_field, name_field);
        // every instance of the type belongs to the same model
        if filter.resource_type_chain.iter().any(|hop| hop.id == TypeId::SYS_MODEL) {
            for instance in &mut results {
                instance.path.push(InstancePath {
                    resource_type: TypeId::SYS_MODEL,
                    id: model_id.clone(),
                    display_name: model.object_name.to_string(),
                });
            }
        }
        Ok(ListInstanceResult { count, results })
    }

    async fn search_page(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        conditions: Vec<Filter>,
        page: Page,
        extra_fields: &[&str],
    ) -> Result<(u64, Vec<Document>)> {
        let (table, id_field, name_field) = type_fields(type_id)?;
        let filter = and_filters(conditions);
        let counts = ctx
            .run(self.store.count_by_filter(ctx, table, std::slice::from_ref(&filter)))
            .await?;

        let mut fields: Vec<&str> = vec![id_field, name_field];
        for field in extra_fields {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
        let param = SearchParam::new(table, filter)
            .with_fields(fields)
            .with_page(page.offset, page.limit);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        Ok((counts.first().copied().unwrap_or(0), documents))
    }

    async fn search_ancestors(
        &self,
        ctx: &RequestContext,
        table: &str,
        id_field: &str,
        name_field: &str,
        keywords: &[String],
    ) -> Result<Vec<Document>> {
        let param = SearchParam::new(table, keyword_filter(id_field, name_field, keywords))
            .with_fields([id_field, name_field]);
        ctx.run(self.store.search_auth_resource(ctx, param)).await
    }

    /// Looks up the display names of `ids` not already in `names`.
    async fn fill_names(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        ids: Vec<Value>,
        names: &mut HashMap<String, String>,
    ) -> Result<()> {
        let mut missing: Vec<Value> = Vec::new();
        for id in ids {
            if !names.contains_key(&value_text(&id)) && !missing.contains(&id) {
                missing.push(id);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        let Some((table, id_field, name_field)) = ancestor_fields(type_id) else {
            return Ok(());
        };
        let param = SearchParam::new(table, field_filter(id_field, json!({ "$in": missing })))
            .with_fields([id_field, name_field]);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        for document in &documents {
            if let Some(id) = document.get(id_field) {
                let name = document.get(name_field).map(value_text).unwrap_or_default();
                names.insert(value_text(id), name);
            }
        }
        Ok(())
    }

    async fn hosts_by_relation(
        &self,
        ctx: &RequestContext,
        relation: &str,
        condition: Value,
    ) -> Result<Vec<i64>> {
        ctx.run(self.hosts.host_ids_by_path(ctx, field_filter(relation, condition)))
            .await
    }

    async fn host_relations(&self, ctx: &RequestContext, host_ids: &[i64]) -> Result<Vec<Document>> {
        if host_ids.is_empty() {
            return Ok(Vec::new());
        }
        let param = SearchParam::new(
            TABLE_MODULE_HOST_CONFIG,
            field_filter(FIELD_HOST_ID, json!({ "$in": host_ids })),
        )
        .with_fields([FIELD_HOST_ID, FIELD_BIZ_ID, FIELD_SET_ID, FIELD_MODULE_ID]);
        ctx.run(self.store.search_auth_resource(ctx, param)).await
    }

    /// `_bk_iam_path_` values per host id: the business for business hosts,
    /// the directory for hosts in the resource pool.
    async fn host_paths(
        &self,
        ctx: &RequestContext,
        hosts: &[Document],
    ) -> Result<HashMap<String, Vec<String>>> {
        let host_ids: Vec<i64> = hosts
            .iter()
            .filter_map(|d| d.get(FIELD_HOST_ID).and_then(as_i64))
            .collect();
        let relations = self.host_relations(ctx, &host_ids).await?;
        if relations.is_empty() {
            return Ok(HashMap::new());
        }
        let pool = self.resource_pool_business(ctx).await?;

        let mut paths: HashMap<String, Vec<String>> = HashMap::new();
        for relation in &relations {
            let (Some(host_id), Some(business)) = (
                relation.get(FIELD_HOST_ID).and_then(as_i64),
                relation.get(FIELD_BIZ_ID).and_then(as_i64),
            ) else {
                continue;
            };
            let path = if business == pool {
                let module = relation.get(FIELD_MODULE_ID).map(value_text).unwrap_or_default();
                format_path(&[(&TypeId::SYS_RESOURCE_POOL_DIRECTORY, &module)])
            } else {
                format_path(&[(&TypeId::BUSINESS, &business.to_string())])
            };
            let entry = paths.entry(host_id.to_string()).or_default();
            if !entry.contains(&path) {
                entry.push(path);
            }
        }
        Ok(paths)
    }

    async fn resource_pool_business(&self, ctx: &RequestContext) -> Result<i64> {
        let param = SearchParam::new(TABLE_BUSINESS, field_filter(FIELD_DEFAULT, json!({ "$eq": 1 })))
            .with_fields([FIELD_BIZ_ID])
            .with_limit(1);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        documents
            .first()
            .and_then(|document| document.get(FIELD_BIZ_ID))
            .and_then(as_i64)
            .ok_or_else(|| AuthzError::remote(ctx.rid.clone(), "resource pool business not found"))
    }

    /// Common objects on the mainline topology between business and set.
    async fn mainline_objects(&self, ctx: &RequestContext) -> Result<Vec<String>> {
        let param = SearchParam::new(
            TABLE_OBJECT_ASSOCIATION,
            field_filter("bk_asst_id", json!({ "$eq": MAINLINE_ASSOCIATION })),
        )
        .with_fields([FIELD_OBJ_ID]);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        let mut objects: Vec<String> = Vec::new();
        for object in documents
            .iter()
            .filter_map(|document| document.get(FIELD_OBJ_ID).and_then(Value::as_str))
        {
            if !INNER_OBJECTS.contains(&object) && !objects.iter().any(|o| o == object) {
                objects.push(object.to_string());
            }
        }
        Ok(objects)
    }

    /// `bk_obj_id` condition of the model-flavoured types. Process and cloud
    /// area models are never offered.
    async fn model_condition(&self, ctx: &RequestContext, type_id: &TypeId) -> Result<Filter> {
        let mut excluded = vec!["process".to_string(), "plat".to_string()];
        let condition = match type_id.as_str() {
            "sys_model_event" | "sys_instance_model" => {
                excluded.extend(["host", "biz", "set", "module"].map(String::from));
                excluded.extend(self.mainline_objects(ctx).await?);
                json!({ "$nin": excluded })
            }
            "mainline_model_event" => json!({ "$in": self.mainline_objects(ctx).await? }),
            _ => json!({ "$nin": excluded }),
        };
        Ok(field_filter(FIELD_OBJ_ID, condition))
    }

    async fn model_of(&self, ctx: &RequestContext, type_id: &TypeId) -> Result<PullMethods> {
        let model_id = type_id.sys_instance_model_id()?;
        let param = SearchParam::new(TABLE_OBJECT_DES, field_filter("id", json!({ "$eq": model_id })))
            .with_fields(["id", FIELD_OBJ_ID, FIELD_OBJ_NAME])
            .with_limit(1);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        let model = documents
            .first()
            .ok_or_else(|| AuthzError::ParamInvalid(format!("model {} of {}", model_id, type_id)))?;
        let object_id = model
            .get(FIELD_OBJ_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| AuthzError::ParamInvalid(format!("model {} of {}", model_id, type_id)))?;
        Ok(PullMethods::ModelInstance {
            model_id,
            object_id: object_id.to_string(),
            object_name: model.get(FIELD_OBJ_NAME).map(value_text).unwrap_or_default(),
        })
    }
}

struct ModelRef<'a> {
    id: i64,
    object_id: &'a str,
    object_name: &'a str,
}

fn system(extra: Filter) -> PullMethods {
    PullMethods::System { extra: Some(extra) }
}

fn decode_filter<T: DeserializeOwned>(filter: Value) -> Result<Option<T>> {
    if filter.is_null() {
        return Ok(None);
    }
    serde_json::from_value(filter)
        .map(Some)
        .map_err(|e| AuthzError::ParamInvalid(format!("filter: {}", e)))
}

fn type_fields(type_id: &TypeId) -> Result<(&'static str, &'static str, &'static str)> {
    match (
        resource_table(type_id),
        resource_id_field(type_id),
        resource_name_field(type_id),
    ) {
        (Some(table), Some(id), Some(name)) => Ok((table, id, name)),
        _ => Err(AuthzError::ParamInvalid("type".to_string())),
    }
}

/// Table, id and name field of a type that may appear as an ancestor.
fn ancestor_fields(type_id: &TypeId) -> Option<(&'static str, &'static str, &'static str)> {
    match type_id.as_str() {
        "set" => Some((TABLE_SET, FIELD_SET_ID, "bk_set_name")),
        "module" => Some((TABLE_MODULE, FIELD_MODULE_ID, "bk_module_name")),
        _ => type_fields(type_id).ok(),
    }
}

/// Field of the host/module relation that holds an ancestor of this type.
fn host_relation_field(type_id: &TypeId) -> Option<&'static str> {
    match type_id.as_str() {
        "biz" | "biz_for_host_trans" => Some(FIELD_BIZ_ID),
        "set" => Some(FIELD_SET_ID),
        "module" | "sys_resource_pool_directory" | "sys_host_rsc_pool_directory" => {
            Some(FIELD_MODULE_ID)
        }
        _ => None,
    }
}

fn record_ancestors(
    names: &mut AncestorNames,
    type_id: &TypeId,
    ancestors: &[Document],
    id_field: &str,
    name_field: &str,
) -> Vec<Value> {
    let known = names.entry(type_id.clone()).or_default();
    let mut ids = Vec::with_capacity(ancestors.len());
    for ancestor in ancestors {
        if let Some(id) = ancestor.get(id_field) {
            let name = ancestor.get(name_field).map(value_text).unwrap_or_default();
            known.insert(value_text(id), name);
            ids.push(id.clone());
        }
    }
    ids
}

fn ancestor_path(names: &AncestorNames, type_id: &TypeId, id: String) -> InstancePath {
    let display_name = names
        .get(type_id)
        .and_then(|known| known.get(&id))
        .cloned()
        .unwrap_or_default();
    InstancePath {
        resource_type: type_id.clone(),
        id,
        display_name,
    }
}

fn own_keywords(filter: &ListInstanceFilter, type_id: &TypeId) -> Vec<String> {
    let mut keywords = filter.search.get(type_id).cloned().unwrap_or_default();
    if !filter.keyword.is_empty() {
        keywords.push(filter.keyword.clone());
    }
    keywords
}

/// Keywords are literals: any of them may occur in the value.
fn keyword_pattern(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|")
}

fn keyword_regex(keywords: &[String]) -> Result<Regex> {
    Regex::new(&keyword_pattern(keywords))
        .map_err(|e| AuthzError::ParamInvalid(format!("filter.search: {}", e)))
}

fn keyword_filter(id_field: &str, name_field: &str, keywords: &[String]) -> Filter {
    let pattern = keyword_pattern(keywords);
    let mut filter = Filter::new();
    filter.insert(
        "$or".to_string(),
        Value::Array(vec![
            Value::Object(field_filter(id_field, json!({ "$regex": pattern.clone() }))),
            Value::Object(field_filter(name_field, json!({ "$regex": pattern }))),
        ]),
    );
    filter
}

fn field_filter(field: &str, condition: Value) -> Filter {
    let mut filter = Filter::new();
    filter.insert(field.to_string(), condition);
    filter
}

fn and_filters(mut filters: Vec<Filter>) -> Filter {
    filters.retain(|filter| !filter.is_empty());
    match filters.len() {
        0 => Filter::new(),
        1 => filters.pop().unwrap_or_default(),
        _ => field_filter(
            "$and",
            Value::Array(filters.into_iter().map(Value::Object).collect()),
        ),
    }
}

fn typed_id(type_id: &TypeId, id: &str) -> Option<Value> {
    if is_resource_id_string_type(type_id) {
        Some(Value::String(id.to_string()))
    } else {
        id.parse::<i64>().ok().map(Value::from)
    }
}

fn to_instances(documents: &[Document], id_field: &str, name_field: &str) -> Vec<InstanceResource> {
    documents
        .iter()
        .map(|document| InstanceResource {
            id: document.get(id_field).map(value_text).unwrap_or_default(),
            display_name: document.get(name_field).map(value_text).unwrap_or_default(),
            path: Vec::new(),
        })
        .collect()
}

fn list_kube_workload_kinds(filter: Option<&ListInstanceFilter>, page: Page) -> ListInstanceResult {
    let mut kinds: Vec<&str> = KUBE_WORKLOAD_KINDS.to_vec();
    if let Some(filter) = filter {
        if filter.parent.is_some() {
            return ListInstanceResult::default();
        }
        if !filter.keyword.is_empty() {
            let keyword = filter.keyword.to_lowercase();
            kinds.retain(|kind| kind.to_lowercase().contains(&keyword));
        }
    }
    let count = kinds.len() as u64;
    let results = kinds
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .map(|kind| InstanceResource {
            id: kind.to_string(),
            display_name: kind.to_string(),
            path: Vec::new(),
        })
        .collect();
    ListInstanceResult { count, results }
}

/// Kinds are named by their id, so only `display_name` can be asked for.
fn fetch_kube_workload_kinds(filter: &FetchInstanceInfoFilter) -> Vec<Document> {
    if !filter.attrs.iter().any(|attr| attr == POLICY_NAME_ATTRIBUTE) {
        return Vec::new();
    }
    filter
        .ids
        .iter()
        .filter(|id| KUBE_WORKLOAD_KINDS.contains(&id.as_str()))
        .map(|id| field_filter(POLICY_NAME_ATTRIBUTE, Value::String(id.clone())))
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn ctx() -> RequestContext {
        RequestContext::new("rid-pull")
    }

    fn page(limit: usize) -> Page {
        Page::new(0, limit)
    }

    fn filter(value: Value) -> Option<ListInstanceFilter> {
        Some(serde_json::from_value(value).unwrap())
    }

    fn ids(result: &ListInstanceResult) -> Vec<&str> {
        result.results.iter().map(|r| r.id.as_str()).collect()
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            TABLE_BUSINESS,
            json!({"bk_biz_id": 1, "bk_biz_name": "资源池", "default": 1, "bk_biz_maintainer": "admin"}),
        );
        store.insert(
            TABLE_BUSINESS,
            json!({"bk_biz_id": 2, "bk_biz_name": "blueking", "default": 0, "bk_biz_maintainer": "admin"}),
        );
        store.insert(
            TABLE_BUSINESS,
            json!({"bk_biz_id": 3, "bk_biz_name": "game", "default": 0, "bk_biz_maintainer": "ops"}),
        );
        store.insert(TABLE_SET, json!({"bk_set_id": 20, "bk_set_name": "web", "bk_biz_id": 2}));
        store.insert(TABLE_SET, json!({"bk_set_id": 30, "bk_set_name": "db", "bk_biz_id": 3}));
        store.insert(TABLE_MODULE, json!({"bk_module_id": 5, "bk_module_name": "空闲机", "bk_biz_id": 1}));
        store.insert(TABLE_MODULE, json!({"bk_module_id": 7, "bk_module_name": "nginx", "bk_biz_id": 2}));
        store.insert(TABLE_MODULE, json!({"bk_module_id": 8, "bk_module_name": "mysql", "bk_biz_id": 3}));
        for (host, ip, biz, set, module) in [
            (10, "10.0.0.10", 2, 20, 7),
            (11, "10.0.0.11", 3, 30, 8),
            (12, "10.0.0.12", 1, 0, 5),
        ] {
            store.insert(
                crate::fields::TABLE_HOST,
                json!({"bk_host_id": host, "bk_host_innerip": ip}),
            );
            store.insert(
                TABLE_MODULE_HOST_CONFIG,
                json!({"bk_host_id": host, "bk_biz_id": biz, "bk_set_id": set, "bk_module_id": module}),
            );
        }
        store.insert(
            crate::fields::TABLE_SET_TEMPLATE,
            json!({"id": 1, "name": "tpl-web", "bk_biz_id": 2}),
        );
        store.insert(
            crate::fields::TABLE_SET_TEMPLATE,
            json!({"id": 2, "name": "tpl-db", "bk_biz_id": 3}),
        );
        store
    }

    async fn list(
        provider: &ResourceProvider,
        type_id: &TypeId,
        filter: Option<ListInstanceFilter>,
        page: Page,
    ) -> Result<ListInstanceResult> {
        let ctx = ctx();
        let methods = provider.pull_methods(&ctx, type_id).await?;
        provider.list_instance(&ctx, type_id, &methods, filter, page).await
    }

    #[test]
    fn test_page_limits() {
        assert!(Page::new(0, 0).validate().is_err());
        assert!(Page::new(0, MAX_PAGE_SIZE + 1).validate().is_err());
        assert!(Page::new(5, MAX_PAGE_SIZE).validate().is_ok());
    }

    #[tokio::test]
    async fn test_business_listing_excludes_resource_pool() {
        let provider = ResourceProvider::new(seeded());

        let result = list(&provider, &TypeId::BUSINESS, None, page(10)).await.unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(ids(&result), vec!["2", "3"]);
        assert_eq!(result.results[1].display_name, "game");

        let paged = list(&provider, &TypeId::BUSINESS, None, Page::new(1, 1)).await.unwrap();
        assert_eq!(paged.count, 2);
        assert_eq!(ids(&paged), vec!["3"]);
    }

    #[tokio::test]
    async fn test_system_keywords_match_literally() {
        let provider = ResourceProvider::new(seeded());

        let found = list(&provider, &TypeId::BUSINESS, filter(json!({"search": {"biz": ["gam"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["3"]);

        let literal = list(&provider, &TypeId::BUSINESS, filter(json!({"search": {"biz": ["g.me"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(literal.count, 0);

        let keyword = list(&provider, &TypeId::BUSINESS, filter(json!({"keyword": "blue"})), page(10))
            .await
            .unwrap();
        assert_eq!(ids(&keyword), vec!["2"]);
    }

    #[tokio::test]
    async fn test_system_listing_has_no_ancestors() {
        let provider = ResourceProvider::new(seeded());

        let parent = list(
            &provider,
            &TypeId::BUSINESS,
            filter(json!({"parent": {"type": "business_set", "id": "1"}})),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(parent, ListInstanceResult::default());

        let foreign = list(&provider, &TypeId::BUSINESS, filter(json!({"search": {"host": ["10"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(foreign.count, 0);
    }

    #[tokio::test]
    async fn test_business_instances_by_parent_with_path() {
        let provider = ResourceProvider::new(seeded());
        let type_id = TypeId::BIZ_SET_TEMPLATE;

        let result = list(
            &provider,
            &type_id,
            filter(json!({
                "parent": {"type": "biz", "id": "2"},
                "resource_type_chain": [{"system_id": "bk_cmdb", "id": "biz"}]
            })),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.results[0].display_name, "tpl-web");
        assert_eq!(
            result.results[0].path,
            vec![InstancePath {
                resource_type: TypeId::BUSINESS,
                id: "2".to_string(),
                display_name: "blueking".to_string(),
            }]
        );

        let unparsable = list(
            &provider,
            &type_id,
            filter(json!({"parent": {"type": "biz", "id": "two"}})),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(unparsable.count, 0);
    }

    #[tokio::test]
    async fn test_business_instances_by_ancestor_keyword() {
        let provider = ResourceProvider::new(seeded());
        let type_id = TypeId::BIZ_SET_TEMPLATE;

        let result = list(&provider, &type_id, filter(json!({"search": {"biz": ["game"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["2"]);

        let none = list(&provider, &type_id, filter(json!({"search": {"biz": ["nothing"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(none.count, 0);
    }

    #[tokio::test]
    async fn test_host_listing_by_parent() {
        let provider = ResourceProvider::new(seeded());

        let all = list(&provider, &TypeId::HOST, None, page(10)).await.unwrap();
        assert_eq!(all.count, 3);

        let in_module = list(
            &provider,
            &TypeId::HOST,
            filter(json!({"parent": {"type": "module", "id": "8"}})),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(ids(&in_module), vec!["11"]);
        assert_eq!(in_module.results[0].display_name, "10.0.0.11");

        let empty_module = list(
            &provider,
            &TypeId::HOST,
            filter(json!({"parent": {"type": "module", "id": "99"}})),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(empty_module.count, 0);
    }

    #[tokio::test]
    async fn test_host_search_by_set_reports_path() {
        let provider = ResourceProvider::new(seeded());

        let result = list(
            &provider,
            &TypeId::HOST,
            filter(json!({
                "search": {"set": ["web"]},
                "resource_type_chain": [
                    {"system_id": "bk_cmdb", "id": "biz"},
                    {"system_id": "bk_cmdb", "id": "set"}
                ]
            })),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(ids(&result), vec!["10"]);
        let path: Vec<(&str, &str)> = result.results[0]
            .path
            .iter()
            .map(|p| (p.id.as_str(), p.display_name.as_str()))
            .collect();
        assert_eq!(path, vec![("2", "blueking"), ("20", "web")]);

        let unknown = list(&provider, &TypeId::HOST, filter(json!({"search": {"biz_custom_query": ["x"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(unknown.count, 0);
    }

    #[tokio::test]
    async fn test_model_types_exclude_mainline_objects() {
        let store = seeded();
        store.insert(
            TABLE_OBJECT_ASSOCIATION,
            json!({"bk_asst_id": "bk_mainline", "bk_obj_id": "rack", "bk_asst_obj_id": "biz"}),
        );
        store.insert(
            TABLE_OBJECT_ASSOCIATION,
            json!({"bk_asst_id": "bk_mainline", "bk_obj_id": "set", "bk_asst_obj_id": "rack"}),
        );
        store.insert(
            TABLE_OBJECT_ASSOCIATION,
            json!({"bk_asst_id": "belong", "bk_obj_id": "switch", "bk_asst_obj_id": "rack"}),
        );
        let provider = ResourceProvider::new(store);
        let ctx = ctx();

        let instance_model = provider.pull_methods(&ctx, &TypeId::SYS_INSTANCE_MODEL).await.unwrap();
        assert_eq!(
            instance_model,
            system(field_filter(
                FIELD_OBJ_ID,
                json!({"$nin": ["process", "plat", "host", "biz", "set", "module", "rack"]})
            ))
        );
        let mainline = provider.pull_methods(&ctx, &TypeId::MAINLINE_MODEL_EVENT).await.unwrap();
        assert_eq!(mainline, system(field_filter(FIELD_OBJ_ID, json!({"$in": ["rack"]}))));
        let model = provider.pull_methods(&ctx, &TypeId::SYS_MODEL).await.unwrap();
        assert_eq!(model, system(field_filter(FIELD_OBJ_ID, json!({"$nin": ["process", "plat"]}))));
    }

    #[tokio::test]
    async fn test_pull_methods_per_type() {
        let provider = ResourceProvider::new(seeded());
        let ctx = ctx();

        let directory = provider
            .pull_methods(&ctx, &TypeId::SYS_RESOURCE_POOL_DIRECTORY)
            .await
            .unwrap();
        assert_eq!(directory, system(field_filter(FIELD_BIZ_ID, json!({"$eq": 1}))));
        assert_eq!(
            provider.pull_methods(&ctx, &TypeId::SYS_AUDIT_LOG).await.unwrap(),
            PullMethods::Unrelated
        );
        assert_eq!(
            provider.pull_methods(&ctx, &TypeId::BIZ_CUSTOM_QUERY).await.unwrap(),
            PullMethods::Business
        );
        assert!(matches!(
            provider.pull_methods(&ctx, &TypeId::new("unknown")).await,
            Err(AuthzError::Unsupported(_))
        ));

        let audit = list(&provider, &TypeId::SYS_AUDIT_LOG, None, page(10)).await.unwrap();
        assert_eq!(audit, ListInstanceResult::default());
    }

    #[tokio::test]
    async fn test_model_instance_listing() {
        let store = seeded();
        store.insert(
            TABLE_OBJECT_DES,
            json!({"id": 5, "bk_obj_id": "switch", "bk_obj_name": "交换机"}),
        );
        store.insert(
            crate::fields::TABLE_OBJECT_BASE,
            json!({"bk_inst_id": 1, "bk_inst_name": "sw-1", "bk_obj_id": "switch"}),
        );
        store.insert(
            crate::fields::TABLE_OBJECT_BASE,
            json!({"bk_inst_id": 2, "bk_inst_name": "rk-1", "bk_obj_id": "rack"}),
        );
        let provider = ResourceProvider::new(store);
        let type_id = TypeId::sys_instance(5);

        let all = list(&provider, &type_id, None, page(10)).await.unwrap();
        assert_eq!(ids(&all), vec!["1"]);

        let other_parent = list(
            &provider,
            &type_id,
            filter(json!({"parent": {"type": "sys_model", "id": "6"}})),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(other_parent.count, 0);

        let with_path = list(
            &provider,
            &type_id,
            filter(json!({
                "search": {"sys_model": ["交换"]},
                "resource_type_chain": [{"system_id": "bk_cmdb", "id": "sys_model"}]
            })),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(with_path.results[0].path[0].id, "5");
        assert_eq!(with_path.results[0].path[0].display_name, "交换机");

        let unmatched = list(&provider, &type_id, filter(json!({"search": {"sys_model": ["router"]}})), page(10))
            .await
            .unwrap();
        assert_eq!(unmatched.count, 0);

        let missing = list(&provider, &TypeId::sys_instance(9), None, page(10)).await;
        assert!(matches!(missing, Err(AuthzError::ParamInvalid(_))));
    }

    #[tokio::test]
    async fn test_kube_workload_kinds() {
        let provider = ResourceProvider::new(Arc::new(MemoryStore::new()));
        let type_id = TypeId::KUBE_WORKLOAD_EVENT;

        let matched = list(&provider, &type_id, filter(json!({"keyword": "SET"})), Page::new(1, 1))
            .await
            .unwrap();
        assert_eq!(matched.count, 2);
        assert_eq!(ids(&matched), vec!["daemonSet"]);

        let parent = list(
            &provider,
            &type_id,
            filter(json!({"parent": {"type": "biz", "id": "1"}})),
            page(10),
        )
        .await
        .unwrap();
        assert_eq!(parent.count, 0);

        let ctx = ctx();
        let info = provider
            .fetch_instance_info(
                &ctx,
                &type_id,
                &PullMethods::KubeWorkload,
                FetchInstanceInfoFilter {
                    ids: vec!["deployment".to_string(), "cronjob".to_string()],
                    attrs: vec!["display_name".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(info, vec![field_filter("display_name", json!("deployment"))]);

        let by_policy = provider
            .list_instance_by_policy(
                &ctx,
                &type_id,
                &PullMethods::KubeWorkload,
                ListInstanceByPolicyFilter::default(),
                page(10),
            )
            .await;
        assert!(matches!(by_policy, Err(AuthzError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_fetch_instance_info_aliases_attributes() {
        let provider = ResourceProvider::new(seeded());
        let request: PullResourceRequest = serde_json::from_value(json!({
            "type": "biz",
            "method": "fetch_instance_info",
            "filter": {"ids": ["1", "2", "x"], "attrs": ["display_name", "bk_biz_maintainer"]}
        }))
        .unwrap();

        let PullResult::Info(info) = provider.pull(&ctx(), request).await.unwrap() else {
            panic!("expected instance info");
        };
        assert_eq!(info.len(), 1);
        assert_eq!(
            Value::Object(info[0].clone()),
            json!({"id": "2", "display_name": "blueking", "bk_biz_maintainer": "admin"})
        );
    }

    #[tokio::test]
    async fn test_fetch_host_paths() {
        let provider = ResourceProvider::new(seeded());
        let ctx = ctx();
        let info = provider
            .fetch_instance_info(
                &ctx,
                &TypeId::HOST,
                &PullMethods::Host,
                FetchInstanceInfoFilter {
                    ids: vec!["10".to_string(), "12".to_string()],
                    attrs: vec!["display_name".to_string(), IAM_PATH_KEY.to_string()],
                },
            )
            .await
            .unwrap();

        let paths: HashMap<String, Value> = info
            .iter()
            .map(|d| (value_text(&d["id"]), d[IAM_PATH_KEY].clone()))
            .collect();
        assert_eq!(paths["10"], json!(["/biz,2/"]));
        assert_eq!(paths["12"], json!(["/sys_resource_pool_directory,5/"]));
    }

    #[tokio::test]
    async fn test_list_instance_by_policy() {
        let provider = ResourceProvider::new(seeded());
        let request: PullResourceRequest = serde_json::from_value(json!({
            "type": "biz",
            "method": "list_instance_by_policy",
            "filter": {"expression": {"op": "in", "field": "biz.id", "value": [1, 2]}},
            "page": {"limit": 10, "offset": 0}
        }))
        .unwrap();

        let PullResult::Instances(result) = provider.pull(&ctx(), request).await.unwrap() else {
            panic!("expected instances");
        };
        assert_eq!(result.count, 1);
        assert_eq!(ids(&result), vec!["2"]);
    }

    #[tokio::test]
    async fn test_pull_rejects_bad_requests() {
        let provider = ResourceProvider::new(seeded());

        let no_limit: PullResourceRequest =
            serde_json::from_value(json!({"type": "biz", "method": "list_instance"})).unwrap();
        assert!(matches!(
            provider.pull(&ctx(), no_limit).await,
            Err(AuthzError::Validation(_))
        ));

        let bad_filter: PullResourceRequest = serde_json::from_value(json!({
            "type": "biz",
            "method": "list_instance",
            "filter": {"parent": "biz"},
            "page": {"limit": 10}
        }))
        .unwrap();
        assert!(matches!(
            provider.pull(&ctx(), bad_filter).await,
            Err(AuthzError::ParamInvalid(_))
        ));
    }
}
