//! The authority's model of the CMDB system: resource types, instance
//! selections, actions and their grouping.
//!
//! CMDB owns this model. [`registrar::ModelRegistrar`] keeps the copy held by
//! the authority in line with what [`catalogue`] generates, including one
//! dynamic type, selection and action set per user-defined model.

pub mod catalogue;
pub mod client;
pub mod registrar;

use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::fields::{FIELD_OBJ_ID, FIELD_OBJ_NAME, TABLE_OBJECT_DES};
use crate::iam::{ActionId, TypeId};
use crate::store::{Filter, ResourceStore, SearchParam};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use client::IamModelClient;
pub use registrar::ModelRegistrar;

/// Version stamped on every generated type and action.
pub const MODEL_VERSION: i64 = 1;

/// Path of the resource pull callback the authority calls back into.
pub const RESOURCE_PROVIDER_PATH: &str = "/api/v1/auth/find/resource";

/// Authentication scheme the authority uses against the pull callback.
pub const PROVIDER_AUTH_BASIC: &str = "basic";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_en: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description_en: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub clients: String,
    #[serde(default)]
    pub provider_config: Option<SysConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    pub system_id: String,
    pub id: TypeId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub id: TypeId,
    pub name: String,
    pub name_en: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub parents: Vec<Parent>,
    #[serde(default)]
    pub provider_config: ResourceConfig,
    #[serde(default)]
    pub version: i64,
}

/// One hop of an instance selection's topology chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChain {
    pub system_id: String,
    pub id: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSelection {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub resource_type_chain: Vec<ResourceChain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInstanceSelection {
    pub system_id: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_iam_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContent {
    pub op: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub op: String,
    pub content: Vec<ScopeContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelateResourceType {
    pub system_id: String,
    pub id: TypeId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_alias: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_alias_en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Empty means `instance`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selection_mode: String,
    #[serde(default, rename = "related_instance_selections")]
    pub instance_selections: Vec<RelatedInstanceSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAction {
    pub id: ActionId,
    pub name: String,
    pub name_en: String,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub related_resource_types: Vec<RelateResourceType>,
    #[serde(default)]
    pub related_actions: Vec<ActionId>,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionWithId {
    pub id: ActionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub name: String,
    pub name_en: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_groups: Vec<ActionGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionWithId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorRelatedAction {
    pub id: ActionId,
    pub required: bool,
}

/// Actions granted to the creator of an instance of `id`, and of its
/// sub resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCreatorAction {
    pub id: TypeId,
    pub actions: Vec<CreatorRelatedAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_resource_types: Vec<ResourceCreatorAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCreatorActions {
    pub config: Vec<ResourceCreatorAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonAction {
    pub name: String,
    pub name_en: String,
    pub actions: Vec<ActionWithId>,
}

/// What the authority currently holds for the system. Sections that were
/// not queried stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredSystemInfo {
    #[serde(default)]
    pub base_info: System,
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
    #[serde(default)]
    pub actions: Vec<ResourceAction>,
    #[serde(default)]
    pub action_groups: Vec<ActionGroup>,
    #[serde(default)]
    pub instance_selections: Vec<InstanceSelection>,
    #[serde(default)]
    pub resource_creator_actions: ResourceCreatorActions,
    #[serde(default)]
    pub common_actions: Vec<CommonAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemQueryField {
    BaseInfo,
    ResourceTypes,
    Actions,
    ActionGroups,
    InstanceSelections,
    ResourceCreatorActions,
    CommonActions,
}

impl SystemQueryField {
    pub const ALL: [SystemQueryField; 7] = [
        SystemQueryField::BaseInfo,
        SystemQueryField::ResourceTypes,
        SystemQueryField::Actions,
        SystemQueryField::ActionGroups,
        SystemQueryField::InstanceSelections,
        SystemQueryField::ResourceCreatorActions,
        SystemQueryField::CommonActions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemQueryField::BaseInfo => "base_info",
            SystemQueryField::ResourceTypes => "resource_types",
            SystemQueryField::Actions => "actions",
            SystemQueryField::ActionGroups => "action_groups",
            SystemQueryField::InstanceSelections => "instance_selections",
            SystemQueryField::ResourceCreatorActions => "resource_creator_actions",
            SystemQueryField::CommonActions => "common_actions",
        }
    }
}

/// A user-defined CMDB model that gets its own dynamic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: i64,
    pub bk_obj_id: String,
    pub bk_obj_name: String,
}

/// Model entries to remove from the authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCmdbResourceParam {
    #[serde(default)]
    pub action_ids: Vec<ActionId>,
    #[serde(default)]
    pub instance_selection_ids: Vec<String>,
    #[serde(default)]
    pub type_ids: Vec<TypeId>,
}

/// User-defined models, the ones that get dynamic entries.
pub async fn custom_objects(
    store: &dyn ResourceStore,
    ctx: &RequestContext,
) -> Result<Vec<ModelObject>> {
    let mut filter = Filter::new();
    filter.insert("ispre".to_string(), json!({ "$ne": true }));
    let param = SearchParam::new(TABLE_OBJECT_DES, filter).with_fields([
        "id",
        FIELD_OBJ_ID,
        FIELD_OBJ_NAME,
    ]);
    let documents = ctx.run(store.search_auth_resource(ctx, param)).await?;
    documents
        .into_iter()
        .map(|document| {
            serde_json::from_value(Value::Object(document))
                .map_err(|e| AuthzError::ParamInvalid(format!("model in {}: {}", TABLE_OBJECT_DES, e)))
        })
        .collect()
}
