//! Permission-to-apply: what a denied subject would need to be granted.

use crate::adaptor::{convert_resource, parse_iam_path_to_ancestors};
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::fields::{
    is_resource_id_string_type, resource_id_field, resource_name_field, resource_table,
    FIELD_OBJ_ID, FIELD_OBJ_NAME, TABLE_OBJECT_DES,
};
use crate::generator::gen_iam_resource;
use crate::iam::{action_display_name, ActionId, TypeId, SYSTEM_ID_CMDB, SYSTEM_NAME_CMDB};
use crate::resource::{Resource, ResourceAttribute};
use crate::store::{model_object_id, Document, Filter, ResourceStore, SearchParam};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IamPermission {
    pub system_id: String,
    pub system_name: String,
    #[serde(default)]
    pub actions: Vec<IamAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IamAction {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub related_resource_types: Vec<IamResourceType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamResourceType {
    pub system_id: String,
    #[serde(default)]
    pub system_name: String,
    #[serde(rename = "type")]
    pub resource_type: TypeId,
    #[serde(default)]
    pub type_name: String,
    /// Instance chains, each ordered root to leaf.
    #[serde(default)]
    pub instances: Vec<Vec<IamResourceInstance>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamResourceInstance {
    #[serde(rename = "type")]
    pub resource_type: TypeId,
    #[serde(default)]
    pub type_name: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl IamResourceInstance {
    fn of(resource: &Resource) -> Self {
        Self {
            type_name: resource
                .resource_type
                .display_name()
                .unwrap_or_default()
                .to_string(),
            resource_type: resource.resource_type.clone(),
            id: resource.id.clone(),
            name: String::new(),
        }
    }
}

/// Aggregates denied attributes into an [`IamPermission`], resolving display
/// names from the store.
pub struct PermissionBuilder {
    store: Arc<dyn ResourceStore>,
    max_concurrency: usize,
}

impl PermissionBuilder {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            max_concurrency: 8,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub async fn build(
        &self,
        ctx: &RequestContext,
        attributes: &[ResourceAttribute],
    ) -> Result<IamPermission> {
        let mut permission = IamPermission {
            system_id: SYSTEM_ID_CMDB.to_string(),
            system_name: SYSTEM_NAME_CMDB.to_string(),
            actions: Vec::new(),
        };

        for attribute in attributes {
            let (type_id, action_id) = convert_resource(attribute)?;
            if action_id == ActionId::SKIP {
                continue;
            }
            let resources = gen_iam_resource(&action_id, &type_id, attribute)?;
            let action = action_entry(&mut permission, &action_id);
            for resource in &resources {
                let mut chain = parse_iam_path_to_ancestors(&resource.paths())?;
                if !resource.id.is_empty() {
                    chain.push(IamResourceInstance::of(resource));
                }
                let related = type_entry(action, &resource.resource_type);
                if !chain.is_empty() && !related.instances.contains(&chain) {
                    related.instances.push(chain);
                }
            }
        }

        self.resolve_names(ctx, &mut permission).await?;
        debug!(
            rid = %ctx.rid,
            actions = permission.actions.len(),
            "built permission to apply"
        );
        Ok(permission)
    }

    async fn resolve_names(&self, ctx: &RequestContext, permission: &mut IamPermission) -> Result<()> {
        // type -> ids, first-seen order
        let mut wanted: Vec<(TypeId, Vec<String>)> = Vec::new();
        for action in &permission.actions {
            for related in &action.related_resource_types {
                for instance in related.instances.iter().flatten() {
                    let index = match wanted.iter().position(|(t, _)| *t == instance.resource_type)
                    {
                        Some(index) => index,
                        None => {
                            wanted.push((instance.resource_type.clone(), Vec::new()));
                            wanted.len() - 1
                        }
                    };
                    if !wanted[index].1.contains(&instance.id) {
                        wanted[index].1.push(instance.id.clone());
                    }
                }
            }
        }

        let mut sys_types: Vec<TypeId> = Vec::new();
        for action in &permission.actions {
            for related in &action.related_resource_types {
                if related.resource_type.is_sys_instance() && !sys_types.contains(&related.resource_type) {
                    sys_types.push(related.resource_type.clone());
                }
            }
        }
        for (type_id, _) in &wanted {
            if type_id.is_sys_instance() && !sys_types.contains(type_id) {
                sys_types.push(type_id.clone());
            }
        }

        let instance_names: HashMap<TypeId, HashMap<String, String>> = stream::iter(wanted)
            .map(|(type_id, ids)| async move {
                let names = self.instance_names(ctx, &type_id, &ids).await?;
                Ok::<_, AuthzError>((type_id, names))
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let model_names = self.model_names(ctx, &sys_types).await?;
        let type_name = |type_id: &TypeId| -> String {
            match model_names.get(type_id) {
                Some(name) => name.clone(),
                None => type_id.display_name().unwrap_or_default().to_string(),
            }
        };

        for action in &mut permission.actions {
            for related in &mut action.related_resource_types {
                related.type_name = type_name(&related.resource_type);
                for instance in related.instances.iter_mut().flatten() {
                    instance.type_name = type_name(&instance.resource_type);
                    if let Some(name) = instance_names
                        .get(&instance.resource_type)
                        .and_then(|names| names.get(&instance.id))
                    {
                        instance.name = name.clone();
                    }
                }
            }
        }
        Ok(())
    }

    /// One batched lookup for all instances of a type.
    async fn instance_names(
        &self,
        ctx: &RequestContext,
        type_id: &TypeId,
        ids: &[String],
    ) -> Result<HashMap<String, String>> {
        let (id_field, name_field, table) = match (
            resource_id_field(type_id),
            resource_name_field(type_id),
            resource_table(type_id),
        ) {
            (Some(id), Some(name), Some(table)) => (id, name, table),
            _ => {
                return Err(AuthzError::ParamInvalid(format!(
                    "resource type {}",
                    type_id
                )))
            }
        };

        let mut values = Vec::with_capacity(ids.len());
        for id in ids {
            values.push(instance_id_value(type_id, id)?);
        }
        let mut filter = Filter::new();
        filter.insert(id_field.to_string(), json!({ "$in": values }));
        if type_id.is_sys_instance() {
            let object_id = model_object_id(self.store.as_ref(), ctx, type_id).await?;
            filter.insert(FIELD_OBJ_ID.to_string(), Value::String(object_id));
        }

        let param = SearchParam::new(table, filter).with_fields([id_field, name_field]);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;
        Ok(documents
            .iter()
            .filter_map(|document| {
                Some((
                    document_text(document, id_field)?,
                    document_text(document, name_field)?,
                ))
            })
            .collect())
    }

    /// Model names of dynamic types, looked up in one batch.
    async fn model_names(
        &self,
        ctx: &RequestContext,
        sys_types: &[TypeId],
    ) -> Result<HashMap<TypeId, String>> {
        if sys_types.is_empty() {
            return Ok(HashMap::new());
        }
        let mut by_model = HashMap::with_capacity(sys_types.len());
        for type_id in sys_types {
            by_model.insert(type_id.sys_instance_model_id()?, type_id.clone());
        }
        let model_ids: Vec<i64> = by_model.keys().copied().collect();
        let param = SearchParam::new(TABLE_OBJECT_DES, model_filter(&model_ids))
            .with_fields(["id", FIELD_OBJ_NAME]);
        let documents = ctx.run(self.store.search_auth_resource(ctx, param)).await?;

        let mut names = HashMap::with_capacity(documents.len());
        for document in &documents {
            let model_id = document.get("id").and_then(Value::as_i64);
            let name = document_text(document, FIELD_OBJ_NAME);
            if let (Some(model_id), Some(name)) = (model_id, name) {
                if let Some(type_id) = by_model.get(&model_id) {
                    names.insert(type_id.clone(), name);
                }
            }
        }
        Ok(names)
    }
}

fn action_entry<'p>(permission: &'p mut IamPermission, action_id: &ActionId) -> &'p mut IamAction {
    let index = match permission
        .actions
        .iter()
        .position(|action| action.id == action_id.as_str())
    {
        Some(index) => index,
        None => {
            permission.actions.push(IamAction {
                id: action_id.to_string(),
                name: action_display_name(action_id).unwrap_or_default(),
                related_resource_types: Vec::new(),
            });
            permission.actions.len() - 1
        }
    };
    &mut permission.actions[index]
}

fn type_entry<'a>(action: &'a mut IamAction, type_id: &TypeId) -> &'a mut IamResourceType {
    let index = match action
        .related_resource_types
        .iter()
        .position(|related| related.resource_type == *type_id)
    {
        Some(index) => index,
        None => {
            action.related_resource_types.push(IamResourceType {
                system_id: SYSTEM_ID_CMDB.to_string(),
                system_name: SYSTEM_NAME_CMDB.to_string(),
                resource_type: type_id.clone(),
                type_name: String::new(),
                instances: Vec::new(),
            });
            action.related_resource_types.len() - 1
        }
    };
    &mut action.related_resource_types[index]
}

fn model_filter(model_ids: &[i64]) -> Filter {
    let mut filter = Filter::new();
    filter.insert("id".to_string(), json!({ "$in": model_ids }));
    filter
}

fn instance_id_value(type_id: &TypeId, id: &str) -> Result<Value> {
    if is_resource_id_string_type(type_id) {
        return Ok(Value::String(id.to_string()));
    }
    id.parse::<i64>().map(Value::from).map_err(|_| {
        AuthzError::Validation(format!("instance id {} of {} is not an integer", id, type_id))
    })
}

fn document_text(document: &Document, field: &str) -> Option<String> {
    match document.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{Action, ResourceType};
    use crate::resource::Layer;
    use crate::testing::MemoryStore;

    fn builder(store: Arc<MemoryStore>) -> PermissionBuilder {
        PermissionBuilder::new(store)
    }

    #[tokio::test]
    async fn test_same_action_and_type_share_one_entry() {
        let store = Arc::new(MemoryStore::new());
        store.insert("cc_ApplicationBase", json!({"bk_biz_id": 1, "bk_biz_name": "blueking"}));
        store.insert("cc_ApplicationBase", json!({"bk_biz_id": 2, "bk_biz_name": "game"}));

        let attributes = vec![
            ResourceAttribute::new(ResourceType::Business, Action::Update).with_instance(1),
            ResourceAttribute::new(ResourceType::Business, Action::Update).with_instance(2),
        ];
        let permission = builder(store.clone())
            .build(&RequestContext::new("test"), &attributes)
            .await
            .unwrap();

        assert_eq!(permission.system_id, "bk_cmdb");
        assert_eq!(permission.actions.len(), 1);
        let action = &permission.actions[0];
        assert_eq!(action.id, "edit_business");
        assert_eq!(action.related_resource_types.len(), 1);

        let related = &action.related_resource_types[0];
        assert_eq!(related.resource_type, TypeId::BUSINESS);
        assert_eq!(related.instances.len(), 2);
        assert_eq!(related.instances[0].last().unwrap().id, "1");
        assert_eq!(related.instances[0].last().unwrap().name, "blueking");
        assert_eq!(related.instances[1].last().unwrap().id, "2");
        assert_eq!(related.instances[1].last().unwrap().name, "game");

        // one batch for the business type
        assert_eq!(store.search_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_chains_are_merged() {
        let store = Arc::new(MemoryStore::new());
        let attribute = ResourceAttribute::new(ResourceType::Business, Action::Update).with_instance(1);
        let permission = builder(store)
            .build(&RequestContext::new("test"), &[attribute.clone(), attribute])
            .await
            .unwrap();
        assert_eq!(permission.actions[0].related_resource_types[0].instances.len(), 1);
    }

    #[tokio::test]
    async fn test_path_ancestors_precede_instance() {
        let store = Arc::new(MemoryStore::new());
        store.insert("cc_ApplicationBase", json!({"bk_biz_id": 3, "bk_biz_name": "blueking"}));
        store.insert("cc_HostBase", json!({"bk_host_id": 9, "bk_host_innerip": "10.0.0.9"}));

        let attribute = ResourceAttribute::new(ResourceType::HostInstance, Action::Update)
            .with_business(3)
            .with_instance(9)
            .with_layers(vec![Layer::new(ResourceType::Business, 3)]);
        let permission = builder(store)
            .build(&RequestContext::new("test"), &[attribute])
            .await
            .unwrap();

        let action = &permission.actions[0];
        assert_eq!(action.id, "edit_biz_host");
        let chain = &action.related_resource_types[0].instances[0];
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].resource_type, TypeId::BUSINESS);
        assert_eq!(chain[0].name, "blueking");
        assert_eq!(chain[0].type_name, "业务");
        assert_eq!(chain[1].resource_type, TypeId::HOST);
        assert_eq!(chain[1].name, "10.0.0.9");
    }

    #[tokio::test]
    async fn test_sys_instance_names_come_from_model() {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            "cc_ObjDes",
            json!({"id": 4, "bk_obj_id": "switch", "bk_obj_name": "Switch"}),
        );
        store.insert(
            "cc_ObjectBase",
            json!({"bk_inst_id": 11, "bk_obj_id": "switch", "bk_inst_name": "core-sw"}),
        );

        let attribute =
            ResourceAttribute::new(ResourceType::SysInstance(4), Action::Update).with_instance(11);
        let permission = builder(store)
            .build(&RequestContext::new("test"), &[attribute])
            .await
            .unwrap();

        let action = &permission.actions[0];
        assert_eq!(action.id, "edit_sys_instance_4");
        let related = &action.related_resource_types[0];
        assert_eq!(related.type_name, "Switch");
        assert_eq!(related.instances[0][0].name, "core-sw");
    }

    #[tokio::test]
    async fn test_types_without_name_fields_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut permission = IamPermission::default();
        let action = action_entry(&mut permission, &ActionId::FIND_AUDIT_LOG);
        type_entry(action, &TypeId::SYS_AUDIT_LOG).instances.push(vec![IamResourceInstance {
            resource_type: TypeId::SYS_AUDIT_LOG,
            type_name: String::new(),
            id: "1".into(),
            name: String::new(),
        }]);

        let result = builder(store)
            .resolve_names(&RequestContext::new("test"), &mut permission)
            .await;
        assert!(matches!(result, Err(AuthzError::ParamInvalid(_))));
    }

    #[tokio::test]
    async fn test_create_without_parent_lists_action_only() {
        let store = Arc::new(MemoryStore::new());
        let attribute = ResourceAttribute::new(ResourceType::Business, Action::Create);
        let permission = builder(store)
            .build(&RequestContext::new("test"), &[attribute])
            .await
            .unwrap();
        assert_eq!(permission.actions[0].id, "create_business");
        assert!(permission.actions[0].related_resource_types.is_empty());
    }
}
