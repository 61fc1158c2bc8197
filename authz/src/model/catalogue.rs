//! The model CMDB registers: the static catalogue of resource types,
//! selections and actions, plus the dynamic entries of each CMDB model.

use super::{
    ActionGroup, ActionWithId, CommonAction, CreatorRelatedAction, InstanceSelection,
    ModelObject, RelateResourceType, RelatedInstanceSelection, ResourceAction, ResourceChain,
    ResourceConfig, ResourceCreatorAction, ResourceCreatorActions, ResourceType, Parent,
    MODEL_VERSION, RESOURCE_PROVIDER_PATH,
};
use crate::error::{AuthzError, Result};
use crate::iam::{action_display_name, ActionId, ActionType, TypeId, SYSTEM_ID_CMDB};

pub const SEL_BUSINESS: &str = "business";
pub const SEL_BIZ_SET: &str = "business_set_list";
pub const SEL_BIZ_FOR_HOST_TRANS: &str = "biz_for_host_trans";
pub const SEL_BIZ_HOST: &str = "biz_host_instance";
pub const SEL_POOL_HOST: &str = "sys_host_instance";
pub const SEL_POOL_DIRECTORY: &str = "sys_resource_pool_directory";
pub const SEL_HOST_RSC_POOL_DIRECTORY: &str = "sys_host_rsc_pool_directory";
pub const SEL_CUSTOM_QUERY: &str = "biz_custom_query";
pub const SEL_SERVICE_TEMPLATE: &str = "biz_process_service_template";
pub const SEL_SERVICE_CATEGORY: &str = "biz_process_service_category";
pub const SEL_SERVICE_INSTANCE: &str = "biz_process_service_instance";
pub const SEL_SET_TEMPLATE: &str = "biz_set_template";
pub const SEL_MODEL_GROUP: &str = "sys_model_group";
pub const SEL_MODEL: &str = "sys_model";
pub const SEL_INSTANCE_MODEL: &str = "instance_model";
pub const SEL_ASSOCIATION_TYPE: &str = "sys_association_type";
pub const SEL_CLOUD_AREA: &str = "sys_cloud_area";
pub const SEL_CLOUD_ACCOUNT: &str = "sys_cloud_account";
pub const SEL_CLOUD_RESOURCE_TASK: &str = "sys_cloud_resource_task";
pub const SEL_MODEL_EVENT: &str = "sys_model_event";
pub const SEL_MAINLINE_MODEL_EVENT: &str = "mainline_model_event";
pub const SEL_INST_ASST_EVENT: &str = "inst_asst_event";
pub const SEL_KUBE_WORKLOAD_EVENT: &str = "kube_workload_event";

const SELECTION_MODE_ALL: &str = "all";

const CREATE: &str = "create";
const EDIT: &str = "edit";
const DELETE: &str = "delete";
const VIEW: &str = "view";

/// A model must carry its id, object id and name to get dynamic entries.
pub fn validate_object(object: &ModelObject) -> Result<()> {
    if object.id == 0 {
        return Err(AuthzError::Validation(format!(
            "model {} has no id",
            object.bk_obj_id
        )));
    }
    if object.bk_obj_id.is_empty() || object.bk_obj_name.is_empty() {
        return Err(AuthzError::Validation(format!(
            "model {} has no object id or name",
            object.id
        )));
    }
    Ok(())
}

fn chain(types: &[TypeId]) -> Vec<ResourceChain> {
    types
        .iter()
        .map(|id| ResourceChain {
            system_id: SYSTEM_ID_CMDB.to_string(),
            id: id.clone(),
        })
        .collect()
}

fn provider_config() -> ResourceConfig {
    ResourceConfig {
        path: RESOURCE_PROVIDER_PATH.to_string(),
    }
}

fn static_types() -> Vec<(TypeId, &'static str, Vec<TypeId>)> {
    vec![
        (TypeId::BUSINESS, "Business", vec![]),
        (TypeId::BIZ_SET, "Business Set", vec![]),
        (TypeId::BUSINESS_FOR_HOST_TRANS, "Business For Host Transfer", vec![]),
        (
            TypeId::HOST,
            "Host",
            vec![TypeId::BUSINESS, TypeId::SYS_RESOURCE_POOL_DIRECTORY],
        ),
        (TypeId::SYS_RESOURCE_POOL_DIRECTORY, "Host Pool Directory", vec![]),
        (TypeId::SYS_HOST_RSC_POOL_DIRECTORY, "Host Pool Host", vec![]),
        (TypeId::BIZ_CUSTOM_QUERY, "Dynamic Grouping", vec![TypeId::BUSINESS]),
        (
            TypeId::BIZ_PROCESS_SERVICE_TEMPLATE,
            "Service Template",
            vec![TypeId::BUSINESS],
        ),
        (
            TypeId::BIZ_PROCESS_SERVICE_CATEGORY,
            "Service Category",
            vec![TypeId::BUSINESS],
        ),
        (
            TypeId::BIZ_PROCESS_SERVICE_INSTANCE,
            "Service Instance",
            vec![TypeId::BUSINESS],
        ),
        (TypeId::BIZ_SET_TEMPLATE, "Set Template", vec![TypeId::BUSINESS]),
        (TypeId::SYS_MODEL_GROUP, "Model Group", vec![]),
        (TypeId::SYS_MODEL, "Model", vec![]),
        (TypeId::SYS_INSTANCE_MODEL, "Instance Model", vec![]),
        (TypeId::SYS_ASSOCIATION_TYPE, "Association Type", vec![]),
        (TypeId::SYS_CLOUD_AREA, "Cloud Area", vec![]),
        (TypeId::SYS_CLOUD_ACCOUNT, "Cloud Account", vec![]),
        (TypeId::SYS_CLOUD_RESOURCE_TASK, "Cloud Resource Task", vec![]),
        (TypeId::SYS_MODEL_EVENT, "Model Event", vec![]),
        (TypeId::MAINLINE_MODEL_EVENT, "Mainline Model Event", vec![]),
        (TypeId::INST_ASST_EVENT, "Instance Association Event", vec![]),
        (TypeId::KUBE_WORKLOAD_EVENT, "Container Workload Event", vec![]),
    ]
}

/// Static resource types followed by one type per model.
pub fn resource_types(objects: &[ModelObject]) -> Vec<ResourceType> {
    let mut types: Vec<ResourceType> = static_types()
        .into_iter()
        .map(|(id, name_en, parents)| ResourceType {
            name: id.display_name().unwrap_or_default().to_string(),
            name_en: name_en.to_string(),
            description: String::new(),
            description_en: String::new(),
            parents: parents
                .into_iter()
                .map(|id| Parent {
                    system_id: SYSTEM_ID_CMDB.to_string(),
                    id,
                })
                .collect(),
            provider_config: provider_config(),
            version: MODEL_VERSION,
            id,
        })
        .collect();
    types.extend(dynamic_resource_types(objects));
    types
}

fn static_selections() -> Vec<(&'static str, &'static str, &'static str, Vec<TypeId>)> {
    vec![
        (SEL_BUSINESS, "业务列表", "Business List", vec![TypeId::BUSINESS]),
        (SEL_BIZ_SET, "业务集列表", "Business Set List", vec![TypeId::BIZ_SET]),
        (
            SEL_BIZ_FOR_HOST_TRANS,
            "业务主机转移列表",
            "Business For Host Transfer List",
            vec![TypeId::BUSINESS_FOR_HOST_TRANS],
        ),
        (
            SEL_BIZ_HOST,
            "业务主机",
            "Business Host",
            vec![TypeId::BUSINESS, TypeId::HOST],
        ),
        (
            SEL_POOL_HOST,
            "主机池主机",
            "Host Pool Host",
            vec![TypeId::SYS_RESOURCE_POOL_DIRECTORY, TypeId::HOST],
        ),
        (
            SEL_POOL_DIRECTORY,
            "主机池目录列表",
            "Host Pool Directory List",
            vec![TypeId::SYS_RESOURCE_POOL_DIRECTORY],
        ),
        (
            SEL_HOST_RSC_POOL_DIRECTORY,
            "主机池主机目录列表",
            "Host Pool Host Directory List",
            vec![TypeId::SYS_HOST_RSC_POOL_DIRECTORY],
        ),
        (
            SEL_CUSTOM_QUERY,
            "业务动态分组列表",
            "Dynamic Grouping List",
            vec![TypeId::BUSINESS, TypeId::BIZ_CUSTOM_QUERY],
        ),
        (
            SEL_SERVICE_TEMPLATE,
            "服务模板列表",
            "Service Template List",
            vec![TypeId::BUSINESS, TypeId::BIZ_PROCESS_SERVICE_TEMPLATE],
        ),
        (
            SEL_SERVICE_CATEGORY,
            "服务分类列表",
            "Service Category List",
            vec![TypeId::BUSINESS, TypeId::BIZ_PROCESS_SERVICE_CATEGORY],
        ),
        (
            SEL_SERVICE_INSTANCE,
            "服务实例列表",
            "Service Instance List",
            vec![TypeId::BUSINESS, TypeId::BIZ_PROCESS_SERVICE_INSTANCE],
        ),
        (
            SEL_SET_TEMPLATE,
            "集群模板列表",
            "Set Template List",
            vec![TypeId::BUSINESS, TypeId::BIZ_SET_TEMPLATE],
        ),
        (
            SEL_MODEL_GROUP,
            "模型分组列表",
            "Model Group List",
            vec![TypeId::SYS_MODEL_GROUP],
        ),
        (SEL_MODEL, "模型列表", "Model List", vec![TypeId::SYS_MODEL]),
        (
            SEL_INSTANCE_MODEL,
            "实例模型列表",
            "Instance Model List",
            vec![TypeId::SYS_INSTANCE_MODEL],
        ),
        (
            SEL_ASSOCIATION_TYPE,
            "关联类型列表",
            "Association Type List",
            vec![TypeId::SYS_ASSOCIATION_TYPE],
        ),
        (
            SEL_CLOUD_AREA,
            "管控区域列表",
            "Cloud Area List",
            vec![TypeId::SYS_CLOUD_AREA],
        ),
        (
            SEL_CLOUD_ACCOUNT,
            "云账户列表",
            "Cloud Account List",
            vec![TypeId::SYS_CLOUD_ACCOUNT],
        ),
        (
            SEL_CLOUD_RESOURCE_TASK,
            "云资源发现任务列表",
            "Cloud Resource Task List",
            vec![TypeId::SYS_CLOUD_RESOURCE_TASK],
        ),
        (
            SEL_MODEL_EVENT,
            "模型事件列表",
            "Model Event List",
            vec![TypeId::SYS_MODEL_EVENT],
        ),
        (
            SEL_MAINLINE_MODEL_EVENT,
            "主线模型事件列表",
            "Mainline Model Event List",
            vec![TypeId::MAINLINE_MODEL_EVENT],
        ),
        (
            SEL_INST_ASST_EVENT,
            "实例关联事件列表",
            "Instance Association Event List",
            vec![TypeId::INST_ASST_EVENT],
        ),
        (
            SEL_KUBE_WORKLOAD_EVENT,
            "容器工作负载事件列表",
            "Container Workload Event List",
            vec![TypeId::KUBE_WORKLOAD_EVENT],
        ),
    ]
}

/// Static selections followed by one selection per model.
pub fn instance_selections(objects: &[ModelObject]) -> Vec<InstanceSelection> {
    let mut selections: Vec<InstanceSelection> = static_selections()
        .into_iter()
        .map(|(id, name, name_en, types)| InstanceSelection {
            id: id.to_string(),
            name: name.to_string(),
            name_en: name_en.to_string(),
            resource_type_chain: chain(&types),
        })
        .collect();
    selections.extend(dynamic_instance_selections(objects));
    selections
}

fn english_name(action: &ActionId) -> String {
    let spaced = action.as_str().replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

fn relate(type_id: TypeId, selections: &[&str]) -> RelateResourceType {
    RelateResourceType {
        system_id: SYSTEM_ID_CMDB.to_string(),
        id: type_id,
        name_alias: String::new(),
        name_alias_en: String::new(),
        scope: None,
        selection_mode: String::new(),
        instance_selections: selections
            .iter()
            .map(|id| RelatedInstanceSelection {
                system_id: SYSTEM_ID_CMDB.to_string(),
                id: id.to_string(),
                ignore_iam_path: false,
            })
            .collect(),
    }
}

fn action(id: ActionId, action_type: &str, related: Vec<RelateResourceType>) -> ResourceAction {
    ResourceAction {
        name: action_display_name(&id).unwrap_or_else(|| id.to_string()),
        name_en: english_name(&id),
        action_type: action_type.to_string(),
        related_resource_types: related,
        related_actions: Vec::new(),
        version: MODEL_VERSION,
        id,
    }
}

/// Create, edit and delete of one resource managed through a single selection.
fn crud(
    create: ActionId,
    edit: ActionId,
    delete: ActionId,
    parent: Option<RelateResourceType>,
    own: RelateResourceType,
) -> Vec<ResourceAction> {
    vec![
        action(create, CREATE, parent.into_iter().collect()),
        action(edit, EDIT, vec![own.clone()]),
        action(delete, DELETE, vec![own]),
    ]
}

fn static_actions() -> Vec<ResourceAction> {
    use ActionId as A;
    use TypeId as T;

    let biz = || relate(T::BUSINESS, &[SEL_BUSINESS]);
    let biz_set = || relate(T::BIZ_SET, &[SEL_BIZ_SET]);
    let pool_directory = || relate(T::SYS_RESOURCE_POOL_DIRECTORY, &[SEL_POOL_DIRECTORY]);

    let mut actions = vec![
        action(A::CREATE_BUSINESS, CREATE, vec![]),
        action(A::EDIT_BUSINESS, EDIT, vec![biz()]),
        action(A::ARCHIVE_BUSINESS, EDIT, vec![biz()]),
        action(A::FIND_BUSINESS, VIEW, vec![biz()]),
        action(A::VIEW_BUSINESS_RESOURCE, VIEW, vec![biz()]),
        action(A::CREATE_BIZ_SET, CREATE, vec![]),
        action(A::EDIT_BIZ_SET, EDIT, vec![biz_set()]),
        action(A::DELETE_BIZ_SET, DELETE, vec![biz_set()]),
        action(A::VIEW_BIZ_SET, VIEW, vec![biz_set()]),
        action(A::ACCESS_BIZ_SET, VIEW, vec![biz_set()]),
        action(A::EDIT_BUSINESS_CUSTOM_FIELD, EDIT, vec![biz()]),
        action(A::EDIT_BUSINESS_HOST_APPLY, EDIT, vec![biz()]),
    ];
    actions.extend(crud(
        A::CREATE_BUSINESS_CUSTOM_QUERY,
        A::EDIT_BUSINESS_CUSTOM_QUERY,
        A::DELETE_BUSINESS_CUSTOM_QUERY,
        Some(biz()),
        relate(T::BIZ_CUSTOM_QUERY, &[SEL_CUSTOM_QUERY]),
    ));
    // Categories and service instances are authorized on their business.
    actions.extend(crud(
        A::CREATE_BUSINESS_SERVICE_CATEGORY,
        A::EDIT_BUSINESS_SERVICE_CATEGORY,
        A::DELETE_BUSINESS_SERVICE_CATEGORY,
        Some(biz()),
        biz(),
    ));
    actions.extend(crud(
        A::CREATE_BUSINESS_SERVICE_INSTANCE,
        A::EDIT_BUSINESS_SERVICE_INSTANCE,
        A::DELETE_BUSINESS_SERVICE_INSTANCE,
        Some(biz()),
        biz(),
    ));
    actions.extend(crud(
        A::CREATE_BUSINESS_SERVICE_TEMPLATE,
        A::EDIT_BUSINESS_SERVICE_TEMPLATE,
        A::DELETE_BUSINESS_SERVICE_TEMPLATE,
        Some(biz()),
        relate(T::BIZ_PROCESS_SERVICE_TEMPLATE, &[SEL_SERVICE_TEMPLATE]),
    ));
    actions.extend(crud(
        A::CREATE_BUSINESS_SET_TEMPLATE,
        A::EDIT_BUSINESS_SET_TEMPLATE,
        A::DELETE_BUSINESS_SET_TEMPLATE,
        Some(biz()),
        relate(T::BIZ_SET_TEMPLATE, &[SEL_SET_TEMPLATE]),
    ));
    actions.extend(crud(
        A::CREATE_BUSINESS_TOPOLOGY,
        A::EDIT_BUSINESS_TOPOLOGY,
        A::DELETE_BUSINESS_TOPOLOGY,
        Some(biz()),
        biz(),
    ));
    actions.extend(crud(
        A::CREATE_RESOURCE_POOL_HOST,
        A::EDIT_RESOURCE_POOL_HOST,
        A::DELETE_RESOURCE_POOL_HOST,
        Some(pool_directory()),
        relate(T::HOST, &[SEL_POOL_HOST]),
    ));
    actions.extend([
        action(
            A::EDIT_BUSINESS_HOST,
            EDIT,
            vec![relate(T::HOST, &[SEL_BIZ_HOST])],
        ),
        action(
            A::RESOURCE_POOL_HOST_TRANSFER_TO_BUSINESS,
            EDIT,
            vec![
                relate(T::SYS_HOST_RSC_POOL_DIRECTORY, &[SEL_HOST_RSC_POOL_DIRECTORY]),
                biz(),
            ],
        ),
        action(
            A::RESOURCE_POOL_HOST_TRANSFER_TO_DIRECTORY,
            EDIT,
            vec![
                relate(T::SYS_HOST_RSC_POOL_DIRECTORY, &[SEL_HOST_RSC_POOL_DIRECTORY]),
                pool_directory(),
            ],
        ),
        action(
            A::BUSINESS_HOST_TRANSFER_TO_RESOURCE_POOL,
            EDIT,
            vec![biz(), pool_directory()],
        ),
        action(
            A::HOST_TRANSFER_ACROSS_BUSINESS,
            EDIT,
            vec![
                relate(T::BUSINESS_FOR_HOST_TRANS, &[SEL_BIZ_FOR_HOST_TRANS]),
                biz(),
            ],
        ),
    ]);
    actions.extend(crud(
        A::CREATE_RESOURCE_POOL_DIRECTORY,
        A::EDIT_RESOURCE_POOL_DIRECTORY,
        A::DELETE_RESOURCE_POOL_DIRECTORY,
        None,
        pool_directory(),
    ));
    actions.extend(crud(
        A::CREATE_CLOUD_AREA,
        A::EDIT_CLOUD_AREA,
        A::DELETE_CLOUD_AREA,
        None,
        relate(T::SYS_CLOUD_AREA, &[SEL_CLOUD_AREA]),
    ));
    let account = relate(T::SYS_CLOUD_ACCOUNT, &[SEL_CLOUD_ACCOUNT]);
    actions.extend(crud(
        A::CREATE_CLOUD_ACCOUNT,
        A::EDIT_CLOUD_ACCOUNT,
        A::DELETE_CLOUD_ACCOUNT,
        None,
        account.clone(),
    ));
    actions.push(action(A::FIND_CLOUD_ACCOUNT, VIEW, vec![account]));
    let task = relate(T::SYS_CLOUD_RESOURCE_TASK, &[SEL_CLOUD_RESOURCE_TASK]);
    actions.extend(crud(
        A::CREATE_CLOUD_RESOURCE_TASK,
        A::EDIT_CLOUD_RESOURCE_TASK,
        A::DELETE_CLOUD_RESOURCE_TASK,
        None,
        task.clone(),
    ));
    actions.push(action(A::FIND_CLOUD_RESOURCE_TASK, VIEW, vec![task]));
    actions.extend(crud(
        A::CREATE_SYS_MODEL,
        A::EDIT_SYS_MODEL,
        A::DELETE_SYS_MODEL,
        Some(relate(T::SYS_MODEL_GROUP, &[SEL_MODEL_GROUP])),
        relate(T::SYS_MODEL, &[SEL_MODEL]),
    ));
    actions.extend(crud(
        A::CREATE_ASSOCIATION_TYPE,
        A::EDIT_ASSOCIATION_TYPE,
        A::DELETE_ASSOCIATION_TYPE,
        None,
        relate(T::SYS_ASSOCIATION_TYPE, &[SEL_ASSOCIATION_TYPE]),
    ));
    actions.extend(crud(
        A::CREATE_MODEL_GROUP,
        A::EDIT_MODEL_GROUP,
        A::DELETE_MODEL_GROUP,
        None,
        relate(T::SYS_MODEL_GROUP, &[SEL_MODEL_GROUP]),
    ));
    for (id, action_type) in [
        (A::EDIT_BUSINESS_LAYER, EDIT),
        (A::EDIT_MODEL_TOPOLOGY_VIEW, EDIT),
        (A::FIND_OPERATION_STATISTIC, VIEW),
        (A::EDIT_OPERATION_STATISTIC, EDIT),
        (A::FIND_AUDIT_LOG, VIEW),
        (A::GLOBAL_SETTINGS, EDIT),
        (A::WATCH_HOST_EVENT, VIEW),
        (A::WATCH_HOST_RELATION_EVENT, VIEW),
        (A::WATCH_BIZ_EVENT, VIEW),
        (A::WATCH_SET_EVENT, VIEW),
        (A::WATCH_MODULE_EVENT, VIEW),
        (A::WATCH_PROCESS_EVENT, VIEW),
        (A::WATCH_BIZ_SET_EVENT, VIEW),
        (A::WATCH_KUBE_CLUSTER_EVENT, VIEW),
        (A::WATCH_KUBE_NODE_EVENT, VIEW),
        (A::WATCH_KUBE_NAMESPACE_EVENT, VIEW),
        (A::WATCH_KUBE_POD_EVENT, VIEW),
        (A::CREATE_CONTAINER_CLUSTER, CREATE),
        (A::EDIT_CONTAINER_CLUSTER, EDIT),
        (A::DELETE_CONTAINER_CLUSTER, DELETE),
        (A::CREATE_CONTAINER_NODE, CREATE),
        (A::EDIT_CONTAINER_NODE, EDIT),
        (A::DELETE_CONTAINER_NODE, DELETE),
        (A::CREATE_CONTAINER_NAMESPACE, CREATE),
        (A::EDIT_CONTAINER_NAMESPACE, EDIT),
        (A::DELETE_CONTAINER_NAMESPACE, DELETE),
        (A::CREATE_CONTAINER_WORKLOAD, CREATE),
        (A::EDIT_CONTAINER_WORKLOAD, EDIT),
        (A::DELETE_CONTAINER_WORKLOAD, DELETE),
        (A::CREATE_CONTAINER_POD, CREATE),
        (A::DELETE_CONTAINER_POD, DELETE),
    ] {
        actions.push(action(id, action_type, vec![]));
    }
    actions.extend([
        action(
            A::WATCH_COMMON_INSTANCE_EVENT,
            VIEW,
            vec![relate(T::SYS_MODEL_EVENT, &[SEL_MODEL_EVENT])],
        ),
        action(
            A::WATCH_MAINLINE_INSTANCE_EVENT,
            VIEW,
            vec![relate(T::MAINLINE_MODEL_EVENT, &[SEL_MAINLINE_MODEL_EVENT])],
        ),
        action(
            A::WATCH_INST_ASST_EVENT,
            VIEW,
            vec![relate(T::INST_ASST_EVENT, &[SEL_INST_ASST_EVENT])],
        ),
        action(
            A::WATCH_KUBE_WORKLOAD_EVENT,
            VIEW,
            vec![relate(T::KUBE_WORKLOAD_EVENT, &[SEL_KUBE_WORKLOAD_EVENT])],
        ),
    ]);
    actions
}

/// Static actions followed by the create, edit and delete actions of each model.
pub fn actions(objects: &[ModelObject]) -> Vec<ResourceAction> {
    let mut actions = static_actions();
    actions.extend(dynamic_actions(objects));
    actions
}

fn with_ids(ids: &[ActionId]) -> Vec<ActionWithId> {
    ids.iter().map(|id| ActionWithId { id: id.clone() }).collect()
}

fn group(name: &str, name_en: &str, actions: &[ActionId]) -> ActionGroup {
    ActionGroup {
        name: name.to_string(),
        name_en: name_en.to_string(),
        sub_groups: Vec::new(),
        actions: with_ids(actions),
    }
}

fn parent_group(name: &str, name_en: &str, sub_groups: Vec<ActionGroup>) -> ActionGroup {
    ActionGroup {
        name: name.to_string(),
        name_en: name_en.to_string(),
        sub_groups,
        actions: Vec::new(),
    }
}

fn dynamic_action_ids(object: &ModelObject) -> [ActionId; 3] {
    [
        ActionId::sys_instance(ActionType::Create, object.id),
        ActionId::sys_instance(ActionType::Edit, object.id),
        ActionId::sys_instance(ActionType::Delete, object.id),
    ]
}

/// How actions are presented in the authority's console. Every generated
/// action belongs to exactly one group.
pub fn action_groups(objects: &[ModelObject]) -> Vec<ActionGroup> {
    use ActionId as A;

    let mut groups = vec![
        parent_group(
            "业务",
            "Business",
            vec![
                group(
                    "业务",
                    "Business",
                    &[
                        A::CREATE_BUSINESS,
                        A::EDIT_BUSINESS,
                        A::ARCHIVE_BUSINESS,
                        A::FIND_BUSINESS,
                        A::VIEW_BUSINESS_RESOURCE,
                        A::EDIT_BUSINESS_CUSTOM_FIELD,
                    ],
                ),
                group(
                    "业务主机",
                    "Business Host",
                    &[
                        A::EDIT_BUSINESS_HOST,
                        A::BUSINESS_HOST_TRANSFER_TO_RESOURCE_POOL,
                        A::HOST_TRANSFER_ACROSS_BUSINESS,
                        A::EDIT_BUSINESS_HOST_APPLY,
                    ],
                ),
                group(
                    "业务拓扑",
                    "Business Topology",
                    &[
                        A::CREATE_BUSINESS_TOPOLOGY,
                        A::EDIT_BUSINESS_TOPOLOGY,
                        A::DELETE_BUSINESS_TOPOLOGY,
                        A::CREATE_BUSINESS_CUSTOM_QUERY,
                        A::EDIT_BUSINESS_CUSTOM_QUERY,
                        A::DELETE_BUSINESS_CUSTOM_QUERY,
                    ],
                ),
                group(
                    "服务管理",
                    "Service Management",
                    &[
                        A::CREATE_BUSINESS_SERVICE_CATEGORY,
                        A::EDIT_BUSINESS_SERVICE_CATEGORY,
                        A::DELETE_BUSINESS_SERVICE_CATEGORY,
                        A::CREATE_BUSINESS_SERVICE_INSTANCE,
                        A::EDIT_BUSINESS_SERVICE_INSTANCE,
                        A::DELETE_BUSINESS_SERVICE_INSTANCE,
                        A::CREATE_BUSINESS_SERVICE_TEMPLATE,
                        A::EDIT_BUSINESS_SERVICE_TEMPLATE,
                        A::DELETE_BUSINESS_SERVICE_TEMPLATE,
                        A::CREATE_BUSINESS_SET_TEMPLATE,
                        A::EDIT_BUSINESS_SET_TEMPLATE,
                        A::DELETE_BUSINESS_SET_TEMPLATE,
                    ],
                ),
            ],
        ),
        group(
            "业务集",
            "Business Set",
            &[
                A::CREATE_BIZ_SET,
                A::EDIT_BIZ_SET,
                A::DELETE_BIZ_SET,
                A::VIEW_BIZ_SET,
                A::ACCESS_BIZ_SET,
            ],
        ),
        group(
            "主机池",
            "Host Pool",
            &[
                A::CREATE_RESOURCE_POOL_HOST,
                A::EDIT_RESOURCE_POOL_HOST,
                A::DELETE_RESOURCE_POOL_HOST,
                A::RESOURCE_POOL_HOST_TRANSFER_TO_BUSINESS,
                A::RESOURCE_POOL_HOST_TRANSFER_TO_DIRECTORY,
                A::CREATE_RESOURCE_POOL_DIRECTORY,
                A::EDIT_RESOURCE_POOL_DIRECTORY,
                A::DELETE_RESOURCE_POOL_DIRECTORY,
            ],
        ),
        group(
            "云资源",
            "Cloud Resource",
            &[
                A::CREATE_CLOUD_AREA,
                A::EDIT_CLOUD_AREA,
                A::DELETE_CLOUD_AREA,
                A::CREATE_CLOUD_ACCOUNT,
                A::EDIT_CLOUD_ACCOUNT,
                A::DELETE_CLOUD_ACCOUNT,
                A::FIND_CLOUD_ACCOUNT,
                A::CREATE_CLOUD_RESOURCE_TASK,
                A::EDIT_CLOUD_RESOURCE_TASK,
                A::DELETE_CLOUD_RESOURCE_TASK,
                A::FIND_CLOUD_RESOURCE_TASK,
            ],
        ),
        group(
            "模型",
            "Model",
            &[
                A::CREATE_SYS_MODEL,
                A::EDIT_SYS_MODEL,
                A::DELETE_SYS_MODEL,
                A::CREATE_MODEL_GROUP,
                A::EDIT_MODEL_GROUP,
                A::DELETE_MODEL_GROUP,
                A::CREATE_ASSOCIATION_TYPE,
                A::EDIT_ASSOCIATION_TYPE,
                A::DELETE_ASSOCIATION_TYPE,
                A::EDIT_BUSINESS_LAYER,
                A::EDIT_MODEL_TOPOLOGY_VIEW,
            ],
        ),
        group(
            "事件监听",
            "Event Watch",
            &[
                A::WATCH_HOST_EVENT,
                A::WATCH_HOST_RELATION_EVENT,
                A::WATCH_BIZ_EVENT,
                A::WATCH_SET_EVENT,
                A::WATCH_MODULE_EVENT,
                A::WATCH_PROCESS_EVENT,
                A::WATCH_COMMON_INSTANCE_EVENT,
                A::WATCH_MAINLINE_INSTANCE_EVENT,
                A::WATCH_INST_ASST_EVENT,
                A::WATCH_BIZ_SET_EVENT,
                A::WATCH_KUBE_CLUSTER_EVENT,
                A::WATCH_KUBE_NODE_EVENT,
                A::WATCH_KUBE_NAMESPACE_EVENT,
                A::WATCH_KUBE_WORKLOAD_EVENT,
                A::WATCH_KUBE_POD_EVENT,
            ],
        ),
        group(
            "容器",
            "Container",
            &[
                A::CREATE_CONTAINER_CLUSTER,
                A::EDIT_CONTAINER_CLUSTER,
                A::DELETE_CONTAINER_CLUSTER,
                A::CREATE_CONTAINER_NODE,
                A::EDIT_CONTAINER_NODE,
                A::DELETE_CONTAINER_NODE,
                A::CREATE_CONTAINER_NAMESPACE,
                A::EDIT_CONTAINER_NAMESPACE,
                A::DELETE_CONTAINER_NAMESPACE,
                A::CREATE_CONTAINER_WORKLOAD,
                A::EDIT_CONTAINER_WORKLOAD,
                A::DELETE_CONTAINER_WORKLOAD,
                A::CREATE_CONTAINER_POD,
                A::DELETE_CONTAINER_POD,
            ],
        ),
        group(
            "平台管理",
            "Platform Management",
            &[
                A::FIND_OPERATION_STATISTIC,
                A::EDIT_OPERATION_STATISTIC,
                A::FIND_AUDIT_LOG,
                A::GLOBAL_SETTINGS,
            ],
        ),
    ];

    if !objects.is_empty() {
        groups.push(parent_group(
            "模型实例管理",
            "Model Instance Management",
            objects
                .iter()
                .map(|object| {
                    group(
                        &object.bk_obj_name,
                        &object.bk_obj_id,
                        &dynamic_action_ids(object),
                    )
                })
                .collect(),
        ));
    }
    groups
}

fn creator(type_id: TypeId, actions: &[ActionId]) -> ResourceCreatorAction {
    ResourceCreatorAction {
        id: type_id,
        actions: actions
            .iter()
            .map(|id| CreatorRelatedAction {
                id: id.clone(),
                required: false,
            })
            .collect(),
        sub_resource_types: Vec::new(),
    }
}

/// Actions the creator of an instance is granted on it.
pub fn resource_creator_actions(objects: &[ModelObject]) -> ResourceCreatorActions {
    use ActionId as A;
    use TypeId as T;

    let mut business = creator(
        T::BUSINESS,
        &[
            A::EDIT_BUSINESS,
            A::ARCHIVE_BUSINESS,
            A::FIND_BUSINESS,
            A::VIEW_BUSINESS_RESOURCE,
        ],
    );
    business.sub_resource_types = vec![
        creator(
            T::BIZ_CUSTOM_QUERY,
            &[A::EDIT_BUSINESS_CUSTOM_QUERY, A::DELETE_BUSINESS_CUSTOM_QUERY],
        ),
        creator(
            T::BIZ_PROCESS_SERVICE_TEMPLATE,
            &[
                A::EDIT_BUSINESS_SERVICE_TEMPLATE,
                A::DELETE_BUSINESS_SERVICE_TEMPLATE,
            ],
        ),
        creator(
            T::BIZ_SET_TEMPLATE,
            &[A::EDIT_BUSINESS_SET_TEMPLATE, A::DELETE_BUSINESS_SET_TEMPLATE],
        ),
    ];
    let mut model_group = creator(
        T::SYS_MODEL_GROUP,
        &[A::EDIT_MODEL_GROUP, A::DELETE_MODEL_GROUP],
    );
    model_group.sub_resource_types = vec![creator(
        T::SYS_MODEL,
        &[A::EDIT_SYS_MODEL, A::DELETE_SYS_MODEL],
    )];

    let mut config = vec![
        business,
        creator(
            T::BIZ_SET,
            &[
                A::EDIT_BIZ_SET,
                A::DELETE_BIZ_SET,
                A::VIEW_BIZ_SET,
                A::ACCESS_BIZ_SET,
            ],
        ),
        model_group,
        creator(
            T::SYS_ASSOCIATION_TYPE,
            &[A::EDIT_ASSOCIATION_TYPE, A::DELETE_ASSOCIATION_TYPE],
        ),
        creator(
            T::SYS_RESOURCE_POOL_DIRECTORY,
            &[
                A::EDIT_RESOURCE_POOL_DIRECTORY,
                A::DELETE_RESOURCE_POOL_DIRECTORY,
            ],
        ),
        creator(T::SYS_CLOUD_AREA, &[A::EDIT_CLOUD_AREA, A::DELETE_CLOUD_AREA]),
        creator(
            T::SYS_CLOUD_ACCOUNT,
            &[
                A::EDIT_CLOUD_ACCOUNT,
                A::DELETE_CLOUD_ACCOUNT,
                A::FIND_CLOUD_ACCOUNT,
            ],
        ),
        creator(
            T::SYS_CLOUD_RESOURCE_TASK,
            &[
                A::EDIT_CLOUD_RESOURCE_TASK,
                A::DELETE_CLOUD_RESOURCE_TASK,
                A::FIND_CLOUD_RESOURCE_TASK,
            ],
        ),
    ];
    config.extend(objects.iter().map(|object| {
        let [_, edit, delete] = dynamic_action_ids(object);
        creator(TypeId::sys_instance(object.id), &[edit, delete])
    }));
    ResourceCreatorActions { config }
}

/// Action bundles offered as shortcuts when applying for permissions.
pub fn common_actions() -> Vec<CommonAction> {
    use ActionId as A;

    let bundle = |name: &str, name_en: &str, actions: &[ActionId]| CommonAction {
        name: name.to_string(),
        name_en: name_en.to_string(),
        actions: with_ids(actions),
    };
    vec![
        bundle(
            "业务运维",
            "Business Ops",
            &[
                A::FIND_BUSINESS,
                A::VIEW_BUSINESS_RESOURCE,
                A::EDIT_BUSINESS_HOST,
                A::CREATE_BUSINESS_TOPOLOGY,
                A::EDIT_BUSINESS_TOPOLOGY,
                A::DELETE_BUSINESS_TOPOLOGY,
                A::EDIT_BUSINESS_HOST_APPLY,
                A::CREATE_BUSINESS_SERVICE_INSTANCE,
                A::EDIT_BUSINESS_SERVICE_INSTANCE,
                A::DELETE_BUSINESS_SERVICE_INSTANCE,
            ],
        ),
        bundle(
            "主机池管理",
            "Host Pool Management",
            &[
                A::CREATE_RESOURCE_POOL_HOST,
                A::EDIT_RESOURCE_POOL_HOST,
                A::DELETE_RESOURCE_POOL_HOST,
                A::RESOURCE_POOL_HOST_TRANSFER_TO_BUSINESS,
                A::RESOURCE_POOL_HOST_TRANSFER_TO_DIRECTORY,
                A::CREATE_RESOURCE_POOL_DIRECTORY,
                A::EDIT_RESOURCE_POOL_DIRECTORY,
                A::DELETE_RESOURCE_POOL_DIRECTORY,
            ],
        ),
        bundle(
            "模型管理",
            "Model Management",
            &[
                A::CREATE_SYS_MODEL,
                A::EDIT_SYS_MODEL,
                A::DELETE_SYS_MODEL,
                A::CREATE_MODEL_GROUP,
                A::EDIT_MODEL_GROUP,
                A::DELETE_MODEL_GROUP,
                A::CREATE_ASSOCIATION_TYPE,
                A::EDIT_ASSOCIATION_TYPE,
                A::DELETE_ASSOCIATION_TYPE,
            ],
        ),
    ]
}

pub fn dynamic_resource_types(objects: &[ModelObject]) -> Vec<ResourceType> {
    objects
        .iter()
        .map(|object| ResourceType {
            id: TypeId::sys_instance(object.id),
            name: object.bk_obj_name.clone(),
            name_en: object.bk_obj_id.clone(),
            description: String::new(),
            description_en: String::new(),
            parents: Vec::new(),
            provider_config: provider_config(),
            version: MODEL_VERSION,
        })
        .collect()
}

pub fn dynamic_instance_selections(objects: &[ModelObject]) -> Vec<InstanceSelection> {
    objects
        .iter()
        .map(|object| {
            let type_id = TypeId::sys_instance(object.id);
            InstanceSelection {
                id: type_id.to_string(),
                name: object.bk_obj_name.clone(),
                name_en: object.bk_obj_id.clone(),
                resource_type_chain: chain(&[type_id]),
            }
        })
        .collect()
}

pub fn dynamic_actions(objects: &[ModelObject]) -> Vec<ResourceAction> {
    let mut actions = Vec::with_capacity(objects.len() * 3);
    for object in objects {
        let type_id = TypeId::sys_instance(object.id);
        let related = RelateResourceType {
            selection_mode: SELECTION_MODE_ALL.to_string(),
            ..relate(type_id.clone(), &[type_id.as_str()])
        };
        let [create, edit, delete] = dynamic_action_ids(object);
        for (id, action_type, verb, verb_en, related) in [
            (create, CREATE, "新建", "create", Vec::new()),
            (edit, EDIT, "编辑", "edit", vec![related.clone()]),
            (delete, DELETE, "删除", "delete", vec![related]),
        ] {
            actions.push(ResourceAction {
                id,
                name: format!("{}实例{}", object.bk_obj_name, verb),
                name_en: format!("{} {} instance", verb_en, object.bk_obj_id),
                action_type: action_type.to_string(),
                related_resource_types: related,
                related_actions: Vec::new(),
                version: MODEL_VERSION,
            });
        }
    }
    actions
}

/// Whether an instance selection id was generated for a model.
pub fn is_sys_instance_selection(id: &str) -> bool {
    TypeId::new(id).is_sys_instance()
}
