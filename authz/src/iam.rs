//! External IAM vocabulary: resource type ids, action ids and the dynamic
//! ids generated for CMDB models.

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// System id CMDB registers itself under in the authority.
pub const SYSTEM_ID_CMDB: &str = "bk_cmdb";
pub const SYSTEM_NAME_CMDB: &str = "配置平台";

/// Prefix of the dynamic type and action ids generated per model.
pub const IAM_SYS_INSTANCE_PREFIX: &str = "sys_instance_";

/// An external resource type id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub Cow<'static, str>);

/// An external action id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub Cow<'static, str>);

macro_rules! ids {
    ($ty:ident { $($name:ident = $value:literal,)+ }) => {
        impl $ty {
            $(pub const $name: $ty = $ty(Cow::Borrowed($value));)+
        }
    };
}

ids!(TypeId {
    BUSINESS = "biz",
    BIZ_SET = "business_set",
    BUSINESS_FOR_HOST_TRANS = "biz_for_host_trans",
    SYS_MODEL = "sys_model",
    SYS_MODEL_GROUP = "sys_model_group",
    SYS_INSTANCE_MODEL = "sys_instance_model",
    SYS_ASSOCIATION_TYPE = "sys_association_type",
    SYS_CLOUD_AREA = "sys_cloud_area",
    SYS_CLOUD_ACCOUNT = "sys_cloud_account",
    SYS_CLOUD_RESOURCE_TASK = "sys_cloud_resource_task",
    SYS_RESOURCE_POOL_DIRECTORY = "sys_resource_pool_directory",
    SYS_HOST_RSC_POOL_DIRECTORY = "sys_host_rsc_pool_directory",
    SYS_AUDIT_LOG = "sys_audit_log",
    SYS_OPERATION_STATISTIC = "sys_operation_statistic",
    SYS_EVENT_WATCH = "sys_event_watch",
    SYS_SYSTEM_BASE = "sys_system_base",
    SYS_MODEL_EVENT = "sys_model_event",
    MAINLINE_MODEL_EVENT = "mainline_model_event",
    INST_ASST_EVENT = "inst_asst_event",
    KUBE_WORKLOAD_EVENT = "kube_workload_event",
    HOST = "host",
    USER_CUSTOM = "user_custom",
    BIZ_CUSTOM_FIELD = "biz_custom_field",
    BIZ_CUSTOM_QUERY = "biz_custom_query",
    BIZ_TOPOLOGY = "biz_topology",
    BIZ_HOST_APPLY = "biz_host_apply",
    BIZ_PROCESS_SERVICE_TEMPLATE = "biz_process_service_template",
    BIZ_PROCESS_SERVICE_CATEGORY = "biz_process_service_category",
    BIZ_PROCESS_SERVICE_INSTANCE = "biz_process_service_instance",
    BIZ_SET_TEMPLATE = "biz_set_template",
    SKIP = "skip",
    UNTYPED = "",
});

ids!(ActionId {
    SKIP = "skip",
    UNSUPPORTED = "unsupported",

    CREATE_BUSINESS = "create_business",
    EDIT_BUSINESS = "edit_business",
    ARCHIVE_BUSINESS = "archive_business",
    FIND_BUSINESS = "find_business",
    VIEW_BUSINESS_RESOURCE = "find_business_resource",

    CREATE_BIZ_SET = "create_business_set",
    EDIT_BIZ_SET = "edit_business_set",
    DELETE_BIZ_SET = "delete_business_set",
    VIEW_BIZ_SET = "view_business_set",
    ACCESS_BIZ_SET = "access_business_set",

    CREATE_BUSINESS_CUSTOM_QUERY = "create_biz_dynamic_query",
    EDIT_BUSINESS_CUSTOM_QUERY = "edit_biz_dynamic_query",
    DELETE_BUSINESS_CUSTOM_QUERY = "delete_biz_dynamic_query",

    EDIT_BUSINESS_CUSTOM_FIELD = "edit_biz_custom_field",

    CREATE_BUSINESS_SERVICE_CATEGORY = "create_biz_service_category",
    EDIT_BUSINESS_SERVICE_CATEGORY = "edit_biz_service_category",
    DELETE_BUSINESS_SERVICE_CATEGORY = "delete_biz_service_category",

    CREATE_BUSINESS_SERVICE_INSTANCE = "create_biz_service_instance",
    EDIT_BUSINESS_SERVICE_INSTANCE = "edit_biz_service_instance",
    DELETE_BUSINESS_SERVICE_INSTANCE = "delete_biz_service_instance",

    CREATE_BUSINESS_SERVICE_TEMPLATE = "create_biz_service_template",
    EDIT_BUSINESS_SERVICE_TEMPLATE = "edit_biz_service_template",
    DELETE_BUSINESS_SERVICE_TEMPLATE = "delete_biz_service_template",

    CREATE_BUSINESS_SET_TEMPLATE = "create_biz_set_template",
    EDIT_BUSINESS_SET_TEMPLATE = "edit_biz_set_template",
    DELETE_BUSINESS_SET_TEMPLATE = "delete_biz_set_template",

    CREATE_BUSINESS_TOPOLOGY = "create_biz_topology",
    EDIT_BUSINESS_TOPOLOGY = "edit_biz_topology",
    DELETE_BUSINESS_TOPOLOGY = "delete_biz_topology",

    EDIT_BUSINESS_HOST_APPLY = "edit_biz_host_apply",

    CREATE_RESOURCE_POOL_HOST = "create_resource_pool_host",
    EDIT_RESOURCE_POOL_HOST = "edit_resource_pool_host",
    DELETE_RESOURCE_POOL_HOST = "delete_resource_pool_host",
    EDIT_BUSINESS_HOST = "edit_biz_host",
    RESOURCE_POOL_HOST_TRANSFER_TO_BUSINESS = "assign_host_to_biz",
    RESOURCE_POOL_HOST_TRANSFER_TO_DIRECTORY = "host_transfer_in_resource_pool",
    BUSINESS_HOST_TRANSFER_TO_RESOURCE_POOL = "unassign_biz_host",
    HOST_TRANSFER_ACROSS_BUSINESS = "host_transfer_across_business",

    CREATE_RESOURCE_POOL_DIRECTORY = "create_resource_pool_directory",
    EDIT_RESOURCE_POOL_DIRECTORY = "edit_resource_pool_directory",
    DELETE_RESOURCE_POOL_DIRECTORY = "delete_resource_pool_directory",

    CREATE_CLOUD_AREA = "create_cloud_area",
    EDIT_CLOUD_AREA = "edit_cloud_area",
    DELETE_CLOUD_AREA = "delete_cloud_area",

    CREATE_CLOUD_ACCOUNT = "create_cloud_account",
    EDIT_CLOUD_ACCOUNT = "edit_cloud_account",
    DELETE_CLOUD_ACCOUNT = "delete_cloud_account",
    FIND_CLOUD_ACCOUNT = "find_cloud_account",

    CREATE_CLOUD_RESOURCE_TASK = "create_cloud_resource_task",
    EDIT_CLOUD_RESOURCE_TASK = "edit_cloud_resource_task",
    DELETE_CLOUD_RESOURCE_TASK = "delete_cloud_resource_task",
    FIND_CLOUD_RESOURCE_TASK = "find_cloud_resource_task",

    CREATE_SYS_MODEL = "create_sys_model",
    EDIT_SYS_MODEL = "edit_sys_model",
    DELETE_SYS_MODEL = "delete_sys_model",

    CREATE_ASSOCIATION_TYPE = "create_association_type",
    EDIT_ASSOCIATION_TYPE = "edit_association_type",
    DELETE_ASSOCIATION_TYPE = "delete_association_type",

    CREATE_MODEL_GROUP = "create_model_group",
    EDIT_MODEL_GROUP = "edit_model_group",
    DELETE_MODEL_GROUP = "delete_model_group",

    EDIT_BUSINESS_LAYER = "edit_business_layer",
    EDIT_MODEL_TOPOLOGY_VIEW = "edit_model_topology_view",

    FIND_OPERATION_STATISTIC = "find_operation_statistic",
    EDIT_OPERATION_STATISTIC = "edit_operation_statistic",

    FIND_AUDIT_LOG = "find_audit_log",
    GLOBAL_SETTINGS = "global_settings",

    WATCH_HOST_EVENT = "watch_host_event",
    WATCH_HOST_RELATION_EVENT = "watch_host_relation_event",
    WATCH_BIZ_EVENT = "watch_biz_event",
    WATCH_SET_EVENT = "watch_set_event",
    WATCH_MODULE_EVENT = "watch_module_event",
    WATCH_PROCESS_EVENT = "watch_process_event",
    WATCH_COMMON_INSTANCE_EVENT = "watch_comobj_event",
    WATCH_MAINLINE_INSTANCE_EVENT = "watch_mainline_instance_event",
    WATCH_INST_ASST_EVENT = "watch_inst_asst_event",
    WATCH_BIZ_SET_EVENT = "watch_biz_set_event",
    WATCH_KUBE_CLUSTER_EVENT = "watch_kube_cluster",
    WATCH_KUBE_NODE_EVENT = "watch_kube_node",
    WATCH_KUBE_NAMESPACE_EVENT = "watch_kube_namespace",
    WATCH_KUBE_WORKLOAD_EVENT = "watch_kube_workload",
    WATCH_KUBE_POD_EVENT = "watch_kube_pod",

    CREATE_CONTAINER_CLUSTER = "create_container_cluster",
    EDIT_CONTAINER_CLUSTER = "edit_container_cluster",
    DELETE_CONTAINER_CLUSTER = "delete_container_cluster",
    CREATE_CONTAINER_NODE = "create_container_node",
    EDIT_CONTAINER_NODE = "edit_container_node",
    DELETE_CONTAINER_NODE = "delete_container_node",
    CREATE_CONTAINER_NAMESPACE = "create_container_namespace",
    EDIT_CONTAINER_NAMESPACE = "edit_container_namespace",
    DELETE_CONTAINER_NAMESPACE = "delete_container_namespace",
    CREATE_CONTAINER_WORKLOAD = "create_container_workload",
    EDIT_CONTAINER_WORKLOAD = "edit_container_workload",
    DELETE_CONTAINER_WORKLOAD = "delete_container_workload",
    CREATE_CONTAINER_POD = "create_container_pod",
    DELETE_CONTAINER_POD = "delete_container_pod",
});

impl TypeId {
    pub fn new(id: impl Into<String>) -> Self {
        TypeId(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dynamic type id of a CMDB model: `sys_instance_<model id>`.
    pub fn sys_instance(model_id: i64) -> Self {
        TypeId(Cow::Owned(format!("{}{}", IAM_SYS_INSTANCE_PREFIX, model_id)))
    }

    /// Whether this is a dynamic model type. `sys_instance_model` shares the
    /// prefix but is a static type, so the suffix must be numeric.
    pub fn is_sys_instance(&self) -> bool {
        self.sys_instance_model_id().is_ok()
    }

    /// Model id embedded in a dynamic type id.
    pub fn sys_instance_model_id(&self) -> Result<i64> {
        let suffix = self.0.strip_prefix(IAM_SYS_INSTANCE_PREFIX).ok_or_else(|| {
            AuthzError::Validation(format!(
                "resource type {} is not an iam system instance, it must start with prefix {}",
                self, IAM_SYS_INSTANCE_PREFIX
            ))
        })?;
        suffix.parse::<i64>().map_err(|e| {
            AuthzError::Validation(format!(
                "get model id from resource type {} failed: {}",
                self, e
            ))
        })
    }

    /// Display name shown in permission requests. Dynamic types are named
    /// after their model, which only the store knows.
    pub fn display_name(&self) -> Option<&'static str> {
        let name = match self.as_str() {
            "biz" => "业务",
            "business_set" => "业务集",
            "biz_for_host_trans" => "业务主机",
            "sys_model" => "模型",
            "sys_model_group" => "模型分组",
            "sys_instance_model" => "实例模型",
            "sys_association_type" => "关联类型",
            "sys_cloud_area" => "管控区域",
            "sys_cloud_account" => "云账户",
            "sys_cloud_resource_task" => "云资源发现任务",
            "sys_resource_pool_directory" => "主机池目录",
            "sys_host_rsc_pool_directory" => "主机池主机",
            "sys_audit_log" => "操作审计",
            "sys_operation_statistic" => "运营统计",
            "sys_event_watch" => "事件监听",
            "sys_model_event" => "模型事件",
            "mainline_model_event" => "主线模型事件",
            "inst_asst_event" => "实例关联事件",
            "kube_workload_event" => "容器工作负载事件",
            "host" => "主机",
            "biz_custom_field" => "业务自定义字段",
            "biz_custom_query" => "业务动态分组",
            "biz_topology" => "业务拓扑",
            "biz_host_apply" => "主机自动应用",
            "biz_process_service_template" => "服务模板",
            "biz_process_service_category" => "服务分类",
            "biz_process_service_instance" => "服务实例",
            "biz_set_template" => "集群模板",
            _ => return None,
        };
        Some(name)
    }
}

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        ActionId(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dynamic action id: `<action type>_sys_instance_<model id>`.
    pub fn sys_instance(action_type: ActionType, model_id: i64) -> Self {
        ActionId(Cow::Owned(format!(
            "{}_{}{}",
            action_type.as_str(),
            IAM_SYS_INSTANCE_PREFIX,
            model_id
        )))
    }

    pub fn is_sys_instance(&self) -> bool {
        self.sys_instance_parts().is_ok()
    }

    /// Splits a dynamic action id into its action type and model id.
    pub fn sys_instance_parts(&self) -> Result<(ActionType, i64)> {
        let invalid = || {
            AuthzError::Validation(format!("action {} is not an iam system instance action", self))
        };
        let (prefix, rest) = self.0.split_once('_').ok_or_else(invalid)?;
        let action_type = ActionType::parse(prefix).ok_or_else(invalid)?;
        let model = rest
            .strip_prefix(IAM_SYS_INSTANCE_PREFIX)
            .ok_or_else(invalid)?
            .parse::<i64>()
            .map_err(|_| invalid())?;
        Ok((action_type, model))
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of an action as registered in the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Edit,
    Delete,
    View,
    Find,
    List,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Edit => "edit",
            ActionType::Delete => "delete",
            ActionType::View => "view",
            ActionType::Find => "find",
            ActionType::List => "list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ActionType::Create),
            "edit" => Some(ActionType::Edit),
            "delete" => Some(ActionType::Delete),
            "view" => Some(ActionType::View),
            "find" => Some(ActionType::Find),
            "list" => Some(ActionType::List),
            _ => None,
        }
    }
}

/// Human name of an action, used when rendering a permission request.
pub fn action_display_name(action: &ActionId) -> Option<String> {
    if let Ok((action_type, _)) = action.sys_instance_parts() {
        let verb = match action_type {
            ActionType::Create => "新建",
            ActionType::Edit => "编辑",
            ActionType::Delete => "删除",
            _ => return None,
        };
        return Some(format!("实例{}", verb));
    }
    let name = match action.as_str() {
        "create_business" => "业务创建",
        "edit_business" => "业务编辑",
        "archive_business" => "业务归档",
        "find_business" => "业务查询",
        "find_business_resource" => "业务访问",
        "create_business_set" => "业务集新建",
        "edit_business_set" => "业务集编辑",
        "delete_business_set" => "业务集删除",
        "view_business_set" => "业务集查看",
        "access_business_set" => "业务集访问",
        "create_biz_dynamic_query" => "动态分组新建",
        "edit_biz_dynamic_query" => "动态分组编辑",
        "delete_biz_dynamic_query" => "动态分组删除",
        "edit_biz_custom_field" => "业务自定义字段编辑",
        "create_biz_service_category" => "服务分类新建",
        "edit_biz_service_category" => "服务分类编辑",
        "delete_biz_service_category" => "服务分类删除",
        "create_biz_service_instance" => "服务实例新建",
        "edit_biz_service_instance" => "服务实例编辑",
        "delete_biz_service_instance" => "服务实例删除",
        "create_biz_service_template" => "服务模板新建",
        "edit_biz_service_template" => "服务模板编辑",
        "delete_biz_service_template" => "服务模板删除",
        "create_biz_set_template" => "集群模板新建",
        "edit_biz_set_template" => "集群模板编辑",
        "delete_biz_set_template" => "集群模板删除",
        "create_biz_topology" => "业务拓扑新建",
        "edit_biz_topology" => "业务拓扑编辑",
        "delete_biz_topology" => "业务拓扑删除",
        "edit_biz_host_apply" => "主机自动应用编辑",
        "create_resource_pool_host" => "主机池主机创建",
        "edit_resource_pool_host" => "主机池主机编辑",
        "delete_resource_pool_host" => "主机池主机删除",
        "edit_biz_host" => "业务主机编辑",
        "assign_host_to_biz" => "主机池主机分配到业务",
        "host_transfer_in_resource_pool" => "主机池主机转移",
        "unassign_biz_host" => "业务主机归还主机池",
        "host_transfer_across_business" => "主机转移到其他业务",
        "create_resource_pool_directory" => "主机池目录创建",
        "edit_resource_pool_directory" => "主机池目录编辑",
        "delete_resource_pool_directory" => "主机池目录删除",
        "create_cloud_area" => "管控区域创建",
        "edit_cloud_area" => "管控区域编辑",
        "delete_cloud_area" => "管控区域删除",
        "create_cloud_account" => "云账户新建",
        "edit_cloud_account" => "云账户编辑",
        "delete_cloud_account" => "云账户删除",
        "find_cloud_account" => "云账户查询",
        "create_cloud_resource_task" => "云资源任务新建",
        "edit_cloud_resource_task" => "云资源任务编辑",
        "delete_cloud_resource_task" => "云资源任务删除",
        "find_cloud_resource_task" => "云资源任务查询",
        "create_sys_model" => "模型新建",
        "edit_sys_model" => "模型编辑",
        "delete_sys_model" => "模型删除",
        "create_association_type" => "关联类型新建",
        "edit_association_type" => "关联类型编辑",
        "delete_association_type" => "关联类型删除",
        "create_model_group" => "模型分组新建",
        "edit_model_group" => "模型分组编辑",
        "delete_model_group" => "模型分组删除",
        "edit_business_layer" => "业务层级编辑",
        "edit_model_topology_view" => "模型拓扑视图编辑",
        "find_operation_statistic" => "运营统计查询",
        "edit_operation_statistic" => "运营统计编辑",
        "find_audit_log" => "操作审计查询",
        "global_settings" => "全局设置",
        "watch_host_event" => "主机事件监听",
        "watch_host_relation_event" => "主机关系事件监听",
        "watch_biz_event" => "业务事件监听",
        "watch_set_event" => "集群事件监听",
        "watch_module_event" => "模块事件监听",
        "watch_process_event" => "进程事件监听",
        "watch_comobj_event" => "模型实例事件监听",
        "watch_mainline_instance_event" => "自定义拓扑层级事件监听",
        "watch_inst_asst_event" => "实例关联事件监听",
        "watch_biz_set_event" => "业务集事件监听",
        "watch_kube_cluster" => "容器集群事件监听",
        "watch_kube_node" => "容器节点事件监听",
        "watch_kube_namespace" => "容器命名空间事件监听",
        "watch_kube_workload" => "容器工作负载事件监听",
        "watch_kube_pod" => "容器Pod事件监听",
        "create_container_cluster" => "容器集群新建",
        "edit_container_cluster" => "容器集群编辑",
        "delete_container_cluster" => "容器集群删除",
        "create_container_node" => "容器节点新建",
        "edit_container_node" => "容器节点编辑",
        "delete_container_node" => "容器节点删除",
        "create_container_namespace" => "容器命名空间新建",
        "edit_container_namespace" => "容器命名空间编辑",
        "delete_container_namespace" => "容器命名空间删除",
        "create_container_workload" => "容器工作负载新建",
        "edit_container_workload" => "容器工作负载编辑",
        "delete_container_workload" => "容器工作负载删除",
        "create_container_pod" => "容器Pod新建",
        "delete_container_pod" => "容器Pod删除",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_type_id_round_trip() {
        for model in [1_i64, 7, 42, 10_000, i64::MAX] {
            let id = TypeId::sys_instance(model);
            assert!(id.is_sys_instance());
            assert_eq!(id.sys_instance_model_id().unwrap(), model);
            assert_eq!(TypeId::sys_instance(id.sys_instance_model_id().unwrap()), id);
        }
    }

    #[test]
    fn test_dynamic_action_id_round_trip() {
        for action_type in [ActionType::Create, ActionType::Edit, ActionType::Delete] {
            let id = ActionId::sys_instance(action_type, 9);
            assert_eq!(id.as_str(), format!("{}_sys_instance_9", action_type.as_str()));
            let (parsed_type, model) = id.sys_instance_parts().unwrap();
            assert_eq!(parsed_type, action_type);
            assert_eq!(model, 9);
            assert_eq!(ActionId::sys_instance(parsed_type, model), id);
        }
    }

    #[test]
    fn test_sys_instance_model_is_not_dynamic() {
        assert!(!TypeId::SYS_INSTANCE_MODEL.is_sys_instance());
        assert!(TypeId::SYS_INSTANCE_MODEL.sys_instance_model_id().is_err());
        assert!(!TypeId::HOST.is_sys_instance());
        assert!(!ActionId::EDIT_SYS_MODEL.is_sys_instance());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&TypeId::BUSINESS).unwrap();
        assert_eq!(json, "\"biz\"");
        let action: ActionId = serde_json::from_str("\"edit_biz_host\"").unwrap();
        assert_eq!(action, ActionId::EDIT_BUSINESS_HOST);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TypeId::BUSINESS.display_name(), Some("业务"));
        assert_eq!(TypeId::sys_instance(3).display_name(), None);
        assert_eq!(
            action_display_name(&ActionId::sys_instance(ActionType::Edit, 3)).as_deref(),
            Some("实例编辑")
        );
    }
}
