//! Physical field and collection names of external resource types.

use crate::iam::TypeId;

pub const TABLE_BUSINESS: &str = "cc_ApplicationBase";
pub const TABLE_BIZ_SET: &str = "cc_BizSetBase";
pub const TABLE_HOST: &str = "cc_HostBase";
pub const TABLE_MODULE_HOST_CONFIG: &str = "cc_ModuleHostConfig";
pub const TABLE_OBJECT_DES: &str = "cc_ObjDes";
pub const TABLE_OBJECT_BASE: &str = "cc_ObjectBase";
pub const TABLE_OBJ_CLASSIFICATION: &str = "cc_ObjClassification";
pub const TABLE_ASSOCIATION_TYPE: &str = "cc_AsstDes";
pub const TABLE_CLOUD_AREA: &str = "cc_PlatBase";
pub const TABLE_CLOUD_ACCOUNT: &str = "cc_CloudAccount";
pub const TABLE_CLOUD_SYNC_TASK: &str = "cc_CloudSyncTask";
pub const TABLE_MODULE: &str = "cc_ModuleBase";
pub const TABLE_DYNAMIC_GROUP: &str = "cc_DynamicGroup";
pub const TABLE_SERVICE_TEMPLATE: &str = "cc_ServiceTemplate";
pub const TABLE_SERVICE_CATEGORY: &str = "cc_ServiceCategory";
pub const TABLE_SERVICE_INSTANCE: &str = "cc_ServiceInstance";
pub const TABLE_SET_TEMPLATE: &str = "cc_SetTemplate";
pub const TABLE_SET: &str = "cc_SetBase";
pub const TABLE_OBJECT_ASSOCIATION: &str = "cc_ObjAsst";

pub const FIELD_HOST_ID: &str = "bk_host_id";
pub const FIELD_BIZ_ID: &str = "bk_biz_id";
pub const FIELD_SET_ID: &str = "bk_set_id";
pub const FIELD_MODULE_ID: &str = "bk_module_id";
/// `1` marks the resource pool business in [`TABLE_BUSINESS`].
pub const FIELD_DEFAULT: &str = "default";
pub const FIELD_OBJ_ID: &str = "bk_obj_id";
pub const FIELD_OBJ_NAME: &str = "bk_obj_name";

/// Attribute names a policy may use instead of physical fields.
pub const POLICY_ID_ATTRIBUTE: &str = "id";
pub const POLICY_NAME_ATTRIBUTE: &str = "display_name";

/// Physical id field of an external type's instances.
pub fn resource_id_field(type_id: &TypeId) -> Option<&'static str> {
    if type_id.is_sys_instance() {
        return Some("bk_inst_id");
    }
    let field = match type_id.as_str() {
        "host" => FIELD_HOST_ID,
        "sys_model_group"
        | "sys_model"
        | "sys_instance_model"
        | "sys_model_event"
        | "inst_asst_event"
        | "mainline_model_event"
        | "sys_association_type" => "id",
        "sys_resource_pool_directory" | "sys_host_rsc_pool_directory" => "bk_module_id",
        "sys_cloud_area" => "bk_cloud_id",
        "sys_cloud_account" => "bk_account_id",
        "sys_cloud_resource_task" => "bk_task_id",
        "biz" | "biz_for_host_trans" => "bk_biz_id",
        "business_set" => "bk_biz_set_id",
        "biz_custom_query"
        | "biz_process_service_template"
        | "biz_process_service_category"
        | "biz_process_service_instance"
        | "biz_set_template" => "id",
        _ => return None,
    };
    Some(field)
}

/// Physical display-name field of an external type's instances.
pub fn resource_name_field(type_id: &TypeId) -> Option<&'static str> {
    if type_id.is_sys_instance() {
        return Some("bk_inst_name");
    }
    let field = match type_id.as_str() {
        "host" => "bk_host_innerip",
        "sys_model_group" => "bk_classification_name",
        "sys_model" | "sys_instance_model" | "sys_model_event" | "mainline_model_event"
        | "inst_asst_event" => FIELD_OBJ_NAME,
        "sys_association_type" => "bk_asst_name",
        "sys_resource_pool_directory" | "sys_host_rsc_pool_directory" => "bk_module_name",
        "sys_cloud_area" => "bk_cloud_name",
        "sys_cloud_account" => "bk_account_name",
        "sys_cloud_resource_task" => "bk_task_name",
        "biz" | "biz_for_host_trans" => "bk_biz_name",
        "business_set" => "bk_biz_set_name",
        "biz_custom_query"
        | "biz_process_service_template"
        | "biz_process_service_category"
        | "biz_process_service_instance"
        | "biz_set_template" => "name",
        _ => return None,
    };
    Some(field)
}

/// Collection holding an external type's instances. Sys-instance types share
/// [`TABLE_OBJECT_BASE`] and are told apart by `bk_obj_id`.
pub fn resource_table(type_id: &TypeId) -> Option<&'static str> {
    if type_id.is_sys_instance() {
        return Some(TABLE_OBJECT_BASE);
    }
    let table = match type_id.as_str() {
        "biz" | "biz_for_host_trans" => TABLE_BUSINESS,
        "business_set" => TABLE_BIZ_SET,
        "host" => TABLE_HOST,
        "sys_model" | "sys_instance_model" | "sys_model_event" | "mainline_model_event"
        | "inst_asst_event" => TABLE_OBJECT_DES,
        "sys_model_group" => TABLE_OBJ_CLASSIFICATION,
        "sys_association_type" => TABLE_ASSOCIATION_TYPE,
        "sys_cloud_area" => TABLE_CLOUD_AREA,
        "sys_cloud_account" => TABLE_CLOUD_ACCOUNT,
        "sys_cloud_resource_task" => TABLE_CLOUD_SYNC_TASK,
        "sys_resource_pool_directory" | "sys_host_rsc_pool_directory" => TABLE_MODULE,
        "biz_custom_query" => TABLE_DYNAMIC_GROUP,
        "biz_process_service_template" => TABLE_SERVICE_TEMPLATE,
        "biz_process_service_category" => TABLE_SERVICE_CATEGORY,
        "biz_process_service_instance" => TABLE_SERVICE_INSTANCE,
        "biz_set_template" => TABLE_SET_TEMPLATE,
        _ => return None,
    };
    Some(table)
}

/// Whether the instances of a type carry `bk_biz_id` themselves. Hosts do not:
/// their business is recorded in [`TABLE_MODULE_HOST_CONFIG`].
pub fn stores_business_id(type_id: &TypeId) -> bool {
    if type_id.is_sys_instance() {
        return false;
    }
    matches!(
        resource_table(type_id),
        Some(
            TABLE_BUSINESS
                | TABLE_MODULE
                | TABLE_DYNAMIC_GROUP
                | TABLE_SERVICE_TEMPLATE
                | TABLE_SERVICE_CATEGORY
                | TABLE_SERVICE_INSTANCE
                | TABLE_SET_TEMPLATE
        )
    )
}

/// Types whose instance ids are strings rather than integers.
pub fn is_resource_id_string_type(type_id: &TypeId) -> bool {
    *type_id == TypeId::BIZ_CUSTOM_QUERY
}
