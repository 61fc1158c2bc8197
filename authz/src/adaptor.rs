//! Maps CMDB resource kinds and actions onto the authority's type and
//! action ids.
//!
//! The tables are built once and only read afterwards. A missing entry is an
//! [`AuthzError::Unsupported`] error, which callers must treat as a denial.

use crate::error::{AuthzError, Result};
use crate::iam::{ActionId, ActionType, TypeId};
use crate::meta::{Action, ResourceType};
use crate::permission::IamResourceInstance;
use crate::resource::ResourceAttribute;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

type ActionTable = HashMap<ResourceType, HashMap<Action, ActionId>>;

/// Converts a CMDB resource kind into the authority's resource type.
pub fn convert_resource_type(resource_type: ResourceType, business_id: i64) -> Result<TypeId> {
    use ResourceType::*;

    let type_id = match resource_type {
        Business => TypeId::BUSINESS,
        BizSet => TypeId::BIZ_SET,
        Model | ModelUnique | ModelAttributeGroup | ModelAssociation => TypeId::SYS_MODEL,
        ModelAttribute => {
            if business_id > 0 {
                TypeId::BIZ_CUSTOM_FIELD
            } else {
                TypeId::SYS_MODEL
            }
        }
        ModelModule | ModelSet | MainlineInstance | MainlineInstanceTopology => {
            TypeId::BIZ_TOPOLOGY
        }
        // Authorized by action alone; the authority has no type for these.
        MainlineModel | ModelTopology | MainlineModelTopology | SystemBase | ConfigAdmin
        | SystemConfig | KubeCluster | KubeNode | KubeNamespace | KubeWorkload
        | KubeDeployment | KubeStatefulSet | KubeDaemonSet | KubeGameStatefulSet
        | KubeGameDeployment | KubeCronJob | KubeJob | KubePodWorkload | KubePod
        | KubeContainer => TypeId::UNTYPED,
        InstallBK => TypeId::SYS_SYSTEM_BASE,
        ModelClassification => TypeId::SYS_MODEL_GROUP,
        AssociationType => TypeId::SYS_ASSOCIATION_TYPE,
        ModelInstanceTopology | HostFavorite => TypeId::SKIP,
        CloudAreaInstance => TypeId::SYS_CLOUD_AREA,
        HostInstance => TypeId::HOST,
        Process | ProcessServiceInstance => TypeId::BIZ_PROCESS_SERVICE_INSTANCE,
        DynamicGrouping => TypeId::BIZ_CUSTOM_QUERY,
        AuditLog => TypeId::SYS_AUDIT_LOG,
        UserCustom => TypeId::USER_CUSTOM,
        ProcessServiceTemplate | ProcessTemplate => TypeId::BIZ_PROCESS_SERVICE_TEMPLATE,
        ProcessServiceCategory => TypeId::BIZ_PROCESS_SERVICE_CATEGORY,
        BizTopology => TypeId::BIZ_TOPOLOGY,
        SetTemplate => TypeId::BIZ_SET_TEMPLATE,
        OperationStatistic => TypeId::SYS_OPERATION_STATISTIC,
        HostApply => TypeId::BIZ_HOST_APPLY,
        ResourcePoolDirectory => TypeId::SYS_RESOURCE_POOL_DIRECTORY,
        CloudAccount => TypeId::SYS_CLOUD_ACCOUNT,
        CloudResourceTask => TypeId::SYS_CLOUD_RESOURCE_TASK,
        EventWatch => TypeId::SYS_EVENT_WATCH,
        SysInstance(model_id) => TypeId::sys_instance(model_id),
        NetDataCollector => {
            return Err(AuthzError::Unsupported(format!(
                "unsupported resource type: {}",
                resource_type
            )))
        }
    };

    Ok(type_id)
}

/// Converts a CMDB action on a resource kind into the authority's action id.
pub fn convert_resource_action(
    resource_type: ResourceType,
    action: Action,
    business_id: i64,
) -> Result<ActionId> {
    if action == Action::Skip {
        return Ok(ActionId::SKIP);
    }

    let action = action.normalize();

    if matches!(
        resource_type,
        ResourceType::ModelAttribute | ResourceType::ModelAttributeGroup
    ) && matches!(action, Action::Create | Action::Update | Action::Delete)
    {
        return Ok(if business_id > 0 {
            ActionId::EDIT_BUSINESS_CUSTOM_FIELD
        } else {
            ActionId::EDIT_SYS_MODEL
        });
    }

    if resource_type == ResourceType::HostInstance && action == Action::Update {
        return Ok(if business_id > 0 {
            ActionId::EDIT_BUSINESS_HOST
        } else {
            ActionId::EDIT_RESOURCE_POOL_HOST
        });
    }

    if let ResourceType::SysInstance(model_id) = resource_type {
        return convert_sys_instance_action(model_id, action);
    }

    RESOURCE_ACTIONS
        .get(&resource_type)
        .and_then(|actions| actions.get(&action))
        .filter(|id| **id != ActionId::UNSUPPORTED)
        .cloned()
        .ok_or_else(|| {
            AuthzError::Unsupported(format!(
                "unsupported type {} action: {}",
                resource_type, action
            ))
        })
}

/// Dynamic model instances: reads are never authorized per instance.
pub fn convert_sys_instance_action(model_id: i64, action: Action) -> Result<ActionId> {
    let action_type = match action.normalize() {
        Action::Create => ActionType::Create,
        Action::Update => ActionType::Edit,
        Action::Delete => ActionType::Delete,
        Action::Find => return Ok(ActionId::SKIP),
        other => {
            return Err(AuthzError::Unsupported(format!(
                "unsupported action: {}",
                other
            )))
        }
    };
    Ok(ActionId::sys_instance(action_type, model_id))
}

/// Adapts both halves of an attribute at once.
pub fn convert_resource(attribute: &ResourceAttribute) -> Result<(TypeId, ActionId)> {
    let action = convert_resource_action(
        attribute.resource_type,
        attribute.action,
        attribute.business_id,
    )?;
    let type_id = convert_resource_type(attribute.resource_type, attribute.business_id)?;
    debug!(
        resource_type = %attribute.resource_type,
        action = %attribute.action,
        %type_id,
        action_id = %action,
        "adapted resource attribute"
    );
    Ok((type_id, action))
}

/// Every `(resource type, action)` pair the action table declares, with
/// the id it maps to (possibly [`ActionId::UNSUPPORTED`]).
pub fn declared_actions() -> impl Iterator<Item = (ResourceType, Action, &'static ActionId)> {
    RESOURCE_ACTIONS.iter().flat_map(|(resource_type, actions)| {
        actions
            .iter()
            .map(move |(action, id)| (*resource_type, *action, id))
    })
}

/// Parses ancestor paths (`/type,id/type,id/`) into instances, root first.
/// Wildcard ids are skipped.
pub fn parse_iam_path_to_ancestors<S: AsRef<str>>(paths: &[S]) -> Result<Vec<IamResourceInstance>> {
    let mut instances = Vec::new();
    for path in paths {
        let trimmed = path.as_ref().trim_matches('/');
        if trimmed.is_empty() {
            continue;
        }
        for item in trimmed.split('/') {
            let (type_id, id) = split_path_item(item)?;
            if id == "*" {
                continue;
            }
            let type_id = TypeId::new(type_id);
            instances.push(IamResourceInstance {
                type_name: type_id.display_name().unwrap_or_default().to_string(),
                resource_type: type_id,
                id: id.to_string(),
                name: String::new(),
            });
        }
    }
    Ok(instances)
}

/// Splits one `type,id` path item.
pub(crate) fn split_path_item(item: &str) -> Result<(&str, &str)> {
    let mut parts = item.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(type_id), Some(id), None) => Ok((type_id, id)),
        _ => Err(AuthzError::Validation(format!("pathItem {} invalid", item))),
    }
}

fn insert(table: &mut ActionTable, resource_type: ResourceType, actions: &[(Action, ActionId)]) {
    table.insert(resource_type, actions.iter().cloned().collect());
}

static RESOURCE_ACTIONS: Lazy<ActionTable> = Lazy::new(|| {
    use Action::*;
    use ResourceType as R;

    let mut t = ActionTable::new();

    let crud_skip_find = |create: ActionId, update: ActionId, delete: ActionId| {
        vec![
            (Create, create),
            (Update, update),
            (Delete, delete),
            (Find, ActionId::SKIP),
        ]
    };
    let workload = crud_skip_find(
        ActionId::CREATE_CONTAINER_WORKLOAD,
        ActionId::EDIT_CONTAINER_WORKLOAD,
        ActionId::DELETE_CONTAINER_WORKLOAD,
    );
    let business_topology = crud_skip_find(
        ActionId::CREATE_BUSINESS_TOPOLOGY,
        ActionId::EDIT_BUSINESS_TOPOLOGY,
        ActionId::DELETE_BUSINESS_TOPOLOGY,
    );
    let all_skip = [
        (Find, ActionId::SKIP),
        (Update, ActionId::SKIP),
        (Delete, ActionId::SKIP),
        (Create, ActionId::SKIP),
    ];
    let edit_model = [
        (Delete, ActionId::EDIT_SYS_MODEL),
        (Update, ActionId::EDIT_SYS_MODEL),
        (Create, ActionId::EDIT_SYS_MODEL),
        (Find, ActionId::SKIP),
    ];

    insert(&mut t, R::ModelAttributeGroup, &edit_model);
    insert(&mut t, R::ModelUnique, &edit_model);
    insert(&mut t, R::ModelAssociation, &edit_model);
    insert(
        &mut t,
        R::ModelAttribute,
        &[
            (Find, ActionId::SKIP),
            (Update, ActionId::EDIT_SYS_MODEL),
            (Delete, ActionId::DELETE_SYS_MODEL),
            (Create, ActionId::CREATE_SYS_MODEL),
        ],
    );
    insert(
        &mut t,
        R::Business,
        &[
            (Archive, ActionId::ARCHIVE_BUSINESS),
            (Create, ActionId::CREATE_BUSINESS),
            (Update, ActionId::EDIT_BUSINESS),
            (Find, ActionId::FIND_BUSINESS),
            (ViewBusinessResource, ActionId::VIEW_BUSINESS_RESOURCE),
        ],
    );
    insert(
        &mut t,
        R::BizSet,
        &[
            (Create, ActionId::CREATE_BIZ_SET),
            (Update, ActionId::EDIT_BIZ_SET),
            (Delete, ActionId::DELETE_BIZ_SET),
            (Find, ActionId::VIEW_BIZ_SET),
            (AccessBizSet, ActionId::ACCESS_BIZ_SET),
        ],
    );
    insert(
        &mut t,
        R::DynamicGrouping,
        &[
            (Delete, ActionId::DELETE_BUSINESS_CUSTOM_QUERY),
            (Update, ActionId::EDIT_BUSINESS_CUSTOM_QUERY),
            (Create, ActionId::CREATE_BUSINESS_CUSTOM_QUERY),
            (Find, ActionId::VIEW_BUSINESS_RESOURCE),
            (Execute, ActionId::VIEW_BUSINESS_RESOURCE),
        ],
    );
    insert(
        &mut t,
        R::MainlineModel,
        &[
            (Find, ActionId::SKIP),
            (Create, ActionId::EDIT_BUSINESS_LAYER),
            (Delete, ActionId::EDIT_BUSINESS_LAYER),
        ],
    );
    insert(
        &mut t,
        R::ModelTopology,
        &[
            (Find, ActionId::EDIT_MODEL_TOPOLOGY_VIEW),
            (Update, ActionId::EDIT_MODEL_TOPOLOGY_VIEW),
        ],
    );
    insert(&mut t, R::MainlineModelTopology, &[(Find, ActionId::SKIP)]);
    insert(
        &mut t,
        R::Process,
        &[
            (Find, ActionId::SKIP),
            (Create, ActionId::EDIT_BUSINESS_SERVICE_INSTANCE),
            (Delete, ActionId::EDIT_BUSINESS_SERVICE_INSTANCE),
            (Update, ActionId::EDIT_BUSINESS_SERVICE_INSTANCE),
        ],
    );
    insert(
        &mut t,
        R::HostInstance,
        &[
            (
                MoveResPoolHostToBizIdleModule,
                ActionId::RESOURCE_POOL_HOST_TRANSFER_TO_BUSINESS,
            ),
            (
                MoveResPoolHostToDirectory,
                ActionId::RESOURCE_POOL_HOST_TRANSFER_TO_DIRECTORY,
            ),
            (
                MoveBizHostFromModuleToResPool,
                ActionId::BUSINESS_HOST_TRANSFER_TO_RESOURCE_POOL,
            ),
            (AddHostToResourcePool, ActionId::CREATE_RESOURCE_POOL_HOST),
            (Create, ActionId::CREATE_RESOURCE_POOL_HOST),
            (Delete, ActionId::DELETE_RESOURCE_POOL_HOST),
            (
                MoveHostToAnotherBizModule,
                ActionId::HOST_TRANSFER_ACROSS_BUSINESS,
            ),
            (Find, ActionId::SKIP),
        ],
    );
    insert(
        &mut t,
        R::ProcessServiceCategory,
        &crud_skip_find(
            ActionId::CREATE_BUSINESS_SERVICE_CATEGORY,
            ActionId::EDIT_BUSINESS_SERVICE_CATEGORY,
            ActionId::DELETE_BUSINESS_SERVICE_CATEGORY,
        ),
    );
    insert(
        &mut t,
        R::ProcessServiceInstance,
        &crud_skip_find(
            ActionId::CREATE_BUSINESS_SERVICE_INSTANCE,
            ActionId::EDIT_BUSINESS_SERVICE_INSTANCE,
            ActionId::DELETE_BUSINESS_SERVICE_INSTANCE,
        ),
    );
    let service_template = crud_skip_find(
        ActionId::CREATE_BUSINESS_SERVICE_TEMPLATE,
        ActionId::EDIT_BUSINESS_SERVICE_TEMPLATE,
        ActionId::DELETE_BUSINESS_SERVICE_TEMPLATE,
    );
    insert(&mut t, R::ProcessServiceTemplate, &service_template);
    insert(&mut t, R::ProcessTemplate, &service_template);
    insert(
        &mut t,
        R::SetTemplate,
        &crud_skip_find(
            ActionId::CREATE_BUSINESS_SET_TEMPLATE,
            ActionId::EDIT_BUSINESS_SET_TEMPLATE,
            ActionId::DELETE_BUSINESS_SET_TEMPLATE,
        ),
    );
    insert(&mut t, R::ModelModule, &business_topology);
    insert(&mut t, R::ModelSet, &business_topology);
    insert(&mut t, R::MainlineInstance, &business_topology);
    insert(&mut t, R::BizTopology, &business_topology);
    insert(&mut t, R::MainlineInstanceTopology, &all_skip);
    insert(
        &mut t,
        R::HostApply,
        &[
            (Create, ActionId::EDIT_BUSINESS_HOST_APPLY),
            (Update, ActionId::EDIT_BUSINESS_HOST_APPLY),
            (Delete, ActionId::EDIT_BUSINESS_HOST_APPLY),
            (Find, ActionId::SKIP),
            (DefaultHostApply, ActionId::VIEW_BUSINESS_RESOURCE),
        ],
    );
    insert(
        &mut t,
        R::ResourcePoolDirectory,
        &[
            (Delete, ActionId::DELETE_RESOURCE_POOL_DIRECTORY),
            (Update, ActionId::EDIT_RESOURCE_POOL_DIRECTORY),
            (Create, ActionId::CREATE_RESOURCE_POOL_DIRECTORY),
            (AddHostToResourcePool, ActionId::CREATE_RESOURCE_POOL_HOST),
            (Find, ActionId::SKIP),
        ],
    );
    insert(
        &mut t,
        R::CloudAreaInstance,
        &crud_skip_find(
            ActionId::CREATE_CLOUD_AREA,
            ActionId::EDIT_CLOUD_AREA,
            ActionId::DELETE_CLOUD_AREA,
        ),
    );
    insert(
        &mut t,
        R::CloudAccount,
        &[
            (Delete, ActionId::DELETE_CLOUD_ACCOUNT),
            (Update, ActionId::EDIT_CLOUD_ACCOUNT),
            (Create, ActionId::CREATE_CLOUD_ACCOUNT),
            (Find, ActionId::FIND_CLOUD_ACCOUNT),
        ],
    );
    insert(
        &mut t,
        R::CloudResourceTask,
        &[
            (Delete, ActionId::DELETE_CLOUD_RESOURCE_TASK),
            (Update, ActionId::EDIT_CLOUD_RESOURCE_TASK),
            (Create, ActionId::CREATE_CLOUD_RESOURCE_TASK),
            (Find, ActionId::FIND_CLOUD_RESOURCE_TASK),
        ],
    );
    insert(
        &mut t,
        R::Model,
        &crud_skip_find(
            ActionId::CREATE_SYS_MODEL,
            ActionId::EDIT_SYS_MODEL,
            ActionId::DELETE_SYS_MODEL,
        ),
    );
    insert(
        &mut t,
        R::AssociationType,
        &crud_skip_find(
            ActionId::CREATE_ASSOCIATION_TYPE,
            ActionId::EDIT_ASSOCIATION_TYPE,
            ActionId::DELETE_ASSOCIATION_TYPE,
        ),
    );
    insert(
        &mut t,
        R::ModelClassification,
        &crud_skip_find(
            ActionId::CREATE_MODEL_GROUP,
            ActionId::EDIT_MODEL_GROUP,
            ActionId::DELETE_MODEL_GROUP,
        ),
    );
    insert(
        &mut t,
        R::OperationStatistic,
        &[
            (Create, ActionId::EDIT_OPERATION_STATISTIC),
            (Delete, ActionId::EDIT_OPERATION_STATISTIC),
            (Update, ActionId::EDIT_OPERATION_STATISTIC),
            (Find, ActionId::FIND_OPERATION_STATISTIC),
        ],
    );
    insert(&mut t, R::AuditLog, &[(Find, ActionId::FIND_AUDIT_LOG)]);
    insert(
        &mut t,
        R::SystemBase,
        &[
            (ModelTopologyView, ActionId::EDIT_MODEL_TOPOLOGY_VIEW),
            (ModelTopologyOperation, ActionId::EDIT_BUSINESS_LAYER),
        ],
    );
    insert(
        &mut t,
        R::EventWatch,
        &[
            (WatchHost, ActionId::WATCH_HOST_EVENT),
            (WatchHostRelation, ActionId::WATCH_HOST_RELATION_EVENT),
            (WatchBiz, ActionId::WATCH_BIZ_EVENT),
            (WatchSet, ActionId::WATCH_SET_EVENT),
            (WatchModule, ActionId::WATCH_MODULE_EVENT),
            (WatchProcess, ActionId::WATCH_PROCESS_EVENT),
            (WatchCommonInstance, ActionId::WATCH_COMMON_INSTANCE_EVENT),
            (WatchMainlineInstance, ActionId::WATCH_MAINLINE_INSTANCE_EVENT),
            (WatchInstAsst, ActionId::WATCH_INST_ASST_EVENT),
            (WatchBizSet, ActionId::WATCH_BIZ_SET_EVENT),
            (WatchKubeCluster, ActionId::WATCH_KUBE_CLUSTER_EVENT),
            (WatchKubeNode, ActionId::WATCH_KUBE_NODE_EVENT),
            (WatchKubeNamespace, ActionId::WATCH_KUBE_NAMESPACE_EVENT),
            (WatchKubeWorkload, ActionId::WATCH_KUBE_WORKLOAD_EVENT),
            (WatchKubePod, ActionId::WATCH_KUBE_POD_EVENT),
        ],
    );
    insert(&mut t, R::UserCustom, &all_skip);
    insert(&mut t, R::ModelInstanceTopology, &all_skip);
    insert(&mut t, R::HostFavorite, &all_skip);
    insert(&mut t, R::SystemConfig, &all_skip);
    insert(
        &mut t,
        R::NetDataCollector,
        &[
            (Find, ActionId::UNSUPPORTED),
            (Update, ActionId::UNSUPPORTED),
            (Delete, ActionId::UNSUPPORTED),
            (Create, ActionId::UNSUPPORTED),
        ],
    );
    insert(&mut t, R::InstallBK, &[(Update, ActionId::SKIP)]);
    insert(
        &mut t,
        R::ConfigAdmin,
        &[
            (Find, ActionId::SKIP),
            (Update, ActionId::GLOBAL_SETTINGS),
            (Delete, ActionId::UNSUPPORTED),
            (Create, ActionId::UNSUPPORTED),
        ],
    );
    insert(
        &mut t,
        R::KubeCluster,
        &crud_skip_find(
            ActionId::CREATE_CONTAINER_CLUSTER,
            ActionId::EDIT_CONTAINER_CLUSTER,
            ActionId::DELETE_CONTAINER_CLUSTER,
        ),
    );
    insert(
        &mut t,
        R::KubeNode,
        &crud_skip_find(
            ActionId::CREATE_CONTAINER_NODE,
            ActionId::EDIT_CONTAINER_NODE,
            ActionId::DELETE_CONTAINER_NODE,
        ),
    );
    insert(
        &mut t,
        R::KubeNamespace,
        &crud_skip_find(
            ActionId::CREATE_CONTAINER_NAMESPACE,
            ActionId::EDIT_CONTAINER_NAMESPACE,
            ActionId::DELETE_CONTAINER_NAMESPACE,
        ),
    );
    for kind in [
        R::KubeWorkload,
        R::KubeDeployment,
        R::KubeStatefulSet,
        R::KubeDaemonSet,
        R::KubeGameStatefulSet,
        R::KubeGameDeployment,
        R::KubeCronJob,
        R::KubeJob,
        R::KubePodWorkload,
    ] {
        insert(&mut t, kind, &workload);
    }
    insert(
        &mut t,
        R::KubePod,
        &[
            (Find, ActionId::SKIP),
            (Delete, ActionId::DELETE_CONTAINER_POD),
            (Create, ActionId::CREATE_CONTAINER_POD),
        ],
    );
    insert(&mut t, R::KubeContainer, &[(Find, ActionId::SKIP)]);

    t
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_declared_pair_adapts() {
        let mut checked = 0;
        for (resource_type, action, id) in declared_actions() {
            if *id == ActionId::UNSUPPORTED {
                assert!(convert_resource_action(resource_type, action, 0).is_err());
                continue;
            }
            for business_id in [0, 5] {
                convert_resource_action(resource_type, action, business_id).unwrap_or_else(
                    |e| panic!("{} {} failed to adapt: {}", resource_type, action, e),
                );
                convert_resource_type(resource_type, business_id).unwrap_or_else(|e| {
                    panic!("{} has no type mapping: {}", resource_type, e)
                });
            }
            checked += 1;
        }
        assert!(checked > 100);
    }

    #[test]
    fn test_batch_actions_are_normalized() {
        assert_eq!(
            convert_resource_action(ResourceType::Model, Action::CreateMany, 0).unwrap(),
            ActionId::CREATE_SYS_MODEL
        );
        assert_eq!(
            convert_resource_action(ResourceType::SetTemplate, Action::DeleteMany, 2).unwrap(),
            ActionId::DELETE_BUSINESS_SET_TEMPLATE
        );
        assert_eq!(
            convert_resource_action(ResourceType::CloudAccount, Action::FindMany, 0).unwrap(),
            ActionId::FIND_CLOUD_ACCOUNT
        );
    }

    #[test]
    fn test_business_scope_changes_the_action() {
        assert_eq!(
            convert_resource_action(ResourceType::ModelAttribute, Action::Update, 3).unwrap(),
            ActionId::EDIT_BUSINESS_CUSTOM_FIELD
        );
        assert_eq!(
            convert_resource_action(ResourceType::ModelAttribute, Action::Delete, 0).unwrap(),
            ActionId::EDIT_SYS_MODEL
        );
        assert_eq!(
            convert_resource_action(ResourceType::HostInstance, Action::Update, 3).unwrap(),
            ActionId::EDIT_BUSINESS_HOST
        );
        assert_eq!(
            convert_resource_action(ResourceType::HostInstance, Action::UpdateMany, 0).unwrap(),
            ActionId::EDIT_RESOURCE_POOL_HOST
        );
        assert_eq!(
            convert_resource_type(ResourceType::ModelAttribute, 3).unwrap(),
            TypeId::BIZ_CUSTOM_FIELD
        );
    }

    #[test]
    fn test_sys_instance_actions() {
        let rt = ResourceType::SysInstance(11);
        assert_eq!(
            convert_resource_type(rt, 0).unwrap().as_str(),
            "sys_instance_11"
        );
        assert_eq!(
            convert_resource_action(rt, Action::Create, 0).unwrap().as_str(),
            "create_sys_instance_11"
        );
        assert_eq!(
            convert_resource_action(rt, Action::UpdateMany, 0).unwrap().as_str(),
            "edit_sys_instance_11"
        );
        assert_eq!(
            convert_resource_action(rt, Action::Delete, 0).unwrap().as_str(),
            "delete_sys_instance_11"
        );
        assert_eq!(
            convert_resource_action(rt, Action::FindMany, 0).unwrap(),
            ActionId::SKIP
        );
        assert!(matches!(
            convert_resource_action(rt, Action::Archive, 0),
            Err(AuthzError::Unsupported(_))
        ));
    }

    #[test]
    fn test_kinds_without_an_authority_type() {
        for kind in [
            ResourceType::KubeCluster,
            ResourceType::KubePod,
            ResourceType::KubeContainer,
            ResourceType::ConfigAdmin,
            ResourceType::SystemBase,
            ResourceType::MainlineModel,
        ] {
            assert_eq!(convert_resource_type(kind, 0).unwrap(), TypeId::UNTYPED, "{}", kind);
        }
        assert_eq!(
            convert_resource_type(ResourceType::InstallBK, 0).unwrap(),
            TypeId::SYS_SYSTEM_BASE
        );
    }

    #[test]
    fn test_unsupported_is_an_error() {
        assert!(convert_resource_type(ResourceType::NetDataCollector, 0).is_err());
        assert!(matches!(
            convert_resource_action(ResourceType::ConfigAdmin, Action::Delete, 0),
            Err(AuthzError::Unsupported(_))
        ));
        assert!(matches!(
            convert_resource_action(ResourceType::AuditLog, Action::Delete, 0),
            Err(AuthzError::Unsupported(_))
        ));
        assert_eq!(
            convert_resource_action(ResourceType::AuditLog, Action::Skip, 0).unwrap(),
            ActionId::SKIP
        );
    }

    #[test]
    fn test_parse_iam_path_to_ancestors() {
        let ancestors =
            parse_iam_path_to_ancestors(&["/biz,3/sys_resource_pool_directory,*/", "/host,9/"])
                .unwrap();
        assert_eq!(ancestors.len(), 2);
        assert_eq!(ancestors[0].resource_type, TypeId::BUSINESS);
        assert_eq!(ancestors[0].id, "3");
        assert_eq!(ancestors[0].type_name, "业务");
        assert_eq!(ancestors[1].resource_type, TypeId::HOST);

        assert!(matches!(
            parse_iam_path_to_ancestors(&["/biz/"]),
            Err(AuthzError::Validation(_))
        ));
    }
}
