//! Generates the resource descriptors an adapted action is authorized
//! against.
//!
//! Each CMDB resource kind has its own generator, looked up in a registry.
//! A generator decides whether the action is checked against the instance,
//! its parent container, a pair of containers (host transfers) or nothing.

use crate::error::{AuthzError, Result};
use crate::iam::{ActionId, TypeId};
use crate::meta::ResourceType;
use crate::resource::{format_path, Resource, ResourceAttribute};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// A per-kind generator.
pub type Generator = fn(&ActionId, &TypeId, &ResourceAttribute) -> Result<Vec<Resource>>;

/// Produces the descriptors for `attribute`, already adapted to
/// `(action, type_id)`. `skip` actions produce an empty list.
pub fn gen_iam_resource(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if *action == ActionId::SKIP {
        return Ok(Vec::new());
    }

    let generator = match attribute.resource_type {
        ResourceType::SysInstance(_) => gen_sys_instance as Generator,
        kind => *GENERATORS.get(&kind).ok_or_else(|| {
            AuthzError::Unsupported(format!(
                "gen id failed: unsupported resource type: {}",
                kind
            ))
        })?,
    };
    generator(action, type_id, attribute)
}

static GENERATORS: Lazy<HashMap<ResourceType, Generator>> = Lazy::new(|| {
    use ResourceType::*;

    let mut registry: HashMap<ResourceType, Generator> = HashMap::new();
    let mut register = |kinds: &[ResourceType], generator: Generator| {
        for kind in kinds {
            registry.insert(*kind, generator);
        }
    };

    register(&[Business], gen_business);
    register(&[BizSet], gen_biz_set);
    register(&[DynamicGrouping], gen_dynamic_grouping);
    register(&[EventWatch], gen_event_watch);
    register(&[ProcessServiceTemplate, ProcessTemplate], gen_service_template);
    register(&[SetTemplate], gen_set_template);
    register(&[CloudAreaInstance], gen_cloud_area);
    register(&[HostApply], gen_business_scoped);
    register(&[CloudAccount], gen_cloud_account);
    register(&[CloudResourceTask], gen_cloud_resource_task);
    register(&[ResourcePoolDirectory], gen_resource_pool_directory);
    register(&[ProcessServiceInstance, Process], gen_business_scoped);
    register(
        &[ModelModule, ModelSet, MainlineInstance, MainlineInstanceTopology, BizTopology],
        gen_business_scoped,
    );
    register(&[Model, ModelAssociation], gen_model);
    register(&[ModelUnique], gen_model_related);
    register(&[ModelAttributeGroup], gen_model_attribute_group);
    register(&[ModelAttribute], gen_model_attribute);
    register(&[ModelClassification], gen_model_classification);
    register(&[AssociationType], gen_association_type);
    register(&[HostInstance], gen_host_instance);
    register(&[ProcessServiceCategory], gen_process_service_category);
    register(
        &[
            AuditLog,
            OperationStatistic,
            ConfigAdmin,
            MainlineModel,
            ModelTopology,
            SystemBase,
            ModelInstanceTopology,
            MainlineModelTopology,
            UserCustom,
            HostFavorite,
            SystemConfig,
            InstallBK,
        ],
        gen_nothing,
    );
    register(
        &[
            KubeCluster,
            KubeNode,
            KubeNamespace,
            KubeWorkload,
            KubeDeployment,
            KubeStatefulSet,
            KubeDaemonSet,
            KubeGameStatefulSet,
            KubeGameDeployment,
            KubeCronJob,
            KubeJob,
            KubePodWorkload,
            KubePod,
            KubeContainer,
        ],
        gen_nothing,
    );

    registry
});

fn id_of(id: i64) -> String {
    if id > 0 {
        id.to_string()
    } else {
        String::new()
    }
}

/// The instance itself, unless it is being created.
fn instance_unless_create(
    action: &ActionId,
    create: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Vec<Resource> {
    if action == create {
        return Vec::new();
    }
    vec![Resource::new(type_id.clone(), id_of(attribute.instance_id))]
}

fn business_resource(business_id: i64) -> Resource {
    Resource::new(TypeId::BUSINESS, id_of(business_id))
}

fn require_business(attribute: &ResourceAttribute) -> Result<i64> {
    if attribute.business_id <= 0 {
        return Err(AuthzError::Validation("biz id can not be 0".to_string()));
    }
    Ok(attribute.business_id)
}

fn first_layer(attribute: &ResourceAttribute) -> Result<i64> {
    attribute
        .layers
        .first()
        .map(|layer| layer.instance_id)
        .ok_or_else(|| {
            AuthzError::NotEnoughLayer(format!(
                "{} needs its parent layer",
                attribute.resource_type
            ))
        })
}

fn gen_business(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_BUSINESS,
        type_id,
        attribute,
    ))
}

fn gen_biz_set(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_BIZ_SET,
        type_id,
        attribute,
    ))
}

fn gen_dynamic_grouping(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    let business_id = require_business(attribute)?;

    if *action == ActionId::CREATE_BUSINESS_CUSTOM_QUERY
        || *action == ActionId::VIEW_BUSINESS_RESOURCE
    {
        return Ok(vec![business_resource(business_id)]);
    }

    let path = format_path(&[(&TypeId::BUSINESS, &business_id.to_string())]);
    Ok(vec![
        Resource::new(type_id.clone(), attribute.instance_id_ex.clone()).with_path(path)
    ])
}

fn gen_event_watch(
    action: &ActionId,
    _type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    let resource = if *action == ActionId::WATCH_COMMON_INSTANCE_EVENT {
        Resource::new(TypeId::SYS_MODEL_EVENT, id_of(attribute.instance_id))
    } else if *action == ActionId::WATCH_MAINLINE_INSTANCE_EVENT {
        Resource::new(TypeId::MAINLINE_MODEL_EVENT, id_of(attribute.instance_id))
    } else if *action == ActionId::WATCH_INST_ASST_EVENT {
        Resource::new(TypeId::INST_ASST_EVENT, id_of(attribute.instance_id))
    } else if *action == ActionId::WATCH_KUBE_WORKLOAD_EVENT {
        Resource::new(TypeId::KUBE_WORKLOAD_EVENT, attribute.instance_id_ex.clone())
    } else {
        return Ok(Vec::new());
    };
    Ok(vec![resource])
}

/// Templates are created under a business; other actions target the template.
fn gen_template(
    create: &ActionId,
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if action == create {
        let business_id = require_business(attribute)?;
        return Ok(vec![business_resource(business_id)]);
    }
    Ok(vec![Resource::new(
        type_id.clone(),
        id_of(attribute.instance_id),
    )])
}

fn gen_service_template(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    gen_template(
        &ActionId::CREATE_BUSINESS_SERVICE_TEMPLATE,
        action,
        type_id,
        attribute,
    )
}

fn gen_set_template(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    gen_template(
        &ActionId::CREATE_BUSINESS_SET_TEMPLATE,
        action,
        type_id,
        attribute,
    )
}

fn gen_cloud_area(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_CLOUD_AREA,
        type_id,
        attribute,
    ))
}

fn gen_cloud_account(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if *action == ActionId::CREATE_CLOUD_ACCOUNT {
        return Ok(Vec::new());
    }
    Ok(vec![Resource::new(
        type_id.clone(),
        attribute.instance_id.to_string(),
    )])
}

fn gen_cloud_resource_task(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_CLOUD_RESOURCE_TASK,
        type_id,
        attribute,
    ))
}

fn gen_resource_pool_directory(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_RESOURCE_POOL_DIRECTORY,
        type_id,
        attribute,
    ))
}

/// Kinds authorized at business granularity only.
fn gen_business_scoped(
    _action: &ActionId,
    _type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(vec![business_resource(attribute.business_id)])
}

// Every action on a service category resolves to its business, even the
// instance-scoped ones. Kept as is until product confirms the granularity.
fn gen_process_service_category(
    _action: &ActionId,
    _type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(vec![business_resource(attribute.business_id)])
}

fn gen_model(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if *action == ActionId::CREATE_SYS_MODEL {
        // a new model is authorized against its model group
        if let Some(group) = attribute.layers.first() {
            return Ok(vec![Resource::new(
                TypeId::SYS_MODEL_GROUP,
                group.instance_id.to_string(),
            )]);
        }
        return Ok(vec![Resource::of_type(type_id.clone())]);
    }
    Ok(vec![Resource::new(
        type_id.clone(),
        id_of(attribute.instance_id),
    )])
}

/// Kinds that live inside a model are authorized against that model.
fn gen_model_related(
    _action: &ActionId,
    _type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    let model_id = first_layer(attribute)?;
    Ok(vec![Resource::new(TypeId::SYS_MODEL, model_id.to_string())])
}

fn gen_model_attribute_group(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if attribute.business_id > 0 {
        return gen_business_scoped(action, type_id, attribute);
    }
    gen_model_related(action, type_id, attribute)
}

fn gen_model_attribute(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if attribute.business_id > 0 {
        return gen_business_scoped(action, type_id, attribute);
    }
    gen_model_related(action, type_id, attribute)
}

fn gen_model_classification(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_MODEL_GROUP,
        type_id,
        attribute,
    ))
}

fn gen_association_type(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(instance_unless_create(
        action,
        &ActionId::CREATE_ASSOCIATION_TYPE,
        type_id,
        attribute,
    ))
}

fn gen_nothing(
    _action: &ActionId,
    _type_id: &TypeId,
    _attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    Ok(Vec::new())
}

/// Source and destination containers of a host transfer, in layer order.
fn transfer_pair(
    attribute: &ResourceAttribute,
    source: TypeId,
    destination: TypeId,
) -> Result<Vec<Resource>> {
    if attribute.layers.len() != 2 {
        return Err(AuthzError::NotEnoughLayer(format!(
            "host transfer needs source and destination layers, got {}",
            attribute.layers.len()
        )));
    }
    Ok(vec![
        Resource::new(source, attribute.layers[0].instance_id.to_string()),
        Resource::new(destination, attribute.layers[1].instance_id.to_string()),
    ])
}

fn gen_host_instance(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    if *action == ActionId::RESOURCE_POOL_HOST_TRANSFER_TO_DIRECTORY {
        return transfer_pair(
            attribute,
            TypeId::SYS_HOST_RSC_POOL_DIRECTORY,
            TypeId::SYS_RESOURCE_POOL_DIRECTORY,
        );
    }
    if *action == ActionId::RESOURCE_POOL_HOST_TRANSFER_TO_BUSINESS {
        return transfer_pair(
            attribute,
            TypeId::SYS_HOST_RSC_POOL_DIRECTORY,
            TypeId::BUSINESS,
        );
    }
    if *action == ActionId::BUSINESS_HOST_TRANSFER_TO_RESOURCE_POOL {
        return transfer_pair(
            attribute,
            TypeId::BUSINESS,
            TypeId::SYS_RESOURCE_POOL_DIRECTORY,
        );
    }
    if *action == ActionId::HOST_TRANSFER_ACROSS_BUSINESS {
        return transfer_pair(
            attribute,
            TypeId::BUSINESS_FOR_HOST_TRANS,
            TypeId::BUSINESS,
        );
    }

    // importing a host is authorized against the target directory
    if *action == ActionId::CREATE_RESOURCE_POOL_HOST {
        let directory = attribute
            .layers
            .first()
            .map(|layer| layer.instance_id.to_string())
            .unwrap_or_default();
        return Ok(vec![Resource::new(
            TypeId::SYS_RESOURCE_POOL_DIRECTORY,
            directory,
        )]);
    }

    let container = if *action == ActionId::EDIT_RESOURCE_POOL_HOST
        || *action == ActionId::DELETE_RESOURCE_POOL_HOST
    {
        TypeId::SYS_HOST_RSC_POOL_DIRECTORY
    } else if *action == ActionId::EDIT_BUSINESS_HOST {
        TypeId::BUSINESS
    } else {
        return Ok(Vec::new());
    };

    let mut resource = Resource::new(type_id.clone(), id_of(attribute.instance_id));
    if let Some(layer) = attribute.layers.first() {
        resource =
            resource.with_path(format_path(&[(&container, &layer.instance_id.to_string())]));
    }
    Ok(vec![resource])
}

fn gen_sys_instance(
    action: &ActionId,
    type_id: &TypeId,
    attribute: &ResourceAttribute,
) -> Result<Vec<Resource>> {
    // the instance does not exist yet
    if attribute.action.is_create() {
        return Ok(Vec::new());
    }
    if attribute.instance_id <= 0 {
        return Err(AuthzError::Validation(format!(
            "{} on {} requires an instance id",
            action, type_id
        )));
    }
    Ok(vec![Resource::new(
        type_id.clone(),
        attribute.instance_id.to_string(),
    )])
}
