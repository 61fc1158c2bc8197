//! CMDB side vocabulary: the resource kinds and actions callers describe
//! their requests with, before adaptation to the external IAM ids.

use crate::error::AuthzError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Prefix of dynamically modeled CMDB resource kinds (`comobj_<model id>`).
pub const CMDB_SYS_INSTANCE_PREFIX: &str = "comobj_";

macro_rules! cmdb_names {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $text:literal,)+
        }
        $(dynamic $dyn:ident = $prefix:expr;)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            $($dyn(i64),)?
        }

        impl $name {
            /// Every statically named variant.
            pub const STATIC: &'static [$name] = &[$($name::$variant,)+];

            pub fn name(&self) -> Cow<'static, str> {
                match self {
                    $($name::$variant => Cow::Borrowed($text),)+
                    $($name::$dyn(id) => Cow::Owned(format!("{}{}", $prefix, id)),)?
                }
            }
        }

        impl FromStr for $name {
            type Err = AuthzError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => {
                        $(
                            if let Some(id) = s.strip_prefix($prefix) {
                                if let Ok(id) = id.parse::<i64>() {
                                    return Ok($name::$dyn(id));
                                }
                            }
                        )?
                        Err(AuthzError::Unsupported(format!(
                            "unknown {} {}",
                            stringify!($name),
                            s
                        )))
                    }
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.name())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.name())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

cmdb_names! {
    /// A CMDB resource kind.
    pub enum ResourceType {
        Business = "business",
        BizSet = "bizSet",
        Model = "model",
        ModelModule = "modelModule",
        ModelSet = "modelSet",
        MainlineModel = "mainlineModel",
        MainlineModelTopology = "mainlineModelTopology",
        MainlineInstanceTopology = "mainlineInstanceTopology",
        MainlineInstance = "mainlineInstance",
        ModelInstanceTopology = "modelInstanceTopology",
        ModelTopology = "modelTopology",
        ModelClassification = "modelClassification",
        ModelAttributeGroup = "modelAttributeGroup",
        ModelAttribute = "modelAttribute",
        ModelUnique = "modelUnique",
        ModelAssociation = "modelAssociation",
        AssociationType = "associationType",
        HostInstance = "hostInstance",
        HostFavorite = "hostFavorite",
        Process = "process",
        ProcessServiceCategory = "processServiceCategory",
        ProcessServiceTemplate = "processServiceTemplate",
        ProcessTemplate = "processTemplate",
        ProcessServiceInstance = "processServiceInstance",
        BizTopology = "bizTopology",
        SetTemplate = "setTemplate",
        HostApply = "hostApply",
        ResourcePoolDirectory = "resourcePoolDirectory",
        CloudAreaInstance = "plat",
        CloudAccount = "cloudAccount",
        CloudResourceTask = "cloudResourceTask",
        NetDataCollector = "netDataCollector",
        DynamicGrouping = "dynamicGrouping",
        AuditLog = "auditlog",
        SystemBase = "systemBase",
        UserCustom = "userCustom",
        EventWatch = "eventWatch",
        OperationStatistic = "operationStatistic",
        InstallBK = "installBK",
        ConfigAdmin = "configAdmin",
        SystemConfig = "systemConfig",
        KubeCluster = "kubeCluster",
        KubeNode = "kubeNode",
        KubeNamespace = "kubeNamespace",
        KubeWorkload = "kubeWorkload",
        KubeDeployment = "kubeDeployment",
        KubeStatefulSet = "kubeStatefulSet",
        KubeDaemonSet = "kubeDaemonSet",
        KubeGameStatefulSet = "kubeGameStatefulSet",
        KubeGameDeployment = "kubeGameDeployment",
        KubeCronJob = "kubeCronJob",
        KubeJob = "kubeJob",
        KubePodWorkload = "kubePodWorkload",
        KubePod = "kubePod",
        KubeContainer = "kubeContainer",
    }
    dynamic SysInstance = CMDB_SYS_INSTANCE_PREFIX;
}

impl ResourceType {
    /// Model id of a dynamically modeled kind.
    pub fn sys_instance_model(&self) -> Option<i64> {
        match self {
            ResourceType::SysInstance(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_kube(&self) -> bool {
        matches!(
            self,
            ResourceType::KubeCluster
                | ResourceType::KubeNode
                | ResourceType::KubeNamespace
                | ResourceType::KubeWorkload
                | ResourceType::KubeDeployment
                | ResourceType::KubeStatefulSet
                | ResourceType::KubeDaemonSet
                | ResourceType::KubeGameStatefulSet
                | ResourceType::KubeGameDeployment
                | ResourceType::KubeCronJob
                | ResourceType::KubeJob
                | ResourceType::KubePodWorkload
                | ResourceType::KubePod
                | ResourceType::KubeContainer
        )
    }
}

cmdb_names! {
    /// A CMDB action.
    pub enum Action {
        Create = "create",
        Update = "update",
        Delete = "delete",
        Find = "find",
        CreateMany = "createMany",
        UpdateMany = "updateMany",
        DeleteMany = "deleteMany",
        FindMany = "findMany",
        Skip = "skip",
        Archive = "archive",
        Execute = "execute",
        ViewBusinessResource = "viewBusinessResource",
        AccessBizSet = "accessBizSet",
        MoveResPoolHostToBizIdleModule = "moveResPoolHostToBizIdleModule",
        MoveResPoolHostToDirectory = "moveResPoolHostToDirectory",
        MoveBizHostFromModuleToResPool = "moveBizHostFromModuleToResPool",
        AddHostToResourcePool = "addHostToResourcePool",
        MoveHostToAnotherBizModule = "moveHostToAnotherBizModule",
        DefaultHostApply = "defaultHostApply",
        ModelTopologyView = "modelTopologyView",
        ModelTopologyOperation = "modelTopologyOperation",
        WatchHost = "host",
        WatchHostRelation = "host_relation",
        WatchBiz = "biz",
        WatchSet = "set",
        WatchModule = "module",
        WatchProcess = "process",
        WatchCommonInstance = "object_instance",
        WatchMainlineInstance = "mainline_instance",
        WatchInstAsst = "inst_asst",
        WatchBizSet = "biz_set",
        WatchKubeCluster = "kube_cluster",
        WatchKubeNode = "kube_node",
        WatchKubeNamespace = "kube_namespace",
        WatchKubeWorkload = "kube_workload",
        WatchKubePod = "kube_pod",
    }
}

impl Action {
    /// Collapses the batch variants onto their single-item action.
    pub fn normalize(self) -> Action {
        match self {
            Action::CreateMany => Action::Create,
            Action::FindMany => Action::Find,
            Action::DeleteMany => Action::Delete,
            Action::UpdateMany => Action::Update,
            other => other,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Action::Create | Action::CreateMany)
    }
}
