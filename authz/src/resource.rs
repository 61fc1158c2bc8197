//! Request-scoped resource descriptions: what CMDB callers send in
//! ([`ResourceAttribute`]) and what the authority is asked about
//! ([`Resource`]).

use crate::iam::{TypeId, SYSTEM_ID_CMDB};
use crate::meta::{Action, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved resource attribute carrying the ancestor paths of an instance.
pub const IAM_PATH_KEY: &str = "_bk_iam_path_";

/// One ancestor of a resource, root first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layer {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub instance_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_id_ex: String,
}

impl Layer {
    pub fn new(resource_type: ResourceType, instance_id: i64) -> Self {
        Self {
            resource_type: Some(resource_type),
            instance_id,
            ..Default::default()
        }
    }
}

/// A CMDB resource an operation is about to touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttribute {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub action: Action,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub instance_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_id_ex: String,
    #[serde(rename = "bk_biz_id", default)]
    pub business_id: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<Layer>,
    #[serde(
        rename = "bk_supplier_account",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub supplier_account: String,
}

impl ResourceAttribute {
    pub fn new(resource_type: ResourceType, action: Action) -> Self {
        Self {
            resource_type,
            action,
            name: String::new(),
            instance_id: 0,
            instance_id_ex: String::new(),
            business_id: 0,
            layers: Vec::new(),
            supplier_account: String::new(),
        }
    }

    pub fn with_instance(mut self, instance_id: i64) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn with_instance_ex(mut self, instance_id_ex: impl Into<String>) -> Self {
        self.instance_id_ex = instance_id_ex.into();
        self
    }

    pub fn with_business(mut self, business_id: i64) -> Self {
        self.business_id = business_id;
        self
    }

    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A resource descriptor in the authority's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub system: String,
    #[serde(rename = "type")]
    pub resource_type: TypeId,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Map<String, Value>>,
}

impl Resource {
    pub fn new(resource_type: TypeId, id: impl Into<String>) -> Self {
        Self {
            system: SYSTEM_ID_CMDB.to_string(),
            resource_type,
            id: id.into(),
            attribute: None,
        }
    }

    /// A descriptor without an instance id, used for "authorize any".
    pub fn of_type(resource_type: TypeId) -> Self {
        Self::new(resource_type, String::new())
    }

    /// Attaches a single-element ancestor path.
    pub fn with_path(mut self, path: String) -> Self {
        let mut attribute = Map::new();
        attribute.insert(
            IAM_PATH_KEY.to_string(),
            Value::Array(vec![Value::String(path)]),
        );
        self.attribute = Some(attribute);
        self
    }

    /// Ancestor paths stored under [`IAM_PATH_KEY`].
    pub fn paths(&self) -> Vec<&str> {
        self.attribute
            .as_ref()
            .and_then(|attribute| attribute.get(IAM_PATH_KEY))
            .and_then(Value::as_array)
            .map(|paths| paths.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Formats one path segment list as `/type,id/type,id/`.
pub fn format_path(segments: &[(&TypeId, &str)]) -> String {
    let mut path = String::from("/");
    for (resource_type, id) in segments {
        path.push_str(resource_type.as_str());
        path.push(',');
        path.push_str(id);
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_wire_names() {
        let attribute: ResourceAttribute = serde_json::from_value(json!({
            "type": "hostInstance",
            "action": "update",
            "instance_id": 5,
            "bk_biz_id": 3,
            "layers": [{"type": "business", "instance_id": 3}]
        }))
        .unwrap();

        assert_eq!(attribute.resource_type, ResourceType::HostInstance);
        assert_eq!(attribute.action, Action::Update);
        assert_eq!(attribute.business_id, 3);
        assert_eq!(attribute.layers[0].instance_id, 3);
        assert!(attribute.supplier_account.is_empty());
    }

    #[test]
    fn test_resource_path_attribute() {
        let path = format_path(&[(&TypeId::BUSINESS, "3")]);
        assert_eq!(path, "/biz,3/");

        let resource = Resource::new(TypeId::HOST, "7").with_path(path);
        assert_eq!(resource.paths(), vec!["/biz,3/"]);
        assert_eq!(resource.system, "bk_cmdb");

        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["attribute"]["_bk_iam_path_"], json!(["/biz,3/"]));
    }
}
