//! Compiles authority policies into store filters.
//!
//! A policy is compiled for one resource type at a time: leaves about other
//! types are pruned, `id`/`display_name` are rewritten to physical fields and
//! the `_bk_iam_path_` attribute is expanded into ancestor id conditions.
//! Hosts keep their ancestors in the host/module relation collection, so a
//! host path condition is resolved to host ids through a [`HostPathResolver`].

use crate::adaptor::split_path_item;
use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::fields::{
    is_resource_id_string_type, resource_id_field, resource_name_field, FIELD_HOST_ID,
    POLICY_ID_ATTRIBUTE, POLICY_NAME_ATTRIBUTE, TABLE_MODULE_HOST_CONFIG,
};
use crate::iam::TypeId;
use crate::policy::{Combinator, FieldValue, Operator, Policy};
use crate::resource::IAM_PATH_KEY;
use crate::store::{Filter, ResourceStore, SearchParam};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Resolves a path condition on the host/module relation to host ids.
#[async_trait]
pub trait HostPathResolver: Send + Sync {
    async fn host_ids_by_path(&self, ctx: &RequestContext, filter: Filter) -> Result<Vec<i64>>;
}

/// Looks host ids up in `cc_ModuleHostConfig`.
pub struct StoreHostPathResolver {
    store: Arc<dyn ResourceStore>,
}

impl StoreHostPathResolver {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HostPathResolver for StoreHostPathResolver {
    async fn host_ids_by_path(&self, ctx: &RequestContext, filter: Filter) -> Result<Vec<i64>> {
        let param =
            SearchParam::new(TABLE_MODULE_HOST_CONFIG, filter).with_fields([FIELD_HOST_ID]);
        let documents = self.store.search_auth_resource(ctx, param).await?;

        let mut host_ids = Vec::with_capacity(documents.len());
        for document in documents {
            let host_id = document
                .get(FIELD_HOST_ID)
                .and_then(value_as_i64)
                .ok_or_else(|| {
                    AuthzError::remote(
                        ctx.rid.clone(),
                        format!("invalid {} in {}", FIELD_HOST_ID, TABLE_MODULE_HOST_CONFIG),
                    )
                })?;
            if !host_ids.contains(&host_id) {
                host_ids.push(host_id);
            }
        }
        Ok(host_ids)
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub struct PolicyCompiler {
    resolver: Arc<dyn HostPathResolver>,
}

impl PolicyCompiler {
    pub fn new(resolver: Arc<dyn HostPathResolver>) -> Self {
        Self { resolver }
    }

    /// Compiles `policy` into a filter over instances of `resource_type`.
    ///
    /// `None` means the policy grants nothing of this type; `Some({})` means
    /// it grants everything.
    pub async fn compile(
        &self,
        ctx: &RequestContext,
        policy: Option<&Policy>,
        resource_type: &TypeId,
    ) -> Result<Option<Filter>> {
        let Some(policy) = policy else {
            return Ok(None);
        };
        let filter = self.compile_node(ctx, policy, resource_type).await?;
        debug!(
            rid = %ctx.rid,
            resource_type = %resource_type,
            filter = ?filter,
            "compiled policy"
        );
        Ok(filter)
    }

    fn compile_node<'a>(
        &'a self,
        ctx: &'a RequestContext,
        policy: &'a Policy,
        resource_type: &'a TypeId,
    ) -> BoxFuture<'a, Result<Option<Filter>>> {
        Box::pin(async move {
            match policy {
                Policy::Any => Ok(Some(Filter::new())),
                Policy::Combinator { op, content } => {
                    if content.is_empty() {
                        return Err(AuthzError::InvalidPolicy(format!(
                            "filter op {} content can't be empty",
                            op.as_str()
                        )));
                    }
                    let mut filters = Vec::with_capacity(content.len());
                    for child in content {
                        if let Some(filter) = self.compile_node(ctx, child, resource_type).await? {
                            filters.push(Value::Object(filter));
                        }
                    }
                    if filters.is_empty() {
                        return Ok(None);
                    }
                    if filters.len() == 1 {
                        if let Some(Value::Object(only)) = filters.pop() {
                            return Ok(Some(only));
                        }
                    }
                    let key = match op {
                        Combinator::And => "$and",
                        Combinator::Or => "$or",
                    };
                    Ok(Some(single(key, Value::Array(filters))))
                }
                Policy::Leaf(leaf) => self.compile_leaf(ctx, leaf, resource_type).await,
            }
        })
    }

    async fn compile_leaf(
        &self,
        ctx: &RequestContext,
        leaf: &FieldValue,
        resource_type: &TypeId,
    ) -> Result<Option<Filter>> {
        if leaf.field.resource_type != *resource_type {
            return Ok(None);
        }
        if leaf.op == Operator::Any {
            return Ok(Some(Filter::new()));
        }
        if leaf.field.attribute == IAM_PATH_KEY {
            return self.compile_path(ctx, leaf, resource_type).await;
        }

        let attribute = match leaf.field.attribute.as_str() {
            POLICY_ID_ATTRIBUTE => resource_id_field(resource_type)
                .ok_or_else(|| AuthzError::ParamInvalid(format!("{} id field", resource_type)))?
                .to_string(),
            POLICY_NAME_ATTRIBUTE => resource_name_field(resource_type)
                .ok_or_else(|| AuthzError::ParamInvalid(format!("{} name field", resource_type)))?
                .to_string(),
            other => other.to_string(),
        };
        compile_comparison(&attribute, &leaf.op, &leaf.value).map(Some)
    }

    async fn compile_path(
        &self,
        ctx: &RequestContext,
        leaf: &FieldValue,
        resource_type: &TypeId,
    ) -> Result<Option<Filter>> {
        let op = &leaf.op;
        let condition = match op {
            Operator::Eq | Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                path_condition(expect_str(op, &leaf.value)?, "$eq")?
            }
            Operator::NotEq
            | Operator::NotContains
            | Operator::NotStartsWith
            | Operator::NotEndsWith => path_condition(expect_str(op, &leaf.value)?, "$ne")?,
            Operator::In | Operator::NotIn => {
                let (combinator, cmp) = if *op == Operator::In {
                    ("$or", "$eq")
                } else {
                    ("$and", "$ne")
                };
                let paths = expect_array(op, &leaf.value)?;
                let mut conditions = Vec::with_capacity(paths.len());
                for path in paths {
                    let path = path.as_str().ok_or_else(|| {
                        AuthzError::TypeMismatch(format!(
                            "filter op {} value {} isn't string type",
                            op, leaf.value
                        ))
                    })?;
                    conditions.push(Value::Object(path_condition(path, cmp)?));
                }
                single(combinator, Value::Array(conditions))
            }
            other => {
                return Err(AuthzError::Unsupported(format!(
                    "filter op {} not supported",
                    other
                )))
            }
        };

        if *resource_type != TypeId::HOST {
            return Ok(Some(condition));
        }

        let host_ids = ctx
            .run(self.resolver.host_ids_by_path(ctx, condition))
            .await?;
        debug!(rid = %ctx.rid, count = host_ids.len(), "resolved host path");
        Ok(Some(single(FIELD_HOST_ID, json!({ "$in": host_ids }))))
    }
}

fn single(key: &str, value: Value) -> Filter {
    let mut filter = Filter::new();
    filter.insert(key.to_string(), value);
    filter
}

fn field_condition(attribute: &str, op: &str, value: Value) -> Filter {
    single(attribute, Value::Object(single(op, value)))
}

/// Turns `/type,id/type,id/` into one condition per bounded ancestor.
fn path_condition(path: &str, cmp: &str) -> Result<Filter> {
    let mut condition = Filter::new();
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(condition);
    }
    for item in trimmed.split('/') {
        let (type_id, id) = split_path_item(item)?;
        if id == "*" {
            continue;
        }
        let type_id = TypeId::new(type_id);
        let id_field = resource_id_field(&type_id).ok_or_else(|| {
            AuthzError::Validation(format!("pathItem {} has unknown resource type", item))
        })?;
        let id = if is_resource_id_string_type(&type_id) {
            Value::String(id.to_string())
        } else {
            let id: i64 = id.parse().map_err(|e| {
                AuthzError::InvalidPolicy(format!("id {} parse int failed, error: {}", id, e))
            })?;
            Value::from(id)
        };
        condition.insert(id_field.to_string(), Value::Object(single(cmp, id)));
    }
    Ok(condition)
}

fn compile_comparison(attribute: &str, op: &Operator, value: &Value) -> Result<Filter> {
    let filter = match op {
        Operator::Eq | Operator::NotEq => {
            if scalar_kind(value).is_none() {
                return Err(AuthzError::TypeMismatch(format!(
                    "filter op {} value {} isn't string, numeric or boolean type",
                    op, value
                )));
            }
            let cmp = if *op == Operator::Eq { "$eq" } else { "$ne" };
            field_condition(attribute, cmp, value.clone())
        }
        Operator::In | Operator::NotIn => {
            let items = expect_array(op, value)?;
            let kind = scalar_kind(&items[0]).ok_or_else(|| {
                AuthzError::TypeMismatch(format!(
                    "filter op {} value {} isn't string, numeric or boolean array type",
                    op, value
                ))
            })?;
            if items.iter().any(|item| scalar_kind(item) != Some(kind)) {
                return Err(AuthzError::TypeMismatch(format!(
                    "filter op {} value {} contains values with different types",
                    op, value
                )));
            }
            let cmp = if *op == Operator::In { "$in" } else { "$nin" };
            field_condition(attribute, cmp, value.clone())
        }
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            if !value.is_number() {
                return Err(AuthzError::TypeMismatch(format!(
                    "filter op {} value {} isn't numeric type",
                    op, value
                )));
            }
            let cmp = match op {
                Operator::Lt => "$lt",
                Operator::Lte => "$lte",
                Operator::Gt => "$gt",
                _ => "$gte",
            };
            field_condition(attribute, cmp, value.clone())
        }
        Operator::Contains
        | Operator::StartsWith
        | Operator::EndsWith
        | Operator::NotContains
        | Operator::NotStartsWith
        | Operator::NotEndsWith => {
            let escaped = regex::escape(expect_str(op, value)?);
            let pattern = match op {
                Operator::StartsWith | Operator::NotStartsWith => format!("^{}", escaped),
                Operator::EndsWith | Operator::NotEndsWith => format!("{}$", escaped),
                _ => escaped,
            };
            let regex = json!({ "$regex": pattern });
            if op.is_negative() {
                field_condition(attribute, "$not", regex)
            } else {
                single(attribute, regex)
            }
        }
        other => {
            return Err(AuthzError::Unsupported(format!(
                "filter op {} not supported",
                other
            )))
        }
    };
    Ok(filter)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    String,
    Number,
    Bool,
}

fn scalar_kind(value: &Value) -> Option<ScalarKind> {
    match value {
        Value::String(_) => Some(ScalarKind::String),
        Value::Number(_) => Some(ScalarKind::Number),
        Value::Bool(_) => Some(ScalarKind::Bool),
        _ => None,
    }
}

fn expect_str<'v>(op: &Operator, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| {
        AuthzError::TypeMismatch(format!(
            "filter op {} value {} isn't string type",
            op, value
        ))
    })
}

fn expect_array<'v>(op: &Operator, value: &'v Value) -> Result<&'v Vec<Value>> {
    match value.as_array() {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(AuthzError::TypeMismatch(format!(
            "filter op {} value {} isn't array type or is empty",
            op, value
        ))),
    }
}
