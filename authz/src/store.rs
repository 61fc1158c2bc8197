//! The resource store the engine reads instances from.

use crate::context::RequestContext;
use crate::error::{AuthzError, Result};
use crate::fields::{FIELD_OBJ_ID, TABLE_OBJECT_DES};
use crate::iam::TypeId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A store filter in Mongo operator form, e.g. `{"bk_host_id": {"$in": [1, 2]}}`.
pub type Filter = Map<String, Value>;

/// One stored document.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParam {
    pub collection: String,
    #[serde(default)]
    pub filter: Filter,
    /// Projection; empty returns whole documents.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Matching documents skipped before `limit` applies.
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchParam {
    pub fn new(collection: impl Into<String>, filter: Filter) -> Self {
        Self {
            collection: collection.into(),
            filter,
            ..Default::default()
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Documents of `param.collection` matching `param.filter`.
    async fn search_auth_resource(
        &self,
        ctx: &RequestContext,
        param: SearchParam,
    ) -> Result<Vec<Document>>;

    /// One count per filter, in order.
    async fn count_by_filter(
        &self,
        ctx: &RequestContext,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<u64>>;
}

/// `bk_obj_id` of the model behind a dynamic `sys_instance_<id>` type.
pub async fn model_object_id(
    store: &dyn ResourceStore,
    ctx: &RequestContext,
    type_id: &TypeId,
) -> Result<String> {
    let model_id = type_id.sys_instance_model_id()?;
    let mut filter = Filter::new();
    filter.insert("id".to_string(), json!({ "$eq": model_id }));
    let param = SearchParam::new(TABLE_OBJECT_DES, filter)
        .with_fields(["id", FIELD_OBJ_ID])
        .with_limit(1);
    let documents = ctx.run(store.search_auth_resource(ctx, param)).await?;
    documents
        .first()
        .and_then(|document| document.get(FIELD_OBJ_ID))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AuthzError::ParamInvalid(format!("model {} of {}", model_id, type_id)))
}
