use crate::filter::matches;
use crate::{Database, DatabaseError, Result, RESOURCE_TABLE};
use async_trait::async_trait;
use authz::store::{Document, Filter, ResourceStore, SearchParam};
use authz::{AuthzError, RequestContext};
use serde_json::{Map, Value};
use sqlx::{Row, Sqlite, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// SQLite-backed document store for the resources the authorizer reads:
/// business, host, relation and model tables, one JSON document per row.
#[derive(Debug, Clone)]
pub struct AuthResourceStore {
    db: Arc<Database>,
}

impl AuthResourceStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert one document into `collection`.
    pub async fn insert_document(&self, collection: &str, document: &Document) -> Result<()> {
        let data = serde_json::to_string(document)?;
        sqlx::query(&format!(
            "INSERT INTO {} (collection, data) VALUES (?, ?)",
            RESOURCE_TABLE
        ))
        .bind(collection)
        .bind(data)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Insert many documents atomically.
    pub async fn insert_documents(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        let mut tx = self.db.pool().begin().await?;
        insert_in_tx(&mut tx, collection, documents).await?;
        tx.commit().await?;
        debug!("Inserted {} documents into {}", documents.len(), collection);
        Ok(documents.len())
    }

    /// Every document of `collection` in insertion order.
    pub async fn load_collection(&self, collection: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT data FROM {} WHERE collection = ? ORDER BY id",
            RESOURCE_TABLE
        ))
        .bind(collection)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                Ok(serde_json::from_str(&data)?)
            })
            .collect()
    }

    /// Documents matching the filter, projected and paged as requested.
    pub async fn search(&self, param: &SearchParam) -> Result<Vec<Document>> {
        let mut found = Vec::new();
        let mut skipped = 0;
        for document in self.load_collection(&param.collection).await? {
            if param.limit.is_some_and(|limit| found.len() >= limit) {
                break;
            }
            if !matches(&document, &param.filter)? {
                continue;
            }
            if skipped < param.offset {
                skipped += 1;
                continue;
            }
            found.push(project(document, &param.fields));
        }
        debug!(
            "Search on {} matched {} documents",
            param.collection,
            found.len()
        );
        Ok(found)
    }

    /// Number of documents in `collection` matching `filter`.
    pub async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut total = 0;
        for document in self.load_collection(collection).await? {
            if matches(&document, filter)? {
                total += 1;
            }
        }
        Ok(total)
    }

    /// Load a seed file shaped `{"<collection>": [<document>, ...]}`. All
    /// collections are written in one transaction; any failure leaves the
    /// store untouched.
    pub async fn load_seed_file(&self, path: &Path) -> Result<usize> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: BTreeMap<String, Vec<Value>> = serde_json::from_str(&raw)?;

        let mut tx = self.db.pool().begin().await?;
        let mut total = 0;
        for (collection, values) in seed {
            let documents = values
                .into_iter()
                .map(to_document)
                .collect::<Result<Vec<_>>>()
                .map_err(|e| DatabaseError::Other(format!("seed {}: {}", collection, e)))?;
            insert_in_tx(&mut tx, &collection, &documents).await?;
            total += documents.len();
        }
        tx.commit().await?;
        info!("Loaded {} seed documents from {:?}", total, path);
        Ok(total)
    }
}

async fn insert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &str,
    documents: &[Document],
) -> Result<()> {
    if collection.trim().is_empty() {
        return Err(DatabaseError::Other("collection name can not be empty".to_string()));
    }
    let sql = format!(
        "INSERT INTO {} (collection, data) VALUES (?, ?)",
        RESOURCE_TABLE
    );
    for document in documents {
        sqlx::query(&sql)
            .bind(collection)
            .bind(serde_json::to_string(document)?)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn project(document: Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return document;
    }
    let mut projected = Map::new();
    for field in fields {
        if let Some(value) = document.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

fn store_error(ctx: &RequestContext, err: DatabaseError) -> AuthzError {
    AuthzError::remote(ctx.rid.clone(), err)
}

#[async_trait]
impl ResourceStore for AuthResourceStore {
    async fn search_auth_resource(
        &self,
        ctx: &RequestContext,
        param: SearchParam,
    ) -> authz::Result<Vec<Document>> {
        self.search(&param).await.map_err(|e| store_error(ctx, e))
    }

    async fn count_by_filter(
        &self,
        ctx: &RequestContext,
        table: &str,
        filters: &[Filter],
    ) -> authz::Result<Vec<u64>> {
        let documents = self
            .load_collection(table)
            .await
            .map_err(|e| store_error(ctx, e))?;

        let mut counts = Vec::with_capacity(filters.len());
        for filter in filters {
            let mut total = 0;
            for document in &documents {
                if matches(document, filter).map_err(|e| store_error(ctx, e))? {
                    total += 1;
                }
            }
            counts.push(total);
        }
        Ok(counts)
    }
}

/// Convert a JSON value into a document, rejecting non-objects.
pub fn to_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Other(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn store() -> AuthResourceStore {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        AuthResourceStore::new(Arc::new(db))
    }

    fn filter(value: Value) -> Filter {
        to_document(value).unwrap()
    }

    async fn seed_hosts(store: &AuthResourceStore) {
        let hosts: Vec<Document> = (1..=4)
            .map(|id| {
                to_document(json!({
                    "bk_host_id": id,
                    "bk_host_innerip": format!("10.0.0.{}", id),
                    "bk_biz_id": if id % 2 == 0 { 2 } else { 3 },
                }))
                .unwrap()
            })
            .collect();
        store.insert_documents("cc_HostBase", &hosts).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_load() {
        let store = store().await;
        store
            .insert_document("cc_ApplicationBase", &filter(json!({"bk_biz_id": 3})))
            .await
            .unwrap();

        let docs = store.load_collection("cc_ApplicationBase").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["bk_biz_id"], json!(3));
        assert!(store.load_collection("cc_HostBase").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_with_projection_and_limit() {
        let store = store().await;
        seed_hosts(&store).await;

        let param = SearchParam::new("cc_HostBase", filter(json!({"bk_biz_id": {"$eq": 3}})))
            .with_fields(["bk_host_id"]);
        let docs = store.search(&param).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], filter(json!({"bk_host_id": 1})));

        let limited = store
            .search(&SearchParam::new("cc_HostBase", Filter::new()).with_limit(3))
            .await
            .unwrap();
        assert_eq!(limited.len(), 3);

        let page = store
            .search(
                &SearchParam::new("cc_HostBase", filter(json!({"bk_biz_id": {"$eq": 3}})))
                    .with_fields(["bk_host_id"])
                    .with_page(1, 5),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_ne!(page[0], docs[0]);
    }

    #[tokio::test]
    async fn test_count_by_filter_keeps_order() {
        let store = store().await;
        seed_hosts(&store).await;
        let ctx = RequestContext::new("rid-count");

        let counts = store
            .count_by_filter(
                &ctx,
                "cc_HostBase",
                &[
                    filter(json!({"bk_biz_id": 2})),
                    Filter::new(),
                    filter(json!({"bk_host_id": {"$in": []}})),
                ],
            )
            .await
            .unwrap();
        assert_eq!(counts, vec![2, 4, 0]);
    }

    #[tokio::test]
    async fn test_bad_filter_maps_to_remote_error() {
        let store = store().await;
        seed_hosts(&store).await;
        let ctx = RequestContext::new("rid-bad");

        let err = store
            .search_auth_resource(
                &ctx,
                SearchParam::new("cc_HostBase", filter(json!({"bk_host_id": {"$near": 1}}))),
            )
            .await
            .unwrap_err();
        match err {
            AuthzError::Remote { rid, .. } => assert_eq!(rid, "rid-bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_seed_file() {
        let store = store().await;
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "cc_ApplicationBase": [{"bk_biz_id": 3, "bk_biz_name": "blueking"}],
                "cc_HostBase": [{"bk_host_id": 1}, {"bk_host_id": 2}]
            })
        )
        .unwrap();

        let total = store.load_seed_file(file.path()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(store.count("cc_HostBase", &Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_seed_persists_nothing() {
        let store = store().await;
        let mut file = NamedTempFile::new().unwrap();
        // Collections load in name order; the host list fails after the
        // business list was written.
        write!(
            file,
            "{}",
            json!({
                "cc_ApplicationBase": [{"bk_biz_id": 3, "bk_biz_name": "blueking"}],
                "cc_HostBase": [{"bk_host_id": 1}, "not a document"]
            })
        )
        .unwrap();

        assert!(store.load_seed_file(file.path()).await.is_err());
        assert!(store.load_collection("cc_ApplicationBase").await.unwrap().is_empty());
        assert!(store.load_collection("cc_HostBase").await.unwrap().is_empty());
    }

    #[test]
    fn test_to_document_rejects_scalars() {
        assert!(to_document(json!(1)).is_err());
        assert!(to_document(json!({"a": 1})).is_ok());
    }
}
