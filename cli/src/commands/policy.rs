use anyhow::{Context, Result};
use authz::compiler::StoreHostPathResolver;
use authz::{Policy, PolicyCompiler, RequestContext, TypeId};
use database::{AuthResourceStore, Database};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Read a policy given inline or as `@path`.
fn read_policy(source: &str) -> Result<Value> {
    let raw = match source.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path))?,
        None => source.to_string(),
    };
    serde_json::from_str(&raw).context("Policy is not valid JSON")
}

/// Compile a policy into the store filter for `resource_type` and print it.
///
/// Host path conditions are resolved against the relations in `seed`, or
/// against an empty store when no seed is given.
pub async fn compile(resource_type: String, source: String, seed: Option<&Path>) -> Result<()> {
    let policy = Policy::from_value(read_policy(&source)?)?;

    let db = Database::in_memory().await?;
    db.migrate().await?;
    let store = Arc::new(AuthResourceStore::new(Arc::new(db)));
    if let Some(seed) = seed {
        let total = store.load_seed_file(seed).await?;
        debug!("Loaded {} seed documents", total);
    }

    let compiler = PolicyCompiler::new(Arc::new(StoreHostPathResolver::new(store)));
    let ctx = RequestContext::generate();
    let filter = compiler
        .compile(&ctx, policy.as_ref(), &TypeId::new(resource_type))
        .await?;

    let output = match filter {
        Some(filter) => Value::Object(filter),
        None => Value::Null,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_inline_policy() {
        let value = read_policy(r#"{"op": "any", "field": "", "value": []}"#).unwrap();
        assert_eq!(value["op"], "any");
    }

    #[test]
    fn test_read_policy_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"op": "eq", "field": "host.id", "value": "42"}}"#).unwrap();

        let value = read_policy(&format!("@{}", file.path().display())).unwrap();
        assert_eq!(value["field"], "host.id");
    }

    #[test]
    fn test_invalid_policy_json() {
        assert!(read_policy("{not json").is_err());
        assert!(read_policy("@/does/not/exist.json").is_err());
    }
}
