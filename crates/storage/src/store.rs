use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document body is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("invalid order-by field: '{0}'")]
    InvalidOrderField(String),
}

/// Typed ordering for `list` — the field is interpolated into a
/// `json_extract` path, so it is restricted to identifier characters.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderBy { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderBy { field: field.into(), descending: true }
    }

    fn clause(&self) -> Result<String, StorageError> {
        let valid = !self.field.is_empty()
            && self.field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(StorageError::InvalidOrderField(self.field.clone()));
        }
        let direction = if self.descending { "DESC" } else { "ASC" };
        Ok(format!("ORDER BY json_extract(body, '$.{}') {}", self.field, direction))
    }
}

/// A generic document store over SQLite: documents are JSON bodies keyed
/// by (collection, id). Collections need no declaration — they exist as
/// soon as a document is upserted into them.
#[derive(Clone)]
pub struct DocStore {
    pool: DbPool,
}

impl DocStore {
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        Self::connect(&format!("sqlite:{}", path.display())).await
    }

    pub async fn open_in_memory() -> Result<Self, StorageError> {
        Self::connect("sqlite::memory:").await
    }

    async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        run_migrations(&pool).await?;
        tracing::debug!("document store ready at {url}");

        Ok(DocStore { pool })
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(body,)| serde_json::from_str(&body)).transpose()?)
    }

    /// Insert or fully overwrite the document stored under `id`.
    pub async fn upsert<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_string(doc)?;
        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?) \
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self, collection: &str) -> Result<i64, StorageError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM documents WHERE collection = ?")
                .bind(collection)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// List document bodies. Without an explicit ordering, documents come
    /// back in insertion order.
    pub async fn list(
        &self,
        collection: &str,
        limit: i64,
        offset: i64,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Value>, StorageError> {
        let order_clause = match order_by {
            Some(order) => order.clause()?,
            None => "ORDER BY rowid".to_string(),
        };
        let sql = format!(
            "SELECT body FROM documents WHERE collection = ? {order_clause} LIMIT ? OFFSET ?"
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(body,)| serde_json::from_str(&body).map_err(StorageError::from))
            .collect()
    }

    /// Run an arbitrary statement and return its rows as name → value maps.
    pub async fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Map<String, Value>>, StorageError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    /// Run a statement for its side effect; returns the affected-row count.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StorageError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection)")
        .execute(pool)
        .await?;

    Ok(())
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// SQLite columns are dynamically typed; try integer, then real, then
/// text, and fall back to null for anything else (blobs).
fn row_to_map(row: &SqliteRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map(Value::from).unwrap_or(Value::Null)
        } else {
            Value::Null
        };
        map.insert(column.name().to_string(), value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> DocStore {
        DocStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let store = store().await;
        let doc = json!({"vernr": "V1", "account_number": 4010});
        store.upsert("cost", "id-1", &doc).await.unwrap();

        let fetched = store.get("cost", "id-1").await.unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test]
    async fn upsert_overwrites_same_identity() {
        let store = store().await;
        store.upsert("cost", "id-1", &json!({"debit": "1.00"})).await.unwrap();
        store.upsert("cost", "id-1", &json!({"debit": "2.00"})).await.unwrap();

        assert_eq!(store.count("cost").await.unwrap(), 1);
        let fetched = store.get("cost", "id-1").await.unwrap().unwrap();
        assert_eq!(fetched["debit"], "2.00");
    }

    #[tokio::test]
    async fn collections_are_disjoint() {
        let store = store().await;
        store.upsert("cost", "id-1", &json!({"a": 1})).await.unwrap();
        store.upsert("transaction", "id-1", &json!({"a": 2})).await.unwrap();

        assert_eq!(store.count("cost").await.unwrap(), 1);
        assert_eq!(store.count("transaction").await.unwrap(), 1);
        assert_eq!(store.get("cost", "id-1").await.unwrap().unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = store().await;
        store.upsert("cost", "id-1", &json!({})).await.unwrap();
        assert!(store.delete("cost", "id-1").await.unwrap());
        assert!(!store.delete("cost", "id-1").await.unwrap());
    }

    #[tokio::test]
    async fn list_orders_limits_and_offsets() {
        let store = store().await;
        for (id, number) in [("a", 30), ("b", 10), ("c", 20)] {
            store
                .upsert("cost", id, &json!({"account_number": number}))
                .await
                .unwrap();
        }

        let ascending = store
            .list("cost", 10, 0, Some(&OrderBy::asc("account_number")))
            .await
            .unwrap();
        let numbers: Vec<i64> = ascending
            .iter()
            .map(|d| d["account_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![10, 20, 30]);

        let page = store
            .list("cost", 1, 1, Some(&OrderBy::desc("account_number")))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["account_number"], 20);
    }

    #[tokio::test]
    async fn list_rejects_hostile_order_field() {
        let store = store().await;
        let result = store
            .list("cost", 10, 0, Some(&OrderBy::asc("x') --")))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidOrderField(_))));
    }

    #[tokio::test]
    async fn query_returns_typed_row_mappings() {
        let store = store().await;
        store
            .upsert("cost", "id-1", &json!({"vernr": "V1", "account_number": 4010}))
            .await
            .unwrap();

        let rows = store
            .query(
                "SELECT json_extract(body, '$.vernr') AS vernr, \
                        json_extract(body, '$.account_number') AS konto, \
                        json_extract(body, '$.missing') AS missing \
                 FROM documents WHERE collection = ?",
                &[Value::from("cost")],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["vernr"], "V1");
        assert_eq!(rows[0]["konto"], 4010);
        assert_eq!(rows[0]["missing"], Value::Null);
    }

    #[tokio::test]
    async fn execute_counts_affected_rows() {
        let store = store().await;
        for id in ["a", "b"] {
            store.upsert("transaction", id, &json!({"text": "AWS"})).await.unwrap();
        }
        store.upsert("transaction", "c", &json!({"text": "other"})).await.unwrap();

        let updated = store
            .execute(
                "UPDATE documents SET body = json_set(body, '$.supplier_name', ?) \
                 WHERE collection = ? AND json_extract(body, '$.text') = ?",
                &[Value::from("Amazon"), Value::from("transaction"), Value::from("AWS")],
            )
            .await
            .unwrap();

        assert_eq!(updated, 2);
        let untouched = store.get("transaction", "c").await.unwrap().unwrap();
        assert!(untouched.get("supplier_name").is_none());
    }

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kontera.db");
        let store = DocStore::open(&path).await.unwrap();
        store.upsert("cost", "id-1", &json!({})).await.unwrap();
        assert!(path.exists());
    }
}
