//! PostgreSQL document store: one JSONB table per resource inside the schema from `CRUDIFY_SCHEMA`.

use super::{display_value, Document, DocumentStore};
use crate::config::ResourceDescriptor;
use crate::error::StoreError;
use crate::query::Filter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{ConnectOptions, PgPool};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

type Row = (Uuid, Value, DateTime<Utc>, DateTime<Utc>);

const RETURNING: &str = "RETURNING id, doc, created_at, updated_at";

/// Quote identifier for PostgreSQL (names come from descriptors, never from requests).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// PostgreSQL truncates identifiers longer than this many bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Keep `name` within [`MAX_IDENTIFIER_LEN`]. Longer names are cut at a char boundary and
/// suffixed with a hash of the full name, so distinct long names stay distinct.
fn bounded_identifier(name: String) -> String {
    if name.len() <= MAX_IDENTIFIER_LEN {
        return name;
    }
    let hash = format!("{:016x}", fnv1a(name.as_bytes()));
    let mut cut = MAX_IDENTIFIER_LEN - hash.len() - 1;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}_{}", &name[..cut], hash)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3))
}

fn unique_index_name(collection: &str, field: &str) -> String {
    bounded_identifier(format!("{}_{}_uniq", collection, field))
}

/// Unique index name to field, filled as collections are ensured.
#[derive(Clone, Default)]
struct UniqueIndexes(Arc<RwLock<HashMap<String, String>>>);

impl UniqueIndexes {
    fn remember(&self, collection: &str, field: &str) -> String {
        let name = unique_index_name(collection, field);
        self.0
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.clone(), field.to_string());
        name
    }

    /// Field behind a violated constraint. Indexes created by an earlier process are not in
    /// the map, so short names fall back to the `<collection>_<field>_uniq` shape.
    fn field_for(&self, collection: &str, constraint: &str) -> Option<String> {
        if let Some(field) = self.0.read().unwrap_or_else(|e| e.into_inner()).get(constraint) {
            return Some(field.clone());
        }
        constraint
            .strip_prefix(collection)
            .and_then(|c| c.strip_prefix('_'))
            .and_then(|c| c.strip_suffix("_uniq"))
            .map(str::to_string)
    }
}

fn into_document((id, doc, created_at, updated_at): Row) -> Document {
    let fields = match doc {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    Document {
        id,
        fields,
        created_at,
        updated_at,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
    unique_indexes: UniqueIndexes,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
            unique_indexes: UniqueIndexes::default(),
        }
    }

    pub async fn connect(database_url: &str, schema: &str) -> Result<Self, StoreError> {
        ensure_database_exists(database_url).await?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
            .execute(&pool)
            .await?;
        Ok(PgStore::new(pool, schema))
    }

    fn table(&self, collection: &str) -> String {
        format!("{}.{}", quoted(&self.schema), quoted(collection))
    }

    /// Translate a unique-index violation back into the offending field and value.
    fn map_write_error(&self, collection: &str, fields: &Map<String, Value>, e: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = db
                    .constraint()
                    .and_then(|c| self.unique_indexes.field_for(collection, c))
                    .unwrap_or_else(|| "value".to_string());
                let value = display_value(fields.get(&field));
                return StoreError::Duplicate { field, value };
            }
        }
        StoreError::Db(e)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn ensure_collection(&self, descriptor: &ResourceDescriptor) -> Result<(), StoreError> {
        let collection = descriptor.path();
        let table = self.table(&collection);
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                doc JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (doc jsonb_path_ops)",
            quoted(&bounded_identifier(format!("{}_doc_gin", collection))),
            table
        ))
        .execute(&self.pool)
        .await?;

        for field in descriptor.fields.iter().filter(|f| f.unique) {
            let sql = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc->>{}))",
                quoted(&self.unique_indexes.remember(&collection, &field.name)),
                table,
                literal(&field.name)
            );
            tracing::debug!(sql = %sql, "ensure unique index");
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        tracing::info!(collection = %collection, "collection ready");
        Ok(())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE doc @> $1", self.table(collection));
        tracing::debug!(sql = %sql, filter = ?filter, "query");
        let n: i64 = sqlx::query_scalar(&sql)
            .bind(filter.to_json())
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn find(&self, collection: &str, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Document>, StoreError> {
        let sql = format!(
            "SELECT id, doc, created_at, updated_at FROM {} WHERE doc @> $1 ORDER BY created_at, id OFFSET $2 LIMIT $3",
            self.table(collection)
        );
        tracing::debug!(sql = %sql, filter = ?filter, skip, limit, "query");
        let rows: Vec<Row> = sqlx::query_as(&sql)
            .bind(filter.to_json())
            .bind(i64::try_from(skip).unwrap_or(i64::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(into_document).collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "SELECT id, doc, created_at, updated_at FROM {} WHERE id = $1",
            self.table(collection)
        );
        tracing::debug!(sql = %sql, %id, "query");
        let row: Option<Row> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(into_document))
    }

    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<Document, StoreError> {
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2) {}", self.table(collection), RETURNING);
        tracing::debug!(sql = %sql, "query");
        let doc = Value::Object(fields.clone());
        let row: Row = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(doc)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.map_write_error(collection, &fields, e))?;
        Ok(into_document(row))
    }

    async fn replace(&self, collection: &str, id: Uuid, fields: Map<String, Value>) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "UPDATE {} SET doc = $2, updated_at = NOW() WHERE id = $1 {}",
            self.table(collection),
            RETURNING
        );
        tracing::debug!(sql = %sql, %id, "query");
        let doc = Value::Object(fields.clone());
        let row: Option<Row> = sqlx::query_as(&sql)
            .bind(id)
            .bind(doc)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_write_error(collection, &fields, e))?;
        Ok(row.map(into_document))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 {}", self.table(collection), RETURNING);
        tracing::debug!(sql = %sql, %id, "query");
        let row: Option<Row> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(into_document))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the target database when it does not exist yet (connects through the `postgres` database).
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::Unavailable(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/crud?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "crud");
    }

    #[test]
    fn identifiers_and_literals_are_escaped() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(literal("o'brien"), "'o''brien'");
        assert_eq!(unique_index_name("users", "email"), "users_email_uniq");
    }

    #[test]
    fn long_index_names_fit_postgres_limit() {
        let collection = "warehouseinventoryadjustments";
        let a = unique_index_name(collection, "externalReferenceIdentifierPrimary");
        let b = unique_index_name(collection, "externalReferenceIdentifierSecondary");
        assert!(a.len() <= MAX_IDENTIFIER_LEN, "{}", a);
        assert!(b.len() <= MAX_IDENTIFIER_LEN, "{}", b);
        assert_ne!(a, b);
        assert_eq!(a, unique_index_name(collection, "externalReferenceIdentifierPrimary"));

        let wide = unique_index_name("éééééééééééééééééééééééééééééé", "ñññññññññññññññññññññ");
        assert!(wide.len() <= MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn violated_constraint_maps_back_to_field() {
        let indexes = UniqueIndexes::default();
        let collection = "warehouseinventoryadjustments";
        let long = indexes.remember(collection, "externalReferenceIdentifierPrimary");
        let short = indexes.remember("users", "email");
        assert_eq!(short, "users_email_uniq");
        assert_eq!(
            indexes.field_for(collection, &long).as_deref(),
            Some("externalReferenceIdentifierPrimary")
        );
        assert_eq!(indexes.field_for("users", &short).as_deref(), Some("email"));
        assert_eq!(indexes.field_for("products", "products_sku_uniq").as_deref(), Some("sku"));
        assert_eq!(indexes.field_for("products", "other_constraint"), None);
    }
}
