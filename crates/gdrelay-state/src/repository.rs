//! SQLite implementation of the cursor store port
//!
//! Documents are stored as JSON objects keyed by `(collection, document)`.
//! Merges overlay the patch's fields onto the stored object inside a single
//! transaction, so concurrent writers never lose each other's fields.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use gdrelay_core::{
    domain::{
        state::{STATE_COLLECTION, STATE_DOCUMENT},
        RelayState, StatePatch,
    },
    ports::ICursorStore,
};

use crate::StateError;

/// Name of the timestamp field set on every merge
const UPDATED_AT_FIELD: &str = "updatedAt";

/// Cursor store over the `state_documents` table
#[derive(Debug, Clone)]
pub struct SqliteCursorStore {
    pool: SqlitePool,
    collection: String,
    document: String,
}

impl SqliteCursorStore {
    /// Store bound to the relay document `state/drive`
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_key(pool, STATE_COLLECTION, STATE_DOCUMENT)
    }

    /// Store bound to an arbitrary document key
    pub fn with_key(
        pool: SqlitePool,
        collection: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            collection: collection.into(),
            document: document.into(),
        }
    }

    /// Reads the raw stored object, including fields the relay does not model
    pub async fn read_fields(&self) -> Result<Option<Map<String, Value>>, StateError> {
        let row = sqlx::query(
            "SELECT body FROM state_documents WHERE collection = ? AND document = ?",
        )
        .bind(&self.collection)
        .bind(&self.document)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let body: String = r.try_get("body")?;
                self.parse_body(&body).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Overlays `fields` onto the stored object and stamps `updatedAt`
    pub async fn merge_fields(&self, fields: Map<String, Value>) -> Result<(), StateError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT body FROM state_documents WHERE collection = ? AND document = ?",
        )
        .bind(&self.collection)
        .bind(&self.document)
        .fetch_optional(&mut *tx)
        .await?;

        let mut body = match row {
            Some(r) => {
                let raw: String = r.try_get("body")?;
                self.parse_body(&raw)?
            }
            None => Map::new(),
        };

        let field_count = fields.len();
        body.extend(fields);
        let now = Utc::now().to_rfc3339();
        body.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.clone()));

        let serialized = Value::Object(body).to_string();
        sqlx::query(
            "INSERT INTO state_documents (collection, document, body, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (collection, document) \
             DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(&self.collection)
        .bind(&self.document)
        .bind(&serialized)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::trace!(
            collection = %self.collection,
            document = %self.document,
            fields = field_count,
            "Merged state document"
        );
        Ok(())
    }

    fn parse_body(&self, body: &str) -> Result<Map<String, Value>, StateError> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(self.corrupt(format!("expected a JSON object, found {other}"))),
            Err(e) => Err(self.corrupt(e.to_string())),
        }
    }

    fn corrupt(&self, reason: String) -> StateError {
        StateError::CorruptDocument {
            collection: self.collection.clone(),
            document: self.document.clone(),
            reason,
        }
    }
}

#[async_trait::async_trait]
impl ICursorStore for SqliteCursorStore {
    async fn read(&self) -> anyhow::Result<RelayState> {
        let Some(fields) = self.read_fields().await? else {
            return Ok(RelayState::default());
        };
        let state = serde_json::from_value(Value::Object(fields))
            .map_err(|e| self.corrupt(e.to_string()))?;
        Ok(state)
    }

    async fn merge(&self, patch: &StatePatch) -> anyhow::Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.merge_fields(patch.to_fields()).await?;
        Ok(())
    }
}
