//! Cursor persistence: Postgres for deployments, in-memory for tests.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

use super::models::{CursorKey, PaginationCursor};

#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self, key: &CursorKey) -> Result<Option<PaginationCursor>>;

    async fn save(&self, cursor: &PaginationCursor) -> Result<()>;
}

pub struct PgCursorStore {
    pool: PgPool,
}

impl PgCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorStore for PgCursorStore {
    async fn load(&self, key: &CursorKey) -> Result<Option<PaginationCursor>> {
        Ok(PaginationCursor::find(key, &self.pool).await?)
    }

    async fn save(&self, cursor: &PaginationCursor) -> Result<()> {
        cursor.save(&self.pool).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCursorStore {
    cursors: RwLock<HashMap<CursorKey, PaginationCursor>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cursor, as if a previous run had stopped there.
    pub fn with_cursor(self, cursor: PaginationCursor) -> Self {
        self.cursors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cursor.key(), cursor);
        self
    }

    pub fn get(&self, key: &CursorKey) -> Option<PaginationCursor> {
        self.cursors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn load(&self, key: &CursorKey) -> Result<Option<PaginationCursor>> {
        Ok(self.get(key))
    }

    async fn save(&self, cursor: &PaginationCursor) -> Result<()> {
        self.cursors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cursor.key(), cursor.clone());
        Ok(())
    }
}
