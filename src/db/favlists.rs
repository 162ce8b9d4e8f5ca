//! Favlist CRUD operations.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, Favlist};

impl Database {
    /// Insert a favlist, replacing any row with the same id
    pub async fn insert_or_replace_favlist(&self, favlist: &Favlist) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO favlists (id, name, cover, last_checked_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(favlist.id)
        .bind(&favlist.name)
        .bind(&favlist.cover)
        .bind(favlist.last_checked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert favlist: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get favlist by ID
    pub async fn get_favlist(&self, id: i64) -> Result<Option<Favlist>> {
        let favlist = sqlx::query_as::<_, Favlist>(
            "SELECT id, name, cover, last_checked_at FROM favlists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get favlist: {}",
                e
            )))
        })?;

        Ok(favlist)
    }

    /// Get all favlists ordered by id
    pub async fn list_favlists(&self) -> Result<Vec<Favlist>> {
        let favlists = sqlx::query_as::<_, Favlist>(
            "SELECT id, name, cover, last_checked_at FROM favlists ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list favlists: {}",
                e
            )))
        })?;

        Ok(favlists)
    }

    /// Record the time of the latest successful sync cycle
    pub async fn touch_favlist_checked(&self, id: i64, at: i64) -> Result<()> {
        sqlx::query("UPDATE favlists SET last_checked_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update favlist last check: {}",
                    e
                )))
            })?;

        Ok(())
    }
}
