//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over database operations,
//! enabling better testing through mock implementations and dependency injection.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::reservation::{Court, ReservationResult};

/// Trait for court lookup operations
#[async_trait]
pub trait CourtRepository: Send + Sync {
    /// Find a court by ID
    async fn find_by_id(&self, court_id: i64) -> ReservationResult<Option<Court>>;

    /// List all active courts
    async fn list_active(&self) -> ReservationResult<Vec<Court>>;
}

/// Default PostgreSQL implementation of `CourtRepository`
pub struct PgCourtRepository {
    pool: Arc<PgPool>,
}

impl PgCourtRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn court_from_row(row: &sqlx::postgres::PgRow) -> Court {
    Court {
        id: row.get("id"),
        name: row.get("name"),
        sport: row.get("sport"),
        open_hour: row.get("open_hour"),
        close_hour: row.get("close_hour"),
        is_active: row.get("is_active"),
    }
}

#[async_trait]
impl CourtRepository for PgCourtRepository {
    async fn find_by_id(&self, court_id: i64) -> ReservationResult<Option<Court>> {
        let row = sqlx::query(
            "SELECT id, name, sport, open_hour, close_hour, is_active
             FROM courts WHERE id = $1",
        )
        .bind(court_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| court_from_row(&r)))
    }

    async fn list_active(&self) -> ReservationResult<Vec<Court>> {
        let rows = sqlx::query(
            "SELECT id, name, sport, open_hour, close_hour, is_active
             FROM courts WHERE is_active ORDER BY id",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(court_from_row).collect())
    }
}

/// Mock implementation for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct MockCourtRepository {
        courts: Mutex<HashMap<i64, Court>>,
    }

    impl Default for MockCourtRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockCourtRepository {
        pub fn new() -> Self {
            Self {
                courts: Mutex::new(HashMap::new()),
            }
        }

        pub fn with_court(self, court: Court) -> Self {
            self.courts.lock().unwrap().insert(court.id, court);
            self
        }
    }

    #[async_trait]
    impl CourtRepository for MockCourtRepository {
        async fn find_by_id(&self, court_id: i64) -> ReservationResult<Option<Court>> {
            Ok(self.courts.lock().unwrap().get(&court_id).cloned())
        }

        async fn list_active(&self) -> ReservationResult<Vec<Court>> {
            let mut courts: Vec<Court> = self
                .courts
                .lock()
                .unwrap()
                .values()
                .filter(|c| c.is_active)
                .cloned()
                .collect();
            courts.sort_by_key(|c| c.id);
            Ok(courts)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn court(id: i64, active: bool) -> Court {
            Court {
                id,
                name: format!("Court {id}"),
                sport: "padel".to_string(),
                open_hour: 8,
                close_hour: 22,
                is_active: active,
            }
        }

        #[tokio::test]
        async fn test_mock_find_by_id() {
            let repo = MockCourtRepository::new().with_court(court(1, true));

            let found = repo.find_by_id(1).await.unwrap();
            assert!(found.is_some(), "Should find preloaded court");
            assert_eq!(found.unwrap().name, "Court 1");

            let missing = repo.find_by_id(99).await.unwrap();
            assert!(missing.is_none(), "Should not find unknown court");
        }

        #[tokio::test]
        async fn test_mock_list_active_filters_inactive() {
            let repo = MockCourtRepository::new()
                .with_court(court(1, true))
                .with_court(court(2, false))
                .with_court(court(3, true));

            let active = repo.list_active().await.unwrap();
            assert_eq!(active.len(), 2);
            assert_eq!(active[0].id, 1);
            assert_eq!(active[1].id, 3);
        }
    }
}
