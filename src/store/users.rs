//! Postgres-backed user store.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{StoreError, UserStore};
use crate::model::User;

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"INSERT INTO users (login, password_hash)
               VALUES ($1, $2)
               ON CONFLICT (login) DO NOTHING
               RETURNING id"#,
        )
        .bind(login)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.get("id")),
            None => Err(StoreError::LoginAlreadyExists),
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, login, password_hash, created_at
               FROM users
               WHERE login = $1"#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(User {
                id: row.get("id"),
                login: row.get("login"),
                password_hash: row.get("password_hash"),
                created_at: row.get("created_at"),
            }),
            None => Err(StoreError::UserNotFound),
        }
    }
}
