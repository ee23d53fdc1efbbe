//! Persistence layer: sqlx/Postgres models and repositories.
//!
//! Conventions:
//! - Entity structs under [`models`] derive `FromRow` and mirror their
//!   table row exactly; status/type columns are stored as text and
//!   resolved to `haven-core` enums once, via accessor methods.
//! - Repositories under [`repositories`] are zero-sized structs whose
//!   async methods take `&PgPool` as the first argument. Writes that
//!   must join a caller-owned transaction take `&mut PgConnection`
//!   instead.
//! - Nothing in this crate deletes connection or appointment rows;
//!   lifecycle changes are status writes so history stays queryable.

pub mod models;
pub mod repositories;

/// Shared connection pool type.
pub type DbPool = sqlx::PgPool;

/// Connect to Postgres and run pending migrations.
pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("../../db/migrations").run(&pool).await?;
    Ok(pool)
}
