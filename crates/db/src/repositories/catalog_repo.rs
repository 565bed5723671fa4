//! Repository for the `cities` and `categories` reference tables.

use sqlx::PgPool;
use eventcast_core::types::DbId;

use crate::models::catalog::{Category, City, CreateCategory};

const CITY_COLUMNS: &str = "id, name, is_active, created_at";

const CATEGORY_COLUMNS: &str = "id, name, display_name, description, is_active, created_at";

/// Read-mostly access to reference data.
pub struct CatalogRepo;

impl CatalogRepo {
    // -----------------------------------------------------------------------
    // Cities
    // -----------------------------------------------------------------------

    pub async fn list_cities(pool: &PgPool) -> Result<Vec<City>, sqlx::Error> {
        let query = format!("SELECT {CITY_COLUMNS} FROM cities WHERE is_active = true ORDER BY id");
        sqlx::query_as::<_, City>(&query).fetch_all(pool).await
    }

    pub async fn cities_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<City>, sqlx::Error> {
        let query = format!("SELECT {CITY_COLUMNS} FROM cities WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, City>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn find_city_by_name(pool: &PgPool, name: &str) -> Result<Option<City>, sqlx::Error> {
        let query = format!("SELECT {CITY_COLUMNS} FROM cities WHERE name = $1");
        sqlx::query_as::<_, City>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_city(pool: &PgPool, name: &str) -> Result<City, sqlx::Error> {
        let query = format!("INSERT INTO cities (name) VALUES ($1) RETURNING {CITY_COLUMNS}");
        sqlx::query_as::<_, City>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active = true ORDER BY id"
        );
        sqlx::query_as::<_, Category>(&query).fetch_all(pool).await
    }

    pub async fn categories_by_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<Category>, sqlx::Error> {
        let query =
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Category>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Lookup by canonical name; the decorated display variant is never matched.
    pub async fn find_category_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_category(
        pool: &PgPool,
        input: &CreateCategory,
    ) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO categories (name, display_name, description) \
             VALUES ($1, $2, $3) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }
}
