use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::db::StoreError;
use crate::models::request::{ImageRequest, Product, RequestStatus};

/// Postgres error code for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Insert a new image request
pub async fn create_request(
    pool: &PgPool,
    request_id: &str,
    products: Vec<Product>,
    status: RequestStatus,
) -> Result<ImageRequest, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO image_requests (request_id, products, status)
        VALUES ($1, $2, $3)
        RETURNING request_id, products, status, error, created_at, updated_at
        "#,
    )
    .bind(request_id)
    .bind(Json(&products))
    .bind(status.to_string())
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => request_from_row(&row),
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Err(StoreError::Duplicate(request_id.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Get a request by ID
pub async fn get_request(
    pool: &PgPool,
    request_id: &str,
) -> Result<Option<ImageRequest>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT request_id, products, status, error, created_at, updated_at
        FROM image_requests
        WHERE request_id = $1
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(request_from_row).transpose()
}

/// Overwrite the stored products, status and error of a request
pub async fn save_request(pool: &PgPool, request: &ImageRequest) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE image_requests
        SET products = $1,
            status = $2,
            error = $3,
            updated_at = NOW()
        WHERE request_id = $4
        "#,
    )
    .bind(Json(&request.products))
    .bind(request.status.to_string())
    .bind(request.error.as_deref())
    .bind(&request.request_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(request.request_id.clone()));
    }

    Ok(())
}

fn request_from_row(row: &PgRow) -> Result<ImageRequest, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<RequestStatus>()
        .map_err(|_| StoreError::UnknownStatus(status_str.clone()))?;
    let Json(products): Json<Vec<Product>> = row.try_get("products")?;

    Ok(ImageRequest {
        request_id: row.try_get("request_id")?,
        products,
        status,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
