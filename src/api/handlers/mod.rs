pub mod accounts;
pub mod games;
pub mod import;
pub mod reference;

use actix_web::{web, HttpResponse};

use crate::api::auth::Claims;
use crate::api::models::{ApiResponse, HealthResponse};
use crate::util::db::Db;

pub async fn health_check(db: web::Data<Db>) -> HttpResponse {
    let db_status = match sqlx::query_scalar::<_, bool>("SELECT true")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    HttpResponse::Ok().json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
    }))
}

pub(crate) fn forbid_non_admin(claims: &Claims) -> Option<HttpResponse> {
    if claims.is_admin() {
        None
    } else {
        Some(HttpResponse::Forbidden().json(ApiResponse::<()>::error("admin access required")))
    }
}

pub(crate) fn internal_error(e: anyhow::Error) -> HttpResponse {
    tracing::error!(error = ?e, "request handling failed");
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error("internal server error"))
}

pub(crate) fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error("not found"))
}
