use actix_web::{web, HttpResponse};

use crate::api::auth::Claims;
use crate::api::handlers::{forbid_non_admin, internal_error, not_found};
use crate::api::models::ApiResponse;
use crate::store::games::{self, GamePatch};
use crate::util::db::Db;

pub async fn list(db: web::Data<Db>, claims: Claims) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    match games::list(&db).await {
        Ok(rows) => HttpResponse::Ok().json(ApiResponse::success(rows)),
        Err(e) => internal_error(e),
    }
}

pub async fn get(db: web::Data<Db>, claims: Claims, path: web::Path<i64>) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    match games::get(&db, path.into_inner()).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn update(
    db: web::Data<Db>,
    claims: Claims,
    path: web::Path<i64>,
    payload: web::Json<GamePatch>,
) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    match games::update(&db, path.into_inner(), &payload.into_inner()).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn delete(db: web::Data<Db>, claims: Claims, path: web::Path<i64>) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    match games::delete(&db, path.into_inner()).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn assigned_list(db: web::Data<Db>, claims: Claims) -> HttpResponse {
    match games::assigned_list(&db, claims.sub).await {
        Ok(rows) => HttpResponse::Ok().json(ApiResponse::success(rows)),
        Err(e) => internal_error(e),
    }
}

pub async fn assigned_get(db: web::Data<Db>, claims: Claims, path: web::Path<i64>) -> HttpResponse {
    match games::assigned_get(&db, claims.sub, path.into_inner()).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

pub async fn unassigned_list(db: web::Data<Db>, claims: Claims) -> HttpResponse {
    match games::unassigned_list(&db, claims.sub).await {
        Ok(rows) => HttpResponse::Ok().json(ApiResponse::success(rows)),
        Err(e) => internal_error(e),
    }
}

pub async fn unassigned_get(
    db: web::Data<Db>,
    claims: Claims,
    path: web::Path<i64>,
) -> HttpResponse {
    match games::unassigned_get(&db, claims.sub, path.into_inner()).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// Claim a game. Games outside the caller's permitted countries, or
/// already claimed, are indistinguishable from nonexistent ones.
pub async fn assign(db: web::Data<Db>, claims: Claims, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    match games::assign(&db, claims.sub, id).await {
        Ok(true) => match games::get(&db, id).await {
            Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
            Ok(None) => not_found(),
            Err(e) => internal_error(e),
        },
        Ok(false) => not_found(),
        Err(e) => internal_error(e),
    }
}
