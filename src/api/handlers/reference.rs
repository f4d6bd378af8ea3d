// Admin CRUD over the reference entities.

use actix_web::{web, HttpResponse};

use crate::api::auth::Claims;
use crate::api::handlers::{forbid_non_admin, internal_error, not_found};
use crate::api::models::ApiResponse;
use crate::store::countries::{self, CountryPatch, NewCountry};
use crate::store::leagues::{self, LeaguePatch, NewLeague};
use crate::store::seasons::{self, NewSeason, SeasonPatch};
use crate::store::teams::{self, NewTeam, TeamPatch};
use crate::util::db::Db;

macro_rules! crud_handlers {
    ($entity:ident, $store:ident, $new:ty, $patch:ty) => {
        pub mod $entity {
            use super::*;

            pub async fn list(db: web::Data<Db>, claims: Claims) -> HttpResponse {
                if let Some(resp) = forbid_non_admin(&claims) {
                    return resp;
                }
                match $store::list(&db).await {
                    Ok(rows) => HttpResponse::Ok().json(ApiResponse::success(rows)),
                    Err(e) => internal_error(e),
                }
            }

            pub async fn get(
                db: web::Data<Db>,
                claims: Claims,
                path: web::Path<i64>,
            ) -> HttpResponse {
                if let Some(resp) = forbid_non_admin(&claims) {
                    return resp;
                }
                match $store::get(&db, path.into_inner()).await {
                    Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
                    Ok(None) => not_found(),
                    Err(e) => internal_error(e),
                }
            }

            pub async fn create(
                db: web::Data<Db>,
                claims: Claims,
                payload: web::Json<$new>,
            ) -> HttpResponse {
                if let Some(resp) = forbid_non_admin(&claims) {
                    return resp;
                }
                match $store::create(&db, &payload.into_inner()).await {
                    Ok(row) => HttpResponse::Created().json(ApiResponse::success(row)),
                    Err(e) => internal_error(e),
                }
            }

            pub async fn update(
                db: web::Data<Db>,
                claims: Claims,
                path: web::Path<i64>,
                payload: web::Json<$patch>,
            ) -> HttpResponse {
                if let Some(resp) = forbid_non_admin(&claims) {
                    return resp;
                }
                match $store::update(&db, path.into_inner(), &payload.into_inner()).await {
                    Ok(Some(row)) => HttpResponse::Ok().json(ApiResponse::success(row)),
                    Ok(None) => not_found(),
                    Err(e) => internal_error(e),
                }
            }

            pub async fn delete(
                db: web::Data<Db>,
                claims: Claims,
                path: web::Path<i64>,
            ) -> HttpResponse {
                if let Some(resp) = forbid_non_admin(&claims) {
                    return resp;
                }
                match $store::delete(&db, path.into_inner()).await {
                    Ok(true) => HttpResponse::NoContent().finish(),
                    Ok(false) => not_found(),
                    Err(e) => internal_error(e),
                }
            }
        }
    };
}

crud_handlers!(country, countries, NewCountry, CountryPatch);
crud_handlers!(season, seasons, NewSeason, SeasonPatch);
crud_handlers!(league, leagues, NewLeague, LeaguePatch);
crud_handlers!(team, teams, NewTeam, TeamPatch);
