use actix_web::{web, HttpResponse};

use crate::api::auth::{self, Claims, TOKEN_TYPE_REFRESH};
use crate::api::handlers::{forbid_non_admin, internal_error, not_found};
use crate::api::models::{
    AccessToken, ApiResponse, LogInRequest, RefreshRequest, SignUpRequest, UserCountriesPatch,
    UserView,
};
use crate::api::server::AppConfig;
use crate::store::users::{self, NewUser, USER_TYPE_NORMAL};
use crate::util::db::Db;

pub async fn sign_up(db: web::Data<Db>, payload: web::Json<SignUpRequest>) -> HttpResponse {
    let payload = payload.into_inner();
    if payload.password1 != payload.password2 {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("passwords do not match"));
    }
    match users::find_by_email(&db, &payload.email).await {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error("email already registered"));
        }
        Ok(None) => {}
        Err(e) => return internal_error(e),
    }
    let password_hash = match auth::hash_password(&payload.password1) {
        Ok(hash) => hash,
        Err(e) => return internal_error(e),
    };
    let row = NewUser {
        email: payload.email,
        password_hash,
        first_name: payload.first_name,
        last_name: payload.last_name,
        user_type: USER_TYPE_NORMAL,
    };
    match users::create(&db, &row).await {
        Ok(user) => HttpResponse::Created().json(ApiResponse::success(user)),
        Err(e) => internal_error(e),
    }
}

pub async fn log_in(
    db: web::Data<Db>,
    cfg: web::Data<AppConfig>,
    payload: web::Json<LogInRequest>,
) -> HttpResponse {
    let user = match users::find_by_email(&db, &payload.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("invalid credentials"));
        }
        Err(e) => return internal_error(e),
    };
    if !auth::verify_password(&payload.password, &user.password_hash) {
        return HttpResponse::Unauthorized().json(ApiResponse::<()>::error("invalid credentials"));
    }
    match auth::issue_pair(&user, &cfg.jwt_secret) {
        Ok(pair) => HttpResponse::Ok().json(ApiResponse::success(pair)),
        Err(e) => internal_error(e),
    }
}

pub async fn token_refresh(
    cfg: web::Data<AppConfig>,
    payload: web::Json<RefreshRequest>,
) -> HttpResponse {
    let claims = match auth::decode_claims(&payload.refresh, &cfg.jwt_secret) {
        Ok(claims) if claims.token_type == TOKEN_TYPE_REFRESH => claims,
        _ => {
            return HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("invalid refresh token"));
        }
    };
    match auth::issue_access_from(&claims, &cfg.jwt_secret) {
        Ok(access) => HttpResponse::Ok().json(ApiResponse::success(AccessToken { access })),
        Err(e) => internal_error(e),
    }
}

pub async fn users_list(db: web::Data<Db>, claims: Claims) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    let users = match users::list_normal(&db).await {
        Ok(users) => users,
        Err(e) => return internal_error(e),
    };
    let mut views = Vec::with_capacity(users.len());
    for user in users {
        match users::country_ids_of(&db, user.id).await {
            Ok(countries) => views.push(UserView { user, countries }),
            Err(e) => return internal_error(e),
        }
    }
    HttpResponse::Ok().json(ApiResponse::success(views))
}

pub async fn users_get(db: web::Data<Db>, claims: Claims, path: web::Path<i64>) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    let id = path.into_inner();
    match users::get(&db, id).await {
        Ok(Some(user)) if user.user_type == USER_TYPE_NORMAL => {
            match users::country_ids_of(&db, user.id).await {
                Ok(countries) => HttpResponse::Ok().json(ApiResponse::success(UserView {
                    user,
                    countries,
                })),
                Err(e) => internal_error(e),
            }
        }
        Ok(_) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// Replaces the target user's permitted countries. Games in countries
/// removed here are released back to the unassigned pool.
pub async fn users_update(
    db: web::Data<Db>,
    claims: Claims,
    path: web::Path<i64>,
    payload: web::Json<UserCountriesPatch>,
) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    let id = path.into_inner();
    let user = match users::get(&db, id).await {
        Ok(Some(user)) if user.user_type == USER_TYPE_NORMAL => user,
        Ok(_) => return not_found(),
        Err(e) => return internal_error(e),
    };
    let removed = match users::set_countries(&db, user.id, &payload.countries).await {
        Ok(removed) => removed,
        Err(e) => return internal_error(e),
    };
    if !removed.is_empty() {
        tracing::info!(user_id = user.id, ?removed, "released games for removed countries");
    }
    HttpResponse::Ok().json(ApiResponse::success(UserView {
        user,
        countries: payload.into_inner().countries,
    }))
}
