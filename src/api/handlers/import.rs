use actix_web::{web, HttpResponse};
use tracing::warn;

use crate::api::auth::Claims;
use crate::api::handlers::{forbid_non_admin, internal_error};
use crate::api::models::{validate_date, validate_season, ApiResponse, ImportGamesRequest};
use crate::importer;
use crate::sports_api::{ApiOutcome, SportsApi};
use crate::util::db::Db;

/// Fetches games from the sports API for the requested league/season and
/// runs them through the reconciliation pipeline.
pub async fn import_games(
    db: web::Data<Db>,
    claims: Claims,
    payload: web::Json<ImportGamesRequest>,
) -> HttpResponse {
    if let Some(resp) = forbid_non_admin(&claims) {
        return resp;
    }
    if let Err(message) = validate_season(&payload.season) {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }
    if let Some(date) = payload.date.as_deref() {
        if let Err(message) = validate_date(date) {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
        }
    }

    let api = match SportsApi::from_env() {
        Ok(api) => api,
        Err(e) => return internal_error(e),
    };
    let outcome = match api
        .games(
            payload.league,
            &payload.season,
            payload.date.as_deref(),
            payload.team,
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = ?e, "sports api unreachable");
            return HttpResponse::ServiceUnavailable()
                .json(ApiResponse::<()>::error("sports api unavailable"));
        }
    };

    match outcome {
        ApiOutcome::Ok(envelope) if envelope.results == 0 => HttpResponse::NoContent().finish(),
        ApiOutcome::Ok(envelope) => match importer::import_games(&db, &envelope.response).await {
            Ok(_) => HttpResponse::Created().json(ApiResponse::success(serde_json::json!({
                "imported": envelope.response.len()
            }))),
            Err(e) => internal_error(e),
        },
        ApiOutcome::BadRequest(errors) => {
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(errors.to_string()))
        }
        ApiOutcome::Unavailable(_) => HttpResponse::ServiceUnavailable()
            .json(ApiResponse::<()>::error("sports api unavailable")),
    }
}
