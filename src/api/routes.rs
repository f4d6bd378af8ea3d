use actix_web::web;

use crate::api::handlers::{self, accounts, games, import, reference};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        .service(
            web::scope("/accounts")
                .route("/sign_up", web::post().to(accounts::sign_up))
                .route("/log_in", web::post().to(accounts::log_in))
                .route("/token/refresh", web::post().to(accounts::token_refresh))
                .route("/users", web::get().to(accounts::users_list))
                .route("/users/{id}", web::get().to(accounts::users_get))
                .route("/users/{id}", web::patch().to(accounts::users_update)),
        )
        .service(
            web::scope("/api")
                .route("/countries", web::get().to(reference::country::list))
                .route("/countries", web::post().to(reference::country::create))
                .route("/countries/{id}", web::get().to(reference::country::get))
                .route("/countries/{id}", web::put().to(reference::country::update))
                .route(
                    "/countries/{id}",
                    web::patch().to(reference::country::update),
                )
                .route(
                    "/countries/{id}",
                    web::delete().to(reference::country::delete),
                )
                .route("/seasons", web::get().to(reference::season::list))
                .route("/seasons", web::post().to(reference::season::create))
                .route("/seasons/{id}", web::get().to(reference::season::get))
                .route("/seasons/{id}", web::put().to(reference::season::update))
                .route("/seasons/{id}", web::patch().to(reference::season::update))
                .route("/seasons/{id}", web::delete().to(reference::season::delete))
                .route("/leagues", web::get().to(reference::league::list))
                .route("/leagues", web::post().to(reference::league::create))
                .route("/leagues/{id}", web::get().to(reference::league::get))
                .route("/leagues/{id}", web::put().to(reference::league::update))
                .route("/leagues/{id}", web::patch().to(reference::league::update))
                .route("/leagues/{id}", web::delete().to(reference::league::delete))
                .route("/teams", web::get().to(reference::team::list))
                .route("/teams", web::post().to(reference::team::create))
                .route("/teams/{id}", web::get().to(reference::team::get))
                .route("/teams/{id}", web::put().to(reference::team::update))
                .route("/teams/{id}", web::patch().to(reference::team::update))
                .route("/teams/{id}", web::delete().to(reference::team::delete))
                .service(
                    web::scope("/games")
                        .route("/import-games", web::post().to(import::import_games))
                        .route("/user/assigned", web::get().to(games::assigned_list))
                        .route("/user/assigned/{id}", web::get().to(games::assigned_get))
                        .route("/user/unassigned", web::get().to(games::unassigned_list))
                        .route(
                            "/user/unassigned/{id}",
                            web::get().to(games::unassigned_get),
                        )
                        .route(
                            "/user/unassigned/{id}/assign-game",
                            web::post().to(games::assign),
                        )
                        .route("", web::get().to(games::list))
                        .route("/{id}", web::get().to(games::get))
                        .route("/{id}", web::patch().to(games::update))
                        .route("/{id}", web::delete().to(games::delete)),
                ),
        );
}
