use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

use crate::api::{auth, middleware, routes};
use crate::util::db::Db;
use crate::util::env::{env_opt, env_parse, env_req};

/// Handler-visible configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub allowed_origins: String,
}

impl ApiServer {
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = env_parse("API_PORT", 8080u16);
        let jwt_secret = env_req("JWT_SECRET").context("JWT_SECRET is required")?;
        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:8000".to_string());

        Ok(Self {
            host,
            port,
            jwt_secret,
            allowed_origins,
        })
    }

    pub async fn run(self, db: Db) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(host = %self.host, port = %self.port, "starting courtdata API server");

        let db_data = web::Data::new(db);
        let config = web::Data::new(AppConfig {
            jwt_secret: self.jwt_secret.clone(),
        });
        let jwt_secret = self.jwt_secret.clone();
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress, normalize) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);
            let auth = auth::Auth::new(jwt_secret.clone());

            App::new()
                .app_data(db_data.clone())
                .app_data(config.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .wrap(auth)
                .wrap(normalize)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {bind_addr}"))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
