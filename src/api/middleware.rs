// Logging, compression and CORS setup.

use actix_web::middleware::{Compress, Logger, NormalizePath};

pub fn setup_middleware() -> (Logger, Compress, NormalizePath) {
    let logger = Logger::default();
    let compress = Compress::default();
    // Clients coming from the old URL map send trailing slashes.
    let normalize = NormalizePath::trim();
    (logger, compress, normalize)
}

use actix_cors::Cors;
use actix_web::http::header;

pub fn setup_cors(allowed_origins: &str) -> Cors {
    let origins: Vec<&str> = allowed_origins.split(',').collect();

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    for origin in origins {
        cors = cors.allowed_origin(origin.trim());
    }

    cors
}
