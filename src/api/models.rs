// Request/response DTOs shared by the handlers.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::store::users::User;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password1: String,
    pub password2: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// A user together with their permitted country ids, as the admin
/// permission screens consume it.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub countries: Vec<i64>,
}

/// Admin replacement of a user's permitted country set.
#[derive(Debug, Deserialize)]
pub struct UserCountriesPatch {
    pub countries: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ImportGamesRequest {
    pub league: i64,
    pub season: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub team: Option<i64>,
}

const SEASON_MIN_YEAR: i32 = 1950;

/// A season is either `YYYY` or `YYYY-YYYY`, each year within
/// 1950..=current year.
pub fn validate_season(season: &str) -> Result<(), String> {
    let parts: Vec<&str> = season.split('-').collect();
    if parts.is_empty() || parts.len() > 2 {
        return Err(format!("invalid season format: {season:?}"));
    }
    let max_year = Utc::now().year();
    for part in parts {
        let year: i32 = part
            .parse()
            .map_err(|_| format!("invalid season format: {season:?}"))?;
        if !(SEASON_MIN_YEAR..=max_year).contains(&year) {
            return Err(format!("season year {year} out of range"));
        }
    }
    Ok(())
}

/// Game filter dates must be `YYYY-MM-DD`.
pub fn validate_date(date: &str) -> Result<(), String> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| format!("invalid date format: {date:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_single_year() {
        assert!(validate_season("2022").is_ok());
    }

    #[test]
    fn season_span() {
        assert!(validate_season("2019-2020").is_ok());
    }

    #[test]
    fn season_rejects_garbage_and_out_of_range() {
        assert!(validate_season("playoffs").is_err());
        assert!(validate_season("1949").is_err());
        assert!(validate_season("2019-2020-2021").is_err());
        assert!(validate_season("3000").is_err());
    }

    #[test]
    fn date_accepts_iso_days_only() {
        assert!(validate_date("2022-01-05").is_ok());
        assert!(validate_date("2022-13-05").is_err());
        assert!(validate_date("05/01/2022").is_err());
        assert!(validate_date("2022-01-05T19:30").is_err());
    }
}
