//! Client for the upstream basketball data provider (RapidAPI).
//!
//! Every endpoint answers with the same envelope: a `results` count, an
//! `errors` blob and a `response` array. A 400 carries field errors in the
//! envelope; anything else non-success is treated as the service being
//! unavailable.

use anyhow::Result;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::importer::{CountryRecord, GameRecord, LeagueRecord, SeasonValue, TeamRecord};
use crate::util::env::{env_opt, env_req};

pub const DEFAULT_HOST: &str = "api-basketball.p.rapidapi.com";

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub results: i64,
    #[serde(default)]
    pub errors: Value,
    #[serde(default = "Vec::new")]
    pub response: Vec<T>,
}

#[derive(Debug)]
pub enum ApiOutcome<T> {
    Ok(Envelope<T>),
    /// Upstream rejected the request parameters; carries its `errors` blob.
    BadRequest(Value),
    Unavailable(u16),
}

#[derive(Debug, Clone)]
pub struct SportsApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    host: String,
}

impl SportsApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            host: host.into(),
        }
    }

    /// Reads RAPID_API_KEY (required) and RAPID_API_HOST (optional).
    pub fn from_env() -> Result<Self> {
        let host = env_opt("RAPID_API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        Ok(Self::new(format!("https://{host}"), env_req("RAPID_API_KEY")?, host))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiOutcome<T>> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            let envelope: Envelope<T> = resp.json().await?;
            return Ok(ApiOutcome::Ok(envelope));
        }
        if status == StatusCode::BAD_REQUEST {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let errors = body.get("errors").cloned().unwrap_or(Value::Null);
            warn!(%url, ?errors, "upstream rejected request");
            return Ok(ApiOutcome::BadRequest(errors));
        }
        warn!(%url, status = status.as_u16(), "upstream unavailable");
        Ok(ApiOutcome::Unavailable(status.as_u16()))
    }

    pub async fn countries(&self) -> Result<ApiOutcome<CountryRecord>> {
        self.fetch("countries", &[]).await
    }

    pub async fn seasons(&self) -> Result<ApiOutcome<SeasonValue>> {
        self.fetch("seasons", &[]).await
    }

    pub async fn leagues(&self) -> Result<ApiOutcome<LeagueRecord>> {
        self.fetch("leagues", &[]).await
    }

    pub async fn teams(&self, league: i64, season: i32) -> Result<ApiOutcome<TeamRecord>> {
        self.fetch(
            "teams",
            &[("league", league.to_string()), ("season", season.to_string())],
        )
        .await
    }

    pub async fn games(
        &self,
        league: i64,
        season: &str,
        date: Option<&str>,
        team: Option<i64>,
    ) -> Result<ApiOutcome<GameRecord>> {
        let mut query = vec![("league", league.to_string()), ("season", season.to_string())];
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        if let Some(team) = team {
            query.push(("team", team.to_string()));
        }
        self.fetch("games", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api(server: &mockito::ServerGuard) -> SportsApi {
        SportsApi::new(server.url(), "test-key", DEFAULT_HOST)
    }

    #[tokio::test]
    async fn countries_parses_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/countries")
            .match_header("x-rapidapi-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "results": 2,
                    "errors": [],
                    "response": [
                        {"id": 5, "name": "Spain", "code": "ES"},
                        {"id": 6, "name": "France", "code": null}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let outcome = api(&server).countries().await.unwrap();
        mock.assert_async().await;
        match outcome {
            ApiOutcome::Ok(envelope) => {
                assert_eq!(envelope.results, 2);
                assert_eq!(envelope.response.len(), 2);
                assert_eq!(envelope.response[0].name, "Spain");
                assert_eq!(envelope.response[1].code, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn seasons_accepts_mixed_years_and_spans() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/seasons")
            .with_status(200)
            .with_body(
                json!({"results": 4, "errors": [], "response": [2008, "2008-2009", 2009, "2009-2010"]})
                    .to_string(),
            )
            .create_async()
            .await;

        let outcome = api(&server).seasons().await.unwrap();
        match outcome {
            ApiOutcome::Ok(envelope) => {
                assert_eq!(envelope.response.len(), 4);
                assert_eq!(envelope.response[0].first_year().unwrap(), 2008);
                assert_eq!(envelope.response[1].first_year().unwrap(), 2008);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn teams_sends_scoping_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/teams")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("league".into(), "178".into()),
                mockito::Matcher::UrlEncoded("season".into(), "2022".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"results": 1, "errors": [], "response": [
                    {"id": 101, "name": "Lakers", "country": {"id": 5}}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let outcome = api(&server).teams(178, 2022).await.unwrap();
        mock.assert_async().await;
        match outcome {
            ApiOutcome::Ok(envelope) => assert_eq!(envelope.response[0].id, 101),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_request_surfaces_upstream_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(json!({"errors": {"season": "invalid format"}}).to_string())
            .create_async()
            .await;

        let outcome = api(&server).games(12, "bad", None, None).await.unwrap();
        match outcome {
            ApiOutcome::BadRequest(errors) => {
                assert_eq!(errors["season"], json!("invalid format"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/countries")
            .with_status(503)
            .with_body("upstream down")
            .create_async()
            .await;

        let outcome = api(&server).countries().await.unwrap();
        match outcome {
            ApiOutcome::Unavailable(status) => assert_eq!(status, 503),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
