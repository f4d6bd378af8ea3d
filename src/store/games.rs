use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, QueryBuilder, Row};

use crate::util::db::Db;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    pub user_id: Option<i64>,
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub reference_id: i64,
    pub datetime: DateTime<Utc>,
    pub status: String,
    pub scores: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub reference_id: i64,
    pub datetime: DateTime<Utc>,
    pub status: String,
    pub scores: serde_json::Value,
}

/// `user_id` distinguishes "absent" from an explicit `null` so an admin
/// can unassign a game through a plain PATCH.
#[derive(Debug, Default, Deserialize)]
pub struct GamePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub user_id: Option<Option<i64>>,
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub reference_id: Option<i64>,
    pub datetime: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub scores: Option<serde_json::Value>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(de).map(Some)
}

const COLUMNS: &str = "id, user_id, country_id, season_id, league_id, home_team_id, \
                       away_team_id, reference_id, datetime, status, scores";

pub async fn list(db: &Db) -> Result<Vec<Game>> {
    let rows = sqlx::query_as::<_, Game>(&format!("SELECT {COLUMNS} FROM games ORDER BY id DESC"))
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

pub async fn get(db: &Db, id: i64) -> Result<Option<Game>> {
    let row = sqlx::query_as::<_, Game>(&format!("SELECT {COLUMNS} FROM games WHERE id = $1"))
        .bind(id)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn update(db: &Db, id: i64, patch: &GamePatch) -> Result<Option<Game>> {
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new("UPDATE games SET ");
    let mut sep = qb.separated(", ");
    let mut touched = false;
    if let Some(v) = patch.user_id {
        sep.push("user_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.country_id {
        sep.push("country_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.season_id {
        sep.push("season_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.league_id {
        sep.push("league_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.home_team_id {
        sep.push("home_team_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.away_team_id {
        sep.push("away_team_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.reference_id {
        sep.push("reference_id = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = patch.datetime {
        sep.push("datetime = ").push_bind_unseparated(v);
        touched = true;
    }
    if let Some(v) = &patch.status {
        sep.push("status = ").push_bind_unseparated(v.clone());
        touched = true;
    }
    if let Some(v) = &patch.scores {
        sep.push("scores = ").push_bind_unseparated(v.clone());
        touched = true;
    }
    if !touched {
        return get(db, id).await;
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(format!(" RETURNING {COLUMNS}"));
    let row = qb.build_query_as::<Game>().fetch_optional(&db.pool).await?;
    Ok(row)
}

pub async fn delete(db: &Db, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM games WHERE id = $1")
        .bind(id)
        .execute(&db.pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn reference_id_set(db: &Db) -> Result<HashSet<i64>> {
    let rows = sqlx::query("SELECT reference_id FROM games")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>(0)).collect())
}

pub async fn bulk_insert(db: &Db, rows: &[NewGame]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
        "INSERT INTO games (country_id, season_id, league_id, home_team_id, away_team_id, \
         reference_id, datetime, status, scores) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.country_id)
            .push_bind(r.season_id)
            .push_bind(r.league_id)
            .push_bind(r.home_team_id)
            .push_bind(r.away_team_id)
            .push_bind(r.reference_id)
            .push_bind(r.datetime)
            .push_bind(r.status.clone())
            .push_bind(r.scores.clone());
    });
    let res = qb.build().execute(&db.pool).await?;
    Ok(res.rows_affected())
}

/// Games the user has claimed, newest first.
pub async fn assigned_list(db: &Db, user_id: i64) -> Result<Vec<Game>> {
    let rows = sqlx::query_as::<_, Game>(&format!(
        "SELECT {COLUMNS} FROM games WHERE user_id = $1 ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

pub async fn assigned_get(db: &Db, user_id: i64, id: i64) -> Result<Option<Game>> {
    let row = sqlx::query_as::<_, Game>(&format!(
        "SELECT {COLUMNS} FROM games WHERE user_id = $1 AND id = $2"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_optional(&db.pool)
    .await?;
    Ok(row)
}

/// Unclaimed games in the user's permitted countries, newest first.
pub async fn unassigned_list(db: &Db, user_id: i64) -> Result<Vec<Game>> {
    let rows = sqlx::query_as::<_, Game>(&format!(
        "SELECT {COLUMNS} FROM games
         WHERE user_id IS NULL
           AND country_id IN (SELECT country_id FROM user_countries WHERE user_id = $1)
         ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

pub async fn unassigned_get(db: &Db, user_id: i64, id: i64) -> Result<Option<Game>> {
    let row = sqlx::query_as::<_, Game>(&format!(
        "SELECT {COLUMNS} FROM games
         WHERE id = $2 AND user_id IS NULL
           AND country_id IN (SELECT country_id FROM user_countries WHERE user_id = $1)"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_optional(&db.pool)
    .await?;
    Ok(row)
}

/// Claims a game for the user. The filter doubles as the permission
/// check: a game that is already taken or outside the user's countries
/// simply does not match, and the caller reports not-found.
pub async fn assign(db: &Db, user_id: i64, id: i64) -> Result<bool> {
    let res = sqlx::query(
        "UPDATE games SET user_id = $1
         WHERE id = $2 AND user_id IS NULL
           AND country_id IN (SELECT country_id FROM user_countries WHERE user_id = $1)",
    )
    .bind(user_id)
    .bind(id)
    .execute(&db.pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_and_null_user() {
        let patch: GamePatch = serde_json::from_str(r#"{"status": "Finished"}"#).unwrap();
        assert_eq!(patch.user_id, None);
        assert_eq!(patch.status.as_deref(), Some("Finished"));

        let patch: GamePatch = serde_json::from_str(r#"{"user_id": null}"#).unwrap();
        assert_eq!(patch.user_id, Some(None));

        let patch: GamePatch = serde_json::from_str(r#"{"user_id": 42}"#).unwrap();
        assert_eq!(patch.user_id, Some(Some(42)));
    }
}
