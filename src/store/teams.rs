use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row};

use crate::util::db::Db;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: i64,
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
    pub reference_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTeam {
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
    pub reference_id: i64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamPatch {
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
    pub reference_id: Option<i64>,
    pub name: Option<String>,
}

const COLUMNS: &str = "id, country_id, season_id, league_id, reference_id, name";

pub async fn list(db: &Db) -> Result<Vec<Team>> {
    let rows = sqlx::query_as::<_, Team>(&format!("SELECT {COLUMNS} FROM teams ORDER BY id DESC"))
        .fetch_all(&db.pool)
        .await?;
    Ok(rows)
}

pub async fn get(db: &Db, id: i64) -> Result<Option<Team>> {
    let row = sqlx::query_as::<_, Team>(&format!("SELECT {COLUMNS} FROM teams WHERE id = $1"))
        .bind(id)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn create(db: &Db, row: &NewTeam) -> Result<Team> {
    let created = sqlx::query_as::<_, Team>(&format!(
        "INSERT INTO teams (country_id, season_id, league_id, reference_id, name)
         VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
    ))
    .bind(row.country_id)
    .bind(row.season_id)
    .bind(row.league_id)
    .bind(row.reference_id)
    .bind(&row.name)
    .fetch_one(&db.pool)
    .await?;
    Ok(created)
}

pub async fn update(db: &Db, id: i64, patch: &TeamPatch) -> Result<Option<Team>> {
    if patch.country_id.is_none()
        && patch.season_id.is_none()
        && patch.league_id.is_none()
        && patch.reference_id.is_none()
        && patch.name.is_none()
    {
        return get(db, id).await;
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new("UPDATE teams SET ");
    let mut sep = qb.separated(", ");
    if let Some(v) = patch.country_id {
        sep.push("country_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = patch.season_id {
        sep.push("season_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = patch.league_id {
        sep.push("league_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = patch.reference_id {
        sep.push("reference_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = &patch.name {
        sep.push("name = ").push_bind_unseparated(v.clone());
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(format!(" RETURNING {COLUMNS}"));
    let row = qb.build_query_as::<Team>().fetch_optional(&db.pool).await?;
    Ok(row)
}

pub async fn delete(db: &Db, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(id)
        .execute(&db.pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Reference ids of teams already persisted under the caller's scoping
/// (season year + league reference id).
pub async fn reference_ids_for_scope(
    db: &Db,
    season_year: i32,
    league_reference_id: i64,
) -> Result<HashSet<i64>> {
    let rows = sqlx::query(
        "SELECT t.reference_id FROM teams t
         JOIN seasons s ON s.id = t.season_id
         JOIN leagues l ON l.id = t.league_id
         WHERE s.year = $1 AND l.reference_id = $2",
    )
    .bind(season_year)
    .bind(league_reference_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>(0)).collect())
}

/// reference_id -> row id; first row (lowest id) wins on duplicates.
pub async fn ids_by_reference(db: &Db) -> Result<HashMap<i64, i64>> {
    let rows = sqlx::query("SELECT id, reference_id FROM teams ORDER BY id")
        .fetch_all(&db.pool)
        .await?;
    let mut map = HashMap::with_capacity(rows.len());
    for r in rows {
        map.entry(r.get::<i64, _>("reference_id"))
            .or_insert(r.get::<i64, _>("id"));
    }
    Ok(map)
}

pub async fn bulk_insert(db: &Db, rows: &[NewTeam]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
        "INSERT INTO teams (country_id, season_id, league_id, reference_id, name) ",
    );
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.country_id)
            .push_bind(r.season_id)
            .push_bind(r.league_id)
            .push_bind(r.reference_id)
            .push_bind(&r.name);
    });
    let res = qb.build().execute(&db.pool).await?;
    Ok(res.rows_affected())
}
