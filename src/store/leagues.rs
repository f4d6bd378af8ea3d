use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row};

use crate::util::db::Db;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct League {
    pub id: i64,
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub reference_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub league_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewLeague {
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub reference_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub league_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaguePatch {
    pub country_id: Option<i64>,
    pub season_id: Option<i64>,
    pub reference_id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub league_type: Option<String>,
}

const COLUMNS: &str = "id, country_id, season_id, reference_id, name, type";

pub async fn list(db: &Db) -> Result<Vec<League>> {
    let rows = sqlx::query_as::<_, League>(&format!(
        "SELECT {COLUMNS} FROM leagues ORDER BY id DESC"
    ))
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

pub async fn get(db: &Db, id: i64) -> Result<Option<League>> {
    let row = sqlx::query_as::<_, League>(&format!("SELECT {COLUMNS} FROM leagues WHERE id = $1"))
        .bind(id)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn create(db: &Db, row: &NewLeague) -> Result<League> {
    let created = sqlx::query_as::<_, League>(&format!(
        "INSERT INTO leagues (country_id, season_id, reference_id, name, type)
         VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
    ))
    .bind(row.country_id)
    .bind(row.season_id)
    .bind(row.reference_id)
    .bind(&row.name)
    .bind(&row.league_type)
    .fetch_one(&db.pool)
    .await?;
    Ok(created)
}

pub async fn update(db: &Db, id: i64, patch: &LeaguePatch) -> Result<Option<League>> {
    if patch.country_id.is_none()
        && patch.season_id.is_none()
        && patch.reference_id.is_none()
        && patch.name.is_none()
        && patch.league_type.is_none()
    {
        return get(db, id).await;
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new("UPDATE leagues SET ");
    let mut sep = qb.separated(", ");
    if let Some(v) = patch.country_id {
        sep.push("country_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = patch.season_id {
        sep.push("season_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = patch.reference_id {
        sep.push("reference_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = &patch.name {
        sep.push("name = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.league_type {
        sep.push("type = ").push_bind_unseparated(v.clone());
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(&format!(" RETURNING {COLUMNS}"));
    let row = qb
        .build_query_as::<League>()
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn delete(db: &Db, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM leagues WHERE id = $1")
        .bind(id)
        .execute(&db.pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Scoping keys of all persisted leagues: (reference id, season year, country
/// reference id). Leagues with a NULL season or country do not participate in
/// reconciliation, matching the join semantics of the dedupe lookup.
pub async fn scoping_key_set(db: &Db) -> Result<HashSet<(i64, i32, i64)>> {
    let rows = sqlx::query(
        "SELECT l.reference_id, s.year, c.reference_id AS country_reference_id
         FROM leagues l
         JOIN seasons s ON s.id = l.season_id
         JOIN countries c ON c.id = l.country_id",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| {
            (
                r.get::<i64, _>("reference_id"),
                r.get::<i32, _>("year"),
                r.get::<i64, _>("country_reference_id"),
            )
        })
        .collect())
}

/// reference_id -> row id; first row (lowest id) wins on duplicates.
pub async fn ids_by_reference(db: &Db) -> Result<HashMap<i64, i64>> {
    let rows = sqlx::query("SELECT id, reference_id FROM leagues ORDER BY id")
        .fetch_all(&db.pool)
        .await?;
    let mut map = HashMap::with_capacity(rows.len());
    for r in rows {
        map.entry(r.get::<i64, _>("reference_id"))
            .or_insert(r.get::<i64, _>("id"));
    }
    Ok(map)
}

/// First league matching (reference id, season year), used as the team
/// importer's scoping league.
pub async fn id_for_reference_and_year(
    db: &Db,
    reference_id: i64,
    year: i32,
) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT l.id FROM leagues l
         JOIN seasons s ON s.id = l.season_id
         WHERE l.reference_id = $1 AND s.year = $2
         ORDER BY l.id LIMIT 1",
    )
    .bind(reference_id)
    .bind(year)
    .fetch_optional(&db.pool)
    .await?;
    Ok(id)
}

pub async fn bulk_insert(db: &Db, rows: &[NewLeague]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> =
        QueryBuilder::new("INSERT INTO leagues (country_id, season_id, reference_id, name, type) ");
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.country_id)
            .push_bind(r.season_id)
            .push_bind(r.reference_id)
            .push_bind(&r.name)
            .push_bind(&r.league_type);
    });
    let res = qb.build().execute(&db.pool).await?;
    Ok(res.rows_affected())
}
