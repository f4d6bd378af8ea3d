use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row};

use crate::util::db::Db;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Season {
    pub id: i64,
    pub year: i32,
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSeason {
    pub year: i32,
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeasonPatch {
    pub year: Option<i32>,
    pub period: Option<String>,
}

pub async fn list(db: &Db) -> Result<Vec<Season>> {
    let rows =
        sqlx::query_as::<_, Season>("SELECT id, year, period FROM seasons ORDER BY id DESC")
            .fetch_all(&db.pool)
            .await?;
    Ok(rows)
}

pub async fn get(db: &Db, id: i64) -> Result<Option<Season>> {
    let row = sqlx::query_as::<_, Season>("SELECT id, year, period FROM seasons WHERE id = $1")
        .bind(id)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn create(db: &Db, row: &NewSeason) -> Result<Season> {
    let created = sqlx::query_as::<_, Season>(
        "INSERT INTO seasons (year, period) VALUES ($1, $2) RETURNING id, year, period",
    )
    .bind(row.year)
    .bind(row.period.as_deref())
    .fetch_one(&db.pool)
    .await?;
    Ok(created)
}

pub async fn update(db: &Db, id: i64, patch: &SeasonPatch) -> Result<Option<Season>> {
    if patch.year.is_none() && patch.period.is_none() {
        return get(db, id).await;
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new("UPDATE seasons SET ");
    let mut sep = qb.separated(", ");
    if let Some(v) = patch.year {
        sep.push("year = ").push_bind_unseparated(v);
    }
    if let Some(v) = &patch.period {
        sep.push("period = ").push_bind_unseparated(v.clone());
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" RETURNING id, year, period");
    let row = qb
        .build_query_as::<Season>()
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn delete(db: &Db, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM seasons WHERE id = $1")
        .bind(id)
        .execute(&db.pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// All persisted years, pre-loaded once per import call.
pub async fn year_set(db: &Db) -> Result<HashSet<i32>> {
    let rows = sqlx::query("SELECT year FROM seasons")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<i32, _>(0)).collect())
}

/// year -> row id; years are unique so no tie-breaking needed.
pub async fn ids_by_year(db: &Db) -> Result<HashMap<i32, i64>> {
    let rows = sqlx::query("SELECT id, year FROM seasons")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| (r.get::<i32, _>("year"), r.get::<i64, _>("id")))
        .collect())
}

pub async fn bulk_insert(db: &Db, rows: &[NewSeason]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> =
        QueryBuilder::new("INSERT INTO seasons (year, period) ");
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.year).push_bind(r.period.as_deref());
    });
    let res = qb.build().execute(&db.pool).await?;
    Ok(res.rows_affected())
}
