use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row};

use crate::util::db::Db;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub reference_id: i64,
    pub code: Option<String>,
    pub name: String,
}

/// Row computed by the importer, not yet persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCountry {
    pub reference_id: i64,
    pub code: Option<String>,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CountryPatch {
    pub reference_id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
}

pub async fn list(db: &Db) -> Result<Vec<Country>> {
    let rows = sqlx::query_as::<_, Country>(
        "SELECT id, reference_id, code, name FROM countries ORDER BY id DESC",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

pub async fn get(db: &Db, id: i64) -> Result<Option<Country>> {
    let row = sqlx::query_as::<_, Country>(
        "SELECT id, reference_id, code, name FROM countries WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&db.pool)
    .await?;
    Ok(row)
}

pub async fn create(db: &Db, row: &NewCountry) -> Result<Country> {
    let created = sqlx::query_as::<_, Country>(
        "INSERT INTO countries (reference_id, code, name) VALUES ($1, $2, $3)
         RETURNING id, reference_id, code, name",
    )
    .bind(row.reference_id)
    .bind(row.code.as_deref())
    .bind(&row.name)
    .fetch_one(&db.pool)
    .await?;
    Ok(created)
}

pub async fn update(db: &Db, id: i64, patch: &CountryPatch) -> Result<Option<Country>> {
    if patch.reference_id.is_none() && patch.code.is_none() && patch.name.is_none() {
        return get(db, id).await;
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new("UPDATE countries SET ");
    let mut sep = qb.separated(", ");
    if let Some(v) = patch.reference_id {
        sep.push("reference_id = ").push_bind_unseparated(v);
    }
    if let Some(v) = &patch.code {
        sep.push("code = ").push_bind_unseparated(v.clone());
    }
    if let Some(v) = &patch.name {
        sep.push("name = ").push_bind_unseparated(v.clone());
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" RETURNING id, reference_id, code, name");
    let row = qb
        .build_query_as::<Country>()
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn delete(db: &Db, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM countries WHERE id = $1")
        .bind(id)
        .execute(&db.pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// All persisted reference ids, pre-loaded once per import call.
pub async fn reference_id_set(db: &Db) -> Result<HashSet<i64>> {
    let rows = sqlx::query("SELECT reference_id FROM countries")
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>(0)).collect())
}

/// reference_id -> row id; first row (lowest id) wins on duplicates.
pub async fn ids_by_reference(db: &Db) -> Result<HashMap<i64, i64>> {
    let rows = sqlx::query("SELECT id, reference_id FROM countries ORDER BY id")
        .fetch_all(&db.pool)
        .await?;
    let mut map = HashMap::with_capacity(rows.len());
    for r in rows {
        map.entry(r.get::<i64, _>("reference_id"))
            .or_insert(r.get::<i64, _>("id"));
    }
    Ok(map)
}

pub async fn bulk_insert(db: &Db, rows: &[NewCountry]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let mut qb: QueryBuilder<'_, sqlx::Postgres> =
        QueryBuilder::new("INSERT INTO countries (reference_id, code, name) ");
    qb.push_values(rows, |mut b, r| {
        b.push_bind(r.reference_id)
            .push_bind(r.code.as_deref())
            .push_bind(&r.name);
    });
    let res = qb.build().execute(&db.pool).await?;
    Ok(res.rows_affected())
}
