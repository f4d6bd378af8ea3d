use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row};

use crate::util::db::Db;

pub const USER_TYPE_ADMIN: i16 = 0;
pub const USER_TYPE_NORMAL: i16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: i16,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_type == USER_TYPE_ADMIN
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: i16,
}

const COLUMNS: &str = "id, email, password_hash, first_name, last_name, user_type, created_at";

pub async fn create(db: &Db, row: &NewUser) -> Result<User> {
    let created = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash, first_name, last_name, user_type)
         VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
    ))
    .bind(&row.email)
    .bind(&row.password_hash)
    .bind(&row.first_name)
    .bind(&row.last_name)
    .bind(row.user_type)
    .fetch_one(&db.pool)
    .await?;
    Ok(created)
}

pub async fn find_by_email(db: &Db, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

pub async fn get(db: &Db, id: i64) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(&db.pool)
        .await?;
    Ok(row)
}

/// Non-admin accounts, for the admin permission screens.
pub async fn list_normal(db: &Db) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE user_type = $1 ORDER BY id DESC"
    ))
    .bind(USER_TYPE_NORMAL)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

pub async fn country_ids_of(db: &Db, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT country_id FROM user_countries WHERE user_id = $1 ORDER BY country_id",
    )
    .bind(user_id)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows.iter().map(|r| r.get::<i64, _>(0)).collect())
}

/// Countries the user holds now but would lose under the requested set.
/// Only these drive the game-release cascade below; countries that are
/// kept or newly granted leave existing assignments alone.
fn removed_country_ids(current: &[i64], requested: &[i64]) -> Vec<i64> {
    let requested_set: HashSet<i64> = requested.iter().copied().collect();
    current
        .iter()
        .copied()
        .filter(|c| !requested_set.contains(c))
        .collect()
}

/// Replaces the user's country permissions and releases any of their
/// games whose league belongs to a country that was taken away. Runs in
/// one transaction so a crash cannot leave a user holding games they no
/// longer have access to.
pub async fn set_countries(db: &Db, user_id: i64, country_ids: &[i64]) -> Result<Vec<i64>> {
    let mut tx = db.pool.begin().await?;

    let current: Vec<i64> =
        sqlx::query("SELECT country_id FROM user_countries WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|r| r.get::<i64, _>(0))
            .collect();
    let removed = removed_country_ids(&current, country_ids);

    sqlx::query("DELETE FROM user_countries WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if !country_ids.is_empty() {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO user_countries (user_id, country_id) ");
        qb.push_values(country_ids, |mut b, c| {
            b.push_bind(user_id).push_bind(*c);
        });
        qb.push(" ON CONFLICT DO NOTHING");
        qb.build().execute(&mut *tx).await?;
    }

    if !removed.is_empty() {
        sqlx::query(
            "UPDATE games SET user_id = NULL
             WHERE user_id = $1
               AND league_id IN (SELECT id FROM leagues WHERE country_id = ANY($2))",
        )
        .bind(user_id)
        .bind(&removed)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_countries_are_the_cascade_targets() {
        // Holding 1, 2, 3 and being granted 2, 3, 4: only 1 is released.
        let removed = removed_country_ids(&[1, 2, 3], &[2, 3, 4]);
        assert_eq!(removed, vec![1]);
    }

    #[test]
    fn kept_and_new_countries_release_nothing() {
        assert!(removed_country_ids(&[5, 6], &[5, 6, 7]).is_empty());
        assert!(removed_country_ids(&[], &[1, 2]).is_empty());
    }

    #[test]
    fn clearing_all_countries_releases_every_one() {
        let removed = removed_country_ids(&[10, 20], &[]);
        assert_eq!(removed, vec![10, 20]);
    }
}
