//! Reference-data reconciliation.
//!
//! Each entity kind follows the same shape: load a snapshot of the keys
//! already persisted, walk the upstream batch and keep only records whose
//! key is absent, then write the survivors in one bulk insert. Lookups
//! that fail to resolve (for example a league whose country was never
//! imported) degrade to a NULL relation instead of failing the batch, so
//! callers are expected to import in dependency order: countries, then
//! seasons, leagues, teams, games.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::store;
use crate::store::countries::NewCountry;
use crate::store::games::NewGame;
use crate::store::leagues::NewLeague;
use crate::store::seasons::NewSeason;
use crate::store::teams::NewTeam;
use crate::util::db::Db;

/// A season value as the upstream API writes it: either a bare year or a
/// span like `"2019-2020"`. Reconciliation always keys on the first year.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SeasonValue {
    Year(i64),
    Span(String),
}

impl SeasonValue {
    pub fn first_year(&self) -> Result<i32> {
        match self {
            SeasonValue::Year(y) => Ok(*y as i32),
            SeasonValue::Span(s) => {
                let head = s.split('-').next().unwrap_or("");
                head.trim()
                    .parse::<i32>()
                    .with_context(|| format!("unparseable season value {s:?}"))
            }
        }
    }

    fn as_period(&self) -> String {
        match self {
            SeasonValue::Year(y) => y.to_string(),
            SeasonValue::Span(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryRef {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub league_type: String,
    pub country: CountryRef,
    pub seasons: Vec<LeagueSeasonRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueSeasonRecord {
    pub season: SeasonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRecord {
    pub id: i64,
    pub name: String,
    pub country: CountryRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameRecord {
    pub id: i64,
    pub date: String,
    pub time: String,
    pub status: GameStatus,
    pub country: CountryRef,
    pub league: GameLeagueRef,
    pub teams: GameTeams,
    pub scores: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameStatus {
    pub long: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameLeagueRef {
    pub id: i64,
    pub season: SeasonValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameTeams {
    pub home: TeamRef,
    pub away: TeamRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    pub id: i64,
}

/// Pairs the flat alternating `[year, period, year, period, ...]` payload
/// of the seasons endpoint into (year, period) tuples. A trailing year
/// without a period gets `None`. Repeated years collapse into one entry
/// at their first position, the last period seen wins.
pub fn pair_seasons(entries: &[SeasonValue]) -> Result<Vec<(i32, Option<String>)>> {
    let mut order: Vec<i32> = Vec::new();
    let mut periods: HashMap<i32, Option<String>> = HashMap::new();
    for chunk in entries.chunks(2) {
        let year = chunk[0].first_year()?;
        let period = chunk.get(1).map(SeasonValue::as_period);
        if !periods.contains_key(&year) {
            order.push(year);
        }
        periods.insert(year, period);
    }
    Ok(order
        .into_iter()
        .map(|y| {
            let p = periods.remove(&y).flatten();
            (y, p)
        })
        .collect())
}

fn parse_game_datetime(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let day = date.split('T').next().unwrap_or(date);
    let naive = NaiveDateTime::parse_from_str(&format!("{day} {time}"), "%Y-%m-%d %H:%M")
        .with_context(|| format!("unparseable game datetime {date:?} {time:?}"))?;
    Ok(naive.and_utc())
}

pub fn plan_countries(records: &[CountryRecord], existing: &HashSet<i64>) -> Vec<NewCountry> {
    records
        .iter()
        .filter(|r| !existing.contains(&r.id))
        .map(|r| NewCountry {
            reference_id: r.id,
            code: r.code.clone(),
            name: r.name.clone(),
        })
        .collect()
}

pub fn plan_seasons(
    pairs: &[(i32, Option<String>)],
    existing_years: &HashSet<i32>,
) -> Vec<NewSeason> {
    pairs
        .iter()
        .filter(|(year, _)| !existing_years.contains(year))
        .map(|(year, period)| NewSeason {
            year: *year,
            period: period.clone(),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct LeagueSnapshot {
    /// (reference id, season year, country reference id) of persisted leagues.
    pub existing: HashSet<(i64, i32, i64)>,
    pub seasons_by_year: HashMap<i32, i64>,
    pub countries_by_reference: HashMap<i64, i64>,
}

pub fn plan_leagues(records: &[LeagueRecord], snap: &LeagueSnapshot) -> Result<Vec<NewLeague>> {
    let mut rows = Vec::new();
    for rec in records {
        for season in &rec.seasons {
            let year = season.season.first_year()?;
            if snap.existing.contains(&(rec.id, year, rec.country.id)) {
                continue;
            }
            rows.push(NewLeague {
                country_id: snap.countries_by_reference.get(&rec.country.id).copied(),
                season_id: snap.seasons_by_year.get(&year).copied(),
                reference_id: rec.id,
                name: rec.name.clone(),
                league_type: rec.league_type.clone(),
            });
        }
    }
    Ok(rows)
}

#[derive(Debug, Default)]
pub struct TeamSnapshot {
    /// Reference ids of teams already persisted under the scoping
    /// (season year, league reference id) the caller supplied.
    pub existing: HashSet<i64>,
    pub countries_by_reference: HashMap<i64, i64>,
    pub season_id: Option<i64>,
    pub league_id: Option<i64>,
}

pub fn plan_teams(records: &[TeamRecord], snap: &TeamSnapshot) -> Vec<NewTeam> {
    records
        .iter()
        .filter(|r| !snap.existing.contains(&r.id))
        .map(|r| NewTeam {
            country_id: snap.countries_by_reference.get(&r.country.id).copied(),
            season_id: snap.season_id,
            league_id: snap.league_id,
            reference_id: r.id,
            name: r.name.clone(),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct GameSnapshot {
    pub existing: HashSet<i64>,
    pub countries_by_reference: HashMap<i64, i64>,
    pub seasons_by_year: HashMap<i32, i64>,
    pub leagues_by_reference: HashMap<i64, i64>,
    pub teams_by_reference: HashMap<i64, i64>,
}

pub fn plan_games(records: &[GameRecord], snap: &GameSnapshot) -> Result<Vec<NewGame>> {
    let mut rows = Vec::new();
    for rec in records {
        if snap.existing.contains(&rec.id) {
            continue;
        }
        let year = rec.league.season.first_year()?;
        rows.push(NewGame {
            country_id: snap.countries_by_reference.get(&rec.country.id).copied(),
            season_id: snap.seasons_by_year.get(&year).copied(),
            league_id: snap.leagues_by_reference.get(&rec.league.id).copied(),
            home_team_id: snap.teams_by_reference.get(&rec.teams.home.id).copied(),
            away_team_id: snap.teams_by_reference.get(&rec.teams.away.id).copied(),
            reference_id: rec.id,
            datetime: parse_game_datetime(&rec.date, &rec.time)?,
            status: rec.status.long.clone(),
            scores: rec.scores.clone(),
        });
    }
    Ok(rows)
}

pub async fn import_countries(db: &Db, records: &[CountryRecord]) -> Result<bool> {
    let existing = store::countries::reference_id_set(db).await?;
    let rows = plan_countries(records, &existing);
    let inserted = store::countries::bulk_insert(db, &rows).await?;
    info!(total = records.len(), inserted, "countries import finished");
    Ok(true)
}

pub async fn import_seasons(db: &Db, pairs: &[(i32, Option<String>)]) -> Result<bool> {
    let existing = store::seasons::year_set(db).await?;
    let rows = plan_seasons(pairs, &existing);
    let inserted = store::seasons::bulk_insert(db, &rows).await?;
    info!(total = pairs.len(), inserted, "seasons import finished");
    Ok(true)
}

pub async fn import_leagues(db: &Db, records: &[LeagueRecord]) -> Result<bool> {
    let snap = LeagueSnapshot {
        existing: store::leagues::scoping_key_set(db).await?,
        seasons_by_year: store::seasons::ids_by_year(db).await?,
        countries_by_reference: store::countries::ids_by_reference(db).await?,
    };
    let rows = plan_leagues(records, &snap)?;
    let inserted = store::leagues::bulk_insert(db, &rows).await?;
    info!(total = records.len(), inserted, "leagues import finished");
    Ok(true)
}

pub async fn import_teams(
    db: &Db,
    records: &[TeamRecord],
    season_year: i32,
    league_reference_id: i64,
) -> Result<bool> {
    let seasons = store::seasons::ids_by_year(db).await?;
    let snap = TeamSnapshot {
        existing: store::teams::reference_ids_for_scope(db, season_year, league_reference_id)
            .await?,
        countries_by_reference: store::countries::ids_by_reference(db).await?,
        season_id: seasons.get(&season_year).copied(),
        league_id: store::leagues::id_for_reference_and_year(db, league_reference_id, season_year)
            .await?,
    };
    let rows = plan_teams(records, &snap);
    let inserted = store::teams::bulk_insert(db, &rows).await?;
    info!(total = records.len(), inserted, "teams import finished");
    Ok(true)
}

pub async fn import_games(db: &Db, records: &[GameRecord]) -> Result<bool> {
    let snap = GameSnapshot {
        existing: store::games::reference_id_set(db).await?,
        countries_by_reference: store::countries::ids_by_reference(db).await?,
        seasons_by_year: store::seasons::ids_by_year(db).await?,
        leagues_by_reference: store::leagues::ids_by_reference(db).await?,
        teams_by_reference: store::teams::ids_by_reference(db).await?,
    };
    let rows = plan_games(records, &snap)?;
    let inserted = store::games::bulk_insert(db, &rows).await?;
    info!(total = records.len(), inserted, "games import finished");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn country(id: i64, name: &str) -> CountryRecord {
        CountryRecord {
            id,
            name: name.to_string(),
            code: None,
        }
    }

    #[test]
    fn country_already_persisted_is_skipped() {
        let existing: HashSet<i64> = [5].into_iter().collect();
        let batch = vec![country(5, "Spain"), country(6, "France")];
        let rows = plan_countries(&batch, &existing);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reference_id, 6);
        assert_eq!(rows[0].name, "France");
    }

    #[test]
    fn country_import_is_idempotent() {
        let batch = vec![country(1, "Spain"), country(2, "France")];
        let first = plan_countries(&batch, &HashSet::new());
        assert_eq!(first.len(), 2);
        let persisted: HashSet<i64> = first.iter().map(|r| r.reference_id).collect();
        let second = plan_countries(&batch, &persisted);
        assert!(second.is_empty());
    }

    #[test]
    fn duplicates_within_one_batch_are_both_kept() {
        let batch = vec![country(7, "Italy"), country(7, "Italy")];
        let rows = plan_countries(&batch, &HashSet::new());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn pair_seasons_pairs_alternating_years_and_periods() {
        let entries = vec![
            SeasonValue::Year(2008),
            SeasonValue::Span("2008-2009".into()),
            SeasonValue::Year(2009),
            SeasonValue::Span("2009-2010".into()),
        ];
        let pairs = pair_seasons(&entries).unwrap();
        assert_eq!(
            pairs,
            vec![
                (2008, Some("2008-2009".to_string())),
                (2009, Some("2009-2010".to_string())),
            ]
        );
    }

    #[test]
    fn pair_seasons_trailing_year_without_period() {
        let entries = vec![
            SeasonValue::Year(2021),
            SeasonValue::Span("2021-2022".into()),
            SeasonValue::Year(2022),
        ];
        let pairs = pair_seasons(&entries).unwrap();
        assert_eq!(pairs.last(), Some(&(2022, None)));
    }

    #[test]
    fn pair_seasons_collapses_repeated_years() {
        let entries = vec![
            SeasonValue::Year(2020),
            SeasonValue::Span("2020-2021".into()),
            SeasonValue::Year(2020),
            SeasonValue::Span("2020/21".into()),
        ];
        let pairs = pair_seasons(&entries).unwrap();
        assert_eq!(pairs, vec![(2020, Some("2020/21".to_string()))]);
    }

    #[test]
    fn plan_seasons_skips_persisted_years() {
        let existing: HashSet<i32> = [2008].into_iter().collect();
        let pairs = vec![
            (2008, Some("2008-2009".to_string())),
            (2009, Some("2009-2010".to_string())),
        ];
        let rows = plan_seasons(&pairs, &existing);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, 2009);
    }

    #[test]
    fn season_span_resolves_to_first_year() {
        assert_eq!(
            SeasonValue::Span("2019-2020".into()).first_year().unwrap(),
            2019
        );
        assert_eq!(SeasonValue::Year(2022).first_year().unwrap(), 2022);
        assert!(SeasonValue::Span("playoffs".into()).first_year().is_err());
    }

    fn league(id: i64, country_id: i64, seasons: Vec<SeasonValue>) -> LeagueRecord {
        LeagueRecord {
            id,
            name: "Liga".to_string(),
            league_type: "League".to_string(),
            country: CountryRef { id: country_id },
            seasons: seasons
                .into_iter()
                .map(|s| LeagueSeasonRecord { season: s })
                .collect(),
        }
    }

    #[test]
    fn league_span_reconciles_on_first_year() {
        let snap = LeagueSnapshot {
            existing: [(12, 2019, 5)].into_iter().collect(),
            seasons_by_year: [(2019, 1)].into_iter().collect(),
            countries_by_reference: [(5, 1)].into_iter().collect(),
        };
        let batch = vec![league(12, 5, vec![SeasonValue::Span("2019-2020".into())])];
        assert!(plan_leagues(&batch, &snap).unwrap().is_empty());

        // The same span against a 2020 season is a different scoping key.
        let snap_2020 = LeagueSnapshot {
            existing: [(12, 2020, 5)].into_iter().collect(),
            ..Default::default()
        };
        let rows = plan_leagues(&batch, &snap_2020).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn league_with_unknown_country_gets_null_relations() {
        let snap = LeagueSnapshot {
            seasons_by_year: [(2021, 3)].into_iter().collect(),
            ..Default::default()
        };
        let batch = vec![league(40, 99, vec![SeasonValue::Year(2021)])];
        let rows = plan_leagues(&batch, &snap).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].country_id, None);
        assert_eq!(rows[0].season_id, Some(3));
    }

    #[test]
    fn league_emits_one_row_per_season_entry() {
        let batch = vec![league(
            40,
            5,
            vec![SeasonValue::Year(2020), SeasonValue::Year(2021)],
        )];
        let rows = plan_leagues(&batch, &LeagueSnapshot::default()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn team_scoped_dedupe_and_fixed_relations() {
        let snap = TeamSnapshot {
            existing: [101].into_iter().collect(),
            countries_by_reference: [(5, 1)].into_iter().collect(),
            season_id: Some(9),
            league_id: Some(4),
        };
        let batch = vec![
            TeamRecord {
                id: 101,
                name: "Lakers".to_string(),
                country: CountryRef { id: 5 },
            },
            TeamRecord {
                id: 102,
                name: "Heat".to_string(),
                country: CountryRef { id: 5 },
            },
        ];
        let rows = plan_teams(&batch, &snap);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reference_id, 102);
        assert_eq!(rows[0].season_id, Some(9));
        assert_eq!(rows[0].league_id, Some(4));
        assert_eq!(rows[0].country_id, Some(1));
    }

    #[test]
    fn game_datetime_ignores_embedded_time_of_day() {
        let ts = parse_game_datetime("2022-01-05T00:00:00+00:00", "19:30").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2022, 1, 5, 19, 30, 0).unwrap());
    }

    #[test]
    fn game_datetime_rejects_garbage() {
        assert!(parse_game_datetime("not-a-date", "19:30").is_err());
    }

    fn game_record(id: i64) -> GameRecord {
        serde_json::from_value(json!({
            "id": id,
            "date": "2022-01-05T00:00:00+00:00",
            "time": "19:30",
            "status": {"short": "NS", "long": "Not Started"},
            "country": {"id": 5, "name": "USA"},
            "league": {"id": 12, "name": "NBA", "season": "2021-2022"},
            "teams": {
                "home": {"id": 101, "name": "Lakers"},
                "away": {"id": 102, "name": "Heat"}
            },
            "scores": {
                "home": {"quarter_1": 25, "quarter_2": null, "total": 25},
                "away": {"quarter_1": 20, "quarter_2": null, "total": 20}
            }
        }))
        .unwrap()
    }

    #[test]
    fn game_plan_resolves_relations_and_copies_scores() {
        let snap = GameSnapshot {
            existing: HashSet::new(),
            countries_by_reference: [(5, 1)].into_iter().collect(),
            seasons_by_year: [(2021, 2)].into_iter().collect(),
            leagues_by_reference: [(12, 3)].into_iter().collect(),
            teams_by_reference: [(101, 4), (102, 5)].into_iter().collect(),
        };
        let rows = plan_games(&[game_record(900)], &snap).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.country_id, Some(1));
        assert_eq!(row.season_id, Some(2));
        assert_eq!(row.league_id, Some(3));
        assert_eq!(row.home_team_id, Some(4));
        assert_eq!(row.away_team_id, Some(5));
        assert_eq!(row.status, "Not Started");
        assert_eq!(row.scores["home"]["quarter_1"], json!(25));
        assert_eq!(row.scores["away"]["quarter_2"], json!(null));
        assert_eq!(
            row.datetime,
            Utc.with_ymd_and_hms(2022, 1, 5, 19, 30, 0).unwrap()
        );
    }

    #[test]
    fn game_dedupe_keys_on_reference_id_alone() {
        let snap = GameSnapshot {
            existing: [900].into_iter().collect(),
            ..Default::default()
        };
        assert!(plan_games(&[game_record(900)], &snap).unwrap().is_empty());
    }
}
