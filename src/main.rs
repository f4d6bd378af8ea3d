use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use courtdata::api::{auth, ApiServer};
use courtdata::importer;
use courtdata::sports_api::{ApiOutcome, SportsApi};
use courtdata::store::users::{self, NewUser, USER_TYPE_ADMIN};
use courtdata::util::db::Db;
use courtdata::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "courtdata", version, about = "Basketball reference-data backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve,
    /// Fetch countries from the sports API and reconcile them
    ImportCountries,
    /// Fetch seasons from the sports API and reconcile them
    ImportSeasons,
    /// Fetch leagues from the sports API and reconcile them
    ImportLeagues,
    /// Fetch teams for one league and season
    ImportTeams {
        #[arg(long)]
        season: i32,
        #[arg(long)]
        league: i64,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

fn response_of<T>(outcome: ApiOutcome<T>) -> Result<Vec<T>> {
    match outcome {
        ApiOutcome::Ok(envelope) => {
            if envelope.results == 0 {
                info!("no results from upstream");
            }
            Ok(envelope.response)
        }
        ApiOutcome::BadRequest(errors) => bail!("upstream rejected request: {errors}"),
        ApiOutcome::Unavailable(status) => bail!("sports api unavailable (status {status})"),
    }
}

async fn connect_db() -> Result<Db> {
    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    Db::connect(&database_url, max_connections).await
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    courtdata::tracing::init_tracing("info,sqlx=warn")?;

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => {
            let server = ApiServer::from_env()?;
            let db = connect_db().await?;
            server.run(db).await?;
        }
        Command::ImportCountries => {
            let db = connect_db().await?;
            let api = SportsApi::from_env()?;
            let records = response_of(api.countries().await?)?;
            importer::import_countries(&db, &records).await?;
        }
        Command::ImportSeasons => {
            let db = connect_db().await?;
            let api = SportsApi::from_env()?;
            let values = response_of(api.seasons().await?)?;
            let pairs = importer::pair_seasons(&values)?;
            importer::import_seasons(&db, &pairs).await?;
        }
        Command::ImportLeagues => {
            let db = connect_db().await?;
            let api = SportsApi::from_env()?;
            let records = response_of(api.leagues().await?)?;
            importer::import_leagues(&db, &records).await?;
        }
        Command::ImportTeams { season, league } => {
            let db = connect_db().await?;
            let api = SportsApi::from_env()?;
            let records = response_of(api.teams(league, season).await?)?;
            importer::import_teams(&db, &records, season, league).await?;
        }
        Command::CreateAdmin { email, password } => {
            let db = connect_db().await?;
            if users::find_by_email(&db, &email).await?.is_some() {
                bail!("a user with email {email} already exists");
            }
            let row = NewUser {
                email,
                password_hash: auth::hash_password(&password)?,
                first_name: None,
                last_name: None,
                user_type: USER_TYPE_ADMIN,
            };
            let user = users::create(&db, &row).await?;
            info!(user_id = user.id, email = %user.email, "administrator created");
        }
    }

    Ok(())
}
