//! Backend server for the society voting system: provisional vote casting
//! with per-position quotas, atomic ballot finalization, and a live
//! dashboard event feed.

#[macro_use]
extern crate log;

#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod ballot;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

use crate::ballot::VoterLocks;
use crate::config::{BroadcastFairing, ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

/// Assemble the full Rocket instance. The fairings connect to the database
/// and set up managed state during ignition; a failure there aborts launch.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(BroadcastFairing)
        .attach(LoggerFairing)
        .manage(VoterLocks::new())
}

/// Connect to the database configured in the figment.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri: String = rocket::Config::figment()
        .extract_inner("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("failed to connect to database")
}

/// Assemble a Rocket instance against the given database, bypassing the
/// database fairing so each test gets its own freshly-named database.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    use crate::model::{
        db::voting_config::ensure_voting_config_exists,
        mongodb::{ensure_candidate_id_counter_exists, ensure_indexes_exist, Coll},
    };

    let db = client.database(db_name);
    ensure_indexes_exist(&db).await.unwrap();
    ensure_candidate_id_counter_exists(&Coll::from_db(&db))
        .await
        .unwrap();
    ensure_voting_config_exists(&Coll::from_db(&db))
        .await
        .unwrap();

    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(BroadcastFairing)
        .manage(VoterLocks::new())
        .manage(client)
        .manage(db)
}
