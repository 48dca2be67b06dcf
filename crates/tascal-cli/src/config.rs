use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Path of the local SQLite record store.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Owner of every row this client reads and writes. A personal
    /// planner has one; the nil UUID is fine for a single-user setup.
    #[serde(default)]
    pub user_id: Uuid,
}

fn default_database_path() -> String {
    "tascal.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            user_id: Uuid::nil(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("tascal.toml"))
            .merge(Env::prefixed("TASCAL_"))
            .extract()
    }
}
