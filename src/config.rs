use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Name of the endpoint, used to derive flag names.
    pub endpoint_name: String,
    /// Account whose home receives `.cassandra/cqlshrc`.
    pub owner: String,
    /// JSON snapshot of current relation state.
    pub relation_state: PathBuf,
    /// Write here instead of the owner's home; ownership is left alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cqlshrc_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_name: "db".into(),
            owner: "root".into(),
            relation_state: "relations.json".into(),
            cqlshrc_path: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::figment()
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("cassandra-endpoint.toml"))
            .merge(Json::file("cassandra-endpoint.json"))
            .merge(Env::prefixed("CASSANDRA_ENDPOINT_"))
    }
}
