//! Client construction and the [`Mongo`] handle accepted by every async operation.

use crate::{
    Error, Result,
    conventions::{Conventions, DateTimeKind, UuidFormat},
};
use mongodb::{Database, options::ClientOptions};
use serde::Deserialize;
use tracing::info;

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Connection settings, deserializable from any serde source or read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_uri")]
    pub uri: String,
    pub database: String,
    #[serde(default)]
    pub uuid_format: UuidFormat,
    #[serde(default)]
    pub date_time_kind: DateTimeKind,
}

fn default_uri() -> String {
    DEFAULT_URI.to_owned()
}

impl Settings {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            uuid_format: UuidFormat::default(),
            date_time_kind: DateTimeKind::default(),
        }
    }

    /// Reads `ARCA_MONGODB_URI`, `ARCA_DATABASE`, `ARCA_UUID_FORMAT` and `ARCA_DATE_TIME_KIND`.
    /// Only the database is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database = lookup("ARCA_DATABASE")
            .ok_or_else(|| Error::Configuration("`ARCA_DATABASE` is not set".into()))?;

        Ok(Self {
            uri: lookup("ARCA_MONGODB_URI").unwrap_or_else(default_uri),
            database,
            uuid_format: lookup("ARCA_UUID_FORMAT")
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or_default(),
            date_time_kind: lookup("ARCA_DATE_TIME_KIND")
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn conventions(&self) -> Conventions {
        Conventions {
            uuid_format: self.uuid_format,
            date_time_kind: self.date_time_kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    client: mongodb::Client,
    database: Database,
    conventions: Conventions,
}

impl Client {
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let options = ClientOptions::parse(&settings.uri).await?;

        Self::with_options(options, &settings.database, settings.conventions())
    }

    /// Builds a client from driver options, which are passed through untouched.
    pub fn with_options(
        options: ClientOptions,
        database: &str,
        conventions: Conventions,
    ) -> Result<Self> {
        conventions.register()?;

        let client = mongodb::Client::with_options(options)?;
        let database = client.database(database);
        info!(database = database.name(), "client ready");

        Ok(Self {
            client,
            database,
            conventions,
        })
    }

    pub fn mongo(&self) -> Mongo<'_> {
        Mongo::new(&self.database)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn client(&self) -> &mongodb::Client {
        &self.client
    }

    pub fn conventions(&self) -> Conventions {
        self.conventions
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Mongo<'a> {
    pub db: &'a Database,
}

impl<'a> Mongo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl<'a> From<&'a Database> for Mongo<'a> {
    fn from(value: &'a Database) -> Self {
        Self::new(value)
    }
}

impl<'a> From<&'a Client> for Mongo<'a> {
    fn from(value: &'a Client) -> Self {
        value.mongo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn settings_from_environment() {
        let settings = Settings::from_lookup(lookup(&[
            ("ARCA_DATABASE", "inventory"),
            ("ARCA_UUID_FORMAT", "csharpLegacy"),
            ("ARCA_DATE_TIME_KIND", "local"),
        ]))
        .unwrap();

        assert_eq!(settings.uri, DEFAULT_URI);
        assert_eq!(settings.database, "inventory");
        assert_eq!(
            settings.conventions(),
            Conventions {
                uuid_format: UuidFormat::CSharpLegacy,
                date_time_kind: DateTimeKind::Local,
            }
        );
    }

    #[test]
    fn database_is_required() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();

        assert!(err.is_configuration());
    }

    #[test]
    fn unknown_convention_in_environment() {
        let err = Settings::from_lookup(lookup(&[
            ("ARCA_DATABASE", "inventory"),
            ("ARCA_UUID_FORMAT", "unspecified"),
        ]))
        .unwrap_err();

        assert!(err.is_configuration());
    }

    #[test]
    fn settings_deserialize() {
        let settings: Settings = serde_json::from_str(
            r#"{ "uri": "mongodb://db:27017", "database": "shop", "uuid_format": "javaLegacy" }"#,
        )
        .unwrap();

        assert_eq!(settings.uri, "mongodb://db:27017");
        assert_eq!(settings.uuid_format, UuidFormat::JavaLegacy);
        assert_eq!(settings.date_time_kind, DateTimeKind::Utc);

        let err = serde_json::from_str::<Settings>(
            r#"{ "database": "shop", "uuid_format": "mystery" }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unrecognized uuid representation"));
    }

    #[tokio::test]
    async fn client_exposes_database() {
        let options = ClientOptions::parse(DEFAULT_URI).await.unwrap();

        let client = Client::with_options(options, "arca_client", Conventions::default()).unwrap();

        assert_eq!(client.database().name(), "arca_client");
        assert_eq!(client.mongo().db.name(), "arca_client");
        assert_eq!(client.conventions(), Conventions::default());
    }
}
