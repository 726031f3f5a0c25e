#![allow(dead_code)]

use arca::{
    Client, Conventions,
    mongodb::{bson::Uuid, options::ClientOptions},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_URL: &str = "mongodb://localhost:27017";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, arca::Entity)]
#[entity(collection = "test_models")]
pub struct TestModel {
    #[serde(rename = "_id", with = "arca::uuid")]
    pub id: Uuid,
    pub number: i32,
    pub text: String,
    #[serde(with = "arca::naive_datetime")]
    pub stamp: NaiveDateTime,
    pub kids: Vec<Kid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kid {
    pub name: String,
    pub age: i32,
}

pub fn model(number: i32, text: &str) -> TestModel {
    TestModel {
        id: Uuid::new(),
        number,
        text: text.to_owned(),
        stamp: now(),
        kids: vec![Kid {
            name: format!("{text}-kid"),
            age: number,
        }],
    }
}

/// Current time truncated to the millisecond precision of BSON dates.
pub fn now() -> NaiveDateTime {
    DateTime::<Utc>::from_timestamp_millis(Utc::now().timestamp_millis())
        .unwrap()
        .naive_utc()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn url() -> String {
    std::env::var("MONGODB_URL").unwrap_or_else(|_| DEFAULT_URL.to_owned())
}

/// A fresh database per test, so tests can run concurrently.
pub fn database_name() -> String {
    format!("arca_test_{}", Uuid::new().to_string().replace('-', ""))
}

pub async fn client_with(conventions: Conventions) -> Client {
    init_tracing();

    let options = ClientOptions::parse(url()).await.unwrap();

    Client::with_options(options, &database_name(), conventions).unwrap()
}

pub async fn client() -> Client {
    client_with(Conventions::default()).await
}
