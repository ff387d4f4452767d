use serde::Deserialize;

use crate::{
    error::{HookResult, Service},
    http,
};

/// A source of human-readable candidate names.
pub trait NameSource {
    /// The source's current candidate pool, unnormalized. May be empty.
    fn candidates(&self) -> impl Future<Output = HookResult<Vec<String>>> + Send;
}

#[derive(Debug, Deserialize)]
struct Person {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct People {
    #[serde(default)]
    results: Vec<Person>,
}

/// Reads the `results[].name` list of a public people API.
#[derive(Debug, Clone)]
pub struct PeopleApi {
    http: reqwest::Client,
    url: String,
}

impl PeopleApi {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

impl NameSource for PeopleApi {
    async fn candidates(&self) -> HookResult<Vec<String>> {
        let response = http::send(Service::Names, self.http.get(&self.url)).await?;
        let People { results } = http::json(Service::Names, response).await?;
        Ok(results
            .into_iter()
            .map(|person| person.name.unwrap_or_else(|| "unknown".to_owned()))
            .collect())
    }
}

impl<S: NameSource + Sync> NameSource for &S {
    fn candidates(&self) -> impl Future<Output = HookResult<Vec<String>>> + Send {
        (**self).candidates()
    }
}
