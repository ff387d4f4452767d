use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{HookResult, Service},
    http,
};

/// Room title → room id, as visible to the token's owner.
pub type Rooms = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct RoomItem {
    title: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct RoomList {
    items: Vec<RoomItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Membership<'a> {
    room_id: &'a str,
    person_email: &'a str,
}

/// Client for the messaging platform's rooms and memberships endpoints.
#[derive(Debug, Clone)]
pub struct RoomDirectory {
    http: reqwest::Client,
    api_prefix: String,
}

impl RoomDirectory {
    pub fn new(http: reqwest::Client, api_prefix: impl Into<String>) -> Self {
        Self {
            http,
            api_prefix: api_prefix.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Rooms the token's owner belongs to. Duplicate titles keep the last id seen.
    pub async fn list_rooms(&self, token: &str) -> HookResult<Rooms> {
        let request = self
            .http
            .get(format!("{}/v1/rooms", self.api_prefix))
            .query(&[("max", "1000")])
            .bearer_auth(token);
        let response = http::send(Service::Rooms, request).await?;
        let RoomList { items } = http::json(Service::Rooms, response).await?;

        let rooms: Rooms = items
            .into_iter()
            .map(|RoomItem { title, id }| (title, id))
            .collect();
        tracing::debug!(count = rooms.len(), "fetched rooms");
        Ok(rooms)
    }

    pub async fn add_membership(&self, token: &str, room_id: &str, person_email: &str) -> HookResult<()> {
        let request = self
            .http
            .post(format!("{}/v1/memberships", self.api_prefix))
            .bearer_auth(token)
            .json(&Membership { room_id, person_email });
        http::send(Service::Rooms, request).await?;
        Ok(())
    }
}
