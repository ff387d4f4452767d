use serde::{Deserialize, Serialize};

use crate::{
    error::{HookError, HookResult, Service, UpstreamStatus},
    http,
};

pub type TemplateId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub room_id: String,
    pub name: String,
    pub template: TemplateId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
}

/// Client for the webhook registry backend.
#[derive(Debug, Clone)]
pub struct WebhookRegistry {
    http: reqwest::Client,
    base: String,
}

impl WebhookRegistry {
    pub fn new(http: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_owned(),
        }
    }

    pub async fn list_webhooks(&self) -> HookResult<Vec<Webhook>> {
        let response = http::send(Service::Registry, self.http.get(format!("{}/webhooks/", self.base))).await?;
        http::json(Service::Registry, response).await
    }

    pub async fn list_templates(&self) -> HookResult<Vec<Template>> {
        let response = http::send(Service::Registry, self.http.get(format!("{}/templates/", self.base))).await?;
        http::json(Service::Registry, response).await
    }

    /// Registers `name` for `room_id`. Nothing is assumed about the backend when this fails.
    pub async fn register(&self, room_id: &str, name: &str, template: TemplateId) -> HookResult<Webhook> {
        let webhook = Webhook {
            room_id: room_id.to_owned(),
            name: name.to_owned(),
            template,
        };
        let request = self.http.post(format!("{}/webhooks/", self.base)).json(&webhook);
        let response = http::send(Service::Registry, request).await?;

        // some registries answer with an empty body
        let body = response
            .bytes()
            .await
            .map_err(|err| http::transport_error(Service::Registry, err))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(webhook);
        }
        serde_json::from_slice(&body)
            .map_err(|err| HookError::upstream(Service::Registry, UpstreamStatus::Malformed(err.to_string())))
    }
}
