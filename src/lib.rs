pub mod allocator;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod names;
pub mod registry;
pub mod res;
pub mod rooms;
pub mod session;
pub mod workflow;

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}};

use crate::{
    allocator::Allocator,
    config::Config,
    form::InFlight,
    names::PeopleApi,
    registry::WebhookRegistry,
    rooms::RoomDirectory,
    workflow::Controller,
};

pub type FormController = Controller<PeopleApi>;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: Arc<FormController>,
    pub in_flight: InFlight,
}

impl AppState {
    /// Wires the three external clients from `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = http::client(config.request_timeout)?;
        let controller = Controller::new(
            RoomDirectory::new(client.clone(), &config.api_prefix),
            WebhookRegistry::new(client.clone(), &config.webhook_server_url),
            Allocator::new(PeopleApi::new(client, &config.name_source_url), config.max_attempts),
            &config.bot_email,
        );

        Ok(AppState {
            config: Arc::new(config),
            controller: Arc::new(controller),
            in_flight: InFlight::default(),
        })
    }
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Renders Markdown to HTML. Raw HTML in the input is shown as text, never passed through.
pub fn markdown(text: &str) -> String {
    use pulldown_cmark::{Event, Options, Parser};

    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        _ => event,
    });

    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}
