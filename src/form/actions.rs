use axum::{Form, debug_handler, extract::State, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    error::{HookError, HookResult},
    form::InFlightGuard,
    registry::TemplateId,
    session,
    workflow::{FormState, Notice},
};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenForm {
    token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectForm {
    room: String,
    template: Option<TemplateId>,
}

/// Stores the action's outcome as the next notice and sends the browser back to the form.
async fn finish(
    session: &Session,
    guard: InFlightGuard,
    mut form: FormState,
    outcome: HookResult<Option<Notice>>,
) -> AppResult<Redirect> {
    form.notice = match outcome {
        Ok(notice) => notice,
        Err(err) => {
            tracing::warn!(session = %form.key, step = ?form.step, %err, "action failed");
            Some(Notice::error(err.to_string()))
        }
    };
    form.revision += 1;
    session::save(session, &form).await?;
    guard.saved(form.revision);
    Ok(Redirect::to("/"))
}

fn busy(form: &FormState) -> AppResult<Redirect> {
    tracing::warn!(session = %form.key, revision = form.revision, err = %HookError::Busy, "rejected overlapping or stale action");
    Ok(Redirect::to("/"))
}

#[debug_handler]
pub(crate) async fn token(
    State(app): State<AppState>,
    session: Session,
    Form(TokenForm { token }): Form<TokenForm>,
) -> AppResult<Redirect> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;
    let Some(guard) = app.in_flight.enter(&form) else {
        return busy(&form);
    };

    let outcome = app.controller.set_token(&mut form, token).await.map(|()| {
        let count = form.rooms.as_ref().map_or(0, |rooms| rooms.len());
        Some(Notice::success(format!("Fetched **{count}** rooms.")))
    });
    finish(&session, guard, form, outcome).await
}

#[debug_handler]
pub(crate) async fn refresh(State(app): State<AppState>, session: Session) -> AppResult<Redirect> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;
    let Some(guard) = app.in_flight.enter(&form) else {
        return busy(&form);
    };

    let outcome = app.controller.refresh(&mut form).await.map(|()| None);
    finish(&session, guard, form, outcome).await
}

#[debug_handler]
pub(crate) async fn select(
    State(app): State<AppState>,
    session: Session,
    Form(SelectForm { room, template }): Form<SelectForm>,
) -> AppResult<Redirect> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;
    let Some(guard) = app.in_flight.enter(&form) else {
        return busy(&form);
    };

    let template = template
        .or_else(|| form.templates.as_ref()?.first().map(|t| t.id))
        .unwrap_or(1);
    let outcome = app.controller.select(&mut form, &room, template).map(|()| None);
    finish(&session, guard, form, outcome).await
}

#[debug_handler]
pub(crate) async fn generate(State(app): State<AppState>, session: Session) -> AppResult<Redirect> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;
    let Some(guard) = app.in_flight.enter(&form) else {
        return busy(&form);
    };

    let outcome = app.controller.generate(&mut form).await.map(|_| None);
    finish(&session, guard, form, outcome).await
}

#[debug_handler]
pub(crate) async fn register(State(app): State<AppState>, session: Session) -> AppResult<Redirect> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;
    let Some(guard) = app.in_flight.enter(&form) else {
        return busy(&form);
    };

    let outcome = app.controller.register(&mut form).await.map(|registration| {
        let url = app.config.payload_url(&registration.webhook.name);
        Some(match registration.membership {
            Ok(()) => Notice::success(format!(
                "Webhook registered for **{}**: `{url}`",
                registration.room_title
            )),
            Err(err) => Notice::warning(format!(
                "Webhook registered for **{}**: `{url}`\n\nError adding bot to room, {err}",
                registration.room_title
            )),
        })
    });
    finish(&session, guard, form, outcome).await
}

#[debug_handler]
pub(crate) async fn reset(State(app): State<AppState>, session: Session) -> AppResult<Redirect> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;
    let Some(guard) = app.in_flight.enter(&form) else {
        return busy(&form);
    };

    form.reset();
    finish(&session, guard, form, Ok(None)).await
}
