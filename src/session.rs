use tower_sessions::Session;

use crate::{AppResult, workflow::FormState};

pub const FORM_STATE: &str = "form_state";

/// The session's form state, or a fresh one pre-filled with `default_token`.
pub async fn form_state(session: &Session, default_token: Option<&str>) -> AppResult<FormState> {
    Ok(session
        .get::<FormState>(FORM_STATE)
        .await?
        .unwrap_or_else(|| FormState::new(default_token.map(str::to_owned))))
}

pub async fn save(session: &Session, state: &FormState) -> AppResult<()> {
    session.insert(FORM_STATE, state).await?;
    Ok(())
}
