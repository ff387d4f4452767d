//! The form's workflow: load rooms and webhooks, pick a room, draw a suffix, register.
//!
//! Every action validates the current [`Step`], performs its external calls and only writes into the
//! [`FormState`] once all of them succeeded, so a failure leaves the session exactly where it was.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    allocator::{Allocator, used_names},
    error::{HookError, HookResult},
    names::NameSource,
    registry::{Template, TemplateId, Webhook, WebhookRegistry},
    rooms::{RoomDirectory, Rooms},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    #[default]
    Idle,
    RoomsLoaded,
    RoomSelected,
    SuffixGenerated,
    Registered,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Step::*;
        f.write_str(match self {
            Idle => "no rooms are loaded",
            RoomsLoaded => "no room is selected",
            RoomSelected => "no suffix is generated",
            SuffixGenerated => "a suffix is pending registration",
            Registered => "the webhook is registered",
        })
    }
}

/// A webhook on one of the user's own rooms, keyed by room title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyWebhook {
    pub title: String,
    pub hook: String,
    pub template: TemplateId,
}

/// Webhooks whose room is among `rooms`. Webhooks of other users' rooms are skipped.
pub fn my_webhooks(rooms: &Rooms, webhooks: &[Webhook]) -> Vec<MyWebhook> {
    let titles: HashMap<&str, &str> = rooms
        .iter()
        .map(|(title, id)| (id.as_str(), title.as_str()))
        .collect();

    webhooks
        .iter()
        .filter_map(|webhook| {
            titles.get(webhook.room_id.as_str()).map(|title| MyWebhook {
                title: title.to_string(),
                hook: webhook.name.clone(),
                template: webhook.template,
            })
        })
        .collect()
}

/// `rooms` minus every room that already has one of `mine`.
pub fn rooms_without_webhooks(rooms: &Rooms, mine: &[MyWebhook]) -> HookResult<Rooms> {
    let mut free = rooms.clone();
    for webhook in mine {
        if !rooms.contains_key(&webhook.title) {
            return Err(HookError::DataInconsistency {
                room: webhook.title.clone(),
            });
        }
        free.remove(&webhook.title);
    }
    Ok(free)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// Message shown on the next render. The text is Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Warning, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }
}

/// Everything a browser session remembers between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub key: Uuid,
    /// bumped on every save, so a request holding an older copy can be told apart
    #[serde(default)]
    pub revision: u64,
    pub token: Option<String>,
    pub step: Step,
    /// fetched once per token
    pub rooms: Option<Rooms>,
    /// fetched once per token
    pub templates: Option<Vec<Template>>,
    pub webhooks: Vec<Webhook>,
    pub selected: Option<String>,
    pub template: Option<TemplateId>,
    pub suffix: Option<String>,
    pub notice: Option<Notice>,
}

impl FormState {
    pub fn new(token: Option<String>) -> Self {
        Self {
            key: Uuid::now_v7(),
            revision: 0,
            token,
            step: Step::Idle,
            rooms: None,
            templates: None,
            webhooks: Vec::new(),
            selected: None,
            template: None,
            suffix: None,
            notice: None,
        }
    }

    pub fn my_webhooks(&self) -> Vec<MyWebhook> {
        self.rooms
            .as_ref()
            .map(|rooms| my_webhooks(rooms, &self.webhooks))
            .unwrap_or_default()
    }

    pub fn free_rooms(&self) -> HookResult<Rooms> {
        match &self.rooms {
            Some(rooms) => rooms_without_webhooks(rooms, &self.my_webhooks()),
            None => Ok(Rooms::new()),
        }
    }

    pub fn selected_room_id(&self) -> Option<&str> {
        let title = self.selected.as_ref()?;
        self.rooms.as_ref()?.get(title).map(String::as_str)
    }

    fn forget_selection(&mut self) {
        self.selected = None;
        self.template = None;
        self.suffix = None;
    }

    /// Back to `Idle`, keeping only the session key and token.
    pub fn reset(&mut self) {
        *self = Self {
            key: self.key,
            revision: self.revision,
            token: self.token.take(),
            ..Self::new(None)
        };
    }

    fn require(&self, allowed: &[Step], action: &'static str) -> HookResult<()> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(HookError::InvalidTransition { from: self.step, action })
        }
    }
}

/// Outcome of a registration. The membership step is best effort and never undoes the registration.
#[derive(Debug)]
pub struct Registration {
    pub webhook: Webhook,
    pub room_title: String,
    pub membership: HookResult<()>,
}

#[derive(Debug, Clone)]
pub struct Controller<S> {
    rooms: RoomDirectory,
    registry: WebhookRegistry,
    allocator: Allocator<S>,
    bot_email: String,
}

impl<S: NameSource> Controller<S> {
    pub fn new(
        rooms: RoomDirectory,
        registry: WebhookRegistry,
        allocator: Allocator<S>,
        bot_email: impl Into<String>,
    ) -> Self {
        Self {
            rooms,
            registry,
            allocator,
            bot_email: bot_email.into(),
        }
    }

    /// Sets the access token and loads with it. A new token invalidates what the old one fetched.
    pub async fn set_token(&self, state: &mut FormState, token: String) -> HookResult<()> {
        let token = token.trim().to_owned();
        if token.is_empty() {
            return Err(HookError::MissingToken);
        }
        if state.token.as_deref() != Some(token.as_str()) {
            let mut next = state.clone();
            next.reset();
            next.token = Some(token);
            self.load(&mut next).await?;
            *state = next;
            return Ok(());
        }
        self.load(state).await
    }

    /// `Idle -> RoomsLoaded`. Rooms and templates are reused when already fetched for this session.
    pub async fn load(&self, state: &mut FormState) -> HookResult<()> {
        let token = state.token.as_deref().ok_or(HookError::MissingToken)?;

        let rooms = match &state.rooms {
            Some(rooms) => rooms.clone(),
            None => self.rooms.list_rooms(token).await?,
        };
        let webhooks = self.registry.list_webhooks().await?;
        let templates = match &state.templates {
            Some(templates) => templates.clone(),
            None => self.registry.list_templates().await?,
        };

        rooms_without_webhooks(&rooms, &my_webhooks(&rooms, &webhooks))?;

        tracing::info!(
            session = %state.key,
            rooms = rooms.len(),
            webhooks = webhooks.len(),
            templates = templates.len(),
            "loaded form data"
        );
        state.rooms = Some(rooms);
        state.templates = Some(templates);
        state.webhooks = webhooks;
        state.forget_selection();
        state.step = Step::RoomsLoaded;
        Ok(())
    }

    /// Drops the memoized rooms and templates and loads again.
    pub async fn refresh(&self, state: &mut FormState) -> HookResult<()> {
        let mut next = state.clone();
        next.rooms = None;
        next.templates = None;
        self.load(&mut next).await?;
        *state = next;
        Ok(())
    }

    /// `-> RoomSelected`. The room must not have a webhook yet.
    pub fn select(&self, state: &mut FormState, title: &str, template: TemplateId) -> HookResult<()> {
        use Step::*;
        state.require(&[RoomsLoaded, RoomSelected, SuffixGenerated, Registered], "select a room")?;

        if !state.free_rooms()?.contains_key(title) {
            return Err(HookError::UnknownRoom { title: title.to_owned() });
        }
        let known = state.templates.as_deref().unwrap_or_default();
        if !known.is_empty() && !known.iter().any(|t| t.id == template) {
            return Err(HookError::InvalidTransition {
                from: state.step,
                action: "use an unknown template",
            });
        }

        state.selected = Some(title.to_owned());
        state.template = Some(template);
        state.suffix = None;
        state.step = RoomSelected;
        Ok(())
    }

    /// `RoomSelected -> SuffixGenerated`. Drawing again from `SuffixGenerated` replaces the suffix.
    pub async fn generate(&self, state: &mut FormState) -> HookResult<String> {
        use Step::*;
        state.require(&[RoomSelected, SuffixGenerated], "generate a suffix")?;

        let suffix = self.allocator.allocate(&used_names(&state.webhooks)).await?;
        state.suffix = Some(suffix.clone());
        state.step = SuffixGenerated;
        Ok(suffix)
    }

    /// `SuffixGenerated -> Registered`, then adds the bot to the room.
    pub async fn register(&self, state: &mut FormState) -> HookResult<Registration> {
        state.require(&[Step::SuffixGenerated], "register")?;
        let token = state.token.clone().ok_or(HookError::MissingToken)?;

        let (Some(title), Some(room_id), Some(suffix), Some(template)) = (
            state.selected.clone(),
            state.selected_room_id().map(str::to_owned),
            state.suffix.clone(),
            state.template,
        ) else {
            return Err(HookError::InvalidTransition {
                from: state.step,
                action: "register without a room and suffix",
            });
        };

        let webhook = self.registry.register(&room_id, &suffix, template).await?;
        tracing::info!(session = %state.key, room = %room_id, hook = %webhook.name, "registered webhook");

        let membership = self.rooms.add_membership(&token, &room_id, &self.bot_email).await;
        if let Err(err) = &membership {
            tracing::warn!(room = %room_id, %err, "could not add bot to room");
        }

        match self.registry.list_webhooks().await {
            Ok(webhooks) => state.webhooks = webhooks,
            Err(err) => {
                tracing::warn!(%err, "could not refetch webhooks after registration");
                state.webhooks.push(webhook.clone());
            }
        }
        if !state.webhooks.iter().any(|w| w.name == webhook.name) {
            state.webhooks.push(webhook.clone());
        }

        state.suffix = None;
        state.step = Step::Registered;
        Ok(Registration {
            webhook,
            room_title: title,
            membership,
        })
    }
}
