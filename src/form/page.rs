use axum::{debug_handler, extract::State, response::Html};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    config::Config,
    markdown,
    registry::TemplateId,
    session,
    workflow::{FormState, Notice, NoticeKind, Step},
};

#[debug_handler]
pub(crate) async fn form_page(State(app): State<AppState>, session: Session) -> AppResult<Html<String>> {
    let mut form = session::form_state(&session, app.config.access_token.as_deref()).await?;

    // notices show once, unless an action is about to replace this copy
    let notice = form.notice.take();
    if notice.is_some() {
        if let Some(_guard) = app.in_flight.enter(&form) {
            session::save(&session, &form).await?;
        }
    }

    Ok(Html(render(&app.config, &form, notice.as_ref())))
}

fn render_notice(notice: &Notice) -> Markup {
    let kind = match notice.kind {
        NoticeKind::Success => "success",
        NoticeKind::Warning => "warning",
        NoticeKind::Error => "error",
    };
    html! {
        div class={ "notice " (kind) } { (PreEscaped(markdown(&notice.text))) }
    }
}

/// The whole form page for `form`'s current step.
pub fn render(config: &Config, form: &FormState, notice: Option<&Notice>) -> String {
    let body = if form.step == Step::Idle {
        Ok(html! { p { "Please provide your access token before continuing." } })
    } else {
        form.free_rooms()
            .map(|free| render_loaded(config, form, free.keys().map(String::as_str)))
    };

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Webhooks Generator" }
                link rel="stylesheet" href="/style.css";
            }
            body {
                aside {
                    form method="post" action="/token" {
                        label {
                            "Access Token" br;
                            input type="password" name="token" value=(form.token.as_deref().unwrap_or_default());
                        }
                        button type="submit" { "Load rooms" }
                    }
                    form method="post" action="/refresh" { button type="submit" { "Refresh" } }
                    form method="post" action="/reset" { button type="submit" { "Start over" } }
                }
                main {
                    h1 { "Webhooks Generator for Webex Rooms" }
                    @if let Some(notice) = notice {
                        (render_notice(notice))
                    }
                    @match &body {
                        Ok(body) => (body),
                        Err(err) => (render_notice(&Notice::error(err.to_string()))),
                    }
                }
            }
        }
    }
    .into_string()
}

fn render_loaded<'a>(config: &Config, form: &FormState, free: impl Iterator<Item = &'a str>) -> Markup {
    let templates = form.templates.as_deref().unwrap_or_default();
    let template_name = |id: TemplateId| {
        templates
            .iter()
            .find(|t| t.id == id)
            .map_or_else(|| id.to_string(), |t| t.name.clone())
    };
    let checked_template = form.template.or_else(|| templates.first().map(|t| t.id));

    html! {
        section {
            table {
                thead { tr { th { "Room Title" } th { "Hook Name" } th { "Template" } } }
                tbody {
                    @for webhook in form.my_webhooks() {
                        tr {
                            td { (webhook.title) }
                            td { (webhook.hook) }
                            td { (template_name(webhook.template)) }
                        }
                    }
                }
            }
            p { "Webhook payload URL -> " code { (config.payload_url("<Hook Name>")) } }
        }
        section {
            form method="post" action="/select" {
                fieldset {
                    legend { "Select a message template for this Webex room" }
                    @for template in templates {
                        label {
                            input type="radio" name="template" value=(template.id) checked[Some(template.id) == checked_template];
                            " " (template.name)
                        }
                    }
                }
                label {
                    "Please select a Webex room from list: "
                    select name="room" {
                        @for title in free {
                            option value=(title) selected[form.selected.as_deref() == Some(title)] { (title) }
                        }
                    }
                }
                button type="submit" { "Select" }
            }
        }
        @if let (Step::RoomSelected | Step::SuffixGenerated, Some(room)) = (form.step, &form.selected) {
            section {
                p { "Press button to generate a random string as suffix for webhook payload URL" }
                form method="post" action="/generate" { button type="submit" { "Generate" } }
                @if let (Some(suffix), Some(room_id)) = (&form.suffix, form.selected_room_id()) {
                    p {
                        "You selected: \"" strong { (room) } "\" room, suffix generated: \""
                        span class="suffix" { (suffix) } "\""
                    }
                    p { "Room ID = " (room_id) }
                    p { "Click on button to register your webhook" }
                    form method="post" action="/register" { button type="submit" { "Register" } }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::{Template, Webhook},
        rooms::Rooms,
    };

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "WEBHOOK_SERVER_URL" => Some("https://hooks.example.com/".into()),
            "BOT_EMAIL" => Some("bot@example.com".into()),
            _ => None,
        })
        .unwrap()
    }

    fn loaded() -> FormState {
        let mut form = FormState::new(Some("token".into()));
        form.rooms = Some(Rooms::from([
            ("Ops <team>".to_owned(), "1".to_owned()),
            ("Dev".to_owned(), "2".to_owned()),
        ]));
        form.templates = Some(vec![
            Template { id: 1, name: "Plain".into() },
            Template { id: 2, name: "Card".into() },
        ]);
        form.webhooks = vec![Webhook {
            room_id: "1".into(),
            name: "han_solo".into(),
            template: 2,
        }];
        form.step = Step::RoomsLoaded;
        form
    }

    #[test]
    fn idle_asks_for_token() {
        let html = render(&config(), &FormState::new(None), None);
        assert!(html.contains("Please provide your access token"));
        assert!(!html.contains("<select"));
    }

    #[test]
    fn loaded_lists_webhooks_and_free_rooms() {
        let html = render(&config(), &loaded(), None);
        assert!(html.contains("<td>Ops &lt;team&gt;</td><td>han_solo</td><td>Card</td>"));
        assert!(html.contains(r#"<option value="Dev">Dev</option>"#));
        assert!(!html.contains(r#"<option value="Ops"#));
        assert!(html.contains("https://hooks.example.com/process/&lt;Hook Name&gt;"));
        assert!(html.contains(r#"value="1" checked"#));
    }

    #[test]
    fn shows_generated_suffix() {
        let mut form = loaded();
        form.step = Step::SuffixGenerated;
        form.selected = Some("Dev".into());
        form.template = Some(1);
        form.suffix = Some("leia_organa".into());

        let html = render(&config(), &form, None);
        assert!(html.contains(r#"<span class="suffix">leia_organa</span>"#));
        assert!(html.contains("Room ID = 2"));
        assert!(html.contains(r#"action="/register""#));
    }

    #[test]
    fn renders_notice_markdown() {
        let html = render(&config(), &loaded(), Some(&Notice::error("error calling the **registry**")));
        assert!(html.contains(r#"<div class="notice error"><p>error calling the <strong>registry</strong></p>"#));
    }

    #[test]
    fn braces_in_foreign_text_stay_literal() {
        let mut form = loaded();
        form.token = Some("{body}".into());
        form.rooms = Some(Rooms::from([
            ("{room_options}".to_owned(), "1".to_owned()),
            ("{selection}".to_owned(), "2".to_owned()),
        ]));
        form.templates = Some(vec![Template { id: 1, name: "{webhook_rows}".into() }]);

        let html = render(&config(), &form, None);
        assert!(html.contains("<td>{room_options}</td><td>han_solo</td><td>2</td>"));
        assert!(html.contains(r#"<option value="{selection}">{selection}</option>"#));
        assert!(html.contains(r#"value="{body}""#));
        assert!(html.contains(" {webhook_rows}</label>"));
    }

    #[test]
    fn attribute_quotes_are_escaped() {
        let mut form = loaded();
        form.rooms = Some(Rooms::from([(r#"Dev" onmouseover="x"#.to_owned(), "2".to_owned())]));
        form.webhooks.clear();
        let html = render(&config(), &form, None);
        assert!(html.contains(r#"<option value="Dev&quot; onmouseover=&quot;x">"#));
    }
}
