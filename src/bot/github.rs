use thiserror::Error;
use tracing::{debug, info};

use crate::{
    bot::{
        telegram::Button,
        template::{FieldSource, RenderExecutionError, Template, TemplateSyntaxError, Value},
        Response,
    },
    webhooks::github::{GitHubEventType, NormalizedEvent},
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no template for event {event} action {action}")]
    NoTemplateForEvent {
        event: GitHubEventType,
        action: String,
    },
    #[error("parsing template")]
    TemplateSyntax(#[from] TemplateSyntaxError),
    #[error("executing template")]
    Execution(#[from] RenderExecutionError),
}

const PR_OPENED: &str = r#"🔀 <b>New Pull Request</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}
<code>{{pr.head}}</code> → <code>{{pr.base}}</code>

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const PR_CLOSED: &str = r#"❌ <b>Pull Request Closed</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const PR_MERGED: &str = r#"🟣 <b>Pull Request Merged</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}
<code>{{pr.head}}</code> → <code>{{pr.base}}</code>

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const PR_REOPENED: &str = r#"🔄 <b>Pull Request Reopened</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const PR_SYNCHRONIZE: &str = r#"🔄 <b>Pull Request Updated</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

New commits pushed by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const PR_READY_FOR_REVIEW: &str = r#"✅ <b>Pull Request Ready for Review</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const PR_CONVERTED_TO_DRAFT: &str = r#"📝 <b>Pull Request Converted to Draft</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const REVIEW_APPROVED: &str = r#"✅ <b>Pull Request Approved</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>{{#if review.body}}

<blockquote>{{truncate review.body 500}}</blockquote>{{/if}}"#;

const REVIEW_CHANGES_REQUESTED: &str = r#"🔴 <b>Changes Requested</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>{{#if review.body}}

<blockquote>{{truncate review.body 500}}</blockquote>{{/if}}"#;

const REVIEW_COMMENTED: &str = r#"💬 <b>Review Comment</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>{{#if review.body}}

<blockquote>{{truncate review.body 500}}</blockquote>{{/if}}"#;

const REVIEW_DISMISSED: &str = r#"🚫 <b>Review Dismissed</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>"#;

const REVIEW_COMMENT_CREATED: &str = r#"💬 <b>Review Comment</b>
<a href="{{pr.url}}">#{{pr.number}}</a> {{truncate pr.title 100}}

by <a href="{{actor.url}}">{{actor.login}}</a> in <b>{{repo.name}}</b>{{#if comment.path}}
📄 <code>{{comment.path}}</code>{{/if}}{{#if comment.body}}

<blockquote>{{truncate comment.body 500}}</blockquote>{{/if}}"#;

/// Built-in template for an event name and (normalized) action.
fn default_template(event: GitHubEventType, action: &str) -> Option<&'static str> {
    use GitHubEventType::*;

    let template = match (event, action) {
        (PullRequest, "opened") => PR_OPENED,
        (PullRequest, "closed") => PR_CLOSED,
        (PullRequest, "merged") => PR_MERGED,
        (PullRequest, "reopened") => PR_REOPENED,
        (PullRequest, "synchronize") => PR_SYNCHRONIZE,
        (PullRequest, "ready_for_review") => PR_READY_FOR_REVIEW,
        (PullRequest, "converted_to_draft") => PR_CONVERTED_TO_DRAFT,

        (PullRequestReview, "approved") => REVIEW_APPROVED,
        (PullRequestReview, "changes_requested") => REVIEW_CHANGES_REQUESTED,
        (PullRequestReview, "commented") => REVIEW_COMMENTED,
        (PullRequestReview, "dismissed") => REVIEW_DISMISSED,

        (PullRequestReviewComment, "created") => REVIEW_COMMENT_CREATED,

        _ => return None,
    };

    Some(template)
}

fn select_template<'a>(
    event: &NormalizedEvent,
    custom_template: Option<&'a str>,
) -> Result<&'a str, RenderError> {
    if let Some(custom) = custom_template.filter(|t| !t.is_empty()) {
        debug!("using custom template");
        return Ok(custom);
    }

    // merges are announced as such, whatever the literal action
    let action = if event.is_merged() {
        "merged"
    } else {
        event.action.as_str()
    };

    debug!("using default template for {}:{}", event.event_name, action);
    default_template(event.event_name, action).ok_or_else(|| RenderError::NoTemplateForEvent {
        event: event.event_name,
        action: event.action.clone(),
    })
}

/// Renders the notification text for `event`, with the custom template if one is given.
pub fn render(event: &NormalizedEvent, custom_template: Option<&str>) -> Result<String, RenderError> {
    let source = select_template(event, custom_template)?;
    let template = Template::parse(source)?;
    Ok(template.render(event)?)
}

pub fn handle_github_event(
    event: &NormalizedEvent,
    custom_template: Option<&str>,
) -> Result<Response, RenderError> {
    let message = render(event, custom_template)?;

    let mut buttons = vec![Button {
        text: event.button_label().to_owned(),
        url: event.relevant_url().to_owned(),
    }];
    buttons.extend(event.linked_issues().into_iter().map(|issue| Button {
        text: issue.text,
        url: issue.url,
    }));

    info!(
        "rendered {}:{} notification ({} characters, {} buttons)",
        event.event_name,
        event.action,
        message.chars().count(),
        buttons.len()
    );

    Ok(Response { message, buttons })
}

impl FieldSource for NormalizedEvent {
    fn field(&self, path: &str) -> Option<Value<'_>> {
        let pr = &self.pull_request;

        let value = match path {
            "event" => Value::Text(self.event_name.as_str()),
            "action" => Value::Text(&self.action),
            "merged" => Value::Bool(self.is_merged()),
            "url" => Value::Text(self.relevant_url()),

            "actor" | "actor.login" => Value::Text(&self.actor.login),
            "actor.url" => Value::Text(&self.actor.url),

            "repo" | "repo.name" => Value::Text(&self.repo.full_name),
            "repo.url" => Value::Text(&self.repo.url),

            "number" | "pr.number" => Value::Number(pr.number),
            "title" | "pr.title" => Value::Text(&pr.title),
            "pr.url" => Value::Text(&pr.url),
            "pr.body" => Value::Text(&pr.body),
            "pr.draft" => Value::Bool(pr.draft),
            "pr.merged" => Value::Bool(pr.merged),
            "pr.base" => Value::Text(&pr.base_ref),
            "pr.head" => Value::Text(&pr.head_ref),

            "review.state" => Value::Text(&self.review.state),
            "review.body" => Value::Text(&self.review.body),
            "review.url" => Value::Text(&self.review.url),

            "comment.body" => Value::Text(&self.comment.body),
            "comment.url" => Value::Text(&self.comment.url),
            "comment.path" => Value::Text(&self.comment.path),

            _ => return None,
        };

        Some(value)
    }
}
