use std::{fmt, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, trace};

pub mod events;
use events::{PullRequestEvent, PullRequestReviewCommentEvent, PullRequestReviewEvent};

mod normalized;
pub use normalized::*;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parsing {shape}")]
    MalformedPayload {
        shape: &'static str,
        source: serde_json::Error,
    },
    #[error("missing event payload")]
    MissingEventBody,
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),
}

/// Top-level structure of the `toJSON(github)` context handed to the action.
#[derive(Debug, Deserialize)]
struct GitHubContext {
    #[serde(default)]
    event_name: String,
    #[serde(default)]
    event: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubEventType {
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
}

impl GitHubEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::PullRequestReviewComment => "pull_request_review_comment",
        }
    }
}

impl FromStr for GitHubEventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull_request" => Ok(Self::PullRequest),
            "pull_request_review" => Ok(Self::PullRequestReview),
            "pull_request_review_comment" => Ok(Self::PullRequestReviewComment),
            other => Err(ParseError::UnsupportedEvent(other.to_owned())),
        }
    }
}

impl fmt::Display for GitHubEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum GitHubEvent {
    PullRequest(PullRequestEvent),
    PullRequestReview(PullRequestReviewEvent),
    PullRequestReviewComment(PullRequestReviewCommentEvent),
}

impl GitHubEvent {
    /// Decodes a wrapped webhook context into the payload shape matching its event name.
    pub fn from_context(raw: &[u8]) -> Result<Self, ParseError> {
        let context: GitHubContext =
            serde_json::from_slice(raw).map_err(|source| ParseError::MalformedPayload {
                shape: "github context",
                source,
            })?;

        let body = match context.event {
            Some(serde_json::Value::Null) | None => return Err(ParseError::MissingEventBody),
            Some(body) => body,
        };

        let event_type: GitHubEventType = context.event_name.parse()?;
        debug!("received {} event", event_type);

        let event = match event_type {
            GitHubEventType::PullRequest => {
                Self::PullRequest(decode_body(body, "pull_request event")?)
            }
            GitHubEventType::PullRequestReview => {
                Self::PullRequestReview(decode_body(body, "pull_request_review event")?)
            }
            GitHubEventType::PullRequestReviewComment => Self::PullRequestReviewComment(
                decode_body(body, "pull_request_review_comment event")?,
            ),
        };

        Ok(event)
    }

    /// Flattens the payload into the uniform view used by templates.
    pub fn normalize(self) -> NormalizedEvent {
        match self {
            Self::PullRequest(event) => NormalizedEvent {
                event_name: GitHubEventType::PullRequest,
                action: event.action,
                actor: event.sender.into(),
                repo: event.repository.into(),
                pull_request: event.pull_request.into(),
                review: ReviewInfo::default(),
                comment: CommentInfo::default(),
            },
            Self::PullRequestReview(event) => {
                // a submitted review is only interesting through its verdict
                let action = if event.action == "submitted" {
                    trace!("replacing `submitted` action with `{}`", event.review.state);
                    event.review.state.clone()
                } else {
                    event.action
                };

                NormalizedEvent {
                    event_name: GitHubEventType::PullRequestReview,
                    action,
                    actor: event.sender.into(),
                    repo: event.repository.into(),
                    pull_request: event.pull_request.into(),
                    review: event.review.into(),
                    comment: CommentInfo::default(),
                }
            }
            Self::PullRequestReviewComment(event) => NormalizedEvent {
                event_name: GitHubEventType::PullRequestReviewComment,
                action: event.action,
                actor: event.sender.into(),
                repo: event.repository.into(),
                pull_request: event.pull_request.into(),
                review: ReviewInfo::default(),
                comment: event.comment.into(),
            },
        }
    }
}

fn decode_body<T: DeserializeOwned>(
    body: serde_json::Value,
    shape: &'static str,
) -> Result<T, ParseError> {
    serde_json::from_value(body).map_err(|source| ParseError::MalformedPayload { shape, source })
}

/// Parses the raw `toJSON(github)` context into a [`NormalizedEvent`].
pub fn parse(raw: &[u8]) -> Result<NormalizedEvent, ParseError> {
    GitHubEvent::from_context(raw).map(GitHubEvent::normalize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> &'static str {
        match name {
            "opened" => include_str!("../../testdata/pull_request_opened.json"),
            "merged" => include_str!("../../testdata/pull_request_closed_merged.json"),
            "review" => include_str!("../../testdata/pull_request_review_approved.json"),
            "comment" => include_str!("../../testdata/pull_request_review_comment_created.json"),
            _ => unreachable!("unknown fixture {}", name),
        }
    }

    #[test]
    fn test_parse_pull_request_opened() {
        let event = parse(fixture("opened").as_bytes()).unwrap();

        assert_eq!(event.event_name, GitHubEventType::PullRequest);
        assert_eq!(event.action, "opened");
        assert_eq!(event.actor.login, "octocat");
        assert_eq!(event.actor.url, "https://github.com/octocat");
        assert_eq!(event.repo.full_name, "octocat/Hello-World");
        assert_eq!(event.repo.url, "https://github.com/octocat/Hello-World");

        let pr = &event.pull_request;
        assert_eq!(pr.number, 42);
        assert_eq!(pr.title, "Add new feature");
        assert_eq!(pr.url, "https://github.com/octocat/Hello-World/pull/42");
        assert_eq!(pr.body, "This adds a shiny new feature.");
        assert_eq!(pr.base_ref, "main");
        assert_eq!(pr.head_ref, "feature-branch");
        assert!(!pr.draft);
        assert!(!pr.merged);

        assert_eq!(event.review, ReviewInfo::default());
        assert_eq!(event.comment, CommentInfo::default());
        assert!(!event.is_merged());
    }

    #[test]
    fn test_parse_pull_request_merged() {
        let event = parse(fixture("merged").as_bytes()).unwrap();

        assert_eq!(event.action, "closed");
        assert_eq!(event.actor.login, "hubot");
        // null body
        assert_eq!(event.pull_request.body, "");
        assert!(event.is_merged());
    }

    #[test]
    fn test_parse_review_replaces_submitted_action() {
        let event = parse(fixture("review").as_bytes()).unwrap();

        assert_eq!(event.event_name, GitHubEventType::PullRequestReview);
        assert_eq!(event.action, "approved");
        assert_eq!(event.review.state, "approved");
        assert_eq!(event.review.body, "LGTM!");
        assert_eq!(
            event.review.url,
            "https://github.com/octocat/Hello-World/pull/42#pullrequestreview-80"
        );
        assert!(!event.pull_request.merged);
    }

    #[test]
    fn test_parse_review_keeps_other_actions() {
        let payload = fixture("review").replace("\"submitted\"", "\"dismissed\"");
        let event = parse(payload.as_bytes()).unwrap();

        assert_eq!(event.action, "dismissed");
    }

    #[test]
    fn test_parse_review_comment() {
        let event = parse(fixture("comment").as_bytes()).unwrap();

        assert_eq!(event.event_name, GitHubEventType::PullRequestReviewComment);
        assert_eq!(event.action, "created");
        assert_eq!(event.comment.body, "This needs a fix");
        assert_eq!(event.comment.path, "src/main.rs");
        assert_eq!(
            event.comment.url,
            "https://github.com/octocat/Hello-World/pull/42#discussion_r2"
        );
        assert!(event.pull_request.draft);
        assert_eq!(event.review, ReviewInfo::default());
    }

    #[test]
    fn test_parse_review_without_link() {
        let payload = fixture("review").replace(
            r#""html_url": "https://github.com/octocat/Hello-World/pull/42#pullrequestreview-80","#,
            "",
        );
        let event = parse(payload.as_bytes()).unwrap();

        assert_eq!(event.review.url, "");
        assert_eq!(
            event.relevant_url(),
            "https://github.com/octocat/Hello-World/pull/42"
        );
    }

    #[test]
    fn test_parse_invalid_link() {
        let payload = fixture("opened").replace(
            r#""https://github.com/octocat/Hello-World/pull/42""#,
            r#""not a url""#,
        );
        let err = parse(payload.as_bytes()).unwrap_err();

        assert!(matches!(
            err,
            ParseError::MalformedPayload {
                shape: "pull_request event",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse(b"not json").unwrap_err();

        assert!(matches!(
            err,
            ParseError::MalformedPayload {
                shape: "github context",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unsupported_event() {
        let err = parse(br#"{"event_name": "push", "event": {}}"#).unwrap_err();

        match err {
            ParseError::UnsupportedEvent(name) => assert_eq!(name, "push"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_event() {
        let err = parse(br#"{"event_name": "pull_request"}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingEventBody));

        let err = parse(br#"{"event_name": "pull_request", "event": null}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingEventBody));
    }

    #[test]
    fn test_parse_malformed_body_names_shape() {
        let err = parse(br#"{"event_name": "pull_request_review", "event": {"action": 3}}"#)
            .unwrap_err();

        assert!(matches!(
            err,
            ParseError::MalformedPayload {
                shape: "pull_request_review event",
                ..
            }
        ));
        assert_eq!(err.to_string(), "parsing pull_request_review event");
    }
}
