//! Shared builders for unit tests.

use crate::webhooks::github::{
    Actor, CommentInfo, GitHubEventType, NormalizedEvent, PullRequestInfo, Repo, ReviewInfo,
};

pub const REPO_URL: &str = "https://github.com/octocat/Hello-World";

/// A freshly opened pull request by `octocat`, without body.
pub fn sample_event() -> NormalizedEvent {
    NormalizedEvent {
        event_name: GitHubEventType::PullRequest,
        action: "opened".to_string(),
        actor: Actor {
            login: "octocat".to_string(),
            url: "https://github.com/octocat".to_string(),
        },
        repo: Repo {
            full_name: "octocat/Hello-World".to_string(),
            url: REPO_URL.to_string(),
        },
        pull_request: PullRequestInfo {
            number: 42,
            title: "Add new feature".to_string(),
            url: format!("{}/pull/42", REPO_URL),
            head_ref: "feature-branch".to_string(),
            base_ref: "main".to_string(),
            ..Default::default()
        },
        review: ReviewInfo::default(),
        comment: CommentInfo::default(),
    }
}

/// [`sample_event`] turned into a submitted review with the given verdict.
pub fn sample_review(state: &str, body: &str) -> NormalizedEvent {
    let mut event = sample_event();
    event.event_name = GitHubEventType::PullRequestReview;
    event.action = state.to_string();
    event.review = ReviewInfo {
        state: state.to_string(),
        body: body.to_string(),
        url: format!("{}/pull/42#pullrequestreview-1", REPO_URL),
    };
    event
}
