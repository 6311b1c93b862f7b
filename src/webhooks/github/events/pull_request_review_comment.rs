use serde::Deserialize;
use url::Url;

use crate::webhooks::github::events::{GitHubUser, PullRequest, Repository};

#[derive(Debug, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    pub repository: Repository,
    pub sender: GitHubUser,
    pub pull_request: PullRequest,
    pub action: String,
    pub comment: ReviewComment,
}

#[derive(Debug, Deserialize)]
pub struct ReviewComment {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub html_url: Option<Url>,
    pub path: Option<String>,
}
