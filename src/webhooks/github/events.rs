use serde::Deserialize;
use url::Url;

mod pull_request;
mod pull_request_review;
mod pull_request_review_comment;

pub use pull_request::*;
pub use pull_request_review::*;
pub use pull_request_review_comment::*;

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub html_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: Url,
    pub title: String,
    // GitHub sends `null` for PRs opened without a description
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    pub merged: Option<bool>,
    pub base: PrRef,
    pub head: PrRef,
}

#[derive(Debug, Deserialize)]
pub struct PrRef {
    pub r#ref: String,
}
