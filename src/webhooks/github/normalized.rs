use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::webhooks::github::{
    events::{GitHubUser, PullRequest, Repository, Review, ReviewComment},
    GitHubEventType,
};

// GitHub closing keywords, see
// https://docs.github.com/en/issues/tracking-your-work-with-issues/linking-a-pull-request-to-an-issue
// Word boundaries, spaces and digits are ASCII-only.
static LINKED_ISSUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?-u:\b)(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?|refs?):?(?-u:\s)+#([0-9]+)(?-u:\b)")
        .expect("linked issue pattern is valid")
});

/// Flattened view of a pull request related event, whatever the shape of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub event_name: GitHubEventType,
    /// For reviews, a `submitted` action is replaced by the review state.
    pub action: String,
    pub actor: Actor,
    pub repo: Repo,
    pub pull_request: PullRequestInfo,
    /// Empty unless this is a review event.
    pub review: ReviewInfo,
    /// Empty unless this is a review comment event.
    pub comment: CommentInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub login: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repo {
    pub full_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub body: String,
    pub draft: bool,
    pub merged: bool,
    pub base_ref: String,
    pub head_ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewInfo {
    pub state: String,
    pub body: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentInfo {
    pub body: String,
    pub url: String,
    pub path: String,
}

/// An issue referenced by a closing keyword in the pull request description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLink {
    pub text: String,
    pub url: String,
}

impl NormalizedEvent {
    /// A pull request closed through a merge.
    pub fn is_merged(&self) -> bool {
        self.event_name == GitHubEventType::PullRequest
            && self.action == "closed"
            && self.pull_request.merged
    }

    /// The review or comment URL when the event has one, the pull request URL otherwise.
    pub fn relevant_url(&self) -> &str {
        let url = match self.event_name {
            GitHubEventType::PullRequest => "",
            GitHubEventType::PullRequestReview => &self.review.url,
            GitHubEventType::PullRequestReviewComment => &self.comment.url,
        };

        if url.is_empty() {
            &self.pull_request.url
        } else {
            url
        }
    }

    pub fn button_label(&self) -> &'static str {
        match self.event_name {
            GitHubEventType::PullRequest => "View Pull Request",
            GitHubEventType::PullRequestReview => "View Review",
            GitHubEventType::PullRequestReviewComment => "View Comment",
        }
    }

    /// Issues the pull request body closes or references, in order of first mention.
    pub fn linked_issues(&self) -> Vec<IssueLink> {
        let body = &self.pull_request.body;
        if body.is_empty() || self.repo.url.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        LINKED_ISSUE_PATTERN
            .captures_iter(body)
            .filter_map(|captures| captures[1].parse::<u64>().ok())
            .filter(|number| seen.insert(*number))
            .map(|number| IssueLink {
                text: format!("Issue #{}", number),
                url: format!("{}/issues/{}", self.repo.url, number),
            })
            .collect()
    }
}

/// Links missing from the payload are kept empty, the fallbacks above handle them.
fn url_string(url: Option<Url>) -> String {
    url.map(String::from).unwrap_or_default()
}

impl From<GitHubUser> for Actor {
    fn from(user: GitHubUser) -> Self {
        Self {
            login: user.login,
            url: url_string(user.html_url),
        }
    }
}

impl From<Repository> for Repo {
    fn from(repo: Repository) -> Self {
        Self {
            full_name: repo.full_name,
            url: url_string(repo.html_url),
        }
    }
}

impl From<PullRequest> for PullRequestInfo {
    fn from(pr: PullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            url: pr.html_url.into(),
            body: pr.body.unwrap_or_default(),
            draft: pr.draft,
            merged: pr.merged.unwrap_or(false),
            base_ref: pr.base.r#ref,
            head_ref: pr.head.r#ref,
        }
    }
}

impl From<Review> for ReviewInfo {
    fn from(review: Review) -> Self {
        Self {
            state: review.state,
            body: review.body.unwrap_or_default(),
            url: url_string(review.html_url),
        }
    }
}

impl From<ReviewComment> for CommentInfo {
    fn from(comment: ReviewComment) -> Self {
        Self {
            body: comment.body,
            url: url_string(comment.html_url),
            path: comment.path.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_event, REPO_URL};

    fn with_body(body: &str) -> NormalizedEvent {
        let mut event = sample_event();
        event.pull_request.body = body.to_string();
        event
    }

    fn issue_texts(body: &str) -> Vec<String> {
        with_body(body)
            .linked_issues()
            .into_iter()
            .map(|link| link.text)
            .collect()
    }

    #[test]
    fn test_is_merged() {
        let cases = [
            (GitHubEventType::PullRequest, "closed", true, true),
            (GitHubEventType::PullRequest, "closed", false, false),
            (GitHubEventType::PullRequest, "opened", true, false),
            (GitHubEventType::PullRequest, "merged", true, false),
            (GitHubEventType::PullRequestReview, "closed", true, false),
            (GitHubEventType::PullRequestReviewComment, "closed", true, false),
        ];

        for (event_name, action, merged, expected) in cases {
            let mut event = sample_event();
            event.event_name = event_name;
            event.action = action.to_string();
            event.pull_request.merged = merged;

            assert_eq!(
                event.is_merged(),
                expected,
                "{}:{} merged={}",
                event_name,
                action,
                merged
            );
        }
    }

    #[test]
    fn test_relevant_url() {
        let pr_url = "https://x/pr/1";

        let mut event = sample_event();
        event.pull_request.url = pr_url.to_string();
        assert_eq!(event.relevant_url(), pr_url);

        event.event_name = GitHubEventType::PullRequestReview;
        assert_eq!(event.relevant_url(), pr_url);
        event.review.url = "https://x/pr/1#review-1".to_string();
        assert_eq!(event.relevant_url(), "https://x/pr/1#review-1");

        event.event_name = GitHubEventType::PullRequestReviewComment;
        assert_eq!(event.relevant_url(), pr_url);
        event.comment.url = "https://x/pr/1#discussion_r1".to_string();
        assert_eq!(event.relevant_url(), "https://x/pr/1#discussion_r1");

        // a review URL is ignored on plain pull request events
        event.event_name = GitHubEventType::PullRequest;
        assert_eq!(event.relevant_url(), pr_url);
    }

    #[test]
    fn test_button_label() {
        let mut event = sample_event();
        assert_eq!(event.button_label(), "View Pull Request");

        event.event_name = GitHubEventType::PullRequestReview;
        assert_eq!(event.button_label(), "View Review");

        event.event_name = GitHubEventType::PullRequestReviewComment;
        assert_eq!(event.button_label(), "View Comment");
    }

    #[test]
    fn test_linked_issues_in_order() {
        let links = with_body("Fixes #10 and resolves #20").linked_issues();

        assert_eq!(
            links,
            vec![
                IssueLink {
                    text: "Issue #10".to_string(),
                    url: format!("{}/issues/10", REPO_URL),
                },
                IssueLink {
                    text: "Issue #20".to_string(),
                    url: format!("{}/issues/20", REPO_URL),
                },
            ]
        );
    }

    #[test]
    fn test_linked_issues_deduplicated() {
        assert_eq!(issue_texts("Fixes #42\nAlso fixes #42"), vec!["Issue #42"]);
        assert_eq!(
            issue_texts("Refs #3, fixes #1 and closes #3"),
            vec!["Issue #3", "Issue #1"]
        );
    }

    #[test]
    fn test_linked_issues_all_keywords() {
        let body = "close #1\ncloses #2\nclosed #3\nfix #4\nfixes #5\nfixed #6\nresolve #7\nresolves #8\nresolved #9";
        let expected: Vec<String> = (1..=9).map(|n| format!("Issue #{}", n)).collect();

        assert_eq!(issue_texts(body), expected);
    }

    #[test]
    fn test_linked_issues_variants() {
        assert_eq!(
            issue_texts("CLOSES #5\nFIXES #6\nRESOLVES #7"),
            vec!["Issue #5", "Issue #6", "Issue #7"]
        );
        assert_eq!(
            issue_texts("Closes: #11\nFixes: #12"),
            vec!["Issue #11", "Issue #12"]
        );
        assert_eq!(
            issue_texts("Refs #113\nRef #50"),
            vec!["Issue #113", "Issue #50"]
        );
    }

    #[test]
    fn test_linked_issues_rejects_partial_matches() {
        assert!(issue_texts("Fixes #123abc").is_empty());
        assert!(issue_texts("prefix #4").is_empty());
        assert!(issue_texts("Just a regular PR body").is_empty());
        // the number does not fit an issue id
        assert!(issue_texts("fixes #99999999999999999999999").is_empty());
    }

    #[test]
    fn test_linked_issues_ascii_boundaries() {
        assert_eq!(issue_texts("Fixes #12é"), vec!["Issue #12"]);
        assert_eq!(issue_texts("éfixes #4"), vec!["Issue #4"]);
        // no-break space
        assert!(issue_texts("fixes\u{a0}#5").is_empty());
    }

    #[test]
    fn test_linked_issues_needs_body_and_repo() {
        assert!(with_body("").linked_issues().is_empty());

        let mut event = with_body("Fixes #1");
        event.repo.url = String::new();
        assert!(event.linked_issues().is_empty());
    }

    #[test]
    fn test_linked_issues_from_fixture() {
        let payload = include_str!("../../../testdata/pull_request_opened_with_issue.json");
        let event = crate::webhooks::github::parse(payload.as_bytes()).unwrap();

        assert_eq!(
            event.linked_issues(),
            vec![IssueLink {
                text: "Issue #15".to_string(),
                url: format!("{}/issues/15", REPO_URL),
            }]
        );
    }
}
