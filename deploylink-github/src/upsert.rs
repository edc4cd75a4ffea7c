//! Append-or-create for the bot's deployment comment.
use deploylink_common::{Target, short_sha};
use deploylink_links::contains_link;

use crate::client::CommentsApi;
use crate::error::GithubError;
use crate::types::RepoRef;

/// Right-aligned link labelled with the short SHA.
///
/// ```
/// use deploylink_github::deployment_fragment;
///
/// assert_eq!(
///     deployment_fragment("https://abc.pages.dev", "0123456789abcdef"),
///     r#"<div align="right"><a href="https://abc.pages.dev"><code>0123456</code></a></div>"#
/// );
/// ```
pub fn deployment_fragment(deployment_link: &str, commit_sha: &str) -> String {
    format!(
        r#"<div align="right"><a href="{deployment_link}"><code>{}</code></a></div>"#,
        short_sha(commit_sha)
    )
}

#[derive(Debug, Clone, Copy)]
pub struct UpsertPolicy {
    /// Comments authored by this account id are ours to extend.
    pub bot_user_id: u64,
    /// Consult the extracted links of the bot comment before appending.
    pub skip_duplicate_links: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The exact fragment is already in the commit comment.
    FragmentPresent,
    /// The deployment URL is already linked from the bot comment.
    LinkPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { id: u64 },
    Updated { id: u64 },
    Skipped { id: u64, reason: SkipReason },
}

pub async fn upsert_deployment_comment<A>(
    api: &A,
    repo: &RepoRef,
    target: &Target,
    deployment_link: &str,
    commit_sha: &str,
    policy: UpsertPolicy,
) -> Result<UpsertOutcome, GithubError>
where
    A: CommentsApi + ?Sized,
{
    let fragment = deployment_fragment(deployment_link, commit_sha);
    let comments = api.list_comments(repo, target).await?;

    let Some(existing) = comments
        .iter()
        .find(|c| c.author_id() == Some(policy.bot_user_id))
    else {
        let created = api.create_comment(repo, target, &fragment).await?;
        return Ok(UpsertOutcome::Created { id: created.id });
    };

    if matches!(target, Target::Commit { .. }) && existing.body.contains(&fragment) {
        return Ok(UpsertOutcome::Skipped {
            id: existing.id,
            reason: SkipReason::FragmentPresent,
        });
    }

    if policy.skip_duplicate_links && contains_link([existing.body.as_str()], deployment_link) {
        return Ok(UpsertOutcome::Skipped {
            id: existing.id,
            reason: SkipReason::LinkPresent,
        });
    }

    let body = format!("{}\n{}", existing.body, fragment);
    let updated = api
        .update_comment(repo, target, existing.id, &body)
        .await?;
    Ok(UpsertOutcome::Updated { id: updated.id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Comment, User};
    use async_trait::async_trait;
    use deploylink_http::HttpError;
    use std::sync::Mutex;

    const BOT: u64 = 165700353;
    const LINK: &str = "https://abc123.pages.dev";
    const SHA: &str = "abc1234def5678";

    #[derive(Default)]
    struct FakeComments {
        comments: Mutex<Vec<Comment>>,
        next_id: Mutex<u64>,
        fail_list: bool,
        writes: Mutex<Vec<(String, u64, String)>>,
    }

    impl FakeComments {
        fn with(comments: Vec<Comment>) -> Self {
            Self {
                comments: Mutex::new(comments),
                next_id: Mutex::new(1000),
                ..Default::default()
            }
        }

        fn writes(&self) -> Vec<(String, u64, String)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommentsApi for FakeComments {
        async fn list_comments(
            &self,
            _repo: &RepoRef,
            _target: &Target,
        ) -> Result<Vec<Comment>, GithubError> {
            if self.fail_list {
                return Err(HttpError::Network("connection reset".into()).into());
            }
            Ok(self.comments.lock().unwrap().clone())
        }

        async fn create_comment(
            &self,
            _repo: &RepoRef,
            _target: &Target,
            body: &str,
        ) -> Result<Comment, GithubError> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let comment = comment(*next, BOT, body);
            self.comments.lock().unwrap().push(comment.clone());
            self.writes
                .lock()
                .unwrap()
                .push(("create".into(), *next, body.into()));
            Ok(comment)
        }

        async fn update_comment(
            &self,
            _repo: &RepoRef,
            _target: &Target,
            comment_id: u64,
            body: &str,
        ) -> Result<Comment, GithubError> {
            self.writes
                .lock()
                .unwrap()
                .push(("update".into(), comment_id, body.into()));
            Ok(comment(comment_id, BOT, body))
        }
    }

    fn comment(id: u64, user_id: u64, body: &str) -> Comment {
        Comment {
            id,
            body: body.into(),
            user: Some(User {
                id: user_id,
                login: format!("user-{user_id}"),
            }),
        }
    }

    fn repo() -> RepoRef {
        RepoRef::new("acme", "site")
    }

    fn commit() -> Target {
        Target::Commit { sha: SHA.into() }
    }

    fn pr() -> Target {
        Target::PullRequest { number: 7 }
    }

    fn policy() -> UpsertPolicy {
        UpsertPolicy {
            bot_user_id: BOT,
            skip_duplicate_links: false,
        }
    }

    #[test]
    fn fragment_with_short_input_keeps_whole_sha() {
        assert_eq!(
            deployment_fragment("https://x.dev", "abc"),
            r#"<div align="right"><a href="https://x.dev"><code>abc</code></a></div>"#
        );
    }

    #[tokio::test]
    async fn creates_when_no_bot_comment() {
        let api = FakeComments::with(vec![comment(1, 42, "LGTM")]);
        let outcome = upsert_deployment_comment(&api, &repo(), &pr(), LINK, SHA, policy())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Created { id: 1001 });
        let writes = api.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].2, deployment_fragment(LINK, SHA));
    }

    #[tokio::test]
    async fn appends_to_first_bot_comment() {
        let api = FakeComments::with(vec![
            comment(1, 42, "human"),
            comment(2, BOT, "previous"),
            comment(3, BOT, "later"),
        ]);
        let outcome = upsert_deployment_comment(&api, &repo(), &pr(), LINK, SHA, policy())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated { id: 2 });
        let writes = api.writes();
        assert_eq!(writes[0].0, "update");
        assert_eq!(
            writes[0].2,
            format!("previous\n{}", deployment_fragment(LINK, SHA))
        );
    }

    #[tokio::test]
    async fn commit_skips_identical_fragment() {
        let api = FakeComments::with(vec![comment(5, BOT, &deployment_fragment(LINK, SHA))]);
        let outcome = upsert_deployment_comment(&api, &repo(), &commit(), LINK, SHA, policy())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Skipped {
                id: 5,
                reason: SkipReason::FragmentPresent
            }
        );
        assert!(api.writes().is_empty());
    }

    #[tokio::test]
    async fn pull_request_appends_even_when_fragment_present() {
        let api = FakeComments::with(vec![comment(5, BOT, &deployment_fragment(LINK, SHA))]);
        let outcome = upsert_deployment_comment(&api, &repo(), &pr(), LINK, SHA, policy())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated { id: 5 });
    }

    #[tokio::test]
    async fn link_dedup_is_opt_in() {
        // Same URL, different SHA: the fragments differ but the link repeats.
        let existing = deployment_fragment(LINK, "fff0000aaaa");
        let api = FakeComments::with(vec![comment(8, BOT, &existing)]);
        let outcome = upsert_deployment_comment(&api, &repo(), &commit(), LINK, SHA, policy())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { id: 8 });

        let api = FakeComments::with(vec![comment(8, BOT, &existing)]);
        let strict = UpsertPolicy {
            skip_duplicate_links: true,
            ..policy()
        };
        let outcome = upsert_deployment_comment(&api, &repo(), &pr(), LINK, SHA, strict)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            UpsertOutcome::Skipped {
                id: 8,
                reason: SkipReason::LinkPresent
            }
        );
    }

    #[tokio::test]
    async fn list_failures_propagate_to_caller() {
        let api = FakeComments {
            fail_list: true,
            ..Default::default()
        };
        let res = upsert_deployment_comment(&api, &repo(), &pr(), LINK, SHA, policy()).await;
        assert!(matches!(res, Err(GithubError::Http(HttpError::Network(_)))));
        assert!(api.writes().is_empty());
    }
}
