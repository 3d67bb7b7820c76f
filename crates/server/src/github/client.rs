// GitHub REST implementation of `VersionControlClient`.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use subsync_common::types::{BranchHead, CommitObject, RefUpdate, TreeEntry, TreeObject};
use tracing::debug;
use url::Url;

use super::{VcsError, VcsResult, VersionControlClient};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("subsync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    tree: ShaRef,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    sha: String,
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaRef,
    #[serde(default)]
    parents: Vec<ShaRef>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: ShaRef,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for one owner's repositories on a GitHub (or Enterprise) host.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: Url,
    owner: String,
    token: String,
}

impl GithubClient {
    pub fn new(
        base_url: Url,
        owner: impl Into<String>,
        token: impl Into<String>,
    ) -> VcsResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(VcsError::Validation {
                message: format!("api base url `{base_url}` cannot hold a path"),
            });
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| VcsError::transport(error.to_string()))?;
        Ok(Self { http, base_url, owner: owner.into(), token: token.into() })
    }

    /// `{base}/repos/{owner}/{repo}/{segments...}`, each segment percent-encoded.
    fn repo_url<'a>(&self, repo: &str, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["repos", self.owner.as_str(), repo]).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> VcsResult<Response> {
        let response =
            request.send().await.map_err(|error| VcsError::transport(error.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        debug!(status = status.as_u16(), resource, message = %message, "github request failed");
        Err(VcsError::from_status(status.as_u16(), resource, message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> VcsResult<T> {
        self.send(request, resource)
            .await?
            .json::<T>()
            .await
            .map_err(|error| VcsError::Decode(format!("{resource}: {error}")))
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| if text.trim().is_empty() { status.to_string() } else { text }),
        Err(error) => error.to_string(),
    }
}

/// GitHub answers a non-forced, non-fast-forward ref update with 422 and
/// "Update is not a fast forward".
fn is_fast_forward_rejection(message: &str) -> bool {
    message.to_ascii_lowercase().contains("fast forward")
}

#[async_trait]
impl VersionControlClient for GithubClient {
    async fn read_branch_head(&self, repo: &str, branch: &str) -> VcsResult<BranchHead> {
        let url = self.repo_url(repo, ["branches", branch]);
        let resource = format!("branch {repo}:{branch}");
        let body: BranchResponse = self.send_json(self.request(Method::GET, url), &resource).await?;
        Ok(BranchHead { commit_sha: body.commit.sha, tree_sha: body.commit.commit.tree.sha })
    }

    async fn create_tree(
        &self,
        repo: &str,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> VcsResult<TreeObject> {
        let url = self.repo_url(repo, ["git", "trees"]);
        let request = self.request(Method::POST, url).json(&json!({
            "base_tree": base_tree_sha,
            "tree": entries,
        }));
        let body: TreeResponse = self.send_json(request, &format!("tree in {repo}")).await?;
        Ok(TreeObject { sha: body.sha, entries: body.tree })
    }

    async fn create_commit(
        &self,
        repo: &str,
        tree_sha: &str,
        parent_sha: &str,
        message: &str,
    ) -> VcsResult<CommitObject> {
        let url = self.repo_url(repo, ["git", "commits"]);
        let request = self.request(Method::POST, url).json(&json!({
            "message": message,
            "tree": tree_sha,
            "parents": [parent_sha],
        }));
        let body: CommitResponse = self.send_json(request, &format!("commit in {repo}")).await?;
        let parent_sha = body
            .parents
            .into_iter()
            .next()
            .map(|parent| parent.sha)
            .unwrap_or_else(|| parent_sha.to_string());
        let message = if body.message.is_empty() { message.to_string() } else { body.message };
        Ok(CommitObject { sha: body.sha, tree_sha: body.tree.sha, parent_sha, message })
    }

    async fn update_ref(&self, repo: &str, branch: &str, new_sha: &str) -> VcsResult<RefUpdate> {
        // Ref names keep their slashes: refs/heads/release/1.x
        let segments = ["git", "refs", "heads"].into_iter().chain(branch.split('/'));
        let url = self.repo_url(repo, segments);
        let request = self.request(Method::PATCH, url).json(&json!({
            "sha": new_sha,
            "force": false,
        }));
        let resource = format!("ref {repo}:refs/heads/{branch}");

        match self.send_json::<RefResponse>(request, &resource).await {
            Ok(body) => Ok(RefUpdate::Updated { sha: body.object.sha }),
            Err(VcsError::Validation { message }) if is_fast_forward_rejection(&message) => {
                Ok(RefUpdate::Rejected { reason: message })
            }
            Err(error) => Err(error),
        }
    }
}
