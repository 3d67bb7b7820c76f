// GitHub `push` webhook payload.
//
// Only the fields needed to route a push are decoded; everything else in the
// delivery is ignored.

use serde::Deserialize;
use thiserror::Error;

use crate::types::PushNotification;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("push payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("push payload field `{0}` is empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    before: String,
    after: String,
    repository: PushRepository,
}

#[derive(Debug, Deserialize)]
struct PushRepository {
    name: String,
    full_name: String,
}

/// Decode a raw push delivery body into a [`PushNotification`].
pub fn decode_push(body: &[u8]) -> Result<PushNotification, PayloadError> {
    let payload: PushPayload = serde_json::from_slice(body)?;

    let notification = PushNotification {
        source_repo_full_name: payload.repository.full_name,
        source_repo_short_name: payload.repository.name,
        git_ref: payload.git_ref,
        before_sha: payload.before,
        after_sha: payload.after,
    };

    for (field, value) in [
        ("repository.name", &notification.source_repo_short_name),
        ("repository.full_name", &notification.source_repo_full_name),
        ("ref", &notification.git_ref),
        ("after", &notification.after_sha),
    ] {
        if value.trim().is_empty() {
            return Err(PayloadError::EmptyField(field));
        }
    }

    Ok(notification)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn decodes_github_push_payload() {
        let raw = body(json!({
            "ref": "refs/heads/main",
            "before": "aaa111",
            "after": "bbb222",
            "created": false,
            "deleted": false,
            "repository": {
                "id": 1296269,
                "name": "lib",
                "full_name": "acme/lib",
                "owner": { "login": "acme" }
            },
            "pusher": { "name": "octocat" },
            "commits": []
        }));

        let push = decode_push(&raw).expect("payload should decode");
        assert_eq!(
            push,
            PushNotification {
                source_repo_full_name: "acme/lib".into(),
                source_repo_short_name: "lib".into(),
                git_ref: "refs/heads/main".into(),
                before_sha: "aaa111".into(),
                after_sha: "bbb222".into(),
            }
        );
    }

    #[test]
    fn missing_repository_is_an_error() {
        let raw = body(json!({ "ref": "refs/heads/main", "before": "a", "after": "b" }));
        assert!(matches!(decode_push(&raw), Err(PayloadError::Json(_))));
    }

    #[test]
    fn empty_after_is_rejected() {
        let raw = body(json!({
            "ref": "refs/heads/main",
            "before": "aaa111",
            "after": "",
            "repository": { "name": "lib", "full_name": "acme/lib" }
        }));
        assert!(matches!(decode_push(&raw), Err(PayloadError::EmptyField("after"))));
    }

    #[test]
    fn garbage_body_is_rejected() {
        assert!(decode_push(b"not json").is_err());
    }
}
