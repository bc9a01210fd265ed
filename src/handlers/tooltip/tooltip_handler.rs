use std::sync::LazyLock;

use crate::handlers::identity::UserId;
use crate::handlers::tooltip::graphql_client::{GraphQlError, QueryOutcome, query};
use crate::models::AppState;
use crate::models::tooltip::{Tooltip, TooltipQuery};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

static PULL_REQUEST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([A-Za-z0-9_.\-]+)/([A-Za-z0-9_.\-]+)/pull/([0-9]+)/?$")
        .expect("pull request URL pattern is valid")
});

// `organization` is an alias so user-owned repositories resolve too while the
// payload keeps the shape the tooltip renderer reads.
const PULL_REQUEST_QUERY: &str = r#"query($owner: String!, $repo: String!, $number: Int!) {
  organization: repositoryOwner(login: $owner) {
    login
    repository(name: $repo) {
      name
      pullRequest(number: $number) {
        author {
          avatarUrl
          login
        }
        baseRef {
          name
        }
        commits(last: 1) {
          nodes {
            commit {
              status {
                contexts {
                  context
                  state
                }
              }
            }
          }
        }
        labels(first: 100) {
          nodes {
            color
            name
          }
        }
        reviewRequests(first: 100) {
          nodes {
            requestedReviewer {
              ... on User {
                avatarUrl
                login
              }
            }
          }
        }
        assignees(first: 100) {
          nodes {
            avatarUrl
            login
          }
        }
        state
        title
      }
    }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestLocator {
    pub owner: String,
    pub repo: String,
    /// GraphQL `Int` is 32-bit signed, so larger numbers never resolve.
    pub number: i32,
}

impl PullRequestLocator {
    /// `None` for anything that is not a github.com pull request URL.
    pub fn parse(url: &str) -> Option<Self> {
        let captures = PULL_REQUEST_URL.captures(url)?;
        Some(Self {
            owner: captures[1].to_string(),
            repo: captures[2].to_string(),
            number: captures[3].parse().ok()?,
        })
    }

    pub fn variables(&self) -> Value {
        json!({
            "owner": self.owner,
            "repo": self.repo,
            "number": self.number,
        })
    }
}

/// `Ok(None)` means the URL is not one we render a tooltip for.
pub async fn resolve(
    app_state: &AppState,
    user_id: &UserId,
    url: &str,
) -> Result<Option<Tooltip>, GraphQlError> {
    let Some(locator) = PullRequestLocator::parse(url) else {
        return Ok(None);
    };
    debug!(
        owner = %locator.owner,
        repo = %locator.repo,
        number = locator.number,
        "resolving pull request tooltip"
    );

    let variables = locator.variables();
    let tooltip = match query(app_state, user_id, PULL_REQUEST_QUERY, Some(&variables)).await? {
        QueryOutcome::Unauthenticated => Tooltip::authentication_required(),
        QueryOutcome::Data(data) => Tooltip::pull_request(data),
    };
    Ok(Some(tooltip))
}

pub async fn tooltip_handler(
    user_id: UserId,
    State(app_state): State<AppState>,
    Query(params): Query<TooltipQuery>,
) -> Result<Response, GraphQlError> {
    let url = params.url.unwrap_or_default();
    match resolve(&app_state, &user_id, &url).await? {
        Some(tooltip) => Ok(Json(tooltip).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::identity::USER_ID_HEADER;
    use crate::handlers::router;
    use crate::models::app_config::test_support::{configured, state_for, state_with_store};
    use crate::models::tooltip::TooltipKind;
    use crate::store::{FailingStore, access_token_key};
    use std::sync::Arc;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user() -> UserId {
        UserId("u1".to_string())
    }

    #[test]
    fn test_parse_extracts_owner_repo_number() {
        let locator = PullRequestLocator::parse("https://github.com/acme/widgets/pull/42").unwrap();

        assert_eq!(
            locator,
            PullRequestLocator {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                number: 42,
            }
        );
        assert_eq!(
            locator.variables(),
            json!({"owner": "acme", "repo": "widgets", "number": 42})
        );
    }

    #[test]
    fn test_parse_accepts_trailing_slash_and_punctuated_names() {
        let locator =
            PullRequestLocator::parse("https://github.com/my-org.io/repo_name.rs/pull/7/").unwrap();

        assert_eq!(locator.owner, "my-org.io");
        assert_eq!(locator.repo, "repo_name.rs");
        assert_eq!(locator.number, 7);
    }

    #[test]
    fn test_parse_rejects_non_pull_request_urls() {
        let rejected = [
            "",
            "https://github.com/acme/widgets",
            "https://github.com/acme/widgets/issues/42",
            "https://github.com/acme/widgets/pull/42/files",
            "https://github.com/acme/widgets/pull/abc",
            "http://github.com/acme/widgets/pull/42",
            "https://gitlab.com/acme/widgets/pull/42",
            "https://githubxcom/acme/widgets/pull/42",
            "https://github.com/acme/wid gets/pull/42",
            " https://github.com/acme/widgets/pull/42",
            "https://github.com/acme/widgets/pull/2147483648",
            "https://github.com/acme/widgets/pull/99999999999999999999999",
        ];

        for url in rejected {
            assert!(PullRequestLocator::parse(url).is_none(), "{url} should not match");
        }
    }

    #[test]
    fn test_parse_accepts_largest_graphql_int() {
        let locator =
            PullRequestLocator::parse("https://github.com/acme/widgets/pull/2147483647").unwrap();

        assert_eq!(locator.number, i32::MAX);
    }

    #[tokio::test]
    async fn test_resolve_unmatched_url_is_none() {
        let app_state = state_for("http://127.0.0.1:1", configured());

        let result = resolve(&app_state, &user(), "https://example.com").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_resolve_without_token_requires_authentication() {
        let app_state = state_for("http://127.0.0.1:1", configured());

        let tooltip = resolve(&app_state, &user(), "https://github.com/acme/widgets/pull/42")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tooltip, Tooltip::authentication_required());
    }

    #[tokio::test]
    async fn test_resolve_fetches_pull_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": {"owner": "acme", "repo": "widgets", "number": 42}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"organization": {"login": "acme"}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let app_state = state_for(&server.uri(), configured());
        app_state
            .store
            .set(&access_token_key("u1"), b"tok".to_vec())
            .await
            .unwrap();

        let tooltip = resolve(&app_state, &user(), "https://github.com/acme/widgets/pull/42")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tooltip.kind, TooltipKind::PullRequest);
        assert_eq!(tooltip.data, Some(json!({"organization": {"login": "acme"}})));
    }

    async fn get(app_state: AppState, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .uri(uri)
            .header(USER_ID_HEADER, "u1")
            .body(Body::empty())
            .unwrap();
        let response = router(app_state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_handler_not_found_for_unknown_or_missing_url() {
        let app_state = state_for("http://127.0.0.1:1", configured());

        let (status, _) = get(app_state.clone(), "/tooltip?url=https%3A%2F%2Fexample.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(
            app_state.clone(),
            "/tooltip?url=https%3A%2F%2Fgithub.com%2Facme%2Fwidgets%2Fpull%2F4294967296",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(app_state, "/tooltip").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_authentication_required_body() {
        let app_state = state_for("http://127.0.0.1:1", configured());

        let (status, body) = get(
            app_state,
            "/tooltip?url=https%3A%2F%2Fgithub.com%2Facme%2Fwidgets%2Fpull%2F42",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"type": "AuthenticationRequired", "data": null}));
    }

    #[tokio::test]
    async fn test_handler_upstream_failure_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": null, "errors": [{"message": "x"}]})),
            )
            .mount(&server)
            .await;
        let app_state = state_for(&server.uri(), configured());
        app_state
            .store
            .set(&access_token_key("u1"), b"tok".to_vec())
            .await
            .unwrap();

        let (status, _) = get(
            app_state,
            "/tooltip?url=https%3A%2F%2Fgithub.com%2Facme%2Fwidgets%2Fpull%2F42",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_handler_token_read_failure_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let app_state = state_with_store(
            &server.uri(),
            configured(),
            Arc::new(FailingStore::failing_get("gh-access-token:")),
        );

        let (status, _) = get(
            app_state,
            "/tooltip?url=https%3A%2F%2Fgithub.com%2Facme%2Fwidgets%2Fpull%2F42",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
