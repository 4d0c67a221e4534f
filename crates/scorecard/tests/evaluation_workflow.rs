//! End-to-end evaluation workflow through the public router: draft, answer, submit, rank,
//! compare, and export.

mod common {
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use scorecard::rubric::{RubricTemplate, SUBCRITERIA_PER_CRITERION};

    pub(super) async fn send(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.expect("response")
    }

    pub(super) async fn json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    pub(super) async fn text_body(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
            .await
            .expect("read body");
        String::from_utf8(body.to_vec()).expect("utf-8 body")
    }

    pub(super) fn request(method: &str, uri: &str, token: Option<&str>, payload: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match payload {
            Some(payload) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    pub(super) async fn sign_up_and_login(router: &Router, username: &str) -> String {
        let response = send(
            router,
            request(
                "POST",
                "/api/v1/auth/signup",
                None,
                Some(json!({
                    "name": username,
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct horse",
                })),
            ),
        )
        .await;
        assert_eq!(response.status(), 201);

        let response = send(
            router,
            request(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": username, "password": "correct horse" })),
            ),
        )
        .await;
        assert_eq!(response.status(), 200);
        json_body(response).await["token"]
            .as_str()
            .expect("session token")
            .to_string()
    }

    /// Score every cell of every framework in a draft.
    pub(super) fn score_everything(frameworks: usize, score_for: impl Fn(usize, usize) -> u8) -> Value {
        let mut edits = Vec::new();
        for framework in 0..frameworks {
            for criterion in RubricTemplate::standard().criteria() {
                for subcriterion in 0..SUBCRITERIA_PER_CRITERION {
                    edits.push(json!({
                        "kind": "subcriterion_score",
                        "framework": framework,
                        "criterion": criterion.id,
                        "subcriterion": subcriterion,
                        "score": score_for(framework, subcriterion),
                    }));
                }
            }
        }
        json!({ "edits": edits })
    }

    pub(super) async fn submit_scored(
        router: &Router,
        token: &str,
        frameworks: &[&str],
        priority: &str,
        score_for: impl Fn(usize, usize) -> u8,
    ) -> Value {
        let response = send(
            router,
            request(
                "POST",
                "/api/v1/drafts",
                Some(token),
                Some(json!({ "frameworks": frameworks, "default_priority": priority })),
            ),
        )
        .await;
        assert_eq!(response.status(), 201);
        let id = json_body(response).await["id"].as_u64().expect("draft id");

        let response = send(
            router,
            request(
                "PATCH",
                &format!("/api/v1/drafts/{id}"),
                Some(token),
                Some(score_everything(frameworks.len(), score_for)),
            ),
        )
        .await;
        assert_eq!(response.status(), 200);
        let view = json_body(response).await;
        assert_eq!(view["complete"], true);

        let response = send(
            router,
            request("POST", &format!("/api/v1/drafts/{id}/submit"), Some(token), None),
        )
        .await;
        assert_eq!(response.status(), 201);
        json_body(response).await
    }
}

use std::sync::Arc;

use axum::http::StatusCode;
use scorecard::store::MemoryRecordStore;
use scorecard::{scorecard_router, ScorecardState};

use common::*;

fn router() -> axum::Router {
    scorecard_router(ScorecardState::new(Arc::new(MemoryRecordStore::default())))
}

#[tokio::test]
async fn evaluations_flow_from_draft_to_rankings() {
    let router = router();
    let ana = sign_up_and_login(&router, "ana").await;
    let bruno = sign_up_and_login(&router, "bruno").await;

    let first = submit_scored(&router, &ana, &["ITIL", "COBIT"], "High Priority", |framework, _| {
        if framework == 0 {
            4
        } else {
            2
        }
    })
    .await;
    assert_eq!(first["evaluation"]["display_name"], "ITIL, COBIT");

    submit_scored(&router, &bruno, &["ITIL"], "Medium Priority", |_, _| 5).await;

    let response = send(&router, request("GET", "/api/v1/rankings", Some(&ana), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rankings = json_body(response).await;
    let entries = rankings["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["framework"], "ITIL");
    assert_eq!(entries[0]["average_score_display"], "5.00");
    assert_eq!(entries[0]["user"], "bruno");
    assert_eq!(entries[0]["position"], 1);
    assert_eq!(entries[2]["framework"], "COBIT");
    assert_eq!(entries[2]["average_score"], 2.0);

    let response = send(
        &router,
        request("GET", "/api/v1/rankings/frameworks", Some(&ana), None),
    )
    .await;
    let frameworks = json_body(response).await;
    assert_eq!(frameworks["frameworks"][0]["framework"], "ITIL");
    assert_eq!(frameworks["frameworks"][0]["evaluations"], 2);
    assert_eq!(frameworks["frameworks"][0]["average_score_display"], "4.50");

    let response = send(
        &router,
        request(
            "POST",
            "/api/v1/comparisons/frameworks",
            Some(&ana),
            Some(serde_json::json!({ "frameworks": ["ITIL", "COBIT"] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let comparison = json_body(response).await;
    assert_eq!(comparison["columns"][0]["final_score"], 4.5);
    assert_eq!(comparison["columns"][1]["final_score"], 2.0);
}

#[tokio::test]
async fn reports_render_and_deleted_evaluations_disappear() {
    let router = router();
    let ana = sign_up_and_login(&router, "ana").await;
    let submitted = submit_scored(&router, &ana, &["ISO 27001"], "Low Priority", |_, sub| {
        (sub % 5) as u8 + 1
    })
    .await;
    let id = submitted["evaluation"]["id"].as_u64().expect("evaluation id");

    let response = send(
        &router,
        request("GET", &format!("/api/v1/evaluations/{id}/report"), Some(&ana), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["title"], "Evaluation Report");
    assert_eq!(report["frameworks"][0]["framework"], "ISO 27001");

    let response = send(
        &router,
        request("GET", &format!("/api/v1/evaluations/{id}/report.txt"), Some(&ana), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = text_body(response).await;
    assert!(text.starts_with("Evaluation Report"));
    assert!(text.contains("Framework: ISO 27001"));

    let response = send(&router, request("GET", "/api/v1/evaluations", Some(&ana), None)).await;
    assert_eq!(json_body(response).await["evaluations"].as_array().map(Vec::len), Some(1));

    let response = send(
        &router,
        request("DELETE", &format!("/api/v1/evaluations/{id}"), Some(&ana), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&router, request("GET", "/api/v1/rankings", Some(&ana), None)).await;
    assert_eq!(json_body(response).await["entries"].as_array().map(Vec::len), Some(0));

    let response = send(
        &router,
        request("GET", &format!("/api/v1/evaluations/{id}/report"), Some(&ana), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rubric_endpoints_are_public() {
    let router = router();

    let response = send(&router, request("GET", "/api/v1/rubric", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rubric = json_body(response).await;
    assert_eq!(rubric["criteria"].as_array().map(Vec::len), Some(12));
    assert_eq!(rubric["criteria"][0]["title"], "Cost");

    let response = send(&router, request("GET", "/api/v1/explanation", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let explanation = json_body(response).await;
    let prioritized = explanation["criterion_formula"].as_str().expect("criterion formula");
    let stored = explanation["stored_criterion_formula"]
        .as_str()
        .expect("stored criterion formula");
    assert!(prioritized.contains("subcriterion weight"));
    assert!(stored.contains("number of subcriteria"));
    assert!(stored.contains("default rankings"));
}
