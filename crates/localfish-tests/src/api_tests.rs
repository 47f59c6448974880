use futures::future::join_all;
use serde_json::{json, Value};

use localfish_core::Move;

use crate::helpers::{TestServer, BACK_RANK, FOOLS_MATE, STALEMATE, START};

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new().await;
    let resp = server.get("/health").await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "stockfish");
    assert_eq!(body["max_depth"], 30);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_index_endpoint() {
    let server = TestServer::new().await;
    let resp = server.get("/").await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert!(body["endpoints"]["/health"].is_string());
}

#[tokio::test]
async fn test_analyze_starting_position() {
    let server = TestServer::new().await;
    let resp = server.analyze_get(START, Some("15")).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["depth"], 15);
    assert!(body["mate"].is_null());
    assert_eq!(body["evaluation"], 0.31);

    let bestmove = body["bestmove"].as_str().expect("bestmove");
    assert!(Move::from_uci(bestmove).is_some());

    let continuation = body["continuation"].as_str().expect("continuation");
    let plies: Vec<&str> = continuation.split(' ').collect();
    assert_eq!(plies.len(), 10);
    assert_eq!(plies[0], bestmove);
}

#[tokio::test]
async fn test_analyze_post_clamps_depth() {
    let server = TestServer::new().await;
    let resp = server
        .post_json("/analyze", &json!({"fen": START, "depth": 50}))
        .await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["depth"], 30);
}

#[tokio::test]
async fn test_analyze_forced_mate() {
    let server = TestServer::new().await;
    let resp = server.analyze_get(BACK_RANK, Some("10")).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["mate"], 1);
    assert!(body["evaluation"].is_null());
    assert_eq!(body["bestmove"], "a1a8");
}

#[tokio::test]
async fn test_analyze_checkmated_side() {
    let server = TestServer::new().await;
    let resp = server.analyze_get(FOOLS_MATE, None).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert!(body["bestmove"].is_null());
    assert_eq!(body["continuation"], "");
    assert_eq!(body["mate"], 0);
    assert!(body["evaluation"].is_null());
    assert_eq!(body["depth"], 20);
}

#[tokio::test]
async fn test_analyze_stalemate() {
    let server = TestServer::new().await;
    let resp = server.analyze_get(STALEMATE, Some("12")).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("json");
    assert!(body["bestmove"].is_null());
    assert_eq!(body["continuation"], "");
    assert_eq!(body["evaluation"], 0.0);
    assert!(body["mate"].is_null());
    assert_eq!(body["depth"], 12);
}

#[tokio::test]
async fn test_invalid_fen() {
    let server = TestServer::new().await;
    let resp = server.analyze_get("invalid", None).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({"error": "Invalid FEN string"}));
}

#[tokio::test]
async fn test_missing_fen() {
    let server = TestServer::new().await;
    let resp = server.get("/analyze?depth=12").await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({"error": "No FEN provided"}));
}

#[tokio::test]
async fn test_post_without_body() {
    let server = TestServer::new().await;
    let resp = server.post_raw("/analyze", "").await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({"error": "No JSON body provided"}));
}

#[tokio::test]
async fn test_unknown_route() {
    let server = TestServer::new().await;
    let resp = server.get("/foo").await;
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({"error": "Endpoint not found"}));
}

#[tokio::test]
async fn test_repeated_query_key_keeps_json_errors() {
    let server = TestServer::new().await;
    let resp = server.get("/analyze?fen=invalid&fen=invalid").await;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({"error": "Invalid FEN string"}));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_engine() {
    let server = TestServer::new().await;

    let requests = (0..8).map(|i| {
        let fen = if i % 2 == 0 { START } else { BACK_RANK };
        let body = json!({"fen": fen, "depth": 5 + i});
        let server = &server;
        async move { server.post_json("/analyze", &body).await }
    });
    let responses = join_all(requests).await;

    for (i, resp) in responses.into_iter().enumerate() {
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["depth"], 5 + i as u64);
        let expected = if i % 2 == 0 { "e2e4" } else { "a1a8" };
        assert_eq!(body["bestmove"], expected);
    }
}

#[tokio::test]
async fn test_stopped_engine_reports_failure() {
    let server = TestServer::new().await;
    server.shutdown_engine().await;
    server.shutdown_engine().await;

    let resp = server.analyze_get(START, Some("10")).await;
    assert_eq!(resp.status(), 500);

    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["error"], "Analysis failed");

    let resp = server.analyze_get("invalid", None).await;
    assert_eq!(resp.status(), 400);
}
