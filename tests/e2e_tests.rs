// File: e2e_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - The rmirror developers

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_request, build_response, ScriptedTransport};
use rmirror::config::MirrorConfig;
use rmirror::domain::{AuthMode, DomainConfig, SessionStatus};
use rmirror::engine::{MirrorEngine, TrafficTool};
use rmirror::rawhttp::RawRequest;
use rmirror::refresh::RefreshScheduler;
use rmirror::registry::DomainRegistry;

fn mirroring_config() -> MirrorConfig {
    let mut config = MirrorConfig::new();
    config.set_mirror_enabled(true);
    config
}

fn engine_with(
    transport: Arc<ScriptedTransport>,
    config: MirrorConfig,
    domains: &[(&str, AuthMode)],
) -> Arc<MirrorEngine> {
    let engine = MirrorEngine::new(config, transport);
    for (host, mode) in domains {
        engine
            .registry()
            .add(host, DomainConfig::with_mode(*mode))
            .unwrap();
    }
    engine
}

#[tokio::test]
async fn test_cookie_flows_from_primary_to_mirror_and_mismatch_is_detected() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
        "b.com",
        200,
        "{\"balance\": 99}",
    );
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );

    // login response on the primary sets the session cookie
    let login_req = build_request("GET", "/start", "a.com", &[]);
    let login_resp = build_response(200, &[("Set-Cookie", "sid=123; Path=/")], "welcome");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &login_req, &login_resp)
        .await;

    assert_eq!(
        engine
            .registry()
            .with_domain("a.com", |e| e.session.cookies.get("sid").cloned())
            .unwrap()
            .as_deref(),
        Some("123")
    );

    // a later authenticated exchange on the primary is mirrored to b.com
    let req = build_request("GET", "/dashboard", "a.com", &["Cookie: sid=123"]);
    let resp = build_response(200, &[], "{\"balance\": 100}");
    engine
        .on_request("a.com", TrafficTool::Proxy, &req)
        .await;
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    let mirrored = transport.requests_for("b.com");
    assert!(!mirrored.is_empty());
    let last = RawRequest::parse(mirrored.last().unwrap());
    assert_eq!(last.path(), "/dashboard");
    assert_eq!(last.header_value("host"), Some("b.com"));
    assert_eq!(last.header_value("cookie"), Some("sid=123"));

    let results = engine.store().snapshot();
    let dashboard = results
        .iter()
        .find(|r| r.path == "/dashboard")
        .expect("dashboard exchange should produce a result");
    assert!(!dashboard.matched);
    assert_eq!(dashboard.domains(), vec!["a.com", "b.com"]);
    assert_eq!(dashboard.response_for("b.com").unwrap().status, 200);
    assert_ne!(
        dashboard.response_for("a.com").unwrap().hash,
        dashboard.response_for("b.com").unwrap().hash
    );
}

#[tokio::test]
async fn test_identical_mirror_bodies_match() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "same-body");
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::None), ("b.com", AuthMode::None)],
    );

    let req = build_request("GET", "/static", "a.com", &[]);
    let resp = build_response(200, &[], "same-body");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    let results = engine.store().snapshot();
    assert_eq!(results.len(), 1);
    assert!(results[0].matched);
    assert_eq!(results[0].domains(), vec!["a.com", "b.com"]);
}

#[tokio::test]
async fn test_mirror_timeout_leaves_only_primary_and_trivially_matches() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "slow-body");
    transport.delay("b.com", Duration::from_millis(1600));

    let mut config = mirroring_config();
    config.set_request_timeout_secs(1);
    let engine = engine_with(
        Arc::clone(&transport),
        config,
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );

    let req = build_request("GET", "/slow", "a.com", &[]);
    let resp = build_response(200, &[], "primary-body");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    let results = engine.store().snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].domains(), vec!["a.com"]);
    assert!(results[0].matched);
}

#[tokio::test]
async fn test_transport_failure_is_contained_to_that_mirror() {
    let transport = Arc::new(ScriptedTransport::new());
    // b.com has no scripted response -> transport failure; c.com succeeds
    transport.respond("c.com", 200, "primary-body");
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[
            ("a.com", AuthMode::Auto),
            ("b.com", AuthMode::Auto),
            ("c.com", AuthMode::Auto),
        ],
    );

    let req = build_request("GET", "/page", "a.com", &[]);
    let resp = build_response(200, &[], "primary-body");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    let results = engine.store().snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].domains(), vec!["a.com", "c.com"]);
    assert!(results[0].matched);
}

#[tokio::test]
async fn test_saturated_pool_skips_mirrors_instead_of_queueing() {
    let transport = Arc::new(ScriptedTransport::new());
    for host in ["b.com", "c.com", "d.com"] {
        transport.respond(host, 200, "body");
        transport.delay(host, Duration::from_millis(300));
    }

    let mut config = mirroring_config();
    config.set_max_concurrent_mirrors(1);
    let engine = engine_with(
        Arc::clone(&transport),
        config,
        &[
            ("a.com", AuthMode::None),
            ("b.com", AuthMode::None),
            ("c.com", AuthMode::None),
            ("d.com", AuthMode::None),
        ],
    );

    let req = build_request("GET", "/busy", "a.com", &[]);
    let resp = build_response(200, &[], "body");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    // only the first mirror got the single permit; the rest were dropped
    assert_eq!(transport.total_calls(), 1);
    let results = engine.store().snapshot();
    assert_eq!(results[0].domains(), vec!["a.com", "b.com"]);
}

#[tokio::test]
async fn test_self_generated_traffic_is_never_mirrored_again() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "body");
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );

    let req = build_request(
        "GET",
        "/loop",
        "a.com",
        &["X-Rmirror-Internal: true", "Cookie: sid=55"],
    );
    let resp = build_response(200, &[], "body");
    engine.on_request("a.com", TrafficTool::Proxy, &req).await;
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    assert_eq!(transport.total_calls(), 0);
    assert!(engine.store().is_empty());
    // marker traffic contributes nothing to session capture either
    let cookies = engine
        .registry()
        .with_domain("a.com", |e| e.session.cookies.len())
        .unwrap();
    assert_eq!(cookies, 0);
}

#[tokio::test]
async fn test_refresh_traffic_is_not_mirrored() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "body");

    let mut config = mirroring_config();
    config.set_auto_refresh_mirrors(false);
    let engine = engine_with(
        Arc::clone(&transport),
        config,
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );

    let req = build_request("POST", "/auth/refresh", "a.com", &[]);
    let resp = build_response(200, &[], "{\"access_token\":\"tok\"}");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    assert_eq!(transport.total_calls(), 0);
    assert!(engine.store().is_empty());
    // the primary still learned its new token
    let bearer = engine
        .registry()
        .with_domain("a.com", |e| e.session.bearer.clone())
        .unwrap();
    assert_eq!(bearer, "tok");
}

#[tokio::test]
async fn test_primary_refresh_propagates_to_mirrors() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "{\"access_token\":\"mirror-tok\"}");
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );
    // the mirror needs something to refresh with
    engine.registry().with_domain("b.com", |e| {
        e.session.refresh_token = "mirror-refresh".to_string();
    });

    let req = build_request("POST", "/auth/refresh", "a.com", &[]);
    let resp = build_response(200, &[], "{\"access_token\":\"new-primary-tok\"}");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    // propagation is fire-and-forget; give the spawned refreshes a moment
    tokio::time::sleep(Duration::from_millis(200)).await;

    let refreshes = transport.requests_for("b.com");
    assert_eq!(refreshes.len(), 1);
    let parsed = RawRequest::parse(&refreshes[0]);
    assert_eq!(parsed.method(), "POST");
    assert_eq!(parsed.path(), "/refresh");
    assert!(parsed.body.contains("mirror-refresh"));

    // and the mirror captured its own new token from the refresh response
    let bearer = engine
        .registry()
        .with_domain("b.com", |e| e.session.bearer.clone())
        .unwrap();
    assert_eq!(bearer, "mirror-tok");
}

#[tokio::test]
async fn test_non_trigger_tool_captures_but_does_not_mirror() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "body");
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );

    let req = build_request("GET", "/page", "a.com", &[]);
    let resp = build_response(200, &[("Set-Cookie", "sid=7")], "body");
    engine
        .on_response("a.com", TrafficTool::Repeater, true, 443, &req, &resp)
        .await;

    assert!(engine.store().is_empty());
    let cookies = engine
        .registry()
        .with_domain("a.com", |e| e.session.cookies.len())
        .unwrap();
    assert_eq!(cookies, 1);

    // enabling the tool turns mirroring on for it
    engine.set_tool_trigger(TrafficTool::Repeater, true);
    engine
        .on_response("a.com", TrafficTool::Repeater, true, 443, &req, &resp)
        .await;
    assert_eq!(engine.store().len(), 1);
}

#[tokio::test]
async fn test_mirror_responses_bootstrap_their_own_sessions() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond_with_headers(
        "b.com",
        200,
        &[("Set-Cookie", "mirror_sid=999; HttpOnly")],
        "body",
    );
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::Auto), ("b.com", AuthMode::Auto)],
    );

    let req = build_request("GET", "/page", "a.com", &[]);
    let resp = build_response(200, &[], "body");
    engine
        .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
        .await;

    let (cookie, status) = engine
        .registry()
        .with_domain("b.com", |e| {
            (e.session.cookies.get("mirror_sid").cloned(), e.session.status)
        })
        .unwrap();
    assert_eq!(cookie.as_deref(), Some("999"));
    assert_eq!(status, SessionStatus::Ready);
}

#[tokio::test]
async fn test_concurrent_refresh_triggers_deduplicate() {
    let registry = Arc::new(DomainRegistry::new());
    registry
        .add("a.com", DomainConfig::with_mode(AuthMode::Auto))
        .unwrap();
    registry.with_domain("a.com", |e| {
        e.session.refresh_token = "r-tok".to_string();
    });

    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("a.com", 200, "{\"access_token\":\"fresh\"}");
    transport.delay("a.com", Duration::from_millis(200));

    let scheduler = RefreshScheduler::new(Arc::clone(&registry), transport.clone());
    let config = MirrorConfig::new();

    tokio::join!(
        scheduler.trigger("a.com", &config),
        scheduler.trigger("a.com", &config),
    );
    assert_eq!(transport.call_count("a.com"), 1);

    // once the first refresh completed, a new trigger goes through again
    scheduler.trigger("a.com", &config).await;
    assert_eq!(transport.call_count("a.com"), 2);
}

#[tokio::test]
async fn test_refresh_failure_is_swallowed_and_marker_cleared() {
    let registry = Arc::new(DomainRegistry::new());
    registry
        .add("a.com", DomainConfig::with_mode(AuthMode::Auto))
        .unwrap();
    registry.with_domain("a.com", |e| {
        e.session.refresh_token = "r-tok".to_string();
    });

    // no scripted response: the transport errors
    let transport = Arc::new(ScriptedTransport::new());
    let scheduler = RefreshScheduler::new(Arc::clone(&registry), transport.clone());
    let config = MirrorConfig::new();

    scheduler.trigger("a.com", &config).await;
    // the in-flight marker was cleared, so the next trigger sends again
    scheduler.trigger("a.com", &config).await;
    assert_eq!(transport.call_count("a.com"), 2);
}

#[tokio::test]
async fn test_result_store_capacity_applies_to_engine_results() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond("b.com", 200, "body");
    let engine = engine_with(
        Arc::clone(&transport),
        mirroring_config(),
        &[("a.com", AuthMode::None), ("b.com", AuthMode::None)],
    );
    engine.update_config(|c| c.set_max_results(10));

    for i in 0..12 {
        let req = build_request("GET", &format!("/page/{}", i), "a.com", &[]);
        let resp = build_response(200, &[], "body");
        engine
            .on_response("a.com", TrafficTool::Proxy, true, 443, &req, &resp)
            .await;
    }

    let results = engine.store().snapshot();
    assert_eq!(results.len(), 10);
    assert_eq!(results[0].path, "/page/2");
    assert_eq!(results[9].path, "/page/11");
}
