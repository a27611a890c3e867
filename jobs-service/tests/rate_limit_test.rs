mod common;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
};
use common::{test_config, TestApp};
use std::{net::SocketAddr, time::Duration};

fn health_from(ip: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

fn app_with_limit(max_requests: u32) -> TestApp {
    let mut config = test_config();
    config.rate_limit.window_ms = 900_000;
    config.rate_limit.max_requests = max_requests;
    TestApp::with_config(config)
}

#[tokio::test]
async fn request_101_within_window_is_rejected() {
    let app = app_with_limit(100);

    for i in 1..=100 {
        let res = app.send(health_from("198.51.100.1")).await;
        assert_eq!(res.status, StatusCode::OK, "request {} was limited", i);
    }

    let res = app.send(health_from("198.51.100.1")).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        res.body["message"],
        "Too many requests from this IP, please try again later"
    );
    let retry_after: u64 = res.headers["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
}

#[tokio::test]
async fn clients_are_limited_independently() {
    let app = app_with_limit(2);

    assert_eq!(app.send(health_from("10.0.0.1")).await.status, StatusCode::OK);
    assert_eq!(app.send(health_from("10.0.0.1")).await.status, StatusCode::OK);
    assert_eq!(
        app.send(health_from("10.0.0.1")).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    assert_eq!(app.send(health_from("10.0.0.2")).await.status, StatusCode::OK);
}

#[tokio::test]
async fn limit_applies_before_routing_and_auth() {
    let app = app_with_limit(1);

    let first = app
        .request(Method::GET, "/no/such/route", None, None)
        .await;
    assert_eq!(first.status, StatusCode::NOT_FOUND);

    let second = app.request(Method::GET, "/api/v1/jobs", None, None).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn custom_message_is_used() {
    let mut config = test_config();
    config.rate_limit.max_requests = 1;
    config.rate_limit.message = "Slow down".to_string();
    let app = TestApp::with_config(config);

    app.send(health_from("10.0.0.9")).await;
    let res = app.send(health_from("10.0.0.9")).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.body["message"], "Slow down");
}

#[tokio::test]
async fn quota_is_not_refilled_until_the_window_ends() {
    let mut config = test_config();
    config.rate_limit.window_ms = 2_000;
    config.rate_limit.max_requests = 2;
    let app = TestApp::with_config(config);

    assert_eq!(app.send(health_from("10.0.0.3")).await.status, StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(app.send(health_from("10.0.0.3")).await.status, StatusCode::OK);

    let limited = app.send(health_from("10.0.0.3")).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = limited.headers["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=2).contains(&retry_after));

    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(app.send(health_from("10.0.0.3")).await.status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_header_is_ignored_without_trusted_proxy() {
    let mut config = test_config();
    config.rate_limit.max_requests = 1;
    config.rate_limit.trust_proxy = false;
    let app = TestApp::with_config(config);

    let from_peer = |forwarded: &str| {
        let mut request = health_from(forwarded);
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.44:40000".parse().unwrap()));
        request
    };

    assert_eq!(app.send(from_peer("10.0.0.1")).await.status, StatusCode::OK);
    assert_eq!(
        app.send(from_peer("10.0.0.2")).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        app.send(from_peer("10.0.0.3")).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}
