//! Quiesce behavior under live traffic: hanging-work exemptions, bounded
//! waits, and paused admission.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;

use local_httpd::config::ServerConfig;
use local_httpd::net::gate::DEFAULT_WAIT_TICKS;

mod common;
use common::{client, spawn_server, StubCommand, StubRouter};

fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

#[tokio::test]
async fn hanging_work_does_not_block_a_quiesce() {
    let runs = counter();
    let runs_for_route = Arc::clone(&runs);
    let router = StubRouter::new().route("/stream/", move || {
        vec![Box::new(
            StubCommand::new(Arc::clone(&runs_for_route))
                .with_hanging(true)
                .with_delay(Duration::from_millis(600)),
        )]
    });
    let server = spawn_server(ServerConfig::default(), router).await;

    let url = format!("{}/stream/", server.url);
    let request = tokio::spawn(async move { client().get(&url).send().await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    // The hanging command gave its slot back, so the wait returns long
    // before the 600ms of work finishes.
    let started = Instant::now();
    let permit = server.gate.wait_until_idle(0, DEFAULT_WAIT_TICKS).await;
    assert!(started.elapsed() < Duration::from_millis(400));
    drop(permit);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn quiesce_waits_for_ordinary_work() {
    let runs = counter();
    let runs_for_route = Arc::clone(&runs);
    let router = StubRouter::new().route("/busy/", move || {
        vec![Box::new(
            StubCommand::new(Arc::clone(&runs_for_route))
                .with_delay(Duration::from_millis(300)),
        )]
    });
    let server = spawn_server(ServerConfig::default(), router).await;

    let url = format!("{}/busy/", server.url);
    let request = tokio::spawn(async move { client().get(&url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let permit = server.gate.wait_until_idle(0, DEFAULT_WAIT_TICKS).await;
    assert_eq!(server.gate.in_flight(), 0);
    drop(permit);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn quiesce_gives_up_after_its_tick_budget() {
    let runs = counter();
    let runs_for_route = Arc::clone(&runs);
    let router = StubRouter::new().route("/busy/", move || {
        vec![Box::new(
            StubCommand::new(Arc::clone(&runs_for_route))
                .with_delay(Duration::from_secs(2)),
        )]
    });
    let server = spawn_server(ServerConfig::default(), router).await;

    let url = format!("{}/busy/", server.url);
    let request = tokio::spawn(async move { client().get(&url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Three 50ms ticks, then give up with the request still in flight.
    let started = Instant::now();
    let permit = server.gate.wait_until_idle(0, 3).await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(server.gate.in_flight(), 1);
    drop(permit);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admission_pauses_while_the_permit_is_held() {
    let runs = counter();
    let runs_for_route = Arc::clone(&runs);
    let router = StubRouter::new().route("/", move || {
        vec![Box::new(StubCommand::new(Arc::clone(&runs_for_route)))]
    });
    let server = spawn_server(ServerConfig::default(), router).await;

    let permit = server.gate.wait_until_idle(0, DEFAULT_WAIT_TICKS).await;

    let url = server.url.clone();
    let paused = tokio::spawn(async move { client().get(&url).send().await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!paused.is_finished(), "request was admitted during quiesce");

    drop(permit);
    let response = paused.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
