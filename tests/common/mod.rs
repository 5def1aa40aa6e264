//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use local_httpd::config::ServerConfig;
use local_httpd::http::request::RequestContext;
use local_httpd::http::response::JsonRenderer;
use local_httpd::http::HttpServer;
use local_httpd::net::ConcurrencyGate;
use local_httpd::routing::{
    Command, CommandError, CommandOutcome, CommandResult, CommandRouter, RouteError,
};
use local_httpd::session::Session;
use local_httpd::Shutdown;

/// How a [`StubCommand`] finishes once its work counter has ticked.
pub enum ScriptedEnd {
    Done,
    Redirect(String),
    Suppress,
    Deny,
    Unauthenticated,
}

/// A scripted command with an observable run counter.
pub struct StubCommand {
    runs: Arc<AtomicU32>,
    fragments: Vec<String>,
    max_age: u64,
    hanging: bool,
    delay: Duration,
    end: ScriptedEnd,
}

#[allow(dead_code)]
impl StubCommand {
    pub fn new(runs: Arc<AtomicU32>) -> Self {
        Self {
            runs,
            fragments: Vec::new(),
            max_age: 10,
            hanging: false,
            delay: Duration::ZERO,
            end: ScriptedEnd::Done,
        }
    }

    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_hanging(mut self, hanging: bool) -> Self {
        self.hanging = hanging;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn ending_with(mut self, end: ScriptedEnd) -> Self {
        self.end = end;
        self
    }
}

#[async_trait]
impl Command for StubCommand {
    async fn run(&self, _session: &mut Session) -> Result<CommandOutcome, CommandError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.end {
            ScriptedEnd::Done => Ok(CommandOutcome::Done(CommandResult {
                value: serde_json::json!("ok"),
            })),
            ScriptedEnd::Redirect(url) => Ok(CommandOutcome::Redirect(url.clone())),
            ScriptedEnd::Suppress => Ok(CommandOutcome::SuppressOutput),
            ScriptedEnd::Deny => Err(CommandError::AccessDenied),
            ScriptedEnd::Unauthenticated => Err(CommandError::Unauthenticated),
        }
    }

    fn max_age(&self) -> u64 {
        self.max_age
    }

    fn etag_data(&self) -> Vec<String> {
        self.fragments.clone()
    }

    fn is_hanging_activity(&self) -> bool {
        self.hanging
    }
}

type CommandFactory = Arc<dyn Fn() -> Vec<Box<dyn Command>> + Send + Sync>;

/// A routing collaborator with a fixed path → commands table.
#[derive(Default)]
pub struct StubRouter {
    routes: HashMap<String, CommandFactory>,
}

#[allow(dead_code)]
impl StubRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        mut self,
        path: &str,
        factory: impl Fn() -> Vec<Box<dyn Command>> + Send + Sync + 'static,
    ) -> Self {
        self.routes.insert(path.to_string(), Arc::new(factory));
        self
    }
}

impl CommandRouter for StubRouter {
    fn map(
        &self,
        ctx: &RequestContext,
        _session: &Session,
    ) -> Result<Vec<Box<dyn Command>>, RouteError> {
        self.routes
            .get(&ctx.path)
            .map(|factory| factory())
            .ok_or_else(|| RouteError::Usage(ctx.path.clone()))
    }
}

/// A running server under test. Shuts the server down when dropped.
pub struct TestServer {
    pub url: String,
    pub addr: SocketAddr,
    #[allow(dead_code)]
    pub gate: Arc<ConcurrencyGate>,
    pub shutdown: Arc<Shutdown>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Spawn a server on an ephemeral port with the given collaborators.
pub async fn spawn_server(config: ServerConfig, router: StubRouter) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, Arc::new(router), Arc::new(JsonRenderer));
    let gate = server.concurrency_gate();
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    TestServer {
        url: format!("http://{}", addr),
        addr,
        gate,
        shutdown,
    }
}

/// HTTP client that neither follows redirects nor consults proxies.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Issue a GET over a raw socket, bypassing client-side URL normalization.
/// Returns the status code and the full response text.
#[allow(dead_code)]
pub async fn raw_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).to_string();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (status, text)
}
