//! HTTP server setup and the per-connection request dispatcher.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all dispatch handler
//! - Wire up middleware (tracing, request ID)
//! - Admit requests through the concurrency gate
//! - Resolve sessions, issue CSRF tokens, negotiate caching
//! - Short-circuit static paths before any session or routing work
//! - Hand dynamic requests to the routing collaborator and render the
//!   last command's result
//!
//! Per-connection state machine:
//! `Received → Admitted → SessionResolved → {StaticServed | Routed} →
//! {CacheShortCircuited | Executed} → ResponseSent`

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::assets;
use crate::http::cache::{self, CacheDescriptor, CacheDecision};
use crate::http::request::{self, MakeRequestUuid, RequestContext, X_REQUEST_ID};
use crate::http::response::{self, Renderer, SessionCookie};
use crate::lifecycle::Shutdown;
use crate::net::ConcurrencyGate;
use crate::observability::metrics;
use crate::routing::command::{CommandError, CommandOutcome, CommandResult};
use crate::routing::router::{CommandRouter, RouteError};
use crate::security::{CsrfTokenizer, ServerIdentity};
use crate::session::{Session, SessionManager};

/// The legacy RPC URL space. Present but intentionally disabled.
pub const LEGACY_RPC_PREFIX: &str = "/::XMLRPC::/";

/// Short alias prefix stripped before routing, for hand-typed debug URLs.
const SHORT_ALIAS_PREFIX: &str = "/_/";

/// Live application counters exposed to page templates.
pub trait HostStats: Send + Sync {
    fn message_count(&self) -> usize;
}

/// Stats stub for hosts that do not track anything yet.
pub struct NoStats;

impl HostStats for NoStats {
    fn message_count(&self) -> usize {
        0
    }
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub identity: Arc<ServerIdentity>,
    pub gate: Arc<ConcurrencyGate>,
    pub sessions: Arc<SessionManager>,
    pub csrf: CsrfTokenizer,
    pub router: Arc<dyn CommandRouter>,
    pub renderer: Arc<dyn Renderer>,
    pub stats: Arc<dyn HostStats>,
    pub shutdown: Arc<Shutdown>,
}

/// HTTP server for the embedded web interface.
pub struct HttpServer {
    app: Router,
    gate: Arc<ConcurrencyGate>,
    shutdown: Arc<Shutdown>,
}

impl HttpServer {
    /// Create a new server around the routing and rendering collaborators.
    pub fn new(
        config: ServerConfig,
        router: Arc<dyn CommandRouter>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self::with_stats(config, router, renderer, Arc::new(NoStats))
    }

    /// As [`HttpServer::new`], with live application counters.
    pub fn with_stats(
        config: ServerConfig,
        router: Arc<dyn CommandRouter>,
        renderer: Arc<dyn Renderer>,
        stats: Arc<dyn HostStats>,
    ) -> Self {
        let config = Arc::new(config);
        let shutdown = Arc::new(Shutdown::new());
        let identity = Arc::new(ServerIdentity::generate());
        let gate = Arc::new(ConcurrencyGate::new(Arc::clone(&shutdown)));
        let sessions = Arc::new(SessionManager::new(Arc::clone(&identity)));
        let csrf = CsrfTokenizer::new(Arc::clone(&identity));

        let state = AppState {
            config,
            identity,
            gate: Arc::clone(&gate),
            sessions,
            csrf,
            router,
            renderer,
            stats,
            shutdown: Arc::clone(&shutdown),
        };

        let app = Self::build_router(state);
        Self {
            app,
            gate,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The gate, for host-driven quiescing (maintenance operations).
    pub fn concurrency_gate(&self) -> Arc<ConcurrencyGate> {
        Arc::clone(&self.gate)
    }

    /// The shutdown coordinator for this server.
    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// The accept loop swallows per-socket accept errors; it stops on the
    /// shutdown signal and lets in-flight workers finish their response.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut rx = self.shutdown.subscribe();
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: one invocation per request.
async fn dispatch_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();

    // Admission. Blocks while a quiesce holds the pause gate; the guard
    // releases the slot on every exit path, including panics.
    let _in_flight = state.gate.enter().await;

    let response = handle_request(&state, request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), started);
    response
}

async fn handle_request(state: &AppState, request: Request<Body>) -> Response {
    let debug = state.config.http.debug;
    let suppress_body = request.method() == Method::HEAD;
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let headers = request.headers().clone();
    let mut ctx = RequestContext::from_request(&request);

    tracing::debug!(
        request_id = %request_id,
        method = %ctx.method,
        path = %ctx.path,
        "Dispatching request"
    );

    if ctx.path.starts_with(LEGACY_RPC_PREFIX) {
        return response::plain_text(
            StatusCode::INTERNAL_SERVER_ERROR,
            "The legacy RPC endpoint has been disabled",
            None,
        );
    }

    // Body parsing happens before anything else is admitted to routing.
    let mutating = matches!(ctx.method.as_str(), "POST" | "PUT" | "UPDATE");
    if mutating {
        match request::parse_post_body(request, state.config.http.post_body_limit).await {
            Ok(post) => ctx.post = post,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
                let page = state.renderer.render_error(&e.to_string());
                return response::full_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &page.mimetype,
                    None,
                    &[],
                    None,
                    page.body,
                );
            }
        }
    }

    // Static things! Served before any session or routing work.
    let mut path = ctx.path.clone();
    if path == "/favicon.ico" {
        path = "/static/favicon.ico".to_string();
    }
    if let Some(rest) = path.strip_prefix(SHORT_ALIAS_PREFIX) {
        path = format!("/{}", rest);
    }
    if let Some(asset) = path.strip_prefix("/static/") {
        let root = state.config.theme.root_for(&ctx.hostname).to_path_buf();
        return assets::serve(&root, asset, suppress_body).await;
    }
    ctx.path = path;

    // HTTP is stateless: a fresh session per request, only the identifier
    // survives in the cookie.
    let session_id = state
        .sessions
        .resolve_or_mint(ctx.cookie.as_deref(), &headers);
    let cookie = SessionCookie {
        name: state.identity.cookie_name().to_string(),
        value: session_id.clone(),
    };
    let mut session = state
        .sessions
        .new_session(Arc::clone(&state.config), session_id);
    populate_template_vars(state, &ctx, &mut session);

    // Routing, with one trailing-slash retry for plain GETs.
    let commands = match state.router.map(&ctx, &session) {
        Ok(commands) => commands,
        Err(RouteError::Usage(detail))
            if ctx.method == Method::GET && !debug && !ctx.path.ends_with('/') =>
        {
            let retry = ctx.with_path(format!("{}/", ctx.path));
            match state.router.map(&retry, &session) {
                Ok(_) => {
                    let mut url = encode_path(&retry.path);
                    if !ctx.query_string.is_empty() {
                        url.push('?');
                        url.push_str(&ctx.query_string);
                    }
                    tracing::debug!(request_id = %request_id, url = %url, "Redirecting to slashed path");
                    return response::redirect(&url, Some(&cookie));
                }
                Err(_) => return route_failure(state, RouteError::Usage(detail), Some(&cookie)),
            }
        }
        Err(e) => return route_failure(state, e, Some(&cookie)),
    };

    // Cache negotiation is skipped entirely in debug mode.
    let mut extra_headers: Vec<(String, String)> = Vec::new();
    let mut cachectrl: Option<String> = None;
    if !debug {
        let descriptor = CacheDescriptor::collect(&commands);
        match cache::evaluate(&state.identity, &descriptor, ctx.if_none_match.as_deref()) {
            CacheDecision::NotModified => {
                tracing::debug!(request_id = %request_id, "Conditional match, skipping execution");
                return response::not_modified(Some(&cookie));
            }
            CacheDecision::Fresh {
                etag,
                cache_control,
            } => {
                if let Some(etag) = etag {
                    extra_headers.push(("ETag".to_string(), etag));
                }
                cachectrl = Some(cache_control);
            }
        }
    }

    let mut last = CommandResult::empty();
    {
        // Hanging activities give their slot back while the work runs, so
        // a quiesce is not blocked behind them.
        let _exemption = commands
            .iter()
            .any(|c| c.is_hanging_activity())
            .then(|| state.gate.suspend());

        for command in &commands {
            match command.run(&mut session).await {
                Ok(CommandOutcome::Done(result)) => last = result,
                Ok(CommandOutcome::Redirect(url)) => {
                    return response::redirect(&url, Some(&cookie))
                }
                Ok(CommandOutcome::SuppressOutput) => return response::suppressed(),
                Err(e) => return command_failure(state, e, Some(&cookie)),
            }
        }
    }

    let page = state.renderer.render(&session, &last);
    response::full_response(
        StatusCode::OK,
        &page.mimetype,
        cachectrl.as_deref(),
        &extra_headers,
        Some(&cookie),
        page.body,
    )
}

/// The variable bag handed to page templates via the session.
fn populate_template_vars(state: &AppState, ctx: &RequestContext, session: &mut Session) {
    let session_id = session.id.clone();
    let vars = &mut session.vars;
    vars.insert("csrf", state.csrf.generate());
    vars.insert("http_host", ctx.host.clone());
    vars.insert("http_hostname", ctx.hostname.clone());
    vars.insert("http_method", ctx.method.to_string());
    vars.insert("http_session", session_id);
    vars.insert("message_count", state.stats.message_count().to_string());
    vars.insert("name", state.config.profile.display_name.clone());
    vars.insert("title", state.config.profile.title.clone());
    vars.insert("url_protocol", ctx.protocol.clone());
}

/// Percent-encode a path while preserving its segment structure.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn route_failure(
    state: &AppState,
    error: RouteError,
    cookie: Option<&SessionCookie>,
) -> Response {
    match error {
        RouteError::AccessDenied => {
            response::plain_text(StatusCode::FORBIDDEN, "Access Denied", cookie)
        }
        other => internal_error(state, &other.to_string(), cookie),
    }
}

fn command_failure(
    state: &AppState,
    error: CommandError,
    cookie: Option<&SessionCookie>,
) -> Response {
    match error {
        CommandError::AccessDenied => {
            response::plain_text(StatusCode::FORBIDDEN, "Access Denied", cookie)
        }
        CommandError::Unauthenticated => response::plain_text(
            StatusCode::UNAUTHORIZED,
            "Authentication required",
            cookie,
        ),
        CommandError::Failed(detail) => internal_error(state, &detail, cookie),
    }
}

fn internal_error(state: &AppState, detail: &str, cookie: Option<&SessionCookie>) -> Response {
    tracing::error!(error = %detail, "Request failed");
    let body = if state.config.http.debug {
        detail
    } else {
        "Internal error"
    };
    response::plain_text(StatusCode::INTERNAL_SERVER_ERROR, body, cookie)
}
