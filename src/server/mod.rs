//! Development and preview server with live reload

use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, Request, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::post_path;
use crate::generator::Generator;
use crate::helpers::{decode_component, encode_query_component, inject_before_body_end, url_for};
use crate::pagination::{resolve_neighbors, PostListing};
use crate::prismic::{ContentSource, SourceError};
use crate::Blog;

/// Cookie holding the preview ref
pub const PREVIEW_COOKIE: &str = "spacetraveling.preview";

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
"#;

/// Server state
pub struct ServerState {
    blog: Blog,
    generator: Generator,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl ServerState {
    pub fn new(blog: &Blog, live_reload: bool) -> Result<Self> {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        Ok(Self {
            blog: blog.clone(),
            generator: Generator::new(blog)?,
            reload_tx,
            live_reload,
        })
    }

    /// Sender notified after every regeneration
    pub fn reload_sender(&self) -> broadcast::Sender<()> {
        self.reload_tx.clone()
    }

    fn source(&self, preview_ref: Option<&str>) -> Result<Arc<dyn ContentSource>, Response> {
        self.blog
            .content_source(preview_ref)
            .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
    }

    fn posts_api_link(&self, token: &str) -> String {
        format!(
            "{}?token={}",
            url_for(&self.blog.config, "api/posts"),
            encode_query_component(token)
        )
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .route("/api/posts", get(posts_handler))
        .route("/api/revalidate", post(revalidate_handler))
        .route("/", get(index_handler))
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(blog, watch)?);
    let reload_tx = state.reload_sender();
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let blog = blog.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::commands::generate::watch(&blog, Some(reload_tx)).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, error: impl std::fmt::Display) -> Response {
    tracing::warn!("{}: {}", status, error);
    (status, error.to_string()).into_response()
}

fn source_error_response(error: SourceError) -> Response {
    let status = match error {
        SourceError::InvalidCursor { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_response(status, error)
}

/// Preview ref from the request cookies
fn preview_ref(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .and_then(|(_, value)| decode_component(value))
        .filter(|value| !value.is_empty())
}

fn html_response(state: &ServerState, status: StatusCode, html: String) -> Response {
    let html = if state.live_reload {
        inject_before_body_end(&html, LIVE_RELOAD_SCRIPT)
    } else {
        html
    };
    (status, Html(html)).into_response()
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode and redirect to the previewed document
async fn preview_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let token = match params.token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return (StatusCode::UNAUTHORIZED, "Missing preview token").into_response(),
    };

    let location = match params.document_id.filter(|id| !id.is_empty()) {
        Some(id) => {
            let source = match state.source(Some(token.as_str())) {
                Ok(source) => source,
                Err(response) => return response,
            };
            match source.get_by_id(&id).await {
                Ok(doc) => url_for(&state.blog.config, &post_path(&doc.uid)),
                Err(e) if e.is_not_found() => url_for(&state.blog.config, ""),
                Err(e) => return source_error_response(e),
            }
        }
        None => url_for(&state.blog.config, ""),
    };

    tracing::info!("Entering preview mode, redirecting to {}", location);
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        PREVIEW_COOKIE,
        encode_query_component(&token)
    );
    ([(header::SET_COOKIE, cookie)], Redirect::temporary(&location)).into_response()
}

/// Leave preview mode
async fn exit_preview_handler(State(state): State<Arc<ServerState>>) -> Response {
    let cookie = format!("{}=; Path=/; Max-Age=0", PREVIEW_COOKIE);
    let home = url_for(&state.blog.config, "");
    ([(header::SET_COOKIE, cookie)], Redirect::temporary(&home)).into_response()
}

#[derive(Debug, Deserialize)]
struct PostsParams {
    token: String,
}

/// Follow a listing cursor on behalf of the "load more" button
async fn posts_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<PostsParams>,
) -> Response {
    let preview = preview_ref(&headers);
    let source = match state.source(preview.as_deref()) {
        Ok(source) => source,
        Err(response) => return response,
    };

    let listing = match source.load_next_page(&params.token).await {
        Ok(listing) => listing,
        Err(e) => return source_error_response(e),
    };

    let next_page = listing
        .next_page
        .as_deref()
        .map(|token| state.posts_api_link(token));
    let listing = PostListing::from_listing(listing);
    Json(state.generator.listing_chunk(listing.items(), next_page)).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct WebhookSecret {
    secret: Option<String>,
}

/// Whether a revalidation request carries the configured secret, either as
/// `?secret=` or in the Prismic webhook payload
fn webhook_authorized(expected: &str, query: Option<&str>, body: &[u8]) -> bool {
    if expected.is_empty() {
        return true;
    }
    let payload = serde_json::from_slice::<WebhookSecret>(body).unwrap_or_default();
    query == Some(expected) || payload.secret.as_deref() == Some(expected)
}

/// Regenerate the site, e.g. from a content webhook
async fn revalidate_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<WebhookSecret>,
    body: Bytes,
) -> Response {
    let expected = &state.blog.config.prismic.webhook_secret;
    if !webhook_authorized(expected, params.secret.as_deref(), &body) {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid webhook secret");
    }

    match crate::commands::generate::run_with_options(&state.blog, false).await {
        Ok(report) => {
            let _ = state.reload_tx.send(());
            Json(serde_json::json!({
                "revalidated": true,
                "rendered": report.rendered,
                "removed": report.removed,
            }))
            .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Home page, rendered live while previewing
async fn index_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Response {
    let Some(preview) = preview_ref(&headers) else {
        return serve_static(&state, request).await;
    };
    let source = match state.source(Some(preview.as_str())) {
        Ok(source) => source,
        Err(response) => return response,
    };

    let listing = match PostListing::first_page(
        source.as_ref(),
        state.blog.document_type(),
        state.blog.config.page_size(),
    )
    .await
    {
        Ok(listing) => listing,
        Err(e) => return source_error_response(e),
    };

    let cards: Vec<_> = listing.items().iter().map(|s| state.generator.card(s)).collect();
    let next_page = listing.next_page().map(|token| state.posts_api_link(token));

    match state
        .generator
        .render_index_html(&cards, next_page.as_deref(), true)
    {
        Ok(html) => html_response(&state, StatusCode::OK, html),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Post page, rendered live while previewing
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Response {
    let Some(preview) = preview_ref(&headers) else {
        return serve_static(&state, request).await;
    };
    let source = match state.source(Some(preview.as_str())) {
        Ok(source) => source,
        Err(response) => return response,
    };

    let doc = match source.get_by_uid(state.blog.document_type(), &slug).await {
        Ok(doc) => doc,
        Err(e) if e.is_not_found() => return not_found(&state, true),
        Err(e) => return source_error_response(e),
    };

    let neighbors = resolve_neighbors(source.as_ref(), state.blog.document_type(), &doc).await;
    match state.generator.render_post_html(&doc, &neighbors, true) {
        Ok(html) => html_response(&state, StatusCode::OK, html),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

fn not_found(state: &ServerState, preview: bool) -> Response {
    match state.generator.render_not_found_html(preview) {
        Ok(html) => html_response(state, StatusCode::NOT_FOUND, html),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

async fn fallback_handler(State(state): State<Arc<ServerState>>, request: Request<Body>) -> Response {
    serve_static(&state, request).await
}

/// Serve a file from the public directory, injecting live reload into HTML
async fn serve_static(state: &ServerState, request: Request<Body>) -> Response {
    let public_dir = &state.blog.public_dir;
    let path = request.uri().path().to_string();
    let clean_path = path.trim_start_matches('/');

    if clean_path.split('/').any(|segment| segment == "..") {
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    }

    let candidate = public_dir.join(clean_path);
    let file_path = if candidate.is_dir() {
        candidate.join("index.html")
    } else if candidate.exists() {
        candidate
    } else {
        let with_html = public_dir.join(format!("{}.html", clean_path));
        if with_html.exists() {
            with_html
        } else {
            return match tokio::fs::read_to_string(public_dir.join("404.html")).await {
                Ok(html) => html_response(state, StatusCode::NOT_FOUND, html),
                Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            };
        }
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => html_response(state, StatusCode::OK, content),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    } else {
        let mut service = ServeDir::new(public_dir);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
