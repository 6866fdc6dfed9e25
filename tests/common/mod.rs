//! Fake Prismic repository served on a local port

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MASTER_REF: &str = "master-ref";
pub const PREVIEW_REF: &str = "preview-ref";
pub const ACCESS_TOKEN: &str = "secret";

pub struct FakeRepository {
    base_url: String,
    published: Vec<Value>,
    drafts: Vec<Value>,
    api_root_hits: AtomicUsize,
    search_hits: AtomicUsize,
}

impl FakeRepository {
    /// `{base}/api/v2`
    pub fn endpoint(&self) -> String {
        format!("{}/api/v2", self.base_url)
    }

    pub fn api_root_hits(&self) -> usize {
        self.api_root_hits.load(Ordering::SeqCst)
    }

    pub fn search_hits(&self) -> usize {
        self.search_hits.load(Ordering::SeqCst)
    }
}

/// A `posts` document published on 2021-03-{day}
pub fn post(id: &str, uid: &str, day: u32, words: usize) -> Value {
    let text = vec!["palavra"; words].join(" ");
    json!({
        "id": id,
        "uid": uid,
        "type": "posts",
        "first_publication_date": format!("2021-03-{:02}T12:00:00+0000", day),
        "last_publication_date": format!("2021-03-{:02}T12:00:00+0000", day),
        "data": {
            "title": format!("Post {}", uid),
            "subtitle": format!("Subtitle {}", uid),
            "author": "Danilo Vieira",
            "banner": { "url": "https://images.prismic.io/banner.png" },
            "content": [{
                "heading": "Introdução",
                "body": [{ "type": "paragraph", "text": text, "spans": [] }]
            }]
        }
    })
}

/// Start a repository serving `published` under the master ref and
/// `published + drafts` under the preview ref
pub async fn start(published: Vec<Value>, drafts: Vec<Value>) -> Arc<FakeRepository> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let repo = Arc::new(FakeRepository {
        base_url: format!("http://{}", addr),
        published,
        drafts,
        api_root_hits: AtomicUsize::new(0),
        search_hits: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/api/v2", get(api_root))
        .route("/api/v2/documents/search", get(search))
        .with_state(repo.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    repo
}

fn authorized(params: &HashMap<String, String>) -> bool {
    params.get("access_token").map(String::as_str) == Some(ACCESS_TOKEN)
}

async fn api_root(
    State(repo): State<Arc<FakeRepository>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    repo.api_root_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&params) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "refs": [
            { "id": "preview", "ref": PREVIEW_REF, "label": "Preview", "isMasterRef": false },
            { "id": "master", "ref": MASTER_REF, "label": "Master", "isMasterRef": true }
        ]
    }))
    .into_response()
}

/// Value of `<op>(<path>,"<value>")` in a rendered query
fn predicate_value(q: &str, op: &str, path: &str) -> Option<String> {
    let marker = format!("[{}({},\"", op, path);
    let start = q.find(&marker)? + marker.len();
    let end = q[start..].find('"')?;
    Some(q[start..start + end].to_string())
}

async fn search(
    State(repo): State<Arc<FakeRepository>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    repo.search_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&params) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut docs: Vec<Value> = match params.get("ref").map(String::as_str) {
        Some(MASTER_REF) => repo.published.clone(),
        Some(PREVIEW_REF) => repo.published.iter().chain(&repo.drafts).cloned().collect(),
        _ => return (StatusCode::BAD_REQUEST, "unknown ref").into_response(),
    };

    let q = params.get("q").cloned().unwrap_or_default();
    if let Some(doc_type) = predicate_value(&q, "at", "document.type") {
        docs.retain(|d| d["type"] == doc_type.as_str());
        if let Some(uid) = predicate_value(&q, "at", &format!("my.{}.uid", doc_type)) {
            docs.retain(|d| d["uid"] == uid.as_str());
        }
    }
    if let Some(id) = predicate_value(&q, "at", "document.id") {
        docs.retain(|d| d["id"] == id.as_str());
    }
    // Timestamps share one format, so they compare as strings
    let date = |d: &Value| d["first_publication_date"].as_str().unwrap_or("").to_string();
    if let Some(bound) = predicate_value(&q, "date.after", "document.first_publication_date") {
        docs.retain(|d| date(d) > bound);
    }
    if let Some(bound) = predicate_value(&q, "date.before", "document.first_publication_date") {
        docs.retain(|d| date(d) < bound);
    }

    docs.sort_by(|a, b| {
        a["first_publication_date"]
            .as_str()
            .cmp(&b["first_publication_date"].as_str())
    });
    if params
        .get("orderings")
        .map(|o| o.contains(" desc"))
        .unwrap_or(false)
    {
        docs.reverse();
    }

    if let Some(after) = params.get("after") {
        match docs.iter().position(|d| d["id"] == after.as_str()) {
            Some(pos) => docs = docs.split_off(pos + 1),
            None => docs.clear(),
        }
    }

    let page_size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let page: usize = params.get("page").and_then(|s| s.parse().ok()).unwrap_or(1);
    let total = docs.len();
    let total_pages = (total + page_size - 1) / page_size;
    let results: Vec<Value> = docs
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    let next_page = (page < total_pages).then(|| {
        let mut url = reqwest::Url::parse(&format!("{}/documents/search", repo.endpoint())).unwrap();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &params {
                if key != "page" && key != "access_token" {
                    pairs.append_pair(key, value);
                }
            }
            pairs.append_pair("page", &(page + 1).to_string());
        }
        url.to_string()
    });

    Json(json!({
        "page": page,
        "results_per_page": page_size,
        "total_results_size": total,
        "total_pages": total_pages,
        "next_page": next_page,
        "prev_page": null,
        "results": results,
    }))
    .into_response()
}
