//! Full generation and preview server runs

mod common;

use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::fs;
use tempfile::TempDir;

use spacetraveling::commands::{generate, init};
use spacetraveling::config::{PrismicConfig, SiteConfig};
use spacetraveling::server::{router, ServerState};
use spacetraveling::templates::ListingChunk;
use spacetraveling::Blog;

use common::{post, ACCESS_TOKEN, PREVIEW_REF};

#[tokio::test]
async fn test_generate_from_fixtures() {
    let dir = TempDir::new().unwrap();
    init::init_site(dir.path()).unwrap();

    let blog = Blog::new(dir.path()).unwrap();
    blog.generate().await.unwrap();

    let public = dir.path().join("public");
    let index = fs::read_to_string(public.join("index.html")).unwrap();
    assert!(index.contains("Como utilizar Hooks"));
    assert!(index.contains("Criando um app CRA do zero"));
    assert!(!index.contains("data-next"));

    let chunk: ListingChunk =
        serde_json::from_str(&fs::read_to_string(public.join("posts/page-1.json")).unwrap())
            .unwrap();
    assert_eq!(chunk.results.len(), 2);
    assert_eq!(chunk.results[0].uid, "como-utilizar-hooks");
    assert_eq!(chunk.next_page, None);

    // The older post links forward to the newer one only
    let older =
        fs::read_to_string(public.join("post/criando-um-app-cra-do-zero/index.html")).unwrap();
    assert!(older.contains("1 min"));
    assert!(older.contains(r#"href="/post/como-utilizar-hooks/""#));
    assert!(older.contains("Próximo post"));
    assert!(!older.contains("Post anterior"));

    let newer = fs::read_to_string(public.join("post/como-utilizar-hooks/index.html")).unwrap();
    assert!(newer.contains("<strong>Nullam</strong>"));
    assert!(newer.contains("Post anterior"));

    assert!(public.join("404.html").exists());
    assert!(public.join("css/style.css").exists());

    blog.clean().unwrap();
    assert!(!public.exists());
}

fn data_next(html: &str) -> Option<String> {
    let marker = "data-next=\"";
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

#[tokio::test]
async fn test_preview_server() {
    let published: Vec<_> = (1..=5)
        .map(|day| post(&format!("id{}", day), &format!("p{}", day), day, 10))
        .collect();
    let repo = common::start(published, vec![post("draft", "rascunho", 6, 10)]).await;

    let dir = TempDir::new().unwrap();
    let config = SiteConfig {
        per_page: 2,
        prismic: PrismicConfig {
            endpoint: repo.endpoint(),
            access_token: ACCESS_TOKEN.to_string(),
            ..PrismicConfig::default()
        },
        ..SiteConfig::default()
    };
    let blog = Blog::with_config(dir.path(), config);
    let report = generate::run_with_options(&blog, false).await.unwrap();
    assert_eq!(report.rendered, 5);
    assert_eq!(report.listing_pages, 3);

    let state = std::sync::Arc::new(ServerState::new(&blog, false).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    // Published site from disk
    let home = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(home.status(), StatusCode::OK);
    let home = home.text().await.unwrap();
    assert!(home.contains("Post p5"));
    assert!(!home.contains("Post rascunho"));

    let draft_url = format!("{}/post/rascunho/", base);
    let missing = client.get(&draft_url).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    // Entering preview
    let response = client
        .get(format!(
            "{}/api/preview?token={}&documentId=draft",
            base, PREVIEW_REF
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()["location"], "/post/rascunho/");
    let set_cookie = response.headers()["set-cookie"].to_str().unwrap().to_string();
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert_eq!(cookie, format!("spacetraveling.preview={}", PREVIEW_REF));

    let draft = client
        .get(&draft_url)
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(draft.status(), StatusCode::OK);
    let draft = draft.text().await.unwrap();
    assert!(draft.contains("Post rascunho"));
    assert!(draft.contains(r#"href="/post/p5/""#));
    assert!(draft.contains("/api/exit-preview"));

    let unknown = client
        .get(format!("{}/post/nope/", base))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    // Live listing under the preview ref
    let home = client
        .get(format!("{}/", base))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(home.contains("Post rascunho"));
    let next = data_next(&home).unwrap();
    assert!(next.starts_with("/api/posts?token="));

    let chunk: ListingChunk = client
        .get(format!("{}{}", base, next))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let uids: Vec<&str> = chunk.results.iter().map(|c| c.uid.as_str()).collect();
    assert_eq!(uids, vec!["p4", "p3"]);
    assert!(chunk.next_page.unwrap().starts_with("/api/posts?token="));

    let bad_cursor = client
        .get(format!("{}/api/posts?token=garbage", base))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_cursor.status(), StatusCode::BAD_REQUEST);

    // Leaving preview
    let exit = client
        .get(format!("{}/api/exit-preview", base))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(exit.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(exit.headers()["location"], "/");
    assert!(exit.headers()["set-cookie"]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    // Content webhook
    let revalidate: serde_json::Value = client
        .post(format!("{}/api/revalidate", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(revalidate["revalidated"], true);
    assert_eq!(revalidate["rendered"], 0);
}

#[tokio::test]
async fn test_revalidate_checks_webhook_secret() {
    let dir = TempDir::new().unwrap();
    init::init_site(dir.path()).unwrap();
    let mut config = SiteConfig::load(dir.path().join("_config.yml")).unwrap();
    config.prismic.webhook_secret = "hook".to_string();
    let blog = Blog::with_config(dir.path(), config);

    let state = std::sync::Arc::new(ServerState::new(&blog, false).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    let client = reqwest::Client::new();
    let url = format!("{}/api/revalidate", base);

    let missing = client.post(&url).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let wrong = client
        .post(format!("{}?secret=nope", url))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(!dir.path().join("public/index.html").exists());

    let webhook = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(r#"{"type":"api-update","secret":"hook"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(webhook.status(), StatusCode::OK);
    assert!(dir.path().join("public/index.html").exists());

    let query = client
        .post(format!("{}?secret=hook", url))
        .send()
        .await
        .unwrap();
    assert_eq!(query.status(), StatusCode::OK);
}
