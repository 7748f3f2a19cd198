//! End-to-end tests
//!
//! Drive the full router against mocked upstream feeds and assets.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::config::ServerConfig;
use crate::feed::build_http_client;
use crate::http::create_router;
use crate::integration::fixtures::{
    feed_xml, mock_asset, mock_asset_with_language, FakeBehavior, FakeEngine,
};
use crate::state::AppState;
use crate::stitch::{ConcatEngine, StitchEngine};

fn app(engine: Arc<dyn StitchEngine>, config: ServerConfig) -> Router {
    let client = build_http_client(&config.feed).unwrap();
    create_router(Arc::new(AppState::with_engine(config, client, engine)))
}

fn fake_app(behavior: FakeBehavior, config: ServerConfig) -> Router {
    app(Arc::new(FakeEngine::new(behavior)), config)
}

fn classified() -> ServerConfig {
    ServerConfig {
        uniform_errors: false,
        ..Default::default()
    }
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn reason(response: Response) -> String {
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    json["reason"].as_str().unwrap_or_default().to_string()
}

/// Serve a feed listing `uris` at `/feed.xml`; returns the encoded feed URI.
async fn serve_feed(server: &mut mockito::ServerGuard, uris: &[&str]) -> (mockito::Mock, String) {
    let mock = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(feed_xml(uris))
        .create_async()
        .await;
    let encoded = urlencoding::encode(&format!("{}/feed.xml", server.url())).into_owned();
    (mock, encoded)
}

#[tokio::test]
async fn test_stitched_multivariant_and_media_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let _one = mock_asset(&mut server, "one").await;
    let _two = mock_asset(&mut server, "two").await;
    let one = format!("{}/one/master.m3u8", server.url());
    let two = format!("{}/two/master.m3u8", server.url());
    let (_feed, encoded) = serve_feed(&mut server, &[&one, &two]).await;

    let engine: Arc<dyn StitchEngine> = Arc::new(ConcatEngine::new(reqwest::Client::new()));

    let response = get(
        app(engine.clone(), ServerConfig::default()),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let master = body_string(response).await;
    let video_uris: Vec<&str> = master
        .lines()
        .filter(|l| l.starts_with("media.m3u8?bw="))
        .collect();
    assert_eq!(video_uris.len(), 2);
    for uri in &video_uris {
        assert!(uri.ends_with(&format!("&mrss={}", encoded)), "{}", uri);
    }
    assert!(master.contains(&format!(
        "URI=\"media.m3u8?audiotrack=aac-en&mrss={}\"",
        encoded
    )));

    // Child URIs are relative to the multivariant manifest.
    let response = get(
        app(engine.clone(), ServerConfig::default()),
        &format!("/v2v/{}", video_uris[0]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let media = body_string(response).await;
    assert!(media.starts_with("#EXTM3U"));
    assert_eq!(media.matches("#EXT-X-DISCONTINUITY").count(), 1);
    assert!(media.contains(&format!("{}/one/360p/seg0.ts", server.url())));
    assert!(media.contains(&format!("{}/two/360p/seg1.ts", server.url())));

    let response = get(
        app(engine, ServerConfig::default()),
        &format!("/v2v/media.m3u8?audiotrack=aac-en&mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/two/audio/en/seg1.aac"));
}

#[tokio::test]
async fn test_audio_language_with_hyphen_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let _asset = mock_asset_with_language(&mut server, "one", "en-US").await;
    let one = format!("{}/one/master.m3u8", server.url());
    let (_feed, encoded) = serve_feed(&mut server, &[&one]).await;

    let engine: Arc<dyn StitchEngine> = Arc::new(ConcatEngine::new(reqwest::Client::new()));

    let response = get(
        app(engine.clone(), ServerConfig::default()),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let master = body_string(response).await;
    let audio_uri = format!("media.m3u8?audiotrack=aac-en-US&mrss={}", encoded);
    assert!(master.contains(&format!("URI=\"{}\"", audio_uri)), "{}", master);

    let response = get(
        app(engine, ServerConfig::default()),
        &format!("/v2v/{}", audio_uri),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("/one/audio/en/seg0.aac"));
}

#[tokio::test]
async fn test_media_manifest_by_bandwidth() {
    let mut server = mockito::Server::new_async().await;
    let (_feed, encoded) = serve_feed(&mut server, &["http://cdn.example/a/master.m3u8"]).await;

    let response = get(
        fake_app(FakeBehavior::Ok, ServerConfig::default()),
        &format!("/v2v/media.m3u8?mrss={}&bw=500000", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    let body = body_string(response).await;
    assert!(body.contains("http://cdn.example/a/master.m3u8/500000/seg.ts"));
}

#[tokio::test]
async fn test_feed_404_is_500_by_default() {
    let mut server = mockito::Server::new_async().await;
    let _missing = server
        .mock("GET", "/feed.xml")
        .with_status(404)
        .create_async()
        .await;
    let encoded = urlencoding::encode(&format!("{}/feed.xml", server.url())).into_owned();

    let response = get(
        fake_app(FakeBehavior::Ok, ServerConfig::default()),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let reason = reason(response).await;
    assert!(reason.contains("404"), "{}", reason);
    assert!(reason.contains("Not Found"), "{}", reason);
}

#[tokio::test]
async fn test_feed_404_classified_policy() {
    let mut server = mockito::Server::new_async().await;
    let _missing = server
        .mock("GET", "/feed.xml")
        .with_status(404)
        .create_async()
        .await;
    let encoded = urlencoding::encode(&format!("{}/feed.xml", server.url())).into_owned();

    let response = get(
        fake_app(FakeBehavior::Ok, classified()),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_feed_entry_without_link() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_body("<feed><entry><id>a</id></entry></feed>")
        .create_async()
        .await;
    let encoded = urlencoding::encode(&format!("{}/feed.xml", server.url())).into_owned();

    let engine = FakeEngine::new(FakeBehavior::Ok);
    let builds = engine.builds.clone();
    let response = get(
        app(Arc::new(engine), classified()),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(reason(response).await.contains("missing <link>"));
    assert!(builds.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_audiotrack() {
    let query = "/v2v/media.m3u8?audiotrack=abc_en&mrss=http%3A%2F%2Ffeeds.example%2Ffeed.xml";

    let response = get(fake_app(FakeBehavior::Ok, ServerConfig::default()), query).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reason(response).await.contains("abc_en"));

    let response = get(fake_app(FakeBehavior::Ok, classified()), query).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_repeated_query_key() {
    let response = get(
        fake_app(FakeBehavior::Ok, classified()),
        "/v2v/media.m3u8?bw=1&bw=2&mrss=http%3A%2F%2Ffeeds.example%2Ffeed.xml",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(reason(response).await.contains("Invalid query string"));
}

#[tokio::test]
async fn test_missing_selector_and_feed() {
    let response = get(
        fake_app(FakeBehavior::Ok, classified()),
        "/v2v/media.m3u8?mrss=http%3A%2F%2Ffeeds.example%2Ffeed.xml",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(
        fake_app(FakeBehavior::Ok, classified()),
        "/v2v/master.m3u8",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(reason(response).await.contains("mrss"));
}

#[tokio::test]
async fn test_unknown_variant() {
    let mut server = mockito::Server::new_async().await;
    let (_feed, encoded) = serve_feed(&mut server, &["http://cdn.example/a/master.m3u8"]).await;

    let response = get(
        fake_app(FakeBehavior::Ok, classified()),
        &format!("/v2v/media.m3u8?bw=42&mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(reason(response).await.contains("bw=42"));
}

#[tokio::test]
async fn test_stitch_failure() {
    let mut server = mockito::Server::new_async().await;
    let (_feed, encoded) = serve_feed(&mut server, &["http://cdn.example/a/master.m3u8"]).await;

    let response = get(
        fake_app(FakeBehavior::FailLoad, ServerConfig::default()),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reason(response).await.contains("asset probe failed"));
}

#[tokio::test]
async fn test_request_timeout() {
    let mut server = mockito::Server::new_async().await;
    let (_feed, encoded) = serve_feed(&mut server, &["http://cdn.example/a/master.m3u8"]).await;

    let config = ServerConfig {
        request_timeout_secs: 1,
        ..classified()
    };
    let state = AppState::with_engine(
        config,
        reqwest::Client::new(),
        Arc::new(FakeEngine::new(FakeBehavior::Hang(Duration::from_secs(30)))),
    );

    let response = get(
        create_router(Arc::new(state)),
        &format!("/v2v/master.m3u8?mrss={}", encoded),
    )
    .await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_custom_mount_prefix() {
    let config = ServerConfig {
        mount_prefix: "/stitch".to_string(),
        ..Default::default()
    };

    let response = get(
        fake_app(FakeBehavior::Ok, config.clone()),
        "/v2v/master.m3u8?mrss=http%3A%2F%2Ffeeds.example%2Ffeed.xml",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = fake_app(FakeBehavior::Ok, config)
        .oneshot(
            Request::options("/stitch/media.m3u8")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let state = Arc::new(AppState::with_engine(
        ServerConfig::default(),
        reqwest::Client::new(),
        Arc::new(FakeEngine::new(FakeBehavior::Ok)),
    ));
    let router = create_router(state);

    let _ = get(router.clone(), "/v2v/media.m3u8").await;
    let _ = get(router.clone(), "/nowhere").await;

    let response = get(router, "/debug/stats").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["requests"]["media"], 1);
    assert_eq!(json["requests"]["unrouted"], 1);
    assert_eq!(json["failures"]["bad_request"], 1);
    assert_eq!(json["mount_prefix"], "/v2v");
}
