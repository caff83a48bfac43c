//! End-to-end render pipeline against the in-memory backend

use cardshot::memory::{MemoryBackend, PNG_MAGIC};
use cardshot::{
    BrowserPool, CardRenderer, ConsumerSettings, Error, FixedClock, HelpKind, NightMode,
    PoolConfig, RenderConfig, RenderRequest, StaticConsumerConfig, SubscriptionList,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> RenderConfig {
    RenderConfig {
        ready_timeout: Duration::from_millis(50),
        fallback_delay: Duration::from_millis(10),
        settle_delay: Duration::ZERO,
        ..RenderConfig::default()
    }
}

fn renderer(backend: &MemoryBackend, consumers: StaticConsumerConfig) -> CardRenderer {
    let pool = BrowserPool::new(PoolConfig::default(), backend.clone()).unwrap();
    CardRenderer::new(pool, Arc::new(consumers))
        .with_config(fast_config())
        .with_clock(Arc::new(FixedClock::at_timestamp(1_700_100_000)))
}

fn video_request() -> RenderRequest {
    RenderRequest::new(
        "video",
        json!({
            "title": "T",
            "owner": {"name": "A", "face": "u"},
            "pubdate": 1700000000,
            "view": {"count": 12345}
        }),
    )
    .unwrap()
}

#[tokio::test]
async fn video_card_renders_and_releases() {
    let backend = MemoryBackend::new().with_content_height(512);
    let renderer = renderer(&backend, StaticConsumerConfig::new());

    let card = renderer.render(&video_request()).await.unwrap();

    assert!(card.png.starts_with(&PNG_MAGIC));
    assert_eq!((card.width, card.height), (1000, 512));
    assert!(!card.to_base64().is_empty());
    assert_eq!(renderer.pool().stats().active, 0);
    assert_eq!(backend.open_surfaces(), 0);

    let viewport = backend.last_viewport().unwrap();
    assert_eq!(viewport.height, 512);
    assert_eq!(viewport.device_scale_factor, 1.1);

    let markup = backend.last_markup().unwrap();
    assert!(markup.contains(r#"<div class="container theme-light">"#));
    assert!(markup.contains(r#"class="type-badge""#));
    assert!(markup.contains("1.2万"));
}

#[tokio::test]
async fn capture_failure_still_releases() {
    let backend = MemoryBackend::new();
    backend.fail_capture(true);
    let renderer = renderer(&backend, StaticConsumerConfig::new());

    let err = renderer.render(&video_request()).await.unwrap_err();
    assert!(matches!(err, Error::Capture(_)));
    assert_eq!(renderer.pool().stats().active, 0);
    assert_eq!(backend.open_surfaces(), 0);
    assert_eq!(backend.opened(), 1);
}

#[tokio::test]
async fn content_errors_fail_before_acquiring() {
    let backend = MemoryBackend::new();
    let renderer = renderer(&backend, StaticConsumerConfig::new());

    let request = RenderRequest::new("video", json!({"owner": {"name": "A"}})).unwrap();
    let err = renderer.render(&request).await.unwrap_err();
    assert!(err.is_content_error());
    assert_eq!(backend.launches(), 0);

    let err = renderer
        .render_json("podcast", json!({"title": "T"}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedContentType(_)));
}

#[tokio::test]
async fn missing_ready_marker_falls_back_to_delay() {
    let backend = MemoryBackend::new();
    backend.never_ready(true);
    let renderer = renderer(&backend, StaticConsumerConfig::new());

    let card = renderer.render(&video_request()).await.unwrap();
    assert!(card.png.starts_with(&PNG_MAGIC));
    assert_eq!(backend.open_surfaces(), 0);
}

#[tokio::test]
async fn consumer_settings_drive_badge_and_night_mode() {
    let backend = MemoryBackend::new();
    let mut consumers = StaticConsumerConfig::new();
    let mut quiet = ConsumerSettings::default();
    quiet.label_visibility.insert("video".into(), false);
    quiet.night_mode.mode = NightMode::On;
    consumers.insert("group-1", quiet);
    let renderer = renderer(&backend, consumers);

    let request = video_request().with_consumer("group-1");
    renderer.render(&request).await.unwrap();
    let markup = backend.last_markup().unwrap();
    assert!(!markup.contains(r#"class="type-badge""#));
    assert!(markup.contains("theme-dark"));

    // Unknown consumers get defaults: badge shown, day mode
    let request = video_request().with_consumer("group-2");
    renderer.render(&request).await.unwrap();
    let markup = backend.last_markup().unwrap();
    assert!(markup.contains(r#"class="type-badge""#));
    assert!(markup.contains("theme-light"));
}

#[tokio::test]
async fn subscription_list_uses_wrapper_viewport() {
    let backend = MemoryBackend::new().with_content_height(300);
    let renderer = renderer(&backend, StaticConsumerConfig::new());
    let list: SubscriptionList = serde_json::from_value(json!({
        "users": [{"uid": 42, "name": "someone", "face": "f"}]
    }))
    .unwrap();

    let card = renderer
        .render_subscription_list(&list, None, false, "订阅列表")
        .await
        .unwrap();

    assert_eq!((card.width, card.height), (880, 300));
    let viewport = backend.last_viewport().unwrap();
    assert_eq!(viewport.device_scale_factor, 2.0);
    let markup = backend.last_markup().unwrap();
    assert!(markup.contains(r#"<div id="wrapper">"#));
    assert!(!markup.contains("UID:42"));
    assert_eq!(backend.open_surfaces(), 0);
}

#[tokio::test]
async fn help_cards_follow_consumer_night_mode() {
    let backend = MemoryBackend::new().with_content_height(1400);
    let mut consumers = StaticConsumerConfig::new();
    let mut night = ConsumerSettings::default();
    night.night_mode.mode = NightMode::On;
    consumers.insert("group-1", night);
    let renderer = renderer(&backend, consumers);

    let card = renderer
        .render_help_card(HelpKind::Admin, Some("group-1"))
        .await
        .unwrap();
    assert_eq!((card.width, card.height), (1000, 1400));
    let viewport = backend.last_viewport().unwrap();
    assert_eq!(viewport.width, 1000);
    assert_eq!(viewport.device_scale_factor, 1.5);
    let markup = backend.last_markup().unwrap();
    assert!(markup.contains(r#"<body class="theme-dark">"#));
    assert!(markup.contains("tag-root"));

    renderer.render_help_card(HelpKind::User, None).await.unwrap();
    let markup = backend.last_markup().unwrap();
    assert!(markup.contains(r#"<body class="theme-light">"#));
    assert!(markup.contains("Bilibili Assistant"));
    assert!(!markup.contains("tag-root"));
    assert_eq!(backend.open_surfaces(), 0);
    assert_eq!(renderer.pool().stats().active, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_renders_respect_pool_bound() {
    let backend = MemoryBackend::new().with_capture_delay(Duration::from_millis(20));
    let pool = BrowserPool::new(
        PoolConfig {
            max_concurrent: 2,
            ..PoolConfig::default()
        },
        backend.clone(),
    )
    .unwrap();
    let renderer = Arc::new(
        CardRenderer::new(pool, Arc::new(StaticConsumerConfig::new())).with_config(fast_config()),
    );

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let renderer = Arc::clone(&renderer);
            tokio::spawn(async move { renderer.render(&video_request()).await })
        })
        .collect();
    for t in futures::future::join_all(tasks).await {
        t.unwrap().unwrap();
    }

    assert!(backend.peak_open() <= 2);
    assert_eq!(backend.opened(), 6);
    assert_eq!(renderer.pool().stats().active, 0);
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_chrome_video_card() {
    let pool = BrowserPool::chrome(PoolConfig::default()).expect("create pool");
    let renderer = CardRenderer::new(pool.clone(), Arc::new(StaticConsumerConfig::new()));

    let card = renderer.render(&video_request()).await.expect("render");
    assert!(card.png.starts_with(&PNG_MAGIC[..4]));
    assert!(card.height > 0);
    assert_eq!(pool.stats().active, 0);
    pool.shutdown().await.unwrap();
}
