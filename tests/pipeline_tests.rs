mod common;

use common::{resolver, resolver_with, MockTransport, YOUTUBE_OEMBED, YOUTUBE_OEMBED_BODY};
use onebox::{OneboxConfig, Resolution};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn youtube_link_embeds_allowlisted_iframe() {
    let transport = MockTransport::new()
        .json(YOUTUBE_OEMBED, YOUTUBE_OEMBED_BODY)
        .into_arc();
    let onebox = resolver(&transport);

    let preview = onebox
        .resolve("https://youtu.be/dQw4w9WgXcQ")
        .await
        .into_preview()
        .expect("youtube preview");

    assert_eq!(preview.engine, "youtube");
    assert!(preview
        .full_html
        .contains(r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ?feature=oembed""#));
    assert!(preview.full_html.contains(r#"width="480""#));
    assert!(preview.full_html.contains(r#"height="360""#));
    let placeholder = preview.placeholder_html.expect("thumbnail placeholder");
    assert!(placeholder.contains("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"));

    // Only the oEmbed endpoint is consulted.
    assert_eq!(transport.requests(), vec![format!("GET {YOUTUBE_OEMBED}")]);
}

#[tokio::test]
async fn youtube_iframe_from_foreign_origin_is_never_emitted() {
    let body = YOUTUBE_OEMBED_BODY.replace(
        "https://www.youtube.com/embed/dQw4w9WgXcQ?feature=oembed",
        "https://evil.example/embed/x",
    );
    let transport = MockTransport::new().json(YOUTUBE_OEMBED, &body).into_arc();

    let resolution = resolver(&transport).resolve("https://youtu.be/dQw4w9WgXcQ").await;

    // The youtube engine refuses to render, the fallback finds nothing.
    assert_eq!(resolution, Resolution::NoPreview);
    assert!(transport.was_requested("https://youtu.be/dQw4w9WgXcQ"));
}

#[tokio::test]
async fn unmatched_url_with_image_content_type_renders_img() {
    let url = "https://totally-unknown-service.test/x";
    let transport = MockTransport::new().content_type(url, "image/png").into_arc();

    let preview = resolver(&transport)
        .resolve(url)
        .await
        .into_preview()
        .expect("image preview");

    assert_eq!(preview.engine, "generic");
    assert!(preview.full_html.contains(&format!(r#"<img src="{url}""#)));
    assert_eq!(
        preview.placeholder_html.as_deref(),
        Some(format!(r#"<img src="{url}">"#).as_str())
    );
    assert_eq!(transport.requests(), vec![format!("HEAD {url}")]);
}

#[tokio::test]
async fn media_type_is_also_detected_on_get() {
    let url = "https://files.test/download?id=7";
    let transport = MockTransport::new()
        .route(reqwest::Method::HEAD, url, onebox::RawResponse::new(405))
        .route(reqwest::Method::GET, url, {
            let mut response = onebox::RawResponse::new(200);
            response.headers.insert(
                reqwest::header::CONTENT_TYPE,
                reqwest::header::HeaderValue::from_static("video/mp4"),
            );
            response
        })
        .into_arc();

    let html = resolver(&transport).resolve(url).await;
    let html = html.html().expect("video preview");
    assert!(html.contains("<video"));
    assert!(html.contains(r#"<source src="https://files.test/download?id=7">"#));
}

#[tokio::test]
async fn failing_oembed_endpoint_yields_no_preview() {
    let transport = MockTransport::new().status(YOUTUBE_OEMBED, 500).into_arc();

    let resolution = resolver(&transport).resolve("https://youtu.be/dQw4w9WgXcQ").await;

    assert_eq!(resolution, Resolution::NoPreview);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn direct_media_links_need_no_fetch() {
    let transport = MockTransport::new().into_arc();
    let onebox = resolver(&transport);

    let image = onebox.resolve("http://cdn.example.com/photos/cat.JPG").await;
    let video = onebox.resolve("https://cdn.example.com/clip.webm").await;
    let audio = onebox.resolve("https://cdn.example.com/song.mp3").await;

    assert!(image
        .html()
        .unwrap()
        .contains(r#"<img src="http://cdn.example.com/photos/cat.JPG""#));
    assert!(video.html().unwrap().contains("<video"));
    assert!(audio.html().unwrap().contains("<audio controls"));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn unparseable_input_is_no_preview() {
    let transport = MockTransport::new().into_arc();
    let onebox = resolver(&transport);

    assert_eq!(onebox.resolve("not a url").await, Resolution::NoPreview);
    assert_eq!(onebox.resolve("").await, Resolution::NoPreview);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn overall_budget_aborts_slow_resolutions() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_secs(60))
        .into_arc();
    let config = OneboxConfig::default()
        .with_fetch_timeout(Duration::from_secs(30))
        .with_resolve_timeout(Duration::from_secs(2));

    let started = tokio::time::Instant::now();
    let resolution = resolver_with(config, &transport)
        .resolve("https://slow.example.com/article")
        .await;

    assert_eq!(resolution, Resolution::NoPreview);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn per_fetch_timeout_degrades_to_no_preview() {
    let transport = MockTransport::new()
        .with_delay(Duration::from_secs(5))
        .into_arc();
    let config = OneboxConfig::default().with_fetch_timeout(Duration::from_secs(1));

    let resolution = resolver_with(config, &transport)
        .resolve("https://slow.example.com/article")
        .await;

    assert_eq!(resolution, Resolution::NoPreview);
    // HEAD, then GET; both time out.
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn batch_results_keep_input_order() {
    let transport = MockTransport::new().into_arc();
    let onebox = resolver(&transport);

    let results = onebox
        .resolve_batch([
            "https://cdn.example.com/a.png",
            "http://127.0.0.1/admin",
            "https://missing.example.com/page",
        ])
        .await;

    assert!(results[0].is_preview());
    assert_eq!(results[1], Resolution::Rejected);
    assert_eq!(results[2], Resolution::NoPreview);
}

#[tokio::test]
async fn resolutions_run_on_spawned_tasks() {
    let transport = MockTransport::new().into_arc();
    let onebox = resolver(&transport);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let onebox = onebox.clone();
            tokio::spawn(async move {
                onebox
                    .resolve(&format!("https://cdn.example.com/{i}.gif"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_preview());
    }
}

#[cfg(feature = "cache")]
#[tokio::test]
async fn cache_stores_only_previews() {
    let transport = MockTransport::new()
        .json(YOUTUBE_OEMBED, YOUTUBE_OEMBED_BODY)
        .into_arc();
    let onebox = resolver(&transport);
    let cache = onebox::PreviewCache::from(onebox.config());

    let first = onebox.resolve_cached("https://youtu.be/dQw4w9WgXcQ", &cache).await;
    let second = onebox.resolve_cached("https://youtu.be/dQw4w9WgXcQ", &cache).await;
    assert!(first.is_preview());
    assert_eq!(first, second);
    assert_eq!(transport.request_count(), 1);

    let rejected = onebox.resolve_cached("http://10.0.0.1/", &cache).await;
    assert_eq!(rejected, Resolution::Rejected);
    assert_eq!(cache.len(), 1);
}

#[test]
fn invalid_configuration_fails_at_startup() {
    let transport: Arc<dyn onebox::Transport> = MockTransport::new().into_arc();
    let config = OneboxConfig::default().with_max_concurrent_resolutions(0);
    assert!(onebox::Onebox::with_transport(config, transport).is_err());
}
