mod common;

use common::{resolver, resolver_with, MockTransport};
use onebox::{Guard, GuardConfig, OneboxConfig, Resolution};

#[tokio::test]
async fn literal_ip_hosts_are_rejected_before_any_request() {
    let transport = MockTransport::new().into_arc();
    let onebox = resolver(&transport);

    for url in [
        "https://malicious.example@127.0.0.1/admin",
        "http://127.0.0.1/",
        "http://2130706433/",
        "http://0x7f.0.0.1/",
        "http://0177.0.0.1/",
        "http://[::1]/",
        "http://[::ffff:127.0.0.1]/",
        "http://169.254.169.254/latest/meta-data",
        "http://localhost:8080/",
        "http://printer.localhost/",
        "file:///etc/passwd",
        "javascript:alert(1)",
    ] {
        assert_eq!(onebox.resolve(url).await, Resolution::Rejected, "{url}");
    }
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn dot_segments_do_not_change_the_checked_host() {
    // WHATWG parsing keeps `malicious.example` as the host; the `@` lands in the path.
    let transport = MockTransport::new().into_arc();
    let resolution = resolver(&transport)
        .resolve("https://malicious.example/../@127.0.0.1/admin")
        .await;

    assert_eq!(resolution, Resolution::NoPreview);
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.contains("https://malicious.example/")));
}

#[tokio::test]
async fn redirect_to_metadata_service_is_never_followed() {
    let transport = MockTransport::new()
        .redirect(
            "https://innocent.example.com/go",
            "http://169.254.169.254/latest/meta-data/",
        )
        .into_arc();

    let resolution = resolver(&transport)
        .resolve("https://innocent.example.com/go")
        .await;

    assert_eq!(resolution, Resolution::Rejected);
    assert!(!transport.was_requested("http://169.254.169.254"));
}

#[tokio::test]
async fn redirect_chain_into_private_space_is_rejected_mid_chain() {
    let transport = MockTransport::new()
        .redirect("https://a.example.com/", "/hop")
        .redirect("https://a.example.com/hop", "https://b.example.com/")
        .redirect("https://b.example.com/", "http://[fd00::1]/internal")
        .into_arc();

    let resolution = resolver(&transport).resolve("https://a.example.com/").await;

    assert_eq!(resolution, Resolution::Rejected);
    assert!(transport.was_requested("https://b.example.com/"));
    assert!(!transport.was_requested("http://[fd00::1]"));
}

#[tokio::test]
async fn redirect_into_a_specific_engine_fetch_is_revalidated() {
    let transport = MockTransport::new()
        .redirect(
            "https://api.github.com/repos/rust-lang/rust",
            "http://10.0.0.5/steal",
        )
        .into_arc();

    let resolution = resolver(&transport)
        .resolve("https://github.com/rust-lang/rust")
        .await;

    assert_eq!(resolution, Resolution::Rejected);
    assert!(!transport.was_requested("http://10.0.0.5"));
}

#[tokio::test]
async fn too_many_redirects_is_no_preview() {
    let transport = MockTransport::new()
        .redirect("https://loop.example.com/", "https://loop.example.com/")
        .into_arc();
    let config = OneboxConfig::default().with_max_redirects(2);

    let resolution = resolver_with(config, &transport)
        .resolve("https://loop.example.com/")
        .await;

    assert_eq!(resolution, Resolution::NoPreview);
    // Three hops for HEAD, three for GET.
    assert_eq!(transport.request_count(), 6);
}

#[tokio::test]
async fn deployment_lists_apply_to_every_hop() {
    let transport = MockTransport::new()
        .redirect("https://shortener.example.com/x", "https://tracker.blocked.test/x")
        .into_arc();
    let config = OneboxConfig::default().with_denied_host("blocked.test");
    let onebox = resolver_with(config, &transport);

    assert_eq!(
        onebox.resolve("https://blocked.test/page").await,
        Resolution::Rejected
    );
    assert_eq!(
        onebox.resolve("https://shortener.example.com/x").await,
        Resolution::Rejected
    );
    assert!(!transport.was_requested("https://tracker.blocked.test"));
}

#[test]
fn allowlist_restricts_to_listed_domains() {
    let guard = Guard::new(GuardConfig::from(
        &OneboxConfig::default().with_allowed_host("example.com"),
    ));

    assert!(guard.is_safe_str("https://www.example.com/a"));
    assert!(guard.is_safe_str("example.com"));
    assert!(!guard.is_safe_str("https://example.org/"));
    assert!(!guard.is_safe_str("notexample.com"));
}

#[tokio::test]
async fn canonical_link_into_private_space_rejects_the_preview() {
    let page = "https://news.example.com/a";
    let transport = MockTransport::new()
        .html(
            page,
            r#"<html><head>
                <title>Page</title>
                <meta property="og:title" content="Page">
                <link rel="canonical" href="http://169.254.169.254/latest">
            </head></html>"#,
        )
        .into_arc();

    let resolution = resolver(&transport).resolve(page).await;

    assert_eq!(resolution, Resolution::Rejected);
    assert!(!transport.was_requested("http://169.254.169.254"));
}

#[tokio::test]
async fn discovered_oembed_endpoint_on_denied_host_rejects_the_preview() {
    let page = "https://blog.example.com/post";
    let transport = MockTransport::new()
        .html(
            page,
            r#"<html><head>
                <title>Post</title>
                <meta property="og:title" content="Post">
                <link rel="alternate" type="application/json+oembed"
                      href="http://127.0.0.1/oembed?url=x">
            </head></html>"#,
        )
        .into_arc();

    let resolution = resolver(&transport).resolve(page).await;

    assert_eq!(resolution, Resolution::Rejected);
    assert!(!transport.was_requested("http://127.0.0.1"));

    let transport = MockTransport::new()
        .html(
            page,
            r#"<html><head>
                <meta property="og:title" content="Post">
                <link rel="alternate" type="application/json+oembed"
                      href="https://embed.internal.test/oembed?url=x">
            </head></html>"#,
        )
        .into_arc();
    let config = OneboxConfig::default().with_denied_host("internal.test");

    let resolution = resolver_with(config, &transport).resolve(page).await;

    assert_eq!(resolution, Resolution::Rejected);
    assert!(!transport.was_requested("https://embed.internal.test"));
}
