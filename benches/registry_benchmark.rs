use criterion::{black_box, criterion_group, criterion_main, Criterion};
use onebox::extract::{opengraph, PageMeta};
use onebox::render::RenderContext;
use onebox::{Guard, OneboxConfig, Registry, Template};
use std::time::Duration;
use url::Url;

const MOCK_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Test Page</title>
    <meta property="og:title" content="Test Title">
    <meta property="og:description" content="Test Description with <b>markup</b> &amp; quotes &quot;">
    <meta property="og:image" content="/image.jpg">
    <link rel="icon" href="https://example.com/favicon.ico">
</head>
<body>
    <h1>Test Content</h1>
</body>
</html>"#;

const URLS: &[&str] = &[
    "https://youtu.be/dQw4w9WgXcQ",
    "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "https://github.com/rust-lang/rust",
    "https://github.com/rust-lang/rust/issues/1",
    "https://en.wikipedia.org/wiki/Rust",
    "https://x.com/rustlang/status/1234567890",
    "https://cdn.example.com/image.png",
    "https://totally-unknown-service.test/x",
];

fn bench_matching(c: &mut Criterion) {
    let config = OneboxConfig::default();
    let registry = Registry::with_defaults(&config).unwrap();
    let guard = Guard::default();
    let urls: Vec<Url> = URLS.iter().map(|u| Url::parse(u).unwrap()).collect();

    let mut group = c.benchmark_group("matching");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("select_engine", |b| {
        b.iter(|| {
            for url in &urls {
                black_box(registry.select(black_box(url)));
            }
        })
    });

    group.bench_function("guard_check", |b| {
        b.iter(|| {
            for raw in URLS {
                black_box(guard.check(black_box(raw)).is_ok());
            }
        })
    });

    group.finish();
}

fn bench_extract_and_render(c: &mut Criterion) {
    let base = Url::parse("https://example.com/post").unwrap();
    let template = Template::parse(
        r#"<aside>{{#image}}<img src="{{url:image}}">{{/image}}<h3><a href="{{url:link}}">{{title}}</a></h3><p>{{description}}</p></aside>"#,
    )
    .unwrap();
    let ctx = RenderContext {
        base: &base,
        max_text_length: 250,
        force_https: false,
    };

    let mut group = c.benchmark_group("extraction");

    group.bench_function("page_meta_parse", |b| {
        b.iter(|| black_box(PageMeta::parse(black_box(MOCK_HTML))))
    });

    let meta = PageMeta::parse(MOCK_HTML);
    let mut data = opengraph::extract(&meta);
    data.insert_text("link", base.as_str());

    group.bench_function("template_render", |b| {
        b.iter(|| black_box(template.render(black_box(&data), &ctx)))
    });

    group.finish();
}

criterion_group!(benches, bench_matching, bench_extract_and_render);
criterion_main!(benches);
