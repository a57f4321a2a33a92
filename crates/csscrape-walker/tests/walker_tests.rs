//! Integration tests for the stylesheet walk, run against in-memory sites.

use std::time::{Duration, Instant};

use csscrape_css::{CssOrigin, OriginKind};
use csscrape_walker::{ScrapeError, ScrapeRequest, SkipReason, WalkLimits, Walker};
use test_util::StaticSite;

fn kinds(origins: &[CssOrigin]) -> Vec<OriginKind> {
    origins.iter().map(CssOrigin::kind).collect()
}

fn css_of(origins: &[CssOrigin]) -> Vec<&str> {
    origins.iter().map(CssOrigin::css).collect()
}

#[test]
fn test_link_import_and_style_in_order() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<html><head>
                <link rel="stylesheet" href="/a.css">
                <style>body{color:red}</style>
            </head></html>"#,
        )
        .css("https://example.com/a.css", r#"@import url("b.css"); a{}"#)
        .css("https://example.com/b.css", "b{}");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(
        kinds(&result.origins),
        [OriginKind::Link, OriginKind::Import, OriginKind::Style]
    );
    assert_eq!(
        css_of(&result.origins),
        [r#"@import url("b.css"); a{}"#, "b{}", "body{color:red}"]
    );
    let CssOrigin::Import(import) = &result.origins[1] else {
        panic!("expected an import origin");
    };
    assert_eq!(import.href, "b.css");
    assert_eq!(import.url.as_str(), "https://example.com/b.css");
    assert!(result.skipped.is_empty());
}

#[test]
fn test_bare_domain_root() {
    let site = StaticSite::new().html("https://example.com/", "<p style=\"color:red\">");
    let result = Walker::new(&site).get_css("example.com").unwrap();
    assert_eq!(result.css(), "color:red");
    assert_eq!(site.requests(), ["https://example.com/"]);
}

#[test]
fn test_slow_link_keeps_document_order() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="slow.css">
               <style>s{}</style>
               <div style="i:1"></div>
               <link rel="stylesheet" href="fast.css">"#,
        )
        .slow_css("https://example.com/slow.css", "slow{}", Duration::from_millis(150))
        .css("https://example.com/fast.css", "fast{}");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();
    assert_eq!(css_of(&result.origins), ["slow{}", "s{}", "i:1", "fast{}"]);
}

#[test]
fn test_sibling_links_are_fetched_together() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="a.css"><link rel="stylesheet" href="b.css">"#,
        )
        .slow_css("https://example.com/a.css", "a{}", Duration::from_millis(300))
        .slow_css("https://example.com/b.css", "b{}", Duration::from_millis(300));

    let started = Instant::now();
    let result = Walker::new(&site).get_css("https://example.com/").unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.css(), "a{}b{}");
    assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
}

#[test]
fn test_free_worker_takes_the_next_link() {
    // Two workers, with a slow link at each end. The second slow link starts
    // as soon as the fast ones are done instead of waiting on the first.
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="slow1.css">
               <link rel="stylesheet" href="fast1.css">
               <link rel="stylesheet" href="fast2.css">
               <link rel="stylesheet" href="slow2.css">"#,
        )
        .slow_css("https://example.com/slow1.css", "s1{}", Duration::from_millis(300))
        .css("https://example.com/fast1.css", "f1{}")
        .css("https://example.com/fast2.css", "f2{}")
        .slow_css("https://example.com/slow2.css", "s2{}", Duration::from_millis(300));
    let limits = WalkLimits {
        max_concurrency: 2,
        ..WalkLimits::default()
    };

    let started = Instant::now();
    let result = Walker::with_limits(&site, limits)
        .get_css("https://example.com/")
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(css_of(&result.origins), ["s1{}", "f1{}", "f2{}", "s2{}"]);
    assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
}

#[test]
fn test_diamond_imports_fetch_once() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="/left.css">
               <link rel="stylesheet" href="/right.css">
               <link rel="stylesheet" href="/left.css#again">"#,
        )
        .css("https://example.com/left.css", "@import 'shared.css'; l{}")
        .css("https://example.com/right.css", "@import 'shared.css'; r{}")
        .css("https://example.com/shared.css", "s{}");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(
        css_of(&result.origins),
        ["@import 'shared.css'; l{}", "s{}", "@import 'shared.css'; r{}"]
    );
    for url in [
        "https://example.com/left.css",
        "https://example.com/right.css",
        "https://example.com/shared.css",
    ] {
        assert_eq!(site.request_count(url), 1, "{url}");
    }
    // Repeats are not failures.
    assert!(result.skipped.is_empty());
}

#[test]
fn test_circular_imports_terminate() {
    let site = StaticSite::new()
        .html("https://example.com/", r#"<link rel="stylesheet" href="a.css">"#)
        .css("https://example.com/a.css", "@import 'b.css'; a{}")
        .css("https://example.com/b.css", "@import 'a.css'; b{}");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(kinds(&result.origins), [OriginKind::Link, OriginKind::Import]);
    assert_eq!(site.request_count("https://example.com/a.css"), 1);
    assert_eq!(site.request_count("https://example.com/b.css"), 1);
}

#[test]
fn test_self_import_of_css_root() {
    let site = StaticSite::new().css("https://example.com/a.css", "@import 'a.css'; a{}");
    let result = Walker::new(&site).get_css("https://example.com/a.css").unwrap();
    assert_eq!(kinds(&result.origins), [OriginKind::File]);
    assert_eq!(site.request_count("https://example.com/a.css"), 1);
}

#[test]
fn test_one_failing_link_does_not_fail_the_scrape() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="one.css">
               <link rel="stylesheet" href="missing.css">
               <link rel="stylesheet" href="three.css">"#,
        )
        .css("https://example.com/one.css", "one{}")
        .status("https://example.com/missing.css", 404)
        .css("https://example.com/three.css", "three{}");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(css_of(&result.origins), ["one{}", "three{}"]);
    assert_eq!(result.skipped.len(), 1);
    let skipped = &result.skipped[0];
    assert_eq!(skipped.kind, OriginKind::Link);
    assert_eq!(skipped.href, "missing.css");
    assert!(matches!(
        &skipped.reason,
        SkipReason::Fetch { error } if error.status() == Some(404)
    ));
}

#[test]
fn test_skipped_reference_json() {
    let site = StaticSite::new()
        .html("https://example.com/", r#"<link rel="stylesheet" href="/gone.css">"#)
        .status("https://example.com/gone.css", 410);

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "origins": [],
            "skipped": [{
                "kind": "link",
                "href": "/gone.css",
                "url": "https://example.com/gone.css",
                "reason": "fetch",
                "error": "HTTP error 410 from https://example.com/gone.css",
            }],
        })
    );
}

#[test]
fn test_html_answer_for_stylesheet_is_skipped() {
    let site = StaticSite::new()
        .html("https://example.com/", r#"<link rel="stylesheet" href="/theme.css">"#)
        .html("https://example.com/theme.css", "<!DOCTYPE html><h1>Not found</h1>");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert!(result.origins.is_empty());
    assert!(matches!(result.skipped[0].reason, SkipReason::Parse { .. }));
}

#[test]
fn test_depth_limit() {
    let site = StaticSite::new()
        .html("https://example.com/", r#"<link rel="stylesheet" href="1.css">"#)
        .css("https://example.com/1.css", "@import '2.css';")
        .css("https://example.com/2.css", "@import '3.css';")
        .css("https://example.com/3.css", "three{}");
    let limits = WalkLimits {
        max_depth: 2,
        ..WalkLimits::default()
    };

    let result = Walker::with_limits(&site, limits)
        .get_css("https://example.com/")
        .unwrap();

    assert_eq!(result.origins.len(), 2);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].href, "3.css");
    assert_eq!(result.skipped[0].reason, SkipReason::DepthLimit { limit: 2 });
    assert_eq!(site.request_count("https://example.com/3.css"), 0);
}

#[test]
fn test_fetch_limit() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="a.css">
               <link rel="stylesheet" href="b.css">
               <link rel="stylesheet" href="c.css">"#,
        )
        .css("https://example.com/a.css", "a{}")
        .css("https://example.com/b.css", "b{}")
        .css("https://example.com/c.css", "c{}");
    let limits = WalkLimits {
        max_fetches: 2,
        ..WalkLimits::default()
    };

    let result = Walker::with_limits(&site, limits)
        .get_css("https://example.com/")
        .unwrap();

    assert_eq!(result.css(), "a{}b{}");
    assert_eq!(result.skipped[0].reason, SkipReason::FetchLimit { limit: 2 });
    // The root document plus two stylesheets.
    assert_eq!(site.requests().len(), 3);
}

#[test]
fn test_single_fetch_at_a_time_still_completes() {
    let site = StaticSite::new()
        .html(
            "https://example.com/",
            r#"<link rel="stylesheet" href="a.css"><link rel="stylesheet" href="b.css">"#,
        )
        .css("https://example.com/a.css", "a{}")
        .css("https://example.com/b.css", "b{}");
    let limits = WalkLimits {
        max_concurrency: 1,
        ..WalkLimits::default()
    };

    let result = Walker::with_limits(&site, limits)
        .get_css("https://example.com/")
        .unwrap();
    assert_eq!(result.css(), "a{}b{}");
}

#[test]
fn test_base_element_changes_link_resolution() {
    let site = StaticSite::new()
        .html(
            "https://example.com/blog/post",
            r#"<head><base href="https://cdn.example.net/v2/">
               <link rel="stylesheet" href="site.css"></head>"#,
        )
        .css("https://cdn.example.net/v2/site.css", "site{}");

    let result = Walker::new(&site)
        .get_css("https://example.com/blog/post")
        .unwrap();

    assert_eq!(result.css(), "site{}");
    assert_eq!(
        result.origins[0].context_url().map(url::Url::as_str),
        Some("https://cdn.example.net/v2/site.css")
    );
}

#[test]
fn test_base_element_applies_to_style_elements() {
    let site = StaticSite::new()
        .html(
            "https://example.com/blog/post",
            r#"<head><base href="https://cdn.example.net/v2/"></head>
               <style>@import "theme.css"; body{background:url(bg.png)}</style>
               <p style="background:url(dot.png)">"#,
        )
        .css("https://cdn.example.net/v2/theme.css", "t{}");

    let result = Walker::new(&site)
        .get_css("https://example.com/blog/post")
        .unwrap();

    assert_eq!(
        kinds(&result.origins),
        [OriginKind::Style, OriginKind::Import, OriginKind::Inline]
    );
    assert_eq!(site.request_count("https://cdn.example.net/v2/theme.css"), 1);
    assert_eq!(site.request_count("https://example.com/blog/theme.css"), 0);
    assert_eq!(
        result.origins[0].context_url().map(url::Url::as_str),
        Some("https://cdn.example.net/v2/")
    );
    assert_eq!(
        result.absolute_css(),
        concat!(
            r#"@import "https://cdn.example.net/v2/theme.css"; "#,
            r#"body{background:url("https://cdn.example.net/v2/bg.png")}"#,
            "t{}",
            r#"background:url("https://cdn.example.net/v2/dot.png")"#,
        )
    );
}

#[test]
fn test_style_imports_resolve_against_the_page() {
    let site = StaticSite::new()
        .html(
            "https://example.com/docs/",
            "<style>@import 'print.css'; p{}</style>",
        )
        .css("https://example.com/docs/print.css", "print{}");

    let result = Walker::new(&site).get_css("https://example.com/docs/").unwrap();
    assert_eq!(kinds(&result.origins), [OriginKind::Style, OriginKind::Import]);
}

#[test]
fn test_css_root_is_a_file_origin() {
    let site = StaticSite::new()
        .css(
            "https://example.com/styles/main.css",
            "@import url(reset.css); main{}",
        )
        .css("https://example.com/styles/reset.css", "reset{}");

    let result = Walker::new(&site)
        .get_css("https://example.com/styles/main.css")
        .unwrap();

    assert_eq!(kinds(&result.origins), [OriginKind::File, OriginKind::Import]);
    let CssOrigin::File(file) = &result.origins[0] else {
        panic!("expected a file origin");
    };
    assert_eq!(file.href.as_str(), "https://example.com/styles/main.css");
}

#[test]
fn test_imports_resolve_against_the_redirected_url() {
    let site = StaticSite::new()
        .html("https://example.com/", r#"<link rel="stylesheet" href="/old/a.css">"#)
        .redirect("https://example.com/old/a.css", "https://example.com/new/a.css")
        .css("https://example.com/new/a.css", "@import 'b.css';")
        .css("https://example.com/new/b.css", "b{}");

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(result.css(), "@import 'b.css';b{}");
    assert_eq!(site.request_count("https://example.com/old/b.css"), 0);
}

#[test]
fn test_redirected_root_is_claimed_by_its_final_url() {
    let site = StaticSite::new()
        .redirect("https://example.com/style", "https://example.com/css/main.css")
        .css("https://example.com/css/main.css", "@import 'main.css'; main{}");

    let result = Walker::new(&site).get_css("https://example.com/style").unwrap();

    assert_eq!(kinds(&result.origins), [OriginKind::File]);
    assert_eq!(site.request_count("https://example.com/css/main.css"), 0);
    assert_eq!(site.requests(), ["https://example.com/style"]);
}

#[test]
fn test_data_urls_are_decoded_locally() {
    let site = StaticSite::new().html(
        "https://example.com/",
        r#"<link rel="stylesheet" href="data:text/css,a%7Bcolor:red%7D">
           <link rel="stylesheet" href="data:text/css;base64,Ynt9">"#,
    );

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(css_of(&result.origins), ["a{color:red}", "b{}"]);
    assert_eq!(site.requests(), ["https://example.com/"]);
}

#[test]
fn test_local_files_come_first() {
    let site = StaticSite::new()
        .html("https://example.com/", "<style>page{}</style>")
        .css("https://example.com/theme.css", "theme{}");
    let request = ScrapeRequest::new("https://example.com/")
        .with_local_file("tokens.css", "@import 'theme.css'; :root{}");

    let result = Walker::new(&site).scrape(request).unwrap();

    assert_eq!(
        kinds(&result.origins),
        [OriginKind::LocalFile, OriginKind::Import, OriginKind::Style]
    );
}

#[test]
fn test_unresolvable_link_is_skipped() {
    let site = StaticSite::new().html(
        "https://example.com/",
        r#"<link rel="stylesheet" href="http://[broken/a.css"><style>ok{}</style>"#,
    );

    let result = Walker::new(&site).get_css("https://example.com/").unwrap();

    assert_eq!(result.css(), "ok{}");
    assert_eq!(result.skipped[0].reason, SkipReason::UnresolvableUrl);
    assert_eq!(result.skipped[0].url, None);
}

#[test]
fn test_invalid_root_url() {
    let site = StaticSite::new();
    let error = Walker::new(&site).get_css("not a url").unwrap_err();
    assert_eq!(
        error,
        ScrapeError::InvalidRootUrl {
            input: "not a url".to_string()
        }
    );
    assert_eq!(error.status_code(), Some(400));
    assert!(site.requests().is_empty());
}

#[test]
fn test_root_fetch_failure_carries_status() {
    let site = StaticSite::new().status("https://example.com/", 503);
    let error = Walker::new(&site).get_css("https://example.com/").unwrap_err();
    assert!(matches!(error, ScrapeError::RootFetch(_)));
    assert_eq!(error.status_code(), Some(503));
}

#[test]
fn test_unsupported_root_has_no_status() {
    let site = StaticSite::new().route(
        "https://example.com/logo.png",
        "image/png",
        "",
        Duration::ZERO,
    );
    let error = Walker::new(&site)
        .get_css("https://example.com/logo.png")
        .unwrap_err();
    assert!(matches!(error, ScrapeError::RootParse { .. }));
    assert_eq!(error.status_code(), None);
}

#[test]
fn test_absolute_css_rewrites_each_origin_against_its_own_url() {
    let site = StaticSite::new()
        .html(
            "https://example.com/page/",
            r#"<link rel="stylesheet" href="/css/a.css"><div style="background:url(bg.png)">"#,
        )
        .css("https://example.com/css/a.css", "a{background:url(../img/a.png)}");

    let result = Walker::new(&site).get_css("https://example.com/page/").unwrap();

    assert_eq!(
        result.absolute_css(),
        concat!(
            r#"a{background:url("https://example.com/img/a.png")}"#,
            r#"background:url("https://example.com/page/bg.png")"#,
        )
    );
}
