//! Tests for the CSS origin model.

use csscrape_css::origin::{
    CssOrigin, FileOrigin, ImportOrigin, InlineOrigin, LinkResource, LocalFileOrigin, OriginKind,
    StyleOrigin,
};
use strum::IntoEnumIterator;
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn link() -> LinkResource {
    LinkResource {
        href: "css/a.css".to_string(),
        url: url("https://example.com/css/a.css"),
        media: Some("screen".to_string()),
        rel: "stylesheet".to_string(),
    }
}

#[test]
fn test_link_resource_promotes_with_css() {
    let origin = CssOrigin::from(link().with_css("a{}".to_string()));
    assert_eq!(origin.kind(), OriginKind::Link);
    assert_eq!(origin.css(), "a{}");
    assert_eq!(
        origin.context_url(),
        Some(&url("https://example.com/css/a.css"))
    );
}

#[test]
fn test_local_file_has_no_context_url() {
    let origin = CssOrigin::LocalFile(LocalFileOrigin {
        name: "tokens.css".to_string(),
        css: "a{background:url(x.png)}".to_string(),
    });
    assert_eq!(origin.context_url(), None);
    // Nothing to resolve against, so the text comes back untouched.
    assert_eq!(origin.absolute_css(), "a{background:url(x.png)}");
}

#[test]
fn test_absolute_css_uses_the_origin_url() {
    let origin = CssOrigin::Import(ImportOrigin {
        href: "../b.css".to_string(),
        css: "a{background:url(x.png)}".to_string(),
        url: url("https://example.com/b.css"),
    });
    assert_eq!(
        origin.absolute_css(),
        r#"a{background:url("https://example.com/x.png")}"#
    );
}

#[test]
fn test_serialized_type_tags() {
    let origins = [
        CssOrigin::LocalFile(LocalFileOrigin {
            name: "n".to_string(),
            css: String::new(),
        }),
        CssOrigin::File(FileOrigin {
            href: url("https://example.com/a.css"),
            css: String::new(),
        }),
        CssOrigin::Import(ImportOrigin {
            href: "b.css".to_string(),
            css: String::new(),
            url: url("https://example.com/b.css"),
        }),
        CssOrigin::from(link().with_css(String::new())),
        CssOrigin::Style(StyleOrigin {
            css: String::new(),
            url: url("https://example.com/"),
        }),
        CssOrigin::Inline(InlineOrigin {
            css: String::new(),
            url: url("https://example.com/"),
        }),
    ];

    for origin in &origins {
        let json = serde_json::to_value(origin).unwrap();
        assert_eq!(json["type"], origin.kind().to_string());
    }
}

#[test]
fn test_link_json_shape() {
    let json = serde_json::to_value(CssOrigin::from(link().with_css("a{}".to_string()))).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "type": "link",
            "href": "css/a.css",
            "url": "https://example.com/css/a.css",
            "media": "screen",
            "rel": "stylesheet",
            "css": "a{}",
        })
    );

    let mut without_media = link();
    without_media.media = None;
    let json = serde_json::to_value(CssOrigin::from(without_media.with_css(String::new()))).unwrap();
    assert!(json.get("media").is_none());
}

#[test]
fn test_kind_names_round_trip() {
    let names: Vec<&'static str> = OriginKind::iter().map(Into::into).collect();
    assert_eq!(
        names,
        ["local-file", "file", "import", "link", "style", "inline"]
    );
    for kind in OriginKind::iter() {
        assert_eq!(kind.to_string().parse::<OriginKind>().unwrap(), kind);
    }
}
