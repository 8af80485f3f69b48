//! End-to-end parsing scenarios driven by INI profiles

use std::path::Path;

use sacamantecas::domain::metadata::{EMPTY_KEY_PLACEHOLDER, MULTIVALUE_SEPARATOR};
use sacamantecas::infrastructure::address_resolver::{
    AddressResolver, DEFAULT_FALLBACK_CHARSET, resolve_redirect,
};
use sacamantecas::infrastructure::{MemoryTransport, ProfileStore, parse_metadata};
use url::Url;

const PROFILES: &str = r#"
[classes]
url = ^https?://opac\.classes\.example/
k_class = k_
v_class = v_

[blocks]
url = ^https?://opac\.blocks\.example/
m_tag = div
m_attr = id
m_value = ^record$

[catch-all]
url = \.example/
k_class = key
v_class = value
"#;

fn store() -> ProfileStore {
    ProfileStore::parse(PROFILES, Path::new("profiles.ini")).unwrap()
}

fn parse(address: &str, markup: &str) -> sacamantecas::domain::Metadata {
    let store = store();
    let profile = store.find(address).unwrap();
    parse_metadata(profile.parser_config(), markup)
}

#[test]
fn class_marked_title() {
    let metadata = parse(
        "http://opac.classes.example/record/1",
        r#"<div class="k_x">Title:</div><div class="v_x">Don Quixote</div>"#,
    );
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata.get("Title"), Some("Don Quixote"));
}

#[test]
fn unclosed_value_yields_nothing() {
    let metadata = parse(
        "http://opac.classes.example/record/1",
        r#"<div class="k_x">Title:</div><div class="v_x">Don Quixote"#,
    );
    assert!(metadata.is_empty());
}

#[test]
fn value_without_any_key_uses_placeholder() {
    let metadata = parse(
        "http://opac.classes.example/record/1",
        r#"<span class="v_a">Orphan</span>"#,
    );
    assert_eq!(metadata.get(EMPTY_KEY_PLACEHOLDER), Some("Orphan"));
}

#[test]
fn repeated_key_collects_distinct_values() {
    let metadata = parse(
        "http://opac.classes.example/record/1",
        r#"
        <p class="k_s">Materia:</p><p class="v_s">Novela</p>
        <p class="v_s">Caballería</p>
        <p class="k_s">Materia:</p><p class="v_s">Novela</p>
        "#,
    );
    assert_eq!(
        metadata.get("Materia"),
        Some(format!("Novela{MULTIVALUE_SEPARATOR}Caballería").as_str())
    );
}

#[test]
fn block_requires_marker() {
    let address = "https://opac.blocks.example/record/9";
    let without_marker = parse(address, "<div><dl><dt>Autor</dt><dd>Cervantes</dd></dl></div>");
    assert!(without_marker.is_empty());

    let with_marker = parse(
        address,
        r#"<div id="record"><dl><dt>Autor</dt><dd>Cervantes</dd></dl></div>"#,
    );
    assert_eq!(with_marker.get("Autor"), Some("Cervantes"));
}

#[test]
fn first_declared_profile_wins() {
    let store = store();
    assert_eq!(store.find("http://opac.classes.example/x").unwrap().name(), "classes");
    assert_eq!(store.find("http://opac.blocks.example/x").unwrap().name(), "blocks");
    assert_eq!(store.find("http://other.example/x").unwrap().name(), "catch-all");
    assert!(store.find("http://nowhere.test/x").is_none());
}

#[test]
fn content_type_meta_beats_meta_charset() {
    let resolver = AddressResolver::new(MemoryTransport::new(), DEFAULT_FALLBACK_CHARSET);
    let bytes = b"<head>\n<meta http-equiv=\"content-type\" content=\"text/html; charset=\"cp1252\">\n<meta charset=\"cp850\">\n</head>";
    assert_eq!(resolver.detect_charset(bytes, None), "cp1252");
    let single_line =
        br#"<meta http-equiv="content-type" charset="cp1252"><meta charset="cp850">"#;
    assert_eq!(resolver.detect_charset(single_line, None), "cp1252");
    assert_eq!(resolver.detect_charset(bytes, Some("utf-8")), "utf-8");
    assert_eq!(resolver.detect_charset(b"<p>plain</p>", None), DEFAULT_FALLBACK_CHARSET);
}

#[test]
fn path_only_redirect_keeps_scheme_and_host() {
    let base = Url::parse("http://h:80/a/b;pr?q#f").unwrap();
    let resolved = resolve_redirect(&base, "/r/p.html").unwrap();
    assert_eq!(resolved, Url::parse("http://h/r/p.html").unwrap());
    assert_eq!(resolved.query(), None);
    assert_eq!(resolved.fragment(), None);
}
