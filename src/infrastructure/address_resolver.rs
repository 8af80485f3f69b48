//! Address resolution
//!
//! Normalizes an address, fetches it through a [`Transport`], chases
//! `<meta http-equiv="refresh">` redirections and works out the charset
//! of the final bytes before decoding them.

use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::bytes::Regex;
use tracing::{debug, warn};
use url::{Position, Url};

use crate::infrastructure::errors::RetrievalError;
use crate::infrastructure::transport::Transport;

/// Schemes an address may use.
pub const ACCEPTED_SCHEMES: [&str; 3] = ["https", "http", "file"];

/// Charset assumed when nothing else declares one.
pub const DEFAULT_FALLBACK_CHARSET: &str = "ISO-8859-1";

/// Upper bound on chained refresh redirections for one address.
pub const MAX_REDIRECTS: usize = 10;

static META_REFRESH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta http-equiv="refresh" content="(?:[^;]+;\s+)?URL=([^"]+)""#)
        .unwrap_or_else(|e| unreachable!("invalid refresh regex: {e}"))
});

static META_HTTP_EQUIV_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta http-equiv="content-type"[^>]*?charset="([^"]+)""#)
        .unwrap_or_else(|e| unreachable!("invalid content-type regex: {e}"))
});

static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta charset="([^"]+)""#)
        .unwrap_or_else(|e| unreachable!("invalid charset regex: {e}"))
});

/// Bytes of the final page after redirections, with the charset the transport declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub address: Url,
    pub bytes: Vec<u8>,
    pub declared_charset: Option<String>,
}

/// Decoded contents and the charset used to decode them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub contents: String,
    pub charset: String,
}

/// True if `address` parses and uses one of [`ACCEPTED_SCHEMES`].
pub fn is_accepted_address(address: &str) -> bool {
    Url::parse(address).is_ok_and(|url| ACCEPTED_SCHEMES.contains(&url.scheme()))
}

pub struct AddressResolver<T> {
    transport: T,
    fallback_charset: String,
}

impl<T: Transport> AddressResolver<T> {
    pub fn new(transport: T, fallback_charset: impl Into<String>) -> Self {
        Self {
            transport,
            fallback_charset: fallback_charset.into(),
        }
    }

    pub fn fallback_charset(&self) -> &str {
        &self.fallback_charset
    }

    /// Fetch `address`, following refresh redirections until a page without one.
    pub async fn retrieve(&self, address: &str) -> Result<Retrieved, RetrievalError> {
        let mut current = parse_accepted(address)?;
        if current.scheme() == "file" {
            normalize_file_address(&mut current);
        }

        let mut redirects = 0;
        loop {
            debug!("Processing URL «{current}».");
            let fetched = self.transport.fetch(&current).await?;
            let Some(target) = find_refresh_target(&fetched.body) else {
                return Ok(Retrieved {
                    address: current,
                    bytes: fetched.body,
                    declared_charset: fetched.charset.filter(|c| !c.is_empty()),
                });
            };
            if redirects == MAX_REDIRECTS {
                return Err(RetrievalError::generic(format!(
                    "Too many redirections, last one to «{target}»"
                )));
            }
            redirects += 1;
            current = resolve_redirect(&current, &target)?;
            debug!("URL redirected to «{current}».");
        }
    }

    /// Charset for `bytes`: declared, then content-type meta, then meta charset, then fallback.
    pub fn detect_charset(&self, bytes: &[u8], declared: Option<&str>) -> String {
        if let Some(declared) = declared.filter(|c| !c.is_empty()) {
            debug!("Charset found in headers.");
            return declared.to_string();
        }
        debug!("Charset not found in headers.");
        if let Some(charset) = capture_ascii(&META_HTTP_EQUIV_CHARSET_RE, bytes) {
            debug!("Charset found via meta http-equiv.");
            return charset;
        }
        if let Some(charset) = capture_ascii(&META_CHARSET_RE, bytes) {
            debug!("Charset found via meta charset.");
            return charset;
        }
        debug!("Charset not found, using default.");
        self.fallback_charset.clone()
    }

    /// Decode `bytes` as `charset`, falling back to the configured charset for unknown labels.
    pub fn decode(&self, bytes: &[u8], charset: &str) -> String {
        let encoding = Encoding::for_label(charset.as_bytes())
            .or_else(|| {
                warn!("Unknown charset «{charset}», using «{}».", self.fallback_charset);
                Encoding::for_label(self.fallback_charset.as_bytes())
            })
            .unwrap_or(encoding_rs::WINDOWS_1252);
        let (contents, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!("Malformed sequences replaced while decoding as {}.", encoding.name());
        }
        contents.into_owned()
    }

    /// Retrieve, detect the charset and decode in one go.
    pub async fn resolve(&self, address: &str) -> Result<Resolution, RetrievalError> {
        let retrieved = self.retrieve(address).await?;
        let charset = self.detect_charset(&retrieved.bytes, retrieved.declared_charset.as_deref());
        debug!("Contents encoded with charset «{charset}».");
        Ok(Resolution {
            contents: self.decode(&retrieved.bytes, &charset),
            charset,
        })
    }
}

fn parse_accepted(address: &str) -> Result<Url, RetrievalError> {
    match Url::parse(address) {
        Ok(url) if ACCEPTED_SCHEMES.contains(&url.scheme()) => Ok(url),
        _ => Err(RetrievalError::UnknownUrlType {
            url: address.to_string(),
        }),
    }
}

fn capture_ascii(regex: &Regex, bytes: &[u8]) -> Option<String> {
    let capture = regex.captures(bytes)?.get(1)?;
    Some(String::from_utf8_lossy(capture.as_bytes()).into_owned())
}

/// Target of the first refresh directive in `bytes`, if any
pub fn find_refresh_target(bytes: &[u8]) -> Option<String> {
    capture_ascii(&META_REFRESH_RE, bytes)
}

/// Resolve a refresh `target` against `base`.
///
/// Scheme and host come from `base` only when `target` lacks them; every
/// other component is taken from `target`, even when empty.
pub fn resolve_redirect(base: &Url, target: &str) -> Result<Url, RetrievalError> {
    let target = target.trim();
    let resolved = match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) if target.starts_with("//") => {
            Url::parse(&format!("{}:{target}", base.scheme()))
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let origin = &base[..Position::BeforePath];
            let separator = if target.starts_with('/') { "" } else { "/" };
            Url::parse(&format!("{origin}{separator}{target}"))
        }
        Err(e) => Err(e),
    };
    resolved.map_err(|e| RetrievalError::generic(format!("Invalid redirection «{target}»: {e}")))
}

/// Fold `.` and `..` segments and re-encode each path segment of a file address.
pub fn normalize_file_address(url: &mut Url) {
    let Some(segments) = url.path_segments() else {
        return;
    };
    let mut resolved: Vec<String> = Vec::new();
    for segment in segments {
        let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned());
        match decoded.as_str() {
            "." => {}
            ".." => {
                resolved.pop();
            }
            _ => resolved.push(decoded),
        }
    }
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(resolved.iter().map(String::as_str));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::MemoryTransport;
    use rstest::rstest;

    const BASE_URL: &str = "http://sub.domain.tld:80/root/sub/p.html;pr?k1=v1&k2=v2#fr";
    const REXTRA: &str = ";rpr?rk1=rv1&rk2=rv2#rfr";

    fn resolver(transport: MemoryTransport) -> AddressResolver<MemoryTransport> {
        AddressResolver::new(transport, DEFAULT_FALLBACK_CHARSET)
    }

    #[rstest]
    fn test_url_redirection(
        #[values("0; ", "1234; ", "")] delay: &str,
        #[values(REXTRA, "")] extra: &str,
        #[values(
            ("https://rsub.rdomain.rtld:8080/rroot/rsub/rp.html", "https://rsub.rdomain.rtld:8080/rroot/rsub/rp.html"),
            ("/rroot/rsub/rp.html", "http://sub.domain.tld:80/rroot/rsub/rp.html"),
        )]
        case: (&str, &str),
    ) {
        let (target, expected) = case;
        let contents = format!(r#"<meta http-equiv="refresh" content="{delay}url={target}{extra}""#);
        let found = find_refresh_target(contents.as_bytes()).unwrap();
        let base = Url::parse(BASE_URL).unwrap();

        let resolved = resolve_redirect(&base, &found).unwrap();
        assert_eq!(resolved, Url::parse(&format!("{expected}{extra}")).unwrap());
    }

    #[test]
    fn test_path_only_redirect_discards_old_query_and_fragment() {
        let base = Url::parse("http://h:80/a/b;pr?q#f").unwrap();
        let resolved = resolve_redirect(&base, "/r/p.html").unwrap();
        assert_eq!(resolved.as_str(), "http://h/r/p.html");
        assert_eq!(resolved.query(), None);
        assert_eq!(resolved.fragment(), None);
    }

    #[test]
    fn test_scheme_relative_redirect_keeps_base_scheme() {
        let base = Url::parse("https://a.example/x").unwrap();
        let resolved = resolve_redirect(&base, "//b.example/y?z").unwrap();
        assert_eq!(resolved.as_str(), "https://b.example/y?z");
    }

    #[rstest]
    #[case(r#"<meta http-equiv="content-type" charset="cp1252">"#, "cp1252")]
    #[case(r#"<META HTTP-EQUIV="Content-Type" content="text/html; CHARSET="cp1252">"#, "cp1252")]
    #[case(r#"<meta charset="cp850">"#, "cp850")]
    #[case(
        r#"<meta http-equiv="content-type" charset="cp1252"><meta charset="cp850">"#,
        "cp1252"
    )]
    #[case(
        r#"<head><meta http-equiv="content-type" content="text/html; charset="iso-8859-1"><link charset="utf-8"></head>"#,
        "iso-8859-1"
    )]
    #[case("<p>nothing declared</p>", DEFAULT_FALLBACK_CHARSET)]
    fn test_charset_detection(#[case] contents: &str, #[case] expected: &str) {
        let resolver = resolver(MemoryTransport::new());
        assert_eq!(resolver.detect_charset(contents.as_bytes(), None), expected);
    }

    #[test]
    fn test_declared_charset_wins() {
        let resolver = resolver(MemoryTransport::new());
        let contents = br#"<meta http-equiv="content-type" charset="cp1252">"#;
        assert_eq!(resolver.detect_charset(contents, Some("utf-8")), "utf-8");
        assert_eq!(resolver.detect_charset(contents, Some("")), "cp1252");
    }

    #[test]
    fn test_decode_uses_fallback_for_unknown_labels() {
        let resolver = resolver(MemoryTransport::new());
        assert_eq!(resolver.decode(b"Espa\xf1a", "cp1252"), "España");
        assert_eq!(resolver.decode(b"Espa\xf1a", "no-such-charset"), "España");
        assert_eq!(resolver.decode("España".as_bytes(), "utf-8"), "España");
    }

    #[rstest]
    #[case("https://example.com/", true)]
    #[case("http://example.com/", true)]
    #[case("file:///tmp/page.html", true)]
    #[case("ftp://example.com/", false)]
    #[case("example.com", false)]
    #[case("catalogue.txt", false)]
    fn test_accepted_addresses(#[case] address: &str, #[case] accepted: bool) {
        assert_eq!(is_accepted_address(address), accepted);
    }

    #[rstest]
    #[case("file:///abspath/path/filename.suffix", "file:///abspath/path/filename.suffix")]
    #[case("file:///base/./relpath/../path/file%20name.html", "file:///base/path/file%20name.html")]
    #[case("file://netloc.url/abspath/x/%2E%2E/y.html?query#fragment", "file://netloc.url/abspath/y.html?query#fragment")]
    fn test_file_address_normalization(#[case] address: &str, #[case] expected: &str) {
        let mut url = Url::parse(address).unwrap();
        normalize_file_address(&mut url);
        assert_eq!(url.as_str(), expected);
    }

    #[tokio::test]
    async fn test_retrieve_follows_redirect_chain() {
        let transport = MemoryTransport::new()
            .with_page(
                "http://catalogue.example/start",
                r#"<meta http-equiv="refresh" content="0; url=/record?id=7">"#,
                None,
            )
            .with_page("http://catalogue.example/record?id=7", "<p>record</p>", Some("utf-8"));

        let retrieved = resolver(transport)
            .retrieve("http://catalogue.example/start")
            .await
            .unwrap();
        assert_eq!(retrieved.address.as_str(), "http://catalogue.example/record?id=7");
        assert_eq!(retrieved.bytes, b"<p>record</p>");
        assert_eq!(retrieved.declared_charset.as_deref(), Some("utf-8"));
    }

    #[tokio::test]
    async fn test_retrieve_rejects_unknown_schemes() {
        let error = resolver(MemoryTransport::new())
            .retrieve("ftp://example.com/file")
            .await
            .unwrap_err();
        assert!(matches!(error, RetrievalError::UnknownUrlType { .. }));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_capped() {
        let transport = MemoryTransport::new().with_page(
            "http://loop.example/",
            r#"<meta http-equiv="refresh" content="url=http://loop.example/">"#,
            None,
        );
        let error = resolver(transport)
            .retrieve("http://loop.example/")
            .await
            .unwrap_err();
        assert!(matches!(error, RetrievalError::Generic { .. }));
    }

    #[tokio::test]
    async fn test_resolve_decodes_with_detected_charset() {
        let mut page = br#"<meta http-equiv="content-type" content="text/html; charset="windows-1252">"#.to_vec();
        page.extend_from_slice(b"<p>Cervantes Saavedra, Miguel de \x96 Espa\xf1a</p>");
        let transport = MemoryTransport::new().with_page("http://example.com/", page, None);

        let resolution = resolver(transport).resolve("http://example.com/").await.unwrap();
        assert_eq!(resolution.charset, "windows-1252");
        assert!(resolution.contents.contains("Miguel de – España"));
    }
}
