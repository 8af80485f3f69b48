//! Catalogue profiles
//!
//! A profile names a catalogue vendor: the pattern its addresses match, and
//! the parser strategy (plus that strategy's patterns) able to read its pages.

use regex::{Regex, RegexBuilder};
use regex_syntax::ParserBuilder;
use regex_syntax::hir::{Hir, Look};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Reserved key holding the address-matching pattern.
pub const URL_PATTERN_KEY: &str = "url";

/// Attribute-marker strategy: pattern for the class marking a key region.
pub const K_CLASS: &str = "k_class";
/// Attribute-marker strategy: pattern for the class marking a value region.
pub const V_CLASS: &str = "v_class";

/// Metadata-block strategy: tag name of the block marker element.
pub const M_TAG: &str = "m_tag";
/// Metadata-block strategy: attribute name holding the marker.
pub const M_ATTR: &str = "m_attr";
/// Metadata-block strategy: marker value.
pub const M_VALUE: &str = "m_value";

#[derive(Error, Debug)]
pub enum PatternError {
    #[error(transparent)]
    Compile(#[from] regex::Error),

    #[error(transparent)]
    Syntax(#[from] regex_syntax::Error),
}

/// Case-insensitive compiled pattern, usable both as a search and as a
/// whole-subject match.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    search: Regex,
    whole: Regex,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        let search = RegexBuilder::new(source).case_insensitive(true).build()?;
        let hir = ParserBuilder::new().case_insensitive(true).build().parse(source)?;
        let anchored = Hir::concat(vec![Hir::look(Look::Start), hir, Hir::look(Look::End)]);
        let whole = Regex::new(&anchored.to_string())?;
        Ok(Self {
            source: source.to_owned(),
            search,
            whole,
        })
    }

    /// Original pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern matches anywhere in `subject`
    pub fn is_match(&self, subject: &str) -> bool {
        self.search.is_match(subject)
    }

    /// First match anywhere in `subject`
    pub fn find<'s>(&self, subject: &'s str) -> Option<&'s str> {
        self.search.find(subject).map(|m| m.as_str())
    }

    /// True if the pattern matches the whole of `subject`
    pub fn matches_whole(&self, subject: &str) -> bool {
        self.whole.is_match(subject)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// The closed set of parser strategies a profile can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    /// Key and value regions marked by a class attribute on any element.
    AttributeMarker,
    /// A marker element opens a block of `<dt>`/`<dd>` key/value pairs.
    MetadataBlock,
}

impl ParserKind {
    pub const ALL: [Self; 2] = [Self::AttributeMarker, Self::MetadataBlock];

    /// Parameter names required by this strategy
    pub const fn parameters(self) -> &'static [&'static str] {
        match self {
            Self::AttributeMarker => &[K_CLASS, V_CLASS],
            Self::MetadataBlock => &[M_TAG, M_ATTR, M_VALUE],
        }
    }

    /// Strategy whose parameter set is exactly `keys`, if any
    pub fn for_parameters<'a, I>(keys: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut keys: Vec<&str> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();
        Self::ALL.into_iter().find(|kind| {
            let mut required = kind.parameters().to_vec();
            required.sort_unstable();
            required == keys
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::AttributeMarker => "attribute-marker",
            Self::MetadataBlock => "metadata-block",
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed parameters of a strategy, only the ones that strategy uses.
#[derive(Debug, Clone)]
pub enum ParserConfig {
    AttributeMarker {
        key_class: Pattern,
        value_class: Pattern,
    },
    MetadataBlock {
        tag: Pattern,
        attribute: Pattern,
        value: Pattern,
    },
}

impl ParserConfig {
    /// Take the parameters `kind` needs out of `parameters`.
    ///
    /// Returns `None` if any of them is missing.
    pub fn from_parameters(kind: ParserKind, parameters: &mut BTreeMap<String, Pattern>) -> Option<Self> {
        match kind {
            ParserKind::AttributeMarker => Some(Self::AttributeMarker {
                key_class: parameters.remove(K_CLASS)?,
                value_class: parameters.remove(V_CLASS)?,
            }),
            ParserKind::MetadataBlock => Some(Self::MetadataBlock {
                tag: parameters.remove(M_TAG)?,
                attribute: parameters.remove(M_ATTR)?,
                value: parameters.remove(M_VALUE)?,
            }),
        }
    }

    pub const fn kind(&self) -> ParserKind {
        match self {
            Self::AttributeMarker { .. } => ParserKind::AttributeMarker,
            Self::MetadataBlock { .. } => ParserKind::MetadataBlock,
        }
    }
}

/// An immutable, validated catalogue profile.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    url_pattern: Pattern,
    parser_config: ParserConfig,
}

impl Profile {
    pub fn new(name: impl Into<String>, url_pattern: Pattern, parser_config: ParserConfig) -> Self {
        Self {
            name: name.into(),
            url_pattern,
            parser_config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_pattern(&self) -> &Pattern {
        &self.url_pattern
    }

    pub fn parser_config(&self) -> &ParserConfig {
        &self.parser_config
    }

    pub fn kind(&self) -> ParserKind {
        self.parser_config.kind()
    }

    /// True if the address pattern is found anywhere in `address`
    pub fn matches(&self, address: &str) -> bool {
        self.url_pattern.is_match(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(source: &str) -> Pattern {
        Pattern::compile(source).unwrap()
    }

    #[test]
    fn test_pattern_is_case_insensitive() {
        let p = pattern("k_");
        assert!(p.is_match("K_TITLE"));
        assert_eq!(p.find("row K_x"), Some("K_"));
    }

    #[test]
    fn test_whole_match_is_anchored() {
        let p = pattern("d|div");
        assert!(p.matches_whole("div"));
        assert!(p.matches_whole("DIV"));
        assert!(!p.matches_whole("divx"));
        assert!(p.is_match("divx"));
    }

    #[test]
    fn test_verbose_pattern_compiles_both_ways() {
        let p = pattern("(?x)d i v # tag name");
        assert!(p.is_match("a DIV here"));
        assert!(p.matches_whole("div"));
        assert!(!p.matches_whole("divx"));
        assert_eq!(p.as_str(), "(?x)d i v # tag name");
    }

    #[test]
    fn test_kind_from_exact_parameter_set() {
        assert_eq!(
            ParserKind::for_parameters(["v_class", "k_class"]),
            Some(ParserKind::AttributeMarker)
        );
        assert_eq!(
            ParserKind::for_parameters(["m_value", "m_tag", "m_attr"]),
            Some(ParserKind::MetadataBlock)
        );
        assert_eq!(ParserKind::for_parameters(["k_class"]), None);
        assert_eq!(ParserKind::for_parameters(["k_class", "v_class", "m_tag"]), None);
        assert_eq!(ParserKind::for_parameters([]), None);
    }

    #[test]
    fn test_parser_config_takes_only_its_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert(K_CLASS.to_string(), pattern("k_"));
        parameters.insert(V_CLASS.to_string(), pattern("v_"));
        let config = ParserConfig::from_parameters(ParserKind::AttributeMarker, &mut parameters).unwrap();
        assert_eq!(config.kind(), ParserKind::AttributeMarker);
        assert!(parameters.is_empty());

        let mut missing = BTreeMap::new();
        missing.insert(M_TAG.to_string(), pattern("div"));
        assert!(ParserConfig::from_parameters(ParserKind::MetadataBlock, &mut missing).is_none());
    }

    #[test]
    fn test_profile_matches_anywhere_in_address() {
        let mut parameters = BTreeMap::new();
        parameters.insert(K_CLASS.to_string(), pattern("k_"));
        parameters.insert(V_CLASS.to_string(), pattern("v_"));
        let config = ParserConfig::from_parameters(ParserKind::AttributeMarker, &mut parameters).unwrap();
        let profile = Profile::new("bne", pattern(r"catalogo\.bne\.es"), config);

        assert!(profile.matches("http://CATALOGO.bne.es/uhtbin/cgisirsi"));
        assert!(!profile.matches("http://example.com/"));
        assert_eq!(profile.kind(), ParserKind::AttributeMarker);
    }
}
