//! Profile store
//!
//! Loads catalogue profiles from an INI file, compiles every pattern and
//! validates each profile against the known parser strategies. Profiles are
//! kept in declaration order; address lookups are first-match-wins.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use ini::{Ini, ParseOption};
use regex_syntax::ParserBuilder;
use tracing::debug;

use crate::domain::profile::{ParserConfig, ParserKind, Pattern, Profile, URL_PATTERN_KEY};
use crate::infrastructure::errors::ProfilesError;

const MISSING_SECTION_HEADER: &str = "MissingSectionHeader";
const PARSING: &str = "Parsing";
const DUPLICATE_SECTION: &str = "DuplicateSection";
const DUPLICATE_OPTION: &str = "DuplicateOption";

const PROFILE_WITHOUT_URL: &str = "The profile does not include a URL pattern.";

/// Immutable, ordered set of validated profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: Vec<Profile>,
}

impl ProfileStore {
    /// Load profiles from the INI file at `path`.
    pub fn load(path: &Path) -> Result<Self, ProfilesError> {
        debug!("Loading profiles from «{}».", path.display());
        let text = std::fs::read_to_string(path).map_err(|_| ProfilesError::MissingProfiles {
            path: path.to_path_buf(),
        })?;
        let store = Self::parse(&text, path)?;
        debug!(
            "Found the following profiles: {}.",
            store.profiles.iter().map(Profile::name).collect::<Vec<_>>().join(", ")
        );
        Ok(store)
    }

    /// Build the store from INI `text`; `origin` only names the source in errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ProfilesError> {
        check_section_headers(text)?;

        let option = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, option)
            .map_err(|e| ProfilesError::wrong_syntax(PARSING, e.to_string()))?;

        let mut profiles = Vec::new();
        for (section, properties) in ini.iter() {
            let Some(name) = section else {
                if properties.iter().next().is_some() {
                    return Err(ProfilesError::wrong_syntax(
                        MISSING_SECTION_HEADER,
                        "Key/value pairs found before any section header.",
                    ));
                }
                continue;
            };
            let pairs = properties
                .iter()
                .map(|(key, value)| (key.to_lowercase(), value.trim()))
                .collect::<Vec<_>>();
            if let Some(profile) = build_profile(name, &pairs)? {
                debug!("Profile «{}» uses the {} parser.", profile.name(), profile.kind());
                profiles.push(profile);
            }
        }

        if profiles.is_empty() {
            return Err(ProfilesError::EmptyProfiles {
                path: origin.to_path_buf(),
            });
        }
        Ok(Self { profiles })
    }

    /// First profile, in declaration order, whose address pattern is found in `address`
    pub fn find(&self, address: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.matches(address))
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|profile| profile.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Reject key/value lines before the first section and repeated section names.
fn check_section_headers(text: &str) -> Result<(), ProfilesError> {
    let mut seen = HashSet::new();
    let mut in_section = false;
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[') {
            let name = header.split_once(']').map_or(header, |(name, _)| name).trim();
            if !seen.insert(name.to_string()) {
                return Err(ProfilesError::wrong_syntax(
                    DUPLICATE_SECTION,
                    format!("Section «{name}» already exists (line {}).", index + 1),
                ));
            }
            in_section = true;
        } else if !in_section {
            return Err(ProfilesError::wrong_syntax(
                MISSING_SECTION_HEADER,
                format!("File contains no section headers (line {}): {line}", index + 1),
            ));
        }
    }
    Ok(())
}

/// Compile and validate one section. Sections without any non-empty value yield `None`.
fn build_profile(name: &str, pairs: &[(String, &str)]) -> Result<Option<Profile>, ProfilesError> {
    let mut seen = HashSet::new();
    for (key, _) in pairs {
        if !seen.insert(key.as_str()) {
            return Err(ProfilesError::wrong_syntax(
                DUPLICATE_OPTION,
                format!("Option «{key}» in section «{name}» already exists."),
            ));
        }
    }

    let mut parameters = BTreeMap::new();
    for (key, value) in pairs.iter().filter(|(_, value)| !value.is_empty()) {
        let pattern = compile(name, key, value)?;
        parameters.insert(key.clone(), pattern);
    }
    if parameters.is_empty() {
        debug!("Profile «{name}» has no values, skipping.");
        return Ok(None);
    }

    let url_pattern = parameters
        .remove(URL_PATTERN_KEY)
        .ok_or_else(|| ProfilesError::invalid_profile(name, Some(PROFILE_WITHOUT_URL)))?;
    let kind = ParserKind::for_parameters(parameters.keys().map(String::as_str))
        .ok_or_else(|| ProfilesError::invalid_profile(name, None))?;
    let config = ParserConfig::from_parameters(kind, &mut parameters)
        .ok_or_else(|| ProfilesError::invalid_profile(name, None))?;

    Ok(Some(Profile::new(name, url_pattern, config)))
}

fn compile(profile: &str, key: &str, source: &str) -> Result<Pattern, ProfilesError> {
    Pattern::compile(source).map_err(|error| {
        let (reason, column) = locate_syntax_error(source).unwrap_or_else(|| (error.to_string(), 0));
        ProfilesError::BadPattern {
            profile: profile.to_string(),
            key: key.to_string(),
            pattern: source.to_string(),
            reason,
            column,
        }
    })
}

/// Reason and character column of the first syntax error in `source`, if it has one.
fn locate_syntax_error(source: &str) -> Option<(String, usize)> {
    let error = ParserBuilder::new().case_insensitive(true).build().parse(source).err()?;
    let (reason, offset) = match &error {
        regex_syntax::Error::Parse(e) => (e.kind().to_string(), e.span().start.offset),
        regex_syntax::Error::Translate(e) => (e.kind().to_string(), e.span().start.offset),
        _ => (error.to_string(), 0),
    };
    let column = source.get(..offset).map_or(0, |prefix| prefix.chars().count());
    Some((reason, column))
}
