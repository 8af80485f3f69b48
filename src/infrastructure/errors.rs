//! Error types for profile loading, sources, retrieval and skimming
//!
//! Every error carries a human message (its `Display`) plus optional
//! detail text that the operator-facing report prints below it.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Separator printed between key and pattern in profile error details.
const KEY_PATTERN_SEPARATOR: &str = " = ";

/// Fatal errors raised while loading the profile configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfilesError {
    #[error("The profiles file «{}» is missing or unreadable.", path.display())]
    MissingProfiles { path: PathBuf },

    #[error("Syntax error «{kind}» while reading the profiles file.")]
    WrongSyntax { kind: String, details: String },

    #[error("Syntax error «BadRegex» while reading the profiles file.")]
    BadPattern {
        profile: String,
        key: String,
        pattern: String,
        reason: String,
        column: usize,
    },

    #[error("Profile «{profile}» is invalid.")]
    InvalidProfile {
        profile: String,
        reason: Option<String>,
    },

    #[error("There are no profiles defined in the profiles file «{}».", path.display())]
    EmptyProfiles { path: PathBuf },
}

impl ProfilesError {
    pub fn wrong_syntax(kind: &str, details: impl Into<String>) -> Self {
        Self::WrongSyntax {
            kind: kind.to_string(),
            details: details.into(),
        }
    }

    pub fn invalid_profile(profile: &str, reason: Option<&str>) -> Self {
        Self::InvalidProfile {
            profile: profile.to_string(),
            reason: reason.map(str::to_string),
        }
    }

    /// Extra lines shown below the message, if any
    pub fn details(&self) -> Option<String> {
        match self {
            Self::WrongSyntax { details, .. } if !details.is_empty() => Some(details.clone()),
            Self::BadPattern {
                profile,
                key,
                pattern,
                reason,
                column,
            } => {
                let offset = key.chars().count() + KEY_PATTERN_SEPARATOR.len() + column;
                Some(format!(
                    "Profile «{profile}», {reason}:\n  {key}{KEY_PATTERN_SEPARATOR}{pattern}\n  {}^",
                    "_".repeat(offset)
                ))
            }
            Self::InvalidProfile {
                reason: Some(reason),
                ..
            } => Some(reason.clone()),
            _ => None,
        }
    }
}

/// Errors that stop processing of a single source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("The source is not of a supported type.")]
    Unsupported,

    #[error("The input file was not found.")]
    InputNotFound,

    #[error("There are not enough permissions to read the input file.")]
    InputNoPermission,

    #[error("There are not enough permissions to create the output file.")]
    OutputNoPermission,

    #[error("The input spreadsheet is invalid.")]
    InvalidSheet { details: String },

    #[error("I/O error while handling the source: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidSheet { details } if !details.is_empty() => Some(details.clone()),
            _ => None,
        }
    }
}

/// Classified failures of the fetch/redirect loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    UnknownUrlType { url: String },
    Network { code: String, message: String },
    Http { status: u16, reason: String },
    Generic { reason: String },
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.category())
    }
}

impl RetrievalError {
    pub fn network(code: impl Into<String>, message: &str) -> Self {
        Self::Network {
            code: code.into(),
            message: normalize_reason(message),
        }
    }

    pub fn http(status: u16, reason: &str) -> Self {
        Self::Http {
            status,
            reason: normalize_reason(&reason.to_lowercase()),
        }
    }

    pub fn generic(reason: impl AsRef<str>) -> Self {
        Self::Generic {
            reason: normalize_reason(reason.as_ref()),
        }
    }

    /// Human category line, e.g. `HTTP protocol error 404: not found.`
    pub fn category(&self) -> String {
        match self {
            Self::UnknownUrlType { url } => format!("URL error: the URL «{url}» is of an unknown type."),
            Self::Network { code, message } => format!("Network error {code}: {message}."),
            Self::Http { status, reason } => format!("HTTP protocol error {status}: {reason}."),
            Self::Generic { reason } => format!("URL error: {reason}."),
        }
    }
}

/// Lower-case the first letter and drop trailing periods.
fn normalize_reason(reason: &str) -> String {
    let reason = reason.trim().trim_end_matches('.');
    let mut chars = reason.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Per-address failures; the run continues with the next address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkimmingError {
    #[error("No profile was found to process the URL.")]
    NoMatchingProfile,

    #[error("Could not access the specified address.")]
    UrlAccess(#[source] RetrievalError),

    #[error("No contents were received from the URL.")]
    NoContents,

    #[error("No metadata was obtained.")]
    NoMetadataFound,
}

impl SkimmingError {
    pub fn details(&self) -> Option<String> {
        match self {
            Self::UrlAccess(error) => Some(error.category()),
            _ => None,
        }
    }
}

impl From<RetrievalError> for SkimmingError {
    fn from(error: RetrievalError) -> Self {
        Self::UrlAccess(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_pattern_details_point_at_failure() {
        let error = ProfilesError::BadPattern {
            profile: "s".to_string(),
            key: "o".to_string(),
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
            column: 0,
        };
        assert_eq!(
            error.to_string(),
            "Syntax error «BadRegex» while reading the profiles file."
        );
        assert_eq!(
            error.details().unwrap(),
            "Profile «s», unclosed group:\n  o = (\n  ____^"
        );
    }

    #[test]
    fn test_invalid_profile_details_are_optional() {
        assert_eq!(ProfilesError::invalid_profile("p", None).details(), None);
        assert_eq!(
            ProfilesError::invalid_profile("p", Some("why")).details().as_deref(),
            Some("why")
        );
    }

    #[test]
    fn test_retrieval_categories() {
        assert_eq!(
            RetrievalError::http(404, "Not Found").category(),
            "HTTP protocol error 404: not found."
        );
        assert_eq!(
            RetrievalError::network("ECONNREFUSED", "Connection refused.").category(),
            "Network error ECONNREFUSED: connection refused."
        );
        assert_eq!(
            RetrievalError::generic("Too many redirections").category(),
            "URL error: too many redirections."
        );
    }

    #[test]
    fn test_url_access_carries_category_as_details() {
        let error = SkimmingError::from(RetrievalError::http(500, "Internal Server Error"));
        assert_eq!(error.to_string(), "Could not access the specified address.");
        assert_eq!(
            error.details().as_deref(),
            Some("HTTP protocol error 500: internal server error.")
        );
        assert_eq!(SkimmingError::NoMetadataFound.details(), None);
    }
}
