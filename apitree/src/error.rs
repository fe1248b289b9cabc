//! Error handling for apitree.

use std::fmt;

/// Failures produced while resolving an abbreviated expression against an
/// endpoint tree. Every variant carries the data a front end needs to report
/// the failure; text formatting lives only in the `Display` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A path or argument token matched no candidate.
    NotFound {
        token: String,
        candidates: Vec<String>,
    },
    /// A token matched more than one candidate and no tie-break applied.
    Ambiguous {
        token: String,
        matches: Vec<String>,
        candidates: Vec<String>,
    },
    /// Resolution reached a grouping node where an endpoint was required.
    NotEndpoint { path: String, subtree: String },
    /// A supplied argument pair could not be normalized.
    InvalidArgument { pair: String, reason: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { token, candidates } => write!(
                f,
                "nothing matches prefix \"{}\", candidates are: [{}]",
                token,
                candidates.join(", ")
            ),
            ResolveError::Ambiguous {
                token,
                matches,
                candidates,
            } => write!(
                f,
                "prefix \"{}\" is ambiguous, it matches [{}] out of [{}]",
                token,
                matches.join(", "),
                candidates.join(", ")
            ),
            ResolveError::NotEndpoint { path, subtree } => write!(
                f,
                "node at \"{}\" is not an endpoint, it has a sub-tree:\n{}",
                path, subtree
            ),
            ResolveError::InvalidArgument { pair, reason } => {
                write!(f, "invalid argument \"{}\": {}", pair, reason)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// A Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ResolveError::NotFound {
            token: "x".to_string(),
            candidates: vec!["map".to_string(), "info".to_string()],
        };
        assert_eq!(
            format!("{}", err),
            "nothing matches prefix \"x\", candidates are: [map, info]"
        );
    }

    #[test]
    fn test_ambiguous_display() {
        let err = ResolveError::Ambiguous {
            token: "ma".to_string(),
            matches: vec!["map".to_string(), "market-pairs".to_string()],
            candidates: vec![
                "map".to_string(),
                "market-pairs".to_string(),
                "info".to_string(),
            ],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("\"ma\""));
        assert!(msg.contains("[map, market-pairs]"));
        assert!(msg.contains("[map, market-pairs, info]"));
    }

    #[test]
    fn test_not_endpoint_display() {
        let err = ResolveError::NotEndpoint {
            path: "/v1/cryptocurrency".to_string(),
            subtree: "\u{2570} cryptocurrency\n".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("/v1/cryptocurrency"));
        assert!(msg.contains("sub-tree"));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = ResolveError::InvalidArgument {
            pair: "convert".to_string(),
            reason: "expected key=value".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "invalid argument \"convert\": expected key=value"
        );
    }

    #[test]
    fn test_error_source_is_none() {
        let err = ResolveError::NotFound {
            token: "x".to_string(),
            candidates: vec![],
        };
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_error_debug() {
        let err = ResolveError::InvalidArgument {
            pair: "a".to_string(),
            reason: "empty value".to_string(),
        };
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("InvalidArgument"));
    }
}
