use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    FactsNotFound,
    FactsParseError,
    SelfOwnedEntity,
    OwnerCycle,
    UnknownScanRoot,
    UnknownTarget,
    InvalidOutputFormat,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::FactsNotFound => "E1002",
            Self::FactsParseError => "E1003",
            Self::SelfOwnedEntity => "E2001",
            Self::OwnerCycle => "E2002",
            Self::UnknownScanRoot => "E2003",
            Self::UnknownTarget => "E2004",
            Self::InvalidOutputFormat => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::FactsNotFound => "Facts file not found",
            Self::FactsParseError => "Facts file parse error",
            Self::SelfOwnedEntity => "Entity owns itself",
            Self::OwnerCycle => "Ownership cycle",
            Self::UnknownScanRoot => "Unknown scan root",
            Self::UnknownTarget => "Unknown target",
            Self::InvalidOutputFormat => "Invalid output format",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in refscope.toml and retry."),
            Self::FactsNotFound => Some("Check the path passed to the command."),
            Self::FactsParseError => {
                Some("Facts files hold `scan_roots` and `[entities.<name>]` tables.")
            }
            Self::SelfOwnedEntity => Some("Remove the `owner` key or point it at another entity."),
            Self::OwnerCycle => Some("Owners must form a forest; break the cycle."),
            Self::UnknownScanRoot => Some("Declare the scan root under [entities] first."),
            Self::UnknownTarget => None,
            Self::InvalidOutputFormat => Some("Use one of: pretty, text, json."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures loading a facts file.
#[derive(Debug, thiserror::Error)]
pub enum FactsError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("entity '{entity}' lists itself as its owner")]
    SelfOwned { entity: String },

    #[error("ownership cycle through '{entity}'")]
    OwnerCycle { entity: String },

    #[error("scan root '{0}' is not a declared entity")]
    UnknownScanRoot(String),
}

impl FactsError {
    /// Stable code for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Io { source, .. } if matches!(source.kind(), io::ErrorKind::NotFound) => {
                ErrorCode::FactsNotFound
            }
            Self::Io { .. } => ErrorCode::InternalUnexpected,
            Self::Parse { .. } => ErrorCode::FactsParseError,
            Self::SelfOwned { .. } => ErrorCode::SelfOwnedEntity,
            Self::OwnerCycle { .. } => ErrorCode::OwnerCycle,
            Self::UnknownScanRoot(_) => ErrorCode::UnknownScanRoot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 9] = [
        ErrorCode::ConfigParseError,
        ErrorCode::FactsNotFound,
        ErrorCode::FactsParseError,
        ErrorCode::SelfOwnedEntity,
        ErrorCode::OwnerCycle,
        ErrorCode::UnknownScanRoot,
        ErrorCode::UnknownTarget,
        ErrorCode::InvalidOutputFormat,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text[1..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = FactsError::Io {
            path: PathBuf::from("nope.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.error_code(), ErrorCode::FactsNotFound);
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn display_names_the_entity() {
        let err = FactsError::SelfOwned {
            entity: "Player".into(),
        };
        assert_eq!(err.to_string(), "entity 'Player' lists itself as its owner");
        assert_eq!(err.error_code().code(), "E2001");
    }
}
