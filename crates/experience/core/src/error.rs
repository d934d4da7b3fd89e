//! Common error infrastructure for the experience crates.
//!
//! Concern-specific errors (`ChainError`, `RegistryError`, the runtime's
//! `LedgerError` and `ManagerError`) live next to the code that raises them.
//! This module only provides the classification they share so callers can
//! decide whether to log and continue, reject content, or treat the failure as
//! a bug.

/// Severity level of an error, used for categorization and logging priority.
///
/// - **Recoverable**: a collaborator failed transiently; a later attempt may succeed
/// - **Validation**: content or caller input is wrong and must be fixed
/// - **Internal**: a protocol between components was violated (double release, stage skip)
/// - **Fatal**: the session cannot continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Transient collaborator failure (bundle or plugin load).
    Recoverable,

    /// Invalid content or request, should not be retried unchanged.
    ///
    /// Examples: unresolvable experience id, null action entry.
    Validation,

    /// Protocol violation between components.
    ///
    /// These indicate bugs and should be investigated.
    Internal,

    /// Unrecoverable, the owning session should be torn down.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all experience errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity by who has to act on it, not by impact
pub trait ExperienceErrorKind: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for log filtering and assertions in tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels_match_display() {
        for severity in [
            ErrorSeverity::Recoverable,
            ErrorSeverity::Validation,
            ErrorSeverity::Internal,
            ErrorSeverity::Fatal,
        ] {
            assert_eq!(severity.to_string(), severity.as_str());
        }
    }

    #[test]
    fn internal_covers_fatal() {
        assert!(ErrorSeverity::Fatal.is_internal());
        assert!(ErrorSeverity::Internal.is_internal());
        assert!(!ErrorSeverity::Validation.is_internal());
        assert!(ErrorSeverity::Recoverable.is_recoverable());
    }
}
