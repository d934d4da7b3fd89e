//! Authoring-time diagnostics for experience content.

use core::fmt;

/// Outcome of validating one piece of content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataValidation {
    Valid,
    Invalid,
    #[default]
    NotValidated,
}

impl DataValidation {
    /// Combines two results: any `Invalid` wins, then any `Valid`.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Invalid, _) | (_, Self::Invalid) => Self::Invalid,
            (Self::Valid, _) | (_, Self::Valid) => Self::Valid,
            _ => Self::NotValidated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    Error(String),
    Warning(String),
}

impl ValidationIssue {
    pub fn message(&self) -> &str {
        match self {
            Self::Error(message) | Self::Warning(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error: {message}"),
            Self::Warning(message) => write!(f, "warning: {message}"),
        }
    }
}

/// Collects issues while content validates itself.
#[derive(Clone, Debug, Default)]
pub struct ValidationContext {
    issues: Vec<ValidationIssue>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue::Error(message.into()));
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue::Warning(message.into()));
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}
