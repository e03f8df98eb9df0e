//! Unified error types for Nitro Dispatch.
//!
//! Every failure surfaced by the engine is an [`AppError`] tagged with an
//! [`ErrorKind`], so callers can branch on the category while still getting
//! a readable message and, where one exists, the underlying cause.

use std::fmt;
use thiserror::Error;

/// Error category used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Plugin registration was rejected (duplicate name, bad definition).
    PluginRegistration,
    /// Plugin construction or its load/unload callback failed.
    PluginLoad,
    /// The named plugin is unknown or not in the state the operation needs.
    PluginNotFound,
    /// A declared dependency is not a registered plugin.
    MissingDependency,
    /// The dependency graph contains a cycle.
    DependencyCycle,
    /// A hook failed or was used incorrectly.
    Hook,
    /// A hook exceeded its deadline.
    HookTimeout,
    /// Metadata, pattern or event-name validation failed.
    Validation,
    /// Several failures collected into one (see [`AppError::related`]).
    Aggregate,
    /// Configuration could not be built or deserialized.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginRegistration => write!(f, "PLUGIN_REGISTRATION"),
            Self::PluginLoad => write!(f, "PLUGIN_LOAD"),
            Self::PluginNotFound => write!(f, "PLUGIN_NOT_FOUND"),
            Self::MissingDependency => write!(f, "MISSING_DEPENDENCY"),
            Self::DependencyCycle => write!(f, "DEPENDENCY_CYCLE"),
            Self::Hook => write!(f, "HOOK"),
            Self::HookTimeout => write!(f, "HOOK_TIMEOUT"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Aggregate => write!(f, "AGGREGATE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// The unified error used throughout Nitro Dispatch.
///
/// Subsystem failures are mapped into `AppError` with explicit
/// `.map_err()` calls or `From` impls. Aggregated failures keep their
/// individual errors in `related`.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Individual failures folded into an aggregate error.
    pub related: Vec<AppError>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            related: Vec::new(),
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
            related: Vec::new(),
        }
    }

    /// Create an aggregate error from a list of individual failures.
    pub fn aggregate(message: impl Into<String>, related: Vec<AppError>) -> Self {
        Self {
            kind: ErrorKind::Aggregate,
            message: message.into(),
            source: None,
            related,
        }
    }

    /// Create a plugin registration error.
    pub fn plugin_registration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginRegistration, message)
    }

    /// Create a plugin load error.
    pub fn plugin_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginLoad, message)
    }

    /// Create a plugin-not-found error.
    pub fn plugin_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PluginNotFound, message)
    }

    /// Create a missing-dependency error.
    pub fn missing_dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingDependency, message)
    }

    /// Create a dependency-cycle error.
    pub fn dependency_cycle(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependencyCycle, message)
    }

    /// Create a hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook, message)
    }

    /// Create a hook timeout error.
    pub fn hook_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HookTimeout, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Whether this is one of the two dependency resolution failures.
    pub fn is_dependency(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MissingDependency | ErrorKind::DependencyCycle
        )
    }

    /// Whether this error is, or aggregates, a failure of the given kind.
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind || self.related.iter().any(|e| e.contains_kind(kind))
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
            related: self.related.clone(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
