//! Event pattern compilation and matching.
//!
//! Patterns are dot-separated. Each segment is one of:
//!
//! - a literal (`user`), matched exactly;
//! - a literal prefix followed by `*` (`before_*`), matching any single
//!   event segment that starts with the prefix;
//! - a bare `*` as the **last** segment, matching that segment and every
//!   deeper one (`user.*` matches `user.login` and `user.login.success`).
//!
//! Patterns are compiled once at registration; triggers only walk the
//! compiled segments.

use std::fmt;

use nitro_core::error::AppError;

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    /// Exact match.
    Literal(String),
    /// Single-segment prefix match.
    Prefix(String),
    /// Trailing open suffix: one or more remaining segments.
    Tail,
}

/// A compiled event pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventPattern {
    source: String,
    segments: Vec<Segment>,
}

impl EventPattern {
    /// Compiles a pattern string.
    ///
    /// Fails with a validation error on empty segments or on a `*` that is
    /// neither a whole trailing segment nor the final character of a
    /// non-empty literal segment.
    pub fn compile(pattern: &str) -> Result<Self, AppError> {
        if pattern.is_empty() {
            return Err(AppError::validation("Event pattern must not be empty"));
        }

        let parts: Vec<&str> = pattern.split('.').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(AppError::validation(format!(
                    "Event pattern '{pattern}' contains an empty segment"
                )));
            }

            let segment = match part.find('*') {
                None => Segment::Literal((*part).to_string()),
                Some(_) if *part == "*" => {
                    if index != last {
                        return Err(AppError::validation(format!(
                            "Event pattern '{pattern}': a bare '*' is only allowed as the last segment"
                        )));
                    }
                    Segment::Tail
                }
                Some(pos) if pos == part.len() - 1 => {
                    Segment::Prefix(part[..pos].to_string())
                }
                Some(_) => {
                    return Err(AppError::validation(format!(
                        "Event pattern '{pattern}': '*' must end the segment '{part}'"
                    )));
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// Returns the pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern contains any wildcard segment.
    pub fn is_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Literal(_)))
    }

    /// Decides whether a concrete event name matches this pattern.
    pub fn matches(&self, event: &str) -> bool {
        let mut event_segments = event.split('.');

        for segment in &self.segments {
            let Some(part) = event_segments.next() else {
                return false;
            };

            match segment {
                Segment::Literal(literal) => {
                    if part != literal {
                        return false;
                    }
                }
                Segment::Prefix(prefix) => {
                    if !part.starts_with(prefix.as_str()) {
                        return false;
                    }
                }
                Segment::Tail => return true,
            }
        }

        event_segments.next().is_none()
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Checks that an event name is concrete: non-empty segments, no wildcards.
pub fn validate_event_name(event: &str) -> Result<(), AppError> {
    if event.is_empty() {
        return Err(AppError::validation("Event name must not be empty"));
    }
    if event.contains('*') {
        return Err(AppError::validation(format!(
            "Event name '{event}' must not contain wildcards"
        )));
    }
    if event.split('.').any(str::is_empty) {
        return Err(AppError::validation(format!(
            "Event name '{event}' contains an empty segment"
        )));
    }
    Ok(())
}
