//! Regular-expression file classifier.

use regex::{Regex, RegexSet};

use prgate_github::files::{FileClassification, FileClassifier, PullRequestFile};

use crate::settings::ClassificationSettings;
use crate::ConfigError;

/// Classifies files by matching their paths against two pattern sets.
///
/// A renamed file is matched on both its old and new path, so moving a file
/// out of a production directory still counts as touching production.
#[derive(Debug, Clone)]
pub struct RegexClassifier {
    production: RegexSet,
    release_notes: RegexSet,
}

impl RegexClassifier {
    /// Compile both pattern lists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` naming the first pattern that
    /// does not compile.
    pub fn new(production: &[String], release_notes: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            production: compile(production)?,
            release_notes: compile(release_notes)?,
        })
    }

    /// Build a classifier from the `classification` settings section.
    pub fn from_settings(settings: &ClassificationSettings) -> Result<Self, ConfigError> {
        Self::new(
            &settings.production_patterns,
            &settings.release_note_patterns,
        )
    }

    fn matches(set: &RegexSet, file: &PullRequestFile) -> bool {
        set.is_match(&file.filename)
            || file
                .previous_filename
                .as_deref()
                .is_some_and(|previous| set.is_match(previous))
    }
}

impl FileClassifier for RegexClassifier {
    fn classify(&self, file: &PullRequestFile) -> FileClassification {
        FileClassification {
            touches_production: Self::matches(&self.production, file),
            touches_release_notes: Self::matches(&self.release_notes, file),
        }
    }
}

fn compile(patterns: &[String]) -> Result<RegexSet, ConfigError> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }
    RegexSet::new(patterns).map_err(|e| ConfigError::InvalidPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
