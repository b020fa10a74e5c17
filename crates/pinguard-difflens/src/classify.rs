//! Path-based classification of changed files.

use glob::{MatchOptions, Pattern};
use pinguard_core::{FileKind, PatternSet, PatternsConfig};

/// Glob options approximating minimatch: `*` stays within one path segment
/// while `**` crosses directories. Wildcards never match a leading dot, so
/// dot directories are only reached by patterns that name them.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Compile glob strings, logging and dropping invalid ones.
pub(crate) fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "ignoring invalid glob pattern");
                None
            }
        })
        .collect()
}

struct CompiledSet {
    patterns: Vec<Pattern>,
    file_types: Vec<String>,
}

impl CompiledSet {
    fn new(set: &PatternSet) -> Self {
        Self {
            patterns: compile_patterns(&set.patterns),
            file_types: set.file_types.clone(),
        }
    }

    fn matches(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(path, MATCH_OPTIONS))
            || self.file_types.iter().any(|ext| path.ends_with(ext.as_str()))
    }
}

/// Decides whether a path is a dependency manifest, a migration, or neither.
///
/// Dependency rules are checked first, so a path matching both categories
/// is treated as a dependency.
///
/// # Examples
///
/// ```
/// use pinguard_core::{FileKind, PatternsConfig};
/// use pinguard_difflens::classify::FileClassifier;
///
/// let classifier = FileClassifier::new(&PatternsConfig::default());
/// assert_eq!(classifier.classify("web/package.json"), FileKind::Dependency);
/// assert_eq!(classifier.classify("db/001_init.sql"), FileKind::Migration);
/// assert_eq!(classifier.classify("src/main.rs"), FileKind::Ignored);
/// ```
pub struct FileClassifier {
    dependency: CompiledSet,
    migration: CompiledSet,
}

impl FileClassifier {
    /// Build a classifier from the configured pattern sets.
    pub fn new(config: &PatternsConfig) -> Self {
        Self {
            dependency: CompiledSet::new(&config.dependency),
            migration: CompiledSet::new(&config.migration),
        }
    }

    /// Classify a repository-relative path.
    pub fn classify(&self, path: &str) -> FileKind {
        if self.dependency.matches(path) {
            FileKind::Dependency
        } else if self.migration.matches(path) {
            FileKind::Migration
        } else {
            FileKind::Ignored
        }
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(&PatternsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_manifests() {
        let c = FileClassifier::default();
        for path in [
            "package.json",
            "apps/web/package.json",
            "Dockerfile",
            "services/api/Dockerfile",
            "docker/Dockerfile.prod",
            ".github/workflows/ci.yml",
            "docker-compose.yaml",
        ] {
            assert_eq!(c.classify(path), FileKind::Dependency, "{path}");
        }
    }

    #[test]
    fn migrations() {
        let c = FileClassifier::default();
        for path in [
            "schema.sql",
            "db/seed.db",
            "src/migrations/1709584378_UpdateUserTable.ts",
            "prisma/migration_lock.toml",
            "db/20240101_add_users_migration.rb",
        ] {
            assert_eq!(c.classify(path), FileKind::Migration, "{path}");
        }
    }

    #[test]
    fn everything_else_is_ignored() {
        let c = FileClassifier::default();
        for path in ["src/lib.rs", "README.md", "package-lock.json", "docs/sql.txt"] {
            assert_eq!(c.classify(path), FileKind::Ignored, "{path}");
        }
    }

    #[test]
    fn dependency_wins_over_migration() {
        let c = FileClassifier::default();
        assert_eq!(
            c.classify("migrations/docker-compose.yml"),
            FileKind::Dependency
        );
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let config = PatternsConfig {
            dependency: PatternSet {
                patterns: vec!["deps/*.txt".into()],
                file_types: vec![],
            },
            migration: PatternSet::default(),
        };
        let c = FileClassifier::new(&config);
        assert_eq!(c.classify("deps/requirements.txt"), FileKind::Dependency);
        assert_eq!(c.classify("deps/nested/requirements.txt"), FileKind::Ignored);
    }

    #[test]
    fn wildcards_skip_dot_directories() {
        let config = PatternsConfig {
            dependency: PatternSet {
                patterns: vec!["**/requirements.txt".into()],
                file_types: vec![],
            },
            migration: PatternSet::default(),
        };
        let c = FileClassifier::new(&config);
        assert_eq!(c.classify("svc/requirements.txt"), FileKind::Dependency);
        assert_eq!(c.classify(".venv/requirements.txt"), FileKind::Ignored);
    }

    #[test]
    fn invalid_patterns_are_dropped() {
        let config = PatternsConfig {
            dependency: PatternSet {
                patterns: vec!["[".into(), "**/go.mod".into()],
                file_types: vec![],
            },
            migration: PatternSet::default(),
        };
        let c = FileClassifier::new(&config);
        assert_eq!(c.classify("svc/go.mod"), FileKind::Dependency);
    }
}
