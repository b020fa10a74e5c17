use std::fmt;
use std::path::PathBuf;

use pinguard_core::{ChangeKind, DiffHunk, DiffLine, PinguardError};

/// A complete diff for a single file, containing one or more hunks.
///
/// # Examples
///
/// ```
/// use pinguard_difflens::parser::parse_unified_diff;
///
/// let diff = "diff --git a/package.json b/package.json\n\
///             --- a/package.json\n\
///             +++ b/package.json\n\
///             @@ -1,3 +1,4 @@\n\
///              {\n\
///             +  \"name\": \"app\",\n\
///              }\n";
/// let files = parse_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].hunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path in the old version.
    pub old_path: PathBuf,
    /// Path in the new version (`/dev/null` for deletions).
    pub new_path: PathBuf,
    /// Parsed hunks for this file.
    pub hunks: Vec<DiffHunk>,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
}

impl FileDiff {
    fn empty() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: PathBuf::new(),
            hunks: Vec::new(),
            is_new_file: false,
            is_deleted_file: false,
            is_rename: false,
        }
    }

    /// The path review comments are posted against, or `None` when the file
    /// no longer exists in the new version.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinguard_difflens::parser::parse_unified_diff;
    ///
    /// let diff = "--- a/old.sql\n+++ /dev/null\n@@ -1 +0,0 @@\n-DROP TABLE t;\n";
    /// let files = parse_unified_diff(diff).unwrap();
    /// assert!(files[0].target_path().is_none());
    /// ```
    pub fn target_path(&self) -> Option<String> {
        let path = self.new_path.to_string_lossy();
        if path.is_empty() || path == "/dev/null" {
            None
        } else {
            Some(path.into_owned())
        }
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} hunks)",
            self.new_path.display(),
            self.hunks.len()
        )
    }
}

/// Parse a unified diff string (as produced by `git diff` or the GitHub diff
/// media type) into structured [`FileDiff`] entries.
///
/// Handles new files, deleted files, renamed files, and binary files (which
/// are skipped). Every hunk line is recorded with its old and new line
/// numbers.
///
/// # Errors
///
/// Returns [`PinguardError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use pinguard_difflens::parser::parse_unified_diff;
///
/// let files = parse_unified_diff("").unwrap();
/// assert!(files.is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Vec<FileDiff>, PinguardError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut current_hunk: Option<HunkBuilder> = None;
    let mut is_binary = false;

    for line in input.lines() {
        if current_hunk.as_ref().is_some_and(HunkBuilder::is_complete) && !line.starts_with('\\') {
            flush_hunk(&mut current, &mut current_hunk);
        }

        if line.starts_with("diff --git ") {
            flush_hunk(&mut current, &mut current_hunk);
            if let Some(file) = current.take() {
                if !is_binary {
                    files.push(file);
                }
            }
            is_binary = false;
            current = Some(FileDiff::empty());
            continue;
        }

        // Patches without a "diff --git" line start directly with the headers
        if line.starts_with("--- ") && current_hunk.is_none() {
            let needs_new_file = current.as_ref().map_or(true, |file| !file.hunks.is_empty());
            if needs_new_file {
                if let Some(file) = current.take() {
                    if !is_binary {
                        files.push(file);
                    }
                }
                is_binary = false;
                current = Some(FileDiff::empty());
            }
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            is_binary = true;
            continue;
        }

        if current_hunk.is_none() {
            if line.starts_with("new file mode") {
                file.is_new_file = true;
                continue;
            }

            if line.starts_with("deleted file mode") {
                file.is_deleted_file = true;
                continue;
            }

            if let Some(path) = line.strip_prefix("rename from ") {
                file.is_rename = true;
                file.old_path = PathBuf::from(path);
                continue;
            }

            if let Some(path) = line.strip_prefix("rename to ") {
                file.is_rename = true;
                file.new_path = PathBuf::from(path);
                continue;
            }

            if line.starts_with("index ")
                || line.starts_with("similarity index")
                || line.starts_with("old mode")
                || line.starts_with("new mode")
            {
                continue;
            }

            if let Some(path) = line.strip_prefix("--- ") {
                file.old_path = parse_path(path);
                if file.old_path.as_os_str() == "/dev/null" {
                    file.is_new_file = true;
                }
                continue;
            }

            if let Some(path) = line.strip_prefix("+++ ") {
                file.new_path = parse_path(path);
                if file.new_path.as_os_str() == "/dev/null" {
                    file.is_deleted_file = true;
                }
                continue;
            }
        }

        if line.starts_with("@@ ") {
            flush_hunk(&mut current, &mut current_hunk);
            let Some(file) = current.as_ref() else {
                continue;
            };
            let file_path = if file.is_deleted_file {
                file.old_path.clone()
            } else {
                file.new_path.clone()
            };
            current_hunk = Some(HunkBuilder::new(file_path, line)?);
            continue;
        }

        if line.starts_with('\\') {
            continue;
        }

        if let Some(hunk) = current_hunk.as_mut() {
            hunk.push(line);
        }
    }

    flush_hunk(&mut current, &mut current_hunk);
    if let Some(file) = current.take() {
        if !is_binary {
            files.push(file);
        }
    }

    Ok(files)
}

struct HunkBuilder {
    hunk: DiffHunk,
    next_old: u32,
    next_new: u32,
    seen_old: u32,
    seen_new: u32,
}

impl HunkBuilder {
    fn new(file_path: PathBuf, header: &str) -> Result<Self, PinguardError> {
        let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(header)?;
        Ok(Self {
            hunk: DiffHunk {
                file_path,
                header: header.to_string(),
                old_start,
                old_lines,
                new_start,
                new_lines,
                lines: Vec::new(),
            },
            next_old: old_start,
            next_new: new_start,
            seen_old: 0,
            seen_new: 0,
        })
    }

    fn is_complete(&self) -> bool {
        self.seen_old >= self.hunk.old_lines && self.seen_new >= self.hunk.new_lines
    }

    fn push(&mut self, line: &str) {
        let (kind, content) = if let Some(rest) = line.strip_prefix('+') {
            (ChangeKind::Add, rest)
        } else if let Some(rest) = line.strip_prefix('-') {
            (ChangeKind::Delete, rest)
        } else if let Some(rest) = line.strip_prefix(' ') {
            (ChangeKind::Normal, rest)
        } else if line.is_empty() {
            // Some tools strip the trailing space of blank context lines
            (ChangeKind::Normal, "")
        } else {
            return;
        };

        // Headers come from untrusted input; a start near u32::MAX must not overflow
        let (old_line, new_line) = match kind {
            ChangeKind::Add => {
                let n = self.next_new;
                self.next_new = self.next_new.saturating_add(1);
                self.seen_new = self.seen_new.saturating_add(1);
                (None, Some(n))
            }
            ChangeKind::Delete => {
                let o = self.next_old;
                self.next_old = self.next_old.saturating_add(1);
                self.seen_old = self.seen_old.saturating_add(1);
                (Some(o), None)
            }
            ChangeKind::Normal => {
                let o = self.next_old;
                let n = self.next_new;
                self.next_old = self.next_old.saturating_add(1);
                self.next_new = self.next_new.saturating_add(1);
                self.seen_old = self.seen_old.saturating_add(1);
                self.seen_new = self.seen_new.saturating_add(1);
                (Some(o), Some(n))
            }
        };

        self.hunk.lines.push(DiffLine {
            kind,
            old_line,
            new_line,
            content: content.to_string(),
        });
    }
}

fn flush_hunk(current: &mut Option<FileDiff>, hunk: &mut Option<HunkBuilder>) {
    if let Some(h) = hunk.take() {
        if let Some(file) = current.as_mut() {
            file.hunks.push(h.hunk);
        }
    }
}

fn parse_path(raw: &str) -> PathBuf {
    // git appends a tab and timestamp in some patch formats
    let raw = raw.split('\t').next().unwrap_or(raw);
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}

fn parse_hunk_header(line: &str) -> Result<(u32, u32, u32, u32), PinguardError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| PinguardError::Parse(format!("invalid hunk header: {line}")))?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(PinguardError::Parse(format!("invalid hunk header: {line}")));
    }

    let old = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| PinguardError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| PinguardError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_lines) = parse_range(old, line)?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), PinguardError> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| PinguardError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| PinguardError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| PinguardError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_returns_empty_vec() {
        let files = parse_unified_diff("").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn single_file_tracks_line_numbers() {
        let diff = "\
diff --git a/package.json b/package.json
index abc1234..def5678 100644
--- a/package.json
+++ b/package.json
@@ -1,4 +1,4 @@
 {
-  \"express\": \"4.18.2\",
+  \"express\": \"^4.18.2\",
   \"lodash\": \"4.17.21\"
 }
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].new_path, PathBuf::from("package.json"));
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.header, "@@ -1,4 +1,4 @@");
        assert_eq!(hunk.lines.len(), 5);

        assert_eq!(hunk.lines[0].kind, ChangeKind::Normal);
        assert_eq!(hunk.lines[0].old_line, Some(1));
        assert_eq!(hunk.lines[0].new_line, Some(1));

        assert_eq!(hunk.lines[1].kind, ChangeKind::Delete);
        assert_eq!(hunk.lines[1].old_line, Some(2));
        assert_eq!(hunk.lines[1].new_line, None);

        assert_eq!(hunk.lines[2].kind, ChangeKind::Add);
        assert_eq!(hunk.lines[2].old_line, None);
        assert_eq!(hunk.lines[2].new_line, Some(2));
        assert_eq!(hunk.lines[2].content, "  \"express\": \"^4.18.2\",");

        assert_eq!(hunk.lines[3].old_line, Some(3));
        assert_eq!(hunk.lines[3].new_line, Some(3));
    }

    #[test]
    fn single_file_multiple_hunks() {
        let diff = "\
diff --git a/Dockerfile b/Dockerfile
--- a/Dockerfile
+++ b/Dockerfile
@@ -1,2 +1,2 @@
-FROM node:18.17.1
+FROM node:latest
 WORKDIR /app
@@ -10,2 +10,3 @@ RUN npm ci
 COPY . .
+RUN npm run build
 CMD [\"node\", \"index.js\"]
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].hunks.len(), 2);
        assert_eq!(files[0].hunks[1].old_start, 10);
        assert_eq!(files[0].hunks[1].lines[1].new_line, Some(11));
    }

    #[test]
    fn multiple_files() {
        let diff = "\
diff --git a/a.yml b/a.yml
--- a/a.yml
+++ b/a.yml
@@ -1 +1,2 @@
 line1
+line2
diff --git a/b.sql b/b.sql
--- a/b.sql
+++ b/b.sql
@@ -1 +1,2 @@
 line1
+line2
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].new_path, PathBuf::from("a.yml"));
        assert_eq!(files[1].new_path, PathBuf::from("b.sql"));
    }

    #[test]
    fn new_file() {
        let diff = "\
diff --git a/db/001.sql b/db/001.sql
new file mode 100644
--- /dev/null
+++ b/db/001.sql
@@ -0,0 +1,3 @@
+BEGIN;
+CREATE TABLE t (id int);
+COMMIT;
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_new_file);
        assert_eq!(files[0].old_path, PathBuf::from("/dev/null"));
        assert_eq!(files[0].target_path().as_deref(), Some("db/001.sql"));
        let news: Vec<Option<u32>> = files[0].hunks[0].lines.iter().map(|l| l.new_line).collect();
        assert_eq!(news, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn deleted_file() {
        let diff = "\
diff --git a/old.sql b/old.sql
deleted file mode 100644
--- a/old.sql
+++ /dev/null
@@ -1,2 +0,0 @@
-CREATE TABLE t (id int);
-DROP TABLE t;
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_deleted_file);
        assert_eq!(files[0].new_path, PathBuf::from("/dev/null"));
        assert!(files[0].target_path().is_none());
        assert_eq!(files[0].hunks[0].file_path, PathBuf::from("old.sql"));
    }

    #[test]
    fn renamed_file_without_hunks() {
        let diff = "\
diff --git a/old_name.sql b/new_name.sql
similarity index 100%
rename from old_name.sql
rename to new_name.sql
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_rename);
        assert_eq!(files[0].new_path, PathBuf::from("new_name.sql"));
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn binary_files_skipped() {
        let diff = "\
diff --git a/app.db b/app.db
Binary files a/app.db and b/app.db differ
diff --git a/schema.sql b/schema.sql
--- a/schema.sql
+++ b/schema.sql
@@ -1 +1,2 @@
 line1
+line2
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].new_path, PathBuf::from("schema.sql"));
    }

    #[test]
    fn no_newline_at_eof_handled() {
        let diff = "\
diff --git a/f.yml b/f.yml
--- a/f.yml
+++ b/f.yml
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let files = parse_unified_diff(diff).unwrap();
        let lines = &files[0].hunks[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "old");
        assert_eq!(lines[1].content, "new");
    }

    #[test]
    fn added_line_that_looks_like_header_stays_in_hunk() {
        let diff = "\
diff --git a/notes.yml b/notes.yml
--- a/notes.yml
+++ b/notes.yml
@@ -1,1 +1,3 @@
 a
+--- not a header
+b
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].hunks[0].lines.len(), 3);
        assert_eq!(files[0].hunks[0].lines[1].content, "--- not a header");
    }

    #[test]
    fn blank_context_line_without_space() {
        let diff = "--- a/x.yml\n+++ b/x.yml\n@@ -1,3 +1,3 @@\n a\n\n-b\n+c\n";
        let files = parse_unified_diff(diff).unwrap();
        let lines = &files[0].hunks[0].lines;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].kind, ChangeKind::Normal);
        assert_eq!(lines[3].new_line, Some(3));
    }

    #[test]
    fn malformed_hunk_header_is_error() {
        let diff = "--- a/x.yml\n+++ b/x.yml\n@@ -a,b +c @@\n+x\n";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(PinguardError::Parse(_))
        ));
    }

    #[test]
    fn parse_path_handles_quoted_paths() {
        assert_eq!(
            parse_path("\"a/db/my migration.sql\""),
            PathBuf::from("db/my migration.sql")
        );
        assert_eq!(parse_path("b/x.sql\t2024-01-01"), PathBuf::from("x.sql"));
    }

    #[test]
    fn headerless_patches_with_multiple_files() {
        let diff = "\
--- a/one.yml
+++ b/one.yml
@@ -1 +1 @@
-a
+b
--- a/two.yml
+++ b/two.yml
@@ -1 +1 @@
-c
+d
";
        let files = parse_unified_diff(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].new_path, PathBuf::from("two.yml"));
    }

    #[test]
    fn hunk_starting_at_u32_max_does_not_overflow() {
        let diff = "\
--- a/huge.sql
+++ b/huge.sql
@@ -4294967295,1 +4294967295,2 @@
 BEGIN;
+COMMIT;
";
        let files = parse_unified_diff(diff).unwrap();
        let lines = &files[0].hunks[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].old_line, Some(u32::MAX));
        assert_eq!(lines[0].new_line, Some(u32::MAX));
        assert_eq!(lines[1].new_line, Some(u32::MAX));
    }
}
