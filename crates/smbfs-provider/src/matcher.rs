//! Glob and regex matching over SMB paths.

use regex::Regex;

use crate::error::{Result, SmbError};
use crate::path::SmbPath;

/// Matches paths against a `glob:` or `regex:` pattern; a bare pattern is
/// treated as a regex. Candidates are normalized before matching and the
/// pattern is applied as an unanchored search, so `glob:*.txt` matches
/// `/a/b/c.txt`; anchored regexes can spell `^`/`$` explicitly.
pub struct SmbPathMatcher {
    pattern: Regex,
}

impl SmbPathMatcher {
    pub fn new(syntax_and_pattern: &str) -> Result<Self> {
        let pattern = if let Some(glob) = syntax_and_pattern.strip_prefix("glob:") {
            glob_to_regex(glob)
        } else if let Some(regex) = syntax_and_pattern.strip_prefix("regex:") {
            regex.to_string()
        } else {
            syntax_and_pattern.to_string()
        };
        let pattern = Regex::new(&pattern).map_err(|err| {
            SmbError::invalid_argument(format!(
                "invalid path-matcher pattern '{}': {}",
                syntax_and_pattern, err
            ))
        })?;
        Ok(Self { pattern })
    }

    /// Tells whether the normalized rendering of `path` matches.
    pub fn matches(&self, path: &SmbPath) -> bool {
        self.pattern.is_match(&path.normalize().render())
    }
}

/// Translates a glob into a regex: `*` scans, `?` matches one character,
/// `{a,b}` groups alternatives with `,` as the separator, and `\` escapes
/// the next metacharacter. Regex metacharacters are escaped to literals.
fn glob_to_regex(glob: &str) -> String {
    let glob = glob.trim();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut escaping = false;
    let mut in_curlies = 0u32;
    for ch in glob.chars() {
        match ch {
            '*' => {
                if escaping {
                    out.push_str("\\*");
                } else {
                    out.push_str(".*");
                }
                escaping = false;
            }
            '?' => {
                if escaping {
                    out.push_str("\\?");
                } else {
                    out.push('.');
                }
                escaping = false;
            }
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '@' | '%' => {
                out.push('\\');
                out.push(ch);
                escaping = false;
            }
            '\\' => {
                if escaping {
                    out.push_str("\\\\");
                    escaping = false;
                } else {
                    escaping = true;
                }
            }
            '{' => {
                if escaping {
                    out.push_str("\\{");
                } else {
                    out.push('(');
                    in_curlies += 1;
                }
                escaping = false;
            }
            '}' => {
                if in_curlies > 0 && !escaping {
                    out.push(')');
                    in_curlies -= 1;
                } else if escaping {
                    out.push_str("\\}");
                } else {
                    out.push('}');
                }
                escaping = false;
            }
            ',' => {
                if in_curlies > 0 && !escaping {
                    out.push('|');
                } else if escaping {
                    out.push_str("\\,");
                } else {
                    out.push(',');
                }
                escaping = false;
            }
            _ => {
                escaping = false;
                out.push(ch);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::SmbFileSystem;
    use crate::provider::SmbFileSystemProvider;
    use smbfs_client::MemoryClient;
    use std::collections::HashMap;
    use std::sync::Arc;
    use url::Url;

    fn test_fs() -> Arc<SmbFileSystem> {
        let provider = SmbFileSystemProvider::new(Arc::new(MemoryClient::new()));
        let url = Url::parse("smb://u@h/").unwrap();
        provider.new_file_system(&url, &HashMap::new()).unwrap()
    }

    fn path(fs: &Arc<SmbFileSystem>, s: &str) -> SmbPath {
        SmbPath::new(Arc::clone(fs), s)
    }

    #[test]
    fn glob_star_matches_any_run() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("glob:*.txt").unwrap();
        assert!(matcher.matches(&path(&fs, "/a/b/c.txt")));
        assert!(!matcher.matches(&path(&fs, "/a/b/c.md")));
    }

    #[test]
    fn glob_alternation_groups_on_commas() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("glob:{a,b}.txt").unwrap();
        assert!(matcher.matches(&path(&fs, "/x/a.txt")));
        assert!(matcher.matches(&path(&fs, "/x/b.txt")));
        assert!(!matcher.matches(&path(&fs, "/x/c.txt")));
    }

    #[test]
    fn glob_question_mark_matches_one_character() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("glob:file?.bin").unwrap();
        assert!(matcher.matches(&path(&fs, "/share/file1.bin")));
        assert!(!matcher.matches(&path(&fs, "/share/file12.bin")));
    }

    #[test]
    fn glob_comma_outside_curlies_is_literal() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("glob:a,b").unwrap();
        assert!(matcher.matches(&path(&fs, "/x/a,b")));
        assert!(!matcher.matches(&path(&fs, "/x/ab")));
    }

    #[test]
    fn glob_escape_forces_a_literal_star() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("glob:a\\*b").unwrap();
        assert!(matcher.matches(&path(&fs, "/x/a*b")));
        assert!(!matcher.matches(&path(&fs, "/x/aXb")));
    }

    #[test]
    fn regex_prefix_is_taken_verbatim() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("regex:^/a/[0-9]+\\.log$").unwrap();
        assert!(matcher.matches(&path(&fs, "/a/42.log")));
        assert!(!matcher.matches(&path(&fs, "/a/x.log")));
    }

    #[test]
    fn bare_pattern_is_a_regex() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("c\\.txt$").unwrap();
        assert!(matcher.matches(&path(&fs, "/a/b/c.txt")));
    }

    #[test]
    fn matching_normalizes_the_candidate_first() {
        let fs = test_fs();
        let matcher = SmbPathMatcher::new("regex:^/a/c\\.txt$").unwrap();
        assert!(matcher.matches(&path(&fs, "/a/b/../c.txt")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(matches!(
            SmbPathMatcher::new("regex:(unclosed"),
            Err(SmbError::InvalidArgument { .. })
        ));
    }
}
