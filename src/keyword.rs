use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::{Error, Result};

/// Stability level for an architecture keyword.
///
/// See [PMS 7.3.3](https://projects.gentoo.org/pms/9/pms.html#keywords).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    /// Stable on this architecture (`amd64`).
    Stable,
    /// Testing on this architecture (`~amd64`).
    Testing,
    /// Explicitly unsupported on this architecture (`-amd64`).
    Disabled,
    /// All architectures are disabled (`-*`).
    DisabledAll,
}

/// A single architecture keyword from a `KEYWORDS` assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyword {
    /// Architecture name (e.g. `amd64`, `arm64`, `x86`).
    pub arch: String,
    /// Stability classification.
    pub stability: Stability,
}

impl Keyword {
    /// Parse the value of a `KEYWORDS` assignment.
    ///
    /// Surrounding quotes, as written in ebuilds, are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::{Keyword, Stability};
    ///
    /// let kws = Keyword::parse_line("\"amd64 ~arm64 -x86 -*\"").unwrap();
    /// assert_eq!(kws.len(), 4);
    /// assert_eq!(kws[1].stability, Stability::Testing);
    /// assert_eq!(kws[3].stability, Stability::DisabledAll);
    /// ```
    pub fn parse_line(input: &str) -> Result<Vec<Keyword>> {
        tokens(input).iter().map(|token| token.parse()).collect()
    }
}

impl FromStr for Keyword {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (stability, arch) = if s == "-*" {
            (Stability::DisabledAll, "*")
        } else if let Some(arch) = s.strip_prefix('~') {
            (Stability::Testing, arch)
        } else if let Some(arch) = s.strip_prefix('-') {
            (Stability::Disabled, arch)
        } else {
            (Stability::Stable, s)
        };

        if arch.is_empty() || arch.starts_with(['~', '-']) {
            return Err(Error::InvalidKeyword(s.to_string()));
        }
        Ok(Keyword {
            arch: arch.to_string(),
            stability,
        })
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.stability {
            Stability::Stable => write!(f, "{}", self.arch),
            Stability::Testing => write!(f, "~{}", self.arch),
            Stability::Disabled => write!(f, "-{}", self.arch),
            Stability::DisabledAll => write!(f, "-*"),
        }
    }
}

/// Split a `KEYWORDS` value into raw tokens.
fn tokens(value: &str) -> Vec<String> {
    value
        .replace(['"', '\''], " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Tokens of a `KEYWORDS` value, or `None` when any of them is malformed.
fn checked_tokens(value: &str) -> Option<Vec<String>> {
    match Keyword::parse_line(value) {
        Ok(keywords) => Some(keywords.iter().map(Keyword::to_string).collect()),
        Err(e) => {
            warn!(value, error = %e, "skipping KEYWORDS line");
            None
        }
    }
}

/// Keyword movement of one ebuild in one commit.
///
/// Computed from the `KEYWORDS=` lines of the commit's patch for that
/// ebuild: the removed line is the previous state, the added line the new
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordDiff {
    /// Tokens present now that were absent before, excluding
    /// stabilizations.
    pub added: Vec<String>,
    /// Stable keywords whose `~arch` form was present before and is gone
    /// now.
    pub stabilized: Vec<String>,
    /// The complete new keyword list.
    pub all: Vec<String>,
}

impl KeywordDiff {
    /// Compute the difference between two keyword lists.
    ///
    /// Without a previous list every new token counts as added, even
    /// stable ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::KeywordDiff;
    ///
    /// let old = vec!["~amd64".to_string(), "~x86".to_string()];
    /// let new = vec!["amd64".to_string(), "~x86".to_string()];
    /// let diff = KeywordDiff::between(Some(old.as_slice()), &new);
    /// assert_eq!(diff.stabilized, ["amd64"]);
    /// assert!(diff.added.is_empty());
    /// ```
    pub fn between(old: Option<&[String]>, new: &[String]) -> KeywordDiff {
        let Some(old) = old else {
            return KeywordDiff {
                added: new.to_vec(),
                stabilized: Vec::new(),
                all: new.to_vec(),
            };
        };

        let contains = |list: &[String], token: &str| list.iter().any(|t| t == token);
        let mut added = Vec::new();
        let mut stabilized = Vec::new();

        for token in new {
            let stable = matches!(
                token.parse::<Keyword>(),
                Ok(Keyword {
                    stability: Stability::Stable,
                    ..
                })
            );
            let testing = format!("~{token}");
            if stable && contains(old, &testing) && !contains(new, &testing) {
                stabilized.push(token.clone());
            } else if !contains(old, token) {
                added.push(token.clone());
            }
        }

        KeywordDiff {
            added,
            stabilized,
            all: new.to_vec(),
        }
    }

    /// Extract the keyword movement from a unified diff of one ebuild.
    ///
    /// Returns `None` when the patch does not add a valid `KEYWORDS=` line.
    /// For a newly added file, or when the removed line does not parse, the
    /// previous state is unknown.
    pub fn from_patch(patch: &str, added_file: bool) -> Option<KeywordDiff> {
        let mut old = None;
        let mut new = None;

        for line in patch.lines() {
            if let Some(value) = line.strip_prefix("-KEYWORDS=") {
                old = checked_tokens(value);
            } else if let Some(value) = line.strip_prefix("+KEYWORDS=") {
                new = checked_tokens(value);
            }
        }

        let new = new?;
        let old = if added_file { None } else { old };
        Some(KeywordDiff::between(old.as_deref(), &new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_stabilities() {
        let kws = Keyword::parse_line("amd64 ~arm64 -x86 -*").unwrap();
        assert_eq!(kws[0].stability, Stability::Stable);
        assert_eq!(kws[1].arch, "arm64");
        assert_eq!(kws[2].stability, Stability::Disabled);
        assert_eq!(kws[3].arch, "*");
    }

    #[test]
    fn parse_quoted_line() {
        let kws = Keyword::parse_line("\"~amd64 ~x86\"").unwrap();
        assert_eq!(kws.len(), 2);
        assert!(Keyword::parse_line("\"\"").unwrap().is_empty());
    }

    #[test]
    fn display_round_trip() {
        for s in ["amd64", "~arm64", "-x86", "-*"] {
            let kw: Keyword = s.parse().unwrap();
            assert_eq!(kw.to_string(), s);
        }
    }

    #[test]
    fn invalid_keywords() {
        for s in ["", "~", "-", "~~amd64", "-~x86"] {
            assert!(s.parse::<Keyword>().is_err(), "{s}");
        }
    }

    #[test]
    fn stabilization() {
        let patch = "\
--- a/cat/pkg/pkg-1.0.ebuild
+++ b/cat/pkg/pkg-1.0.ebuild
@@ -10,1 +10,1 @@
-KEYWORDS=\"~amd64 ~x86\"
+KEYWORDS=\"amd64 ~x86\"
";
        let diff = KeywordDiff::from_patch(patch, false).unwrap();
        assert_eq!(diff.stabilized, ["amd64"]);
        assert!(diff.added.is_empty());
        assert_eq!(diff.all, ["amd64", "~x86"]);
    }

    #[test]
    fn new_keyword_and_stabilization() {
        let old = strings(&["~amd64", "~x86"]);
        let new = strings(&["amd64", "~x86", "~arm64"]);
        let diff = KeywordDiff::between(Some(old.as_slice()), &new);
        assert_eq!(diff.added, ["~arm64"]);
        assert_eq!(diff.stabilized, ["amd64"]);
    }

    #[test]
    fn stable_without_testing_marker_is_added() {
        let old = strings(&["~x86"]);
        let new = strings(&["amd64", "~x86"]);
        let diff = KeywordDiff::between(Some(old.as_slice()), &new);
        assert_eq!(diff.added, ["amd64"]);
        assert!(diff.stabilized.is_empty());
    }

    #[test]
    fn testing_kept_alongside_stable_is_not_stabilization() {
        let old = strings(&["~amd64"]);
        let new = strings(&["amd64", "~amd64"]);
        let diff = KeywordDiff::between(Some(old.as_slice()), &new);
        assert!(diff.stabilized.is_empty());
        assert_eq!(diff.added, ["amd64"]);
    }

    #[test]
    fn added_file_counts_everything_as_added() {
        let patch = "\
--- /dev/null
+++ b/cat/pkg/pkg-2.0.ebuild
+EAPI=8
+KEYWORDS=\"amd64 ~x86\"
";
        let diff = KeywordDiff::from_patch(patch, true).unwrap();
        assert_eq!(diff.added, ["amd64", "~x86"]);
        assert!(diff.stabilized.is_empty());
        assert_eq!(diff.all, diff.added);
    }

    #[test]
    fn absent_before_then_stable_is_added() {
        let diff = KeywordDiff::between(None, &strings(&["amd64"]));
        assert_eq!(diff.added, ["amd64"]);
        assert!(diff.stabilized.is_empty());
    }

    #[test]
    fn dropped_keywords_are_not_reported() {
        let old = strings(&["~amd64", "~x86"]);
        let new = strings(&["~amd64"]);
        let diff = KeywordDiff::between(Some(old.as_slice()), &new);
        assert!(diff.added.is_empty());
        assert!(diff.stabilized.is_empty());
        assert_eq!(diff.all, ["~amd64"]);
    }

    #[test]
    fn malformed_new_line_is_skipped() {
        let patch = "-KEYWORDS=\"~amd64\"\n+KEYWORDS=\"amd64 ~~x86\"\n";
        assert_eq!(KeywordDiff::from_patch(patch, false), None);
    }

    #[test]
    fn malformed_old_line_counts_as_unknown() {
        let patch = "-KEYWORDS=\"~amd64 -~x86\"\n+KEYWORDS=\"amd64 -*\"\n";
        let diff = KeywordDiff::from_patch(patch, false).unwrap();
        assert_eq!(diff.added, ["amd64", "-*"]);
        assert!(diff.stabilized.is_empty());
    }

    #[test]
    fn patch_without_keywords_change() {
        let patch = "-DESCRIPTION=\"old\"\n+DESCRIPTION=\"new\"\n";
        assert_eq!(KeywordDiff::from_patch(patch, false), None);
        assert_eq!(KeywordDiff::from_patch("-KEYWORDS=\"~amd64\"\n", false), None);
    }
}
