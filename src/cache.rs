use winnow::ascii::multispace0;
use winnow::combinator::{alt, opt, preceded, repeat, terminated};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::error::{Error, Result};
use crate::model::Version;

/// A parsed md5-cache entry.
///
/// Represents a single file from `metadata/md5-cache/<category>/<package>-<version>`,
/// reduced to the fields recorded for a [`Version`].
///
/// See [PMS 14.2](https://projects.gentoo.org/pms/9/pms.html#mddict-cache-file-format).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    /// `EAPI`, `"0"` when absent.
    pub eapi: String,
    pub description: String,
    pub slot: String,
    /// Subslot part of `SLOT`, `"0"` when absent.
    pub subslot: String,
    pub homepage: Vec<String>,
    pub license: String,
    /// Raw `KEYWORDS` value.
    pub keywords: String,
    /// `IUSE` flags without their `+`/`-` default markers.
    pub iuse: Vec<String>,
    /// Unconditional `RESTRICT` tokens.
    pub restrict: Vec<String>,
    /// Unconditional `PROPERTIES` tokens.
    pub properties: Vec<String>,
    /// MD5 checksum of the ebuild (from `_md5_`).
    pub md5: Option<String>,
}

impl CacheEntry {
    /// Parse a md5-cache file's contents.
    ///
    /// Lines are `KEY=VALUE` pairs in arbitrary order; unknown keys are
    /// ignored. `DESCRIPTION` and `SLOT` are mandatory.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::CacheEntry;
    ///
    /// let input = "\
    /// EAPI=8
    /// DESCRIPTION=Example package
    /// SLOT=2/2.1
    /// IUSE=+ssl -doc test
    /// RESTRICT=mirror !test? ( test )
    /// ";
    /// let entry = CacheEntry::parse(input).unwrap();
    /// assert_eq!(entry.slot, "2");
    /// assert_eq!(entry.subslot, "2.1");
    /// assert_eq!(entry.iuse, ["ssl", "doc", "test"]);
    /// assert_eq!(entry.restrict, ["mirror"]);
    /// ```
    pub fn parse(input: &str) -> Result<CacheEntry> {
        let mut entry = CacheEntry {
            eapi: "0".to_string(),
            subslot: "0".to_string(),
            ..CacheEntry::default()
        };
        let mut description = None;
        let mut slot = None;

        for line in input.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                "EAPI" if !value.is_empty() => entry.eapi = value.to_string(),
                "DESCRIPTION" => description = Some(value.to_string()),
                "SLOT" => slot = Some(value.to_string()),
                "HOMEPAGE" => entry.homepage = words(value),
                "LICENSE" => entry.license = value.to_string(),
                "KEYWORDS" => entry.keywords = value.to_string(),
                "IUSE" => {
                    entry.iuse = value
                        .split_whitespace()
                        .map(|flag| flag.trim_start_matches(['+', '-']).to_string())
                        .collect()
                }
                "RESTRICT" => entry.restrict = unconditional_tokens(value)?,
                "PROPERTIES" => entry.properties = unconditional_tokens(value)?,
                "_md5_" => entry.md5 = Some(value.to_string()),
                _ => {}
            }
        }

        entry.description =
            description.ok_or_else(|| Error::MissingField("DESCRIPTION".to_string()))?;
        let slot = slot
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::MissingField("SLOT".to_string()))?;
        match slot.split_once('/') {
            Some((slot, subslot)) => {
                entry.slot = slot.to_string();
                if !subslot.is_empty() {
                    entry.subslot = subslot.to_string();
                }
            }
            None => entry.slot = slot,
        }

        Ok(entry)
    }

    /// Build the [`Version`] record for `category/package-version`.
    pub fn into_version(self, category: &str, package: &str, version: &str) -> Version {
        Version {
            id: format!("{category}/{package}-{version}"),
            category: category.to_string(),
            package: package.to_string(),
            atom: format!("{category}/{package}"),
            version: version.to_string(),
            slot: self.slot,
            subslot: self.subslot,
            eapi: self.eapi,
            keywords: self.keywords,
            useflags: self.iuse,
            restricts: self.restrict,
            properties: self.properties,
            homepage: self.homepage,
            license: self.license,
            description: self.description,
        }
    }
}

fn words(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Tokens of a `RESTRICT`/`PROPERTIES` value that apply regardless of USE
/// flags. Anything inside a `flag? ( ... )` group is dropped.
fn unconditional_tokens(value: &str) -> Result<Vec<String>> {
    let nodes = parse_nodes
        .parse(value)
        .map_err(|e| Error::InvalidCacheEntry(format!("{value}: {e}")))?;
    Ok(nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Token(token) => Some(token),
            Node::Conditional => None,
        })
        .collect())
}

// Winnow parsers

#[derive(Clone)]
enum Node {
    Token(String),
    Conditional,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+')
}

fn parse_nodes(input: &mut &str) -> ModalResult<Vec<Node>> {
    terminated(repeat(0.., preceded(multispace0, parse_node)), multispace0).parse_next(input)
}

fn parse_node(input: &mut &str) -> ModalResult<Node> {
    alt((parse_conditional, parse_token)).parse_next(input)
}

fn parse_token(input: &mut &str) -> ModalResult<Node> {
    take_while(1.., is_token_char)
        .map(|s: &str| Node::Token(s.to_string()))
        .parse_next(input)
}

fn parse_conditional(input: &mut &str) -> ModalResult<Node> {
    (
        opt('!'),
        terminated(take_while(1.., is_token_char), '?'),
        preceded(multispace0, '('),
        parse_nodes,
        ')',
    )
        .value(Node::Conditional)
        .parse_next(input)
}
