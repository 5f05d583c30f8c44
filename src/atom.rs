use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::version::VersionKey;

/// A `category/name` package identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    /// Category, e.g. `dev-lang`.
    pub category: String,
    /// Package name, e.g. `rust`.
    pub name: String,
}

impl Atom {
    /// Create an atom from its two parts.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Atom {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Derive the package atom a version specifier refers to.
    ///
    /// Operators, `::repo` and `:slot` parts are dropped, then the text is
    /// cut at the first `-` whose remainder is a valid version.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::Atom;
    ///
    /// let atom = Atom::from_specifier(">=dev-libs/foo-bar-2.1-r1:2/2.1").unwrap();
    /// assert_eq!(atom.to_string(), "dev-libs/foo-bar");
    /// let atom = Atom::from_specifier("dev-perl/Mail-Sender").unwrap();
    /// assert_eq!(atom.to_string(), "dev-perl/Mail-Sender");
    /// ```
    pub fn from_specifier(specifier: &str) -> Result<Atom> {
        let body = specifier.trim().trim_start_matches(['<', '>', '=', '~', '!']);
        let body = body.split_once("::").map_or(body, |(b, _)| b);
        let body = body.split_once(':').map_or(body, |(b, _)| b);
        let body = body.trim_end_matches('*');

        let (category, rest) = body
            .split_once('/')
            .ok_or_else(|| Error::InvalidAtom(specifier.to_string()))?;

        let name = rest
            .match_indices('-')
            .map(|(i, _)| i)
            .find(|&i| VersionKey::parse(&rest[i + 1..]).is_ok())
            .map_or(rest, |i| &rest[..i]);

        if category.is_empty() || name.is_empty() || name.contains('/') {
            return Err(Error::InvalidAtom(specifier.to_string()));
        }
        Ok(Atom::new(category, name))
    }
}

impl FromStr for Atom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((category, name))
                if !category.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Atom::new(category, name))
            }
            _ => Err(Error::InvalidAtom(s.to_string())),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Comparison operator of a version specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `~`, any revision of the given version.
    AnyRevision,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Equal => "=",
            Operator::AnyRevision => "~",
            Operator::GreaterOrEqual => ">=",
            Operator::Greater => ">",
        }
    }
}

/// A version-range specifier as found in `package.mask`,
/// `package.deprecated` and bug reports.
///
/// The version may be written with or without the atom in front of it:
/// `>=cat/pkg-1.2` and `>=1.2` are equivalent once the atom is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    /// Comparison operator, `None` for slot-only and bare atoms.
    pub operator: Option<Operator>,
    /// Version text without atom, slot, or glob.
    pub version: Option<String>,
    /// Trailing `*` on an `=` specifier.
    pub glob: bool,
    /// Slot constraint.
    pub slot: Option<String>,
    /// Subslot constraint.
    pub subslot: Option<String>,
}

impl VersionSpecifier {
    /// Parse `specifier` in the context of the package `atom`.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::{Operator, VersionSpecifier};
    ///
    /// let spec = VersionSpecifier::parse("=cat/pkg-1.2-r1:0/1", "cat/pkg").unwrap();
    /// assert_eq!(spec.operator, Some(Operator::Equal));
    /// assert_eq!(spec.version.as_deref(), Some("1.2-r1"));
    /// assert_eq!(spec.slot.as_deref(), Some("0"));
    /// assert_eq!(spec.subslot.as_deref(), Some("1"));
    /// ```
    pub fn parse(specifier: &str, atom: &str) -> Result<VersionSpecifier> {
        let invalid = || Error::InvalidSpecifier(specifier.to_string());
        let text = specifier.trim();

        let (operator, rest) = [
            ("<=", Operator::LessOrEqual),
            (">=", Operator::GreaterOrEqual),
            ("<", Operator::Less),
            (">", Operator::Greater),
            ("=", Operator::Equal),
            ("~", Operator::AnyRevision),
        ]
        .iter()
        .find_map(|(prefix, op)| text.strip_prefix(*prefix).map(|rest| (Some(*op), rest)))
        .unwrap_or((None, text));

        let rest = rest.split_once("::").map_or(rest, |(r, _)| r);
        let (body, slots) = match rest.split_once(':') {
            Some((body, slots)) => (body, Some(slots)),
            None => (rest, None),
        };
        let (slot, subslot) = match slots {
            Some(slots) => {
                let (slot, subslot) = match slots.split_once('/') {
                    Some((slot, subslot)) => (slot, Some(subslot)),
                    None => (slots, None),
                };
                if slot.is_empty() || subslot.is_some_and(str::is_empty) {
                    return Err(invalid());
                }
                (Some(slot.to_string()), subslot.map(str::to_string))
            }
            None => (None, None),
        };

        if operator.is_none() {
            return Ok(VersionSpecifier {
                operator,
                version: None,
                glob: false,
                slot,
                subslot,
            });
        }

        let prefix = format!("{atom}-");
        let version = body.strip_prefix(&prefix).unwrap_or(body);
        let (version, glob) = match version.strip_suffix('*') {
            Some(v) if operator == Some(Operator::Equal) => (v, true),
            Some(_) => return Err(invalid()),
            None => (version, false),
        };
        if version.is_empty() || version.contains('/') {
            return Err(invalid());
        }
        if !glob {
            VersionKey::parse(version).map_err(|_| invalid())?;
        }

        Ok(VersionSpecifier {
            operator,
            version: Some(version.to_string()),
            glob,
            slot,
            subslot,
        })
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(op) = self.operator {
            write!(f, "{}", op.as_str())?;
        }
        if let Some(ref version) = self.version {
            write!(f, "{version}")?;
        }
        if self.glob {
            write!(f, "*")?;
        }
        if let Some(ref slot) = self.slot {
            write!(f, ":{slot}")?;
        }
        if let Some(ref subslot) = self.subslot {
            write!(f, "/{subslot}")?;
        }
        Ok(())
    }
}
