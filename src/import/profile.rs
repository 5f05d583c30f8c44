//! `profiles/package.mask` and `profiles/package.deprecated`.
//!
//! Both files share one layout: a header with examples ending at
//! [`END_OF_EXAMPLES`], then entries separated by blank lines. An entry is
//! an author line, comment lines giving the reason, then one specifier per
//! line:
//!
//! ```text
//! # Dev E. Loper <developer@gentoo.org> (2019-07-01)
//! # Deprecated upstream, see HOMEPAGE
//! dev-perl/Mail-Sender
//! ```

use time::macros::format_description;
use time::Date;
use tracing::{info, warn};
use winnow::ascii::space0;
use winnow::combinator::{delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::take_till;

use crate::atom::Atom;
use crate::error::Result;
use crate::git::{FileChange, FileStatus};
use crate::import::Mutation;
use crate::model::{ProfileEntry, ProfileList, SpecifierToVersion};
use crate::resolve::RangeResolver;
use crate::store::Store;
use crate::tree::Tree;

/// Marker line closing the header of a profile list.
pub const END_OF_EXAMPLES: &str = "#--- END OF EXAMPLES ---";

pub(super) fn accepts_mask(path: &str) -> bool {
    path == ProfileList::Mask.path()
}

pub(super) fn accepts_deprecated(path: &str) -> bool {
    path == ProfileList::Deprecated.path()
}

pub(super) fn import_mask(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    import_list(ProfileList::Mask, change, tree)
}

pub(super) fn import_deprecated(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    import_list(ProfileList::Deprecated, change, tree)
}

fn import_list(list: ProfileList, change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    let entries = match change.status {
        FileStatus::Deleted => Vec::new(),
        _ => parse_entries(&tree.read(&change.path)?),
    };
    Ok(vec![Mutation::ReplaceEntries(list, entries)])
}

/// Parse the entries of a mask or deprecation list, one per specifier.
///
/// Without the [`END_OF_EXAMPLES`] marker the whole text is read as
/// entries. Blocks listing no specifier are skipped.
///
/// # Examples
///
/// ```
/// use portage_history::import::parse_entries;
///
/// let text = "# Examples\n#--- END OF EXAMPLES ---\n\n\
///     ## Larry the Cow <larry@gentoo.org> (2024-03-01)\n\
///     ## Removal on 2024-04-01.\n\
///     =dev-lang/foo-1.0\n\
///     dev-lang/bar\n";
/// let entries = parse_entries(text);
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].versions, "=dev-lang/foo-1.0");
/// assert_eq!(entries[1].author_email, "larry@gentoo.org");
/// assert_eq!(entries[1].reason, "Removal on 2024-04-01.");
/// ```
pub fn parse_entries(text: &str) -> Vec<ProfileEntry> {
    let body = text
        .split_once(END_OF_EXAMPLES)
        .map_or(text, |(_, rest)| rest);

    let mut entries = Vec::new();
    let mut block = Vec::new();
    for line in body.lines().map(str::trim).chain(std::iter::once("")) {
        if line.is_empty() {
            entries.extend(parse_block(&block));
            block.clear();
        } else {
            block.push(line);
        }
    }
    entries
}

fn parse_block(lines: &[&str]) -> Vec<ProfileEntry> {
    let mut lines = lines.iter().copied().peekable();

    let (author, author_email, date) = match lines.peek().and_then(|l| author_line.parse(*l).ok()) {
        Some((name, email, date)) => {
            lines.next();
            (name.trim().to_string(), email.trim().to_string(), date.and_then(parse_date))
        }
        None => Default::default(),
    };

    let mut reason = Vec::new();
    let mut specifiers = Vec::new();
    for line in lines {
        match line.strip_prefix('#') {
            Some(comment) => reason.push(comment.strip_prefix(' ').unwrap_or(comment)),
            None => specifiers.push(line),
        }
    }
    let reason = reason.join(" ").trim().to_string();

    specifiers
        .into_iter()
        .map(|versions| ProfileEntry {
            versions: versions.to_string(),
            author: author.clone(),
            author_email: author_email.clone(),
            date,
            reason: reason.clone(),
        })
        .collect()
}

/// `# Name <email> (YYYY-MM-DD)`, the date being optional.
fn author_line<'s>(input: &mut &'s str) -> ModalResult<(&'s str, &'s str, Option<&'s str>)> {
    let _ = ('#', space0).parse_next(input)?;
    let name = take_till(1.., '<').parse_next(input)?;
    let email = delimited('<', take_till(0.., '>'), '>').parse_next(input)?;
    let date = opt(preceded(space0, delimited('(', take_till(1.., ')'), ')'))).parse_next(input)?;
    let _ = space0.parse_next(input)?;
    Ok((name, email, date))
}

fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Recompute the join rows between the entries of `list` and the stored
/// versions, replacing the previous rows.
///
/// Entries whose specifier cannot be resolved are logged and skipped.
/// Returns the number of rows written.
pub fn rebuild_matches(store: &mut dyn Store, list: ProfileList) -> Result<usize> {
    let entries = store.entries(list)?;

    let rows = {
        let resolver = RangeResolver::new(&*store);
        let mut rows = Vec::new();
        for entry in &entries {
            let spec = &entry.versions;
            let versions = Atom::from_specifier(spec)
                .and_then(|atom| resolver.resolve(spec, &atom.to_string()));
            match versions {
                Ok(versions) => rows.extend(versions.into_iter().map(|v| SpecifierToVersion {
                    id: format!("{spec}-{}", v.id),
                    versions: spec.clone(),
                    version_id: v.id,
                })),
                Err(err) => warn!(
                    list = list.path(),
                    specifier = %spec,
                    error = %err,
                    "cannot resolve entry"
                ),
            }
        }
        rows
    };

    store.replace_matches(list, &rows)?;
    info!(
        list = list.path(),
        entries = entries.len(),
        rows = rows.len(),
        "rebuilt version matches"
    );
    Ok(rows.len())
}
