use tracing::warn;

use crate::atom::{Operator, VersionSpecifier};
use crate::error::Result;
use crate::model::Version;
use crate::store::Store;
use crate::version::VersionKey;

/// Resolves version-range specifiers against the versions in a [`Store`].
///
/// Resolution only reads from the store.
pub struct RangeResolver<'a> {
    store: &'a dyn Store,
}

impl<'a> RangeResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        RangeResolver { store }
    }

    /// Stored versions of `atom` matched by `specifier`, lowest first.
    ///
    /// Slot and subslot constraints filter by equality. `~` matches every
    /// revision of the given version and `=...*` matches versions starting
    /// with the given text. A specifier matching nothing yields an empty
    /// list.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::{MemoryStore, RangeResolver, Store, Version};
    ///
    /// let mut store = MemoryStore::new();
    /// for v in ["1.0", "1.2", "2.0"] {
    ///     store.upsert_version(&Version {
    ///         id: format!("cat/pkg-{v}"),
    ///         atom: "cat/pkg".to_string(),
    ///         version: v.to_string(),
    ///         slot: "0".to_string(),
    ///         subslot: "0".to_string(),
    ///         ..Version::default()
    ///     }).unwrap();
    /// }
    /// let found = RangeResolver::new(&store).resolve(">=1.2", "cat/pkg").unwrap();
    /// let ids: Vec<&str> = found.iter().map(|v| v.id.as_str()).collect();
    /// assert_eq!(ids, ["cat/pkg-1.2", "cat/pkg-2.0"]);
    /// ```
    pub fn resolve(&self, specifier: &str, atom: &str) -> Result<Vec<Version>> {
        let spec = VersionSpecifier::parse(specifier, atom)?;
        let wanted = match (&spec.version, spec.glob) {
            (Some(version), false) => Some(VersionKey::parse(version)?),
            _ => None,
        };

        let mut matched: Vec<(Option<VersionKey>, Version)> = self
            .store
            .versions_of(atom)?
            .into_iter()
            .filter(|v| spec.slot.as_ref().map_or(true, |slot| &v.slot == slot))
            .filter(|v| {
                spec.subslot
                    .as_ref()
                    .map_or(true, |subslot| &v.subslot == subslot)
            })
            .filter_map(|v| {
                let key = match VersionKey::parse(&v.version) {
                    Ok(key) => Some(key),
                    Err(err) => {
                        warn!(version = %v.id, error = %err, "stored version does not parse");
                        None
                    }
                };
                matches(&spec, wanted.as_ref(), key.as_ref(), &v.version).then_some((key, v))
            })
            .collect();

        matched.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(matched.into_iter().map(|(_, v)| v).collect())
    }
}

/// Resolve `specifier` for `atom` against `store`.
pub fn resolve(store: &dyn Store, specifier: &str, atom: &str) -> Result<Vec<Version>> {
    RangeResolver::new(store).resolve(specifier, atom)
}

fn matches(
    spec: &VersionSpecifier,
    wanted: Option<&VersionKey>,
    key: Option<&VersionKey>,
    raw: &str,
) -> bool {
    let Some(operator) = spec.operator else {
        return true;
    };
    if spec.glob {
        return spec
            .version
            .as_deref()
            .is_some_and(|prefix| raw.starts_with(prefix));
    }
    let (Some(wanted), Some(key)) = (wanted, key) else {
        return false;
    };
    match operator {
        Operator::Less => key < wanted,
        Operator::LessOrEqual => key <= wanted,
        Operator::Equal => spec.version.as_deref() == Some(raw),
        Operator::GreaterOrEqual => key >= wanted,
        Operator::Greater => key > wanted,
        Operator::AnyRevision => key.without_revision() == wanted.without_revision(),
    }
}
