//! The in-memory reverse index over composite aliases.
//!
//! Three levels of ownership mirror the identity quadruple: alias, then
//! credential type, then algorithm, then parameters, with the leaves
//! holding underlying aliases. The per-level maps are small association
//! vectors, so iteration order is insertion order and loose matches are
//! first-insertion-wins.
//!
//! No level is ever left empty while still linked into its parent; removal
//! prunes upward, driven top-down by the removal walk itself.

use std::collections::HashMap;

use crate::credential::{CredentialType, CredentialTypeQuery};
use crate::params::ParamKey;

/// A successful index lookup.
///
/// Carries the matched concrete type and algorithm so the decode path can
/// reconstruct the credential even when the query was loose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMatch<'a> {
    /// The concrete credential type that matched.
    pub credential_type: CredentialType,
    /// The algorithm under which the entry is indexed, if any.
    pub algorithm: Option<&'a str>,
    /// The underlying alias addressing the container entry.
    pub ks_alias: &'a str,
}

/// Top level of the index, keyed by lower-cased user alias.
#[derive(Debug)]
struct TopEntry {
    alias: String,
    entries: Vec<MidEntry>,
}

/// Middle level, keyed by concrete credential type.
#[derive(Debug)]
struct MidEntry {
    credential_type: CredentialType,
    entries: Vec<BottomEntry>,
    no_algorithm: Option<BottomEntry>,
}

impl MidEntry {
    fn new(credential_type: CredentialType) -> Self {
        Self {
            credential_type,
            entries: Vec::new(),
            no_algorithm: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.no_algorithm.is_none()
    }
}

/// Bottom level, keyed by parameter record.
#[derive(Debug)]
struct BottomEntry {
    algorithm: Option<String>,
    entries: Vec<(ParamKey, String)>,
    no_params: Option<String>,
}

impl BottomEntry {
    fn new(algorithm: Option<String>) -> Self {
        Self {
            algorithm,
            entries: Vec::new(),
            no_params: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.no_params.is_none()
    }
}

/// The in-memory map from credential identities to underlying aliases.
#[derive(Debug, Default)]
pub struct CredentialIndex {
    top: HashMap<String, TopEntry>,
}

impl CredentialIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.top.clear();
    }

    /// Returns the lower-cased user aliases currently indexed.
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        self.top.values().map(|top| top.alias.clone()).collect()
    }

    /// Records an underlying alias for an identity quadruple, returning the
    /// alias it displaced, if any.
    pub fn insert(
        &mut self,
        alias: String,
        credential_type: CredentialType,
        algorithm: Option<String>,
        parameters: Option<ParamKey>,
        ks_alias: String,
    ) -> Option<String> {
        let top = self
            .top
            .entry(alias.clone())
            .or_insert_with(|| TopEntry {
                alias,
                entries: Vec::new(),
            });

        let mid = match top
            .entries
            .iter()
            .position(|m| m.credential_type == credential_type)
        {
            Some(position) => &mut top.entries[position],
            None => {
                top.entries.push(MidEntry::new(credential_type));
                top.entries.last_mut().expect("just pushed")
            }
        };

        let bottom = match algorithm {
            Some(algorithm) => {
                match mid
                    .entries
                    .iter()
                    .position(|b| b.algorithm.as_deref() == Some(algorithm.as_str()))
                {
                    Some(position) => &mut mid.entries[position],
                    None => {
                        mid.entries.push(BottomEntry::new(Some(algorithm)));
                        mid.entries.last_mut().expect("just pushed")
                    }
                }
            }
            None => mid
                .no_algorithm
                .get_or_insert_with(|| BottomEntry::new(None)),
        };

        match parameters {
            Some(parameters) => {
                match bottom.entries.iter().position(|(key, _)| *key == parameters) {
                    Some(position) => {
                        Some(std::mem::replace(&mut bottom.entries[position].1, ks_alias))
                    }
                    None => {
                        bottom.entries.push((parameters, ks_alias));
                        None
                    }
                }
            }
            None => bottom.no_params.replace(ks_alias),
        }
    }

    /// Looks up the underlying alias for a possibly-partial identity.
    ///
    /// A `None` algorithm or parameter set matches an arbitrary entry at
    /// that level, preferring the keyed maps over the "none" slots. Any
    /// missing link is a miss, not an error.
    #[must_use]
    pub fn lookup(
        &self,
        alias: &str,
        query: CredentialTypeQuery,
        algorithm: Option<&str>,
        parameters: Option<&ParamKey>,
    ) -> Option<IndexMatch<'_>> {
        let top = self.top.get(alias)?;

        let mid = match query.exact() {
            Some(exact) => top
                .entries
                .iter()
                .find(|m| m.credential_type == exact)?,
            None => top
                .entries
                .iter()
                .find(|m| query.accepts(m.credential_type))?,
        };

        let bottom = match algorithm {
            Some(algorithm) => mid
                .entries
                .iter()
                .find(|b| b.algorithm.as_deref() == Some(algorithm))?,
            None => mid.entries.first().or(mid.no_algorithm.as_ref())?,
        };

        let ks_alias = match parameters {
            Some(parameters) => bottom
                .entries
                .iter()
                .find(|(key, _)| key == parameters)
                .map(|(_, ks_alias)| ks_alias)?,
            None => bottom
                .entries
                .first()
                .map(|(_, ks_alias)| ks_alias)
                .or(bottom.no_params.as_ref())?,
        };

        Some(IndexMatch {
            credential_type: mid.credential_type,
            algorithm: bottom.algorithm.as_deref(),
            ks_alias: ks_alias.as_str(),
        })
    }

    /// Removes every entry consistent with a possibly-partial identity and
    /// returns the underlying aliases that were dropped.
    ///
    /// Emptied levels are pruned on the way out, the top entry included.
    pub fn remove_matching(
        &mut self,
        alias: &str,
        query: CredentialTypeQuery,
        algorithm: Option<&str>,
        parameters: Option<&ParamKey>,
    ) -> Vec<String> {
        let mut removed = Vec::new();
        let Some(top) = self.top.get_mut(alias) else {
            return removed;
        };

        top.entries.retain_mut(|mid| {
            if query.accepts(mid.credential_type) {
                remove_from_mid(mid, algorithm, parameters, &mut removed);
            }
            !mid.is_empty()
        });

        if top.entries.is_empty() {
            self.top.remove(alias);
        }
        removed
    }
}

fn remove_from_mid(
    mid: &mut MidEntry,
    algorithm: Option<&str>,
    parameters: Option<&ParamKey>,
    removed: &mut Vec<String>,
) {
    match algorithm {
        Some(algorithm) => {
            if let Some(position) = mid
                .entries
                .iter()
                .position(|b| b.algorithm.as_deref() == Some(algorithm))
            {
                remove_from_bottom(&mut mid.entries[position], parameters, removed);
                if mid.entries[position].is_empty() {
                    mid.entries.remove(position);
                }
            }
        }
        None => {
            mid.entries.retain_mut(|bottom| {
                remove_from_bottom(bottom, parameters, removed);
                !bottom.is_empty()
            });
            if let Some(bottom) = &mut mid.no_algorithm {
                remove_from_bottom(bottom, parameters, removed);
                if bottom.is_empty() {
                    mid.no_algorithm = None;
                }
            }
        }
    }
}

fn remove_from_bottom(
    bottom: &mut BottomEntry,
    parameters: Option<&ParamKey>,
    removed: &mut Vec<String>,
) {
    match parameters {
        Some(parameters) => {
            if let Some(position) = bottom.entries.iter().position(|(key, _)| key == parameters) {
                removed.push(bottom.entries.remove(position).1);
            }
        }
        None => {
            removed.extend(bottom.entries.drain(..).map(|(_, ks_alias)| ks_alias));
            if let Some(ks_alias) = bottom.no_params.take() {
                removed.push(ks_alias);
            }
        }
    }
}
