//! Raw identifier lists to [`ProfileRecord`]s.
//!
//! Identifiers are trimmed and blank ones dropped. Labels are looked up by
//! the trimmed identifier and collapsed into a set; identifiers without an
//! entry get an empty label set.

use std::collections::{BTreeSet, HashMap};

use crate::error::{QpiError, Result};
use crate::models::{IdentityKind, ProfileRecord, Site};

/// Labels attached to one identifier, either still comma-joined or already split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSpec {
    Joined(String),
    Split(Vec<String>),
}

impl LabelSpec {
    /// Distinct, trimmed, non-empty labels.
    pub fn to_set(&self) -> BTreeSet<String> {
        let clean = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        match self {
            LabelSpec::Joined(s) => s.split(',').filter_map(clean).collect(),
            LabelSpec::Split(v) => v.iter().filter_map(|s| clean(s.as_str())).collect(),
        }
    }
}

impl From<&str> for LabelSpec {
    fn from(s: &str) -> Self {
        LabelSpec::Joined(s.to_string())
    }
}

impl From<Vec<String>> for LabelSpec {
    fn from(v: Vec<String>) -> Self {
        LabelSpec::Split(v)
    }
}

pub type LabelMap = HashMap<String, LabelSpec>;

/// Build profile records for `site` from raw identifiers.
///
/// Fails with [`QpiError::EmptyInput`] when nothing is left after dropping
/// blank identifiers. Input order is preserved and duplicates are kept.
pub fn normalize_profiles<S: AsRef<str>>(
    raw: &[S],
    site: Site,
    kind: IdentityKind,
    labels: Option<&LabelMap>,
) -> Result<Vec<ProfileRecord>> {
    let records: Vec<ProfileRecord> = raw
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(|id| ProfileRecord {
            identity: kind.identify(id.to_string()),
            site,
            labels: labels
                .and_then(|m| m.get(id))
                .map(LabelSpec::to_set)
                .unwrap_or_default(),
        })
        .collect();

    if records.is_empty() {
        return Err(QpiError::EmptyInput);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    #[test]
    fn builds_username_records_in_order() {
        let records =
            normalize_profiles(&["hyperiongray", "darpa"], Site::Twitter, IdentityKind::Username, None)
                .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity, Identity::Username("hyperiongray".into()));
        assert_eq!(records[1].identity, Identity::Username("darpa".into()));
        assert!(records.iter().all(|r| r.labels.is_empty()));
        assert!(records.iter().all(|r| r.site == Site::Twitter));
    }

    #[test]
    fn builds_upstream_id_records() {
        let records = normalize_profiles(
            &["32324234".to_string()],
            Site::Instagram,
            IdentityKind::UpstreamId,
            None,
        )
        .unwrap();
        assert_eq!(records[0].identity, Identity::UpstreamId("32324234".into()));
    }

    #[test]
    fn drops_blank_identifiers_and_trims() {
        let records = normalize_profiles(
            &["  alice ", "", "   ", "bob"],
            Site::Twitter,
            IdentityKind::Username,
            None,
        )
        .unwrap();
        let names: Vec<_> = records
            .iter()
            .map(|r| match &r.identity {
                Identity::Username(n) => n.as_str(),
                Identity::UpstreamId(_) => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn all_blank_is_empty_input() {
        let err = normalize_profiles(&["", "  "], Site::Twitter, IdentityKind::Username, None)
            .unwrap_err();
        assert!(matches!(err, QpiError::EmptyInput));

        let none: [&str; 0] = [];
        let err =
            normalize_profiles(&none, Site::Twitter, IdentityKind::Username, None).unwrap_err();
        assert!(matches!(err, QpiError::EmptyInput));
    }

    #[test]
    fn labels_are_deduplicated_and_missing_keys_are_empty() {
        let mut labels = LabelMap::new();
        labels.insert("alice".into(), LabelSpec::from("journalist, osint,journalist"));
        labels.insert(
            "bob".into(),
            LabelSpec::from(vec!["a".to_string(), "a".to_string(), " ".to_string()]),
        );

        let records = normalize_profiles(
            &["alice", "bob", "carol"],
            Site::Twitter,
            IdentityKind::Username,
            Some(&labels),
        )
        .unwrap();

        let alice: Vec<_> = records[0].labels.iter().cloned().collect();
        assert_eq!(alice, vec!["journalist".to_string(), "osint".to_string()]);
        let bob: Vec<_> = records[1].labels.iter().cloned().collect();
        assert_eq!(bob, vec!["a".to_string()]);
        assert!(records[2].labels.is_empty());
    }
}
