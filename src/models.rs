//! Core data types exchanged with the QuickPin API.
//!
//! These types represent the profile records sent for ingestion and the
//! query parameters used for search.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Social network a profile lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Twitter,
    Instagram,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Twitter => "twitter",
            Site::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "twitter" => Ok(Site::Twitter),
            "instagram" => Ok(Site::Instagram),
            other => Err(format!(
                "unknown site '{}': expected twitter or instagram",
                other
            )),
        }
    }
}

/// How a profile is identified on its site.
///
/// Serialized flattened into the record, so exactly one of `username` or
/// `upstream_id` appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    Username(String),
    UpstreamId(String),
}

/// Which [`Identity`] variant a list of raw identifiers should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Username,
    UpstreamId,
}

impl IdentityKind {
    pub fn identify(&self, raw: String) -> Identity {
        match self {
            IdentityKind::Username => Identity::Username(raw),
            IdentityKind::UpstreamId => Identity::UpstreamId(raw),
        }
    }
}

/// A profile submitted for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(flatten)]
    pub identity: Identity,
    pub site: Site,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl ProfileRecord {
    pub fn username(name: impl Into<String>, site: Site) -> Self {
        Self {
            identity: Identity::Username(name.into()),
            site,
            labels: BTreeSet::new(),
        }
    }

    pub fn upstream_id(id: impl Into<String>, site: Site) -> Self {
        Self {
            identity: Identity::UpstreamId(id.into()),
            site,
            labels: BTreeSet::new(),
        }
    }
}

/// Parameters for `GET /api/search/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub r#type: Option<String>,
    pub facets: Option<String>,
    pub rpp: u32,
    pub page: u32,
    pub sort: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            r#type: None,
            facets: None,
            rpp: 100,
            page: 1,
            sort: None,
        }
    }

    /// Query-string pairs in wire order. Absent optionals are left out entirely.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("query", self.query.clone())];
        if let Some(ref t) = self.r#type {
            params.push(("type", t.clone()));
        }
        if let Some(ref f) = self.facets {
            params.push(("facets", f.clone()));
        }
        params.push(("rpp", self.rpp.to_string()));
        params.push(("page", self.page.to_string()));
        if let Some(ref s) = self.sort {
            params.push(("sort", s.clone()));
        }
        params
    }
}

/// A single server-sent notification. The payload shape is server-defined.
pub type Notification = serde_json::Value;
