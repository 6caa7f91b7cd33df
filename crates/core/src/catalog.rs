//! Wire shapes of the board catalog endpoint (`/{board}/catalog.json`).
//!
//! The catalog is untrusted input: every field defaults when missing so a
//! sparse entry still decodes.  Only the fields the engine reads are kept.

use serde::{Deserialize, Serialize};

/// One catalog page; the endpoint returns a JSON array of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPage {
    pub page: u32,
    pub threads: Vec<RawThread>,
}

/// A thread as listed in the catalog (the opening post plus a reply preview).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawThread {
    /// Thread number; `0` means the source omitted it.
    pub no: u64,
    pub sub: Option<String>,
    pub com: Option<String>,
    pub name: Option<String>,
    pub time: i64,
    pub last_modified: i64,
    pub replies: u32,
    pub images: u32,
    /// Most recent replies, oldest first.
    pub last_replies: Vec<RawReply>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReply {
    pub no: u64,
    pub name: Option<String>,
    pub com: Option<String>,
    pub time: i64,
}

impl RawThread {
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or_default()
    }

    pub fn body(&self) -> &str {
        self.com.as_deref().unwrap_or_default()
    }

    pub fn author(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The reply closest to the bottom of the thread, if any was listed.
    pub fn latest_reply(&self) -> Option<&RawReply> {
        self.last_replies.last()
    }
}

impl RawReply {
    pub fn body(&self) -> &str {
        self.com.as_deref().unwrap_or_default()
    }

    pub fn author(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}
