//! Externally supplied evidence attached to the coverage matrix.
//!
//! The core never fetches or ranks SERP data; collaborators hand it a
//! per-topic bundle of "People Also Ask" questions the corpus does not
//! answer, content formats it lacks, and the cross-references that already
//! exist between topics.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::TopicId;

/// SERP-derived gap evidence for one topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerpGap {
    #[serde(default)]
    pub paa_missing: BTreeSet<String>,
    #[serde(default)]
    pub format_missing: BTreeSet<String>,
}

/// All evidence supplied from outside the core for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalEvidence {
    /// topic_id -> SERP gap bundle.
    #[serde(default)]
    pub serp: BTreeMap<TopicId, SerpGap>,
    /// topic_id -> topics it already cross-references.
    #[serde(default)]
    pub cross_references: BTreeMap<TopicId, BTreeSet<TopicId>>,
}

impl ExternalEvidence {
    pub fn serp_for(&self, topic_id: &str) -> Option<&SerpGap> {
        self.serp.get(topic_id)
    }

    /// Whether a cross-reference is recorded in either direction.
    pub fn linked(&self, a: &str, b: &str) -> bool {
        self.cross_references.get(a).is_some_and(|s| s.contains(b))
            || self.cross_references.get(b).is_some_and(|s| s.contains(a))
    }
}
