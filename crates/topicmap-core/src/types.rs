//! Domain types shared by every analysis engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

pub type PageId = String;
pub type TopicId = String;

/// A normalized content page with its semantic annotations (the SRO),
/// produced upstream by ingestion and extraction collaborators.
///
/// - `page_id`: unique, stable identifier
/// - `embedding`: fixed-dimension vector; `None` when extraction failed
/// - `entities`: canonical entities observed on the page
/// - `intents`: intent labels observed on the page
/// - `attributes`: free-form attribute strings from the SRO
/// - `questions`: user questions the page addresses, in document order
///
/// Immutable once ingested; every engine reads, none writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_id: PageId,
    pub embedding: Option<Vec<f32>>,
    pub entities: BTreeSet<EntityRef>,
    pub intents: BTreeSet<IntentLabel>,
    #[serde(default)]
    pub attributes: BTreeSet<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Canonical entity reference. Identity is the canonical `key` alone;
/// surface-form aliases ride along but never participate in equality,
/// ordering or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub aliases: BTreeSet<String>,
}

impl EntityRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), aliases: BTreeSet::new() }
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for EntityRef {}

impl PartialOrd for EntityRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl std::hash::Hash for EntityRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// The fixed seven-label intent taxonomy. Declaration order is the
/// canonical precedence used wherever intents need a deterministic
/// sequence; it is a sequencing convention, not a claim about real user
/// journeys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Informational,
    Comparative,
    Transactional,
    Investigative,
    ProblemSolution,
    Objections,
    Scenarios,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 7] = [
        IntentLabel::Informational,
        IntentLabel::Comparative,
        IntentLabel::Transactional,
        IntentLabel::Investigative,
        IntentLabel::ProblemSolution,
        IntentLabel::Objections,
        IntentLabel::Scenarios,
    ];

    pub const TAXONOMY_SIZE: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            IntentLabel::Informational => "informational",
            IntentLabel::Comparative => "comparative",
            IntentLabel::Transactional => "transactional",
            IntentLabel::Investigative => "investigative",
            IntentLabel::ProblemSolution => "problem_solution",
            IntentLabel::Objections => "objections",
            IntentLabel::Scenarios => "scenarios",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity level of a topic node, coarsest to finest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TopicLevel {
    Core,
    Sub,
    Micro,
}

impl fmt::Display for TopicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicLevel::Core => f.write_str("core"),
            TopicLevel::Sub => f.write_str("sub"),
            TopicLevel::Micro => f.write_str("micro"),
        }
    }
}

/// One node of the topic hierarchy, stored flat (see `TopicTree`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: TopicId,
    pub level: TopicLevel,
    pub label: String,
    pub member_pages: BTreeSet<PageId>,
    pub parent_id: Option<TopicId>,
    pub entities: BTreeSet<EntityRef>,
    pub intent_flow: Vec<IntentLabel>,
}

/// A page that could not participate in embedding-based clustering and
/// was attached at the micro level by entity-overlap fallback instead.
/// Consumed as evidence by the coverage computer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedPage {
    pub page_id: PageId,
    pub reason: String,
}

/// The three-level topic hierarchy as a flat table of `Topic` records with
/// explicit `parent_id`/`level` fields. No pointer-linked nodes: any engine
/// indexes by id without traversing live references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicTree {
    pub topics: BTreeMap<TopicId, Topic>,
    #[serde(default)]
    pub excluded_pages: Vec<ExcludedPage>,
}

impl TopicTree {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.get(id)
    }

    /// Topics at one level, in id order.
    pub fn at_level(&self, level: TopicLevel) -> impl Iterator<Item = &Topic> {
        self.topics.values().filter(move |t| t.level == level)
    }

    /// Direct children of `parent`, in id order.
    pub fn children(&self, parent: &str) -> impl Iterator<Item = &Topic> + '_ {
        let parent = parent.to_string();
        self.topics
            .values()
            .filter(move |t| t.parent_id.as_deref() == Some(parent.as_str()))
    }

    /// Siblings of `topic` (same parent, same level, self excluded), in id
    /// order. All core topics are mutual siblings.
    pub fn siblings<'a>(&'a self, topic: &'a Topic) -> impl Iterator<Item = &'a Topic> {
        self.topics.values().filter(move |t| {
            t.topic_id != topic.topic_id
                && t.level == topic.level
                && t.parent_id == topic.parent_id
        })
    }

    /// Check every structural invariant against the corpus the tree was
    /// built from. Violations are fatal: downstream coverage numbers would
    /// be meaningless on a malformed tree.
    pub fn validate(&self, corpus: &BTreeSet<PageId>) -> Result<()> {
        if self.topics.is_empty() {
            if corpus.is_empty() {
                return Ok(());
            }
            return Err(Error::StructuralInvariant(format!(
                "empty tree for a corpus of {} pages",
                corpus.len()
            )));
        }

        for topic in self.topics.values() {
            match (topic.level, topic.parent_id.as_deref()) {
                (TopicLevel::Core, None) => {}
                (TopicLevel::Core, Some(p)) => {
                    return Err(Error::StructuralInvariant(format!(
                        "core topic {} has parent {p}",
                        topic.topic_id
                    )));
                }
                (level, None) => {
                    return Err(Error::StructuralInvariant(format!(
                        "{level} topic {} has no parent",
                        topic.topic_id
                    )));
                }
                (level, Some(p)) => {
                    let parent = self.topics.get(p).ok_or_else(|| {
                        Error::StructuralInvariant(format!(
                            "topic {} references missing parent {p}",
                            topic.topic_id
                        ))
                    })?;
                    let expected = match level {
                        TopicLevel::Sub => TopicLevel::Core,
                        TopicLevel::Micro => TopicLevel::Sub,
                        TopicLevel::Core => unreachable!(),
                    };
                    if parent.level != expected {
                        return Err(Error::StructuralInvariant(format!(
                            "{level} topic {} has {} parent {p}",
                            topic.topic_id, parent.level
                        )));
                    }
                }
            }
            if topic.level == TopicLevel::Micro && topic.member_pages.is_empty() {
                return Err(Error::StructuralInvariant(format!(
                    "micro topic {} has no member pages",
                    topic.topic_id
                )));
            }
        }

        // Depth is exactly three: every core must have a sub child, every
        // sub a micro child.
        for topic in self.topics.values() {
            if topic.level != TopicLevel::Micro && self.children(&topic.topic_id).next().is_none() {
                return Err(Error::StructuralInvariant(format!(
                    "{} topic {} has no children",
                    topic.level, topic.topic_id
                )));
            }
        }

        // Micro siblings partition their parent: no page in two sibling
        // micros, and no corpus page missing from every micro.
        let mut covered: BTreeSet<&PageId> = BTreeSet::new();
        for sub in self.at_level(TopicLevel::Sub) {
            let mut seen: BTreeSet<&PageId> = BTreeSet::new();
            for micro in self.children(&sub.topic_id) {
                for page in &micro.member_pages {
                    if !seen.insert(page) {
                        return Err(Error::StructuralInvariant(format!(
                            "page {page} appears in two sibling micro topics under {}",
                            sub.topic_id
                        )));
                    }
                }
            }
            covered.extend(seen);
        }
        for page in corpus {
            if !covered.contains(page) {
                return Err(Error::StructuralInvariant(format!(
                    "page {page} is missing from every micro topic"
                )));
            }
        }
        Ok(())
    }
}
