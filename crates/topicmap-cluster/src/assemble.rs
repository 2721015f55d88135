//! Turn raw cluster partitions into the flat `TopicTree` table: stable
//! ids, labels, entity unions and dominant intent flows.

use std::collections::{BTreeMap, BTreeSet};

use topicmap_core::types::{
    EntityRef, IntentLabel, Page, PageId, Topic, TopicId, TopicLevel, TopicTree,
};

/// A micro-level partition cell: just its member pages.
pub type ProtoMicro = BTreeSet<PageId>;

pub struct ProtoSub {
    pub micros: Vec<ProtoMicro>,
}

pub struct ProtoCore {
    pub subs: Vec<ProtoSub>,
}

impl ProtoCore {
    /// A one-page core -> sub -> micro chain, used when a page qualifies
    /// for no merge and overlaps no existing micro topic.
    pub fn singleton(page_id: &str) -> Self {
        let micro: ProtoMicro = BTreeSet::from([page_id.to_string()]);
        ProtoCore { subs: vec![ProtoSub { micros: vec![micro] }] }
    }
}

fn entity_union(members: &BTreeSet<PageId>, pages: &BTreeMap<&str, &Page>) -> BTreeSet<EntityRef> {
    let mut union = BTreeSet::new();
    for id in members {
        if let Some(page) = pages.get(id.as_str()) {
            union.extend(page.entities.iter().cloned());
        }
    }
    union
}

/// Most frequent entity key among the member pages (page-level frequency,
/// ties lexical), falling back to the smallest member page id. The modal
/// entity is the most central name the group has for itself.
fn topic_label(members: &BTreeSet<PageId>, pages: &BTreeMap<&str, &Page>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in members {
        if let Some(page) = pages.get(id.as_str()) {
            for entity in &page.entities {
                *counts.entry(entity.key.as_str()).or_insert(0) += 1;
            }
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (key, count) in &counts {
        if best.map_or(true, |(_, c)| *count > c) {
            best = Some((key, *count));
        }
    }
    match best {
        Some((key, _)) => key.to_string(),
        None => members.first().cloned().unwrap_or_default(),
    }
}

/// Dominant observed intent path: each member page contributes its intent
/// set in canonical taxonomy order; the most frequent sequence wins, ties
/// broken by sequence order.
fn intent_flow(members: &BTreeSet<PageId>, pages: &BTreeMap<&str, &Page>) -> Vec<IntentLabel> {
    let mut counts: BTreeMap<Vec<IntentLabel>, usize> = BTreeMap::new();
    for id in members {
        if let Some(page) = pages.get(id.as_str()) {
            let sequence: Vec<IntentLabel> = page.intents.iter().copied().collect();
            *counts.entry(sequence).or_insert(0) += 1;
        }
    }
    let mut best: Option<(&Vec<IntentLabel>, usize)> = None;
    for (sequence, count) in &counts {
        if best.map_or(true, |(_, c)| *count > c) {
            best = Some((sequence, *count));
        }
    }
    best.map(|(sequence, _)| sequence.clone()).unwrap_or_default()
}

fn topic_id(level: TopicLevel, members: &BTreeSet<PageId>) -> TopicId {
    format!("{level}:{}", members.first().map(String::as_str).unwrap_or_default())
}

fn push_topic(
    tree: &mut TopicTree,
    level: TopicLevel,
    members: BTreeSet<PageId>,
    parent_id: Option<TopicId>,
    pages: &BTreeMap<&str, &Page>,
) -> TopicId {
    let id = topic_id(level, &members);
    let topic = Topic {
        topic_id: id.clone(),
        level,
        label: topic_label(&members, pages),
        entities: entity_union(&members, pages),
        intent_flow: intent_flow(&members, pages),
        member_pages: members,
        parent_id,
    };
    tree.topics.insert(id.clone(), topic);
    id
}

/// Materialize the proto partitions as the flat topic table.
pub fn finalize(protos: Vec<ProtoCore>, pages: &BTreeMap<&str, &Page>) -> TopicTree {
    let mut tree = TopicTree::default();
    for core in protos {
        let core_members: BTreeSet<PageId> = core
            .subs
            .iter()
            .flat_map(|s| s.micros.iter().flatten())
            .cloned()
            .collect();
        let core_id = push_topic(&mut tree, TopicLevel::Core, core_members, None, pages);
        for sub in core.subs {
            let sub_members: BTreeSet<PageId> = sub.micros.iter().flatten().cloned().collect();
            let sub_id =
                push_topic(&mut tree, TopicLevel::Sub, sub_members, Some(core_id.clone()), pages);
            for micro in sub.micros {
                push_topic(&mut tree, TopicLevel::Micro, micro, Some(sub_id.clone()), pages);
            }
        }
    }
    tree
}
