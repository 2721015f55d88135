//! File-level ingestion and export around the analysis core. The core
//! itself owns no file, network or CLI surface; everything in this crate
//! is collaborator plumbing.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use topicmap_core::config::AnalysisConfig;
use topicmap_core::evidence::ExternalEvidence;
use topicmap_core::types::{Page, TopicLevel};
use topicmap_pipeline::TopicalAnalysis;

/// Load pages from a single JSON file (one page or an array of pages) or
/// from a directory of such files, visited in sorted path order.
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut pages = Vec::new();
    for file in &files {
        let content = fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let mut batch: Vec<Page> = serde_json::from_str(&content)
            .or_else(|_| serde_json::from_str::<Page>(&content).map(|p| vec![p]))
            .with_context(|| format!("parsing {}", file.display()))?;
        pages.append(&mut batch);
    }
    Ok(pages)
}

/// Keep only the corpus-wide top-N entities by page frequency (ties
/// lexical), dropping the rest from every page, so long-tail extraction
/// noise never reaches the analysis.
pub fn cap_entities(pages: &mut [Page], max: usize) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for page in pages.iter() {
        for entity in &page.entities {
            *counts.entry(entity.key.clone()).or_insert(0) += 1;
        }
    }
    if counts.len() <= max {
        return;
    }
    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let keep: std::collections::BTreeSet<&String> =
        ranked.iter().take(max).map(|(k, _)| *k).collect();
    for page in pages.iter_mut() {
        page.entities.retain(|e| keep.contains(&e.key));
    }
}

pub fn load_evidence(path: &Path) -> Result<ExternalEvidence> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[derive(Debug, Serialize)]
struct SummarySubtopic {
    topic: String,
    related_entities: Vec<String>,
    microtopics: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SummaryCore {
    topic: String,
    subtopics: Vec<SummarySubtopic>,
}

/// Human-oriented nested map: one entry per core topic, subtopics with
/// their related entities beneath it.
#[derive(Debug, Serialize)]
struct Summary {
    topics: Vec<SummaryCore>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    manual_hierarchy: BTreeMap<String, Vec<String>>,
}

fn build_summary(analysis: &TopicalAnalysis, config: &AnalysisConfig) -> Summary {
    let topics = analysis
        .tree
        .at_level(TopicLevel::Core)
        .map(|core| SummaryCore {
            topic: core.label.clone(),
            subtopics: analysis
                .tree
                .children(&core.topic_id)
                .map(|sub| SummarySubtopic {
                    topic: sub.label.clone(),
                    related_entities: sub.entities.iter().map(|e| e.key.clone()).collect(),
                    microtopics: analysis
                        .tree
                        .children(&sub.topic_id)
                        .map(|m| m.label.clone())
                        .collect(),
                })
                .collect(),
        })
        .collect();
    Summary { topics, manual_hierarchy: config.manual_hierarchy.clone() }
}

/// Write every artifact of the run as pretty JSON under `out_dir`.
pub fn write_artifacts(
    analysis: &TopicalAnalysis,
    config: &AnalysisConfig,
    out_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    write_json(out_dir, "topical_map.json", &analysis.tree)?;
    write_json(out_dir, "entity_graph.json", &analysis.entity_graph)?;
    write_json(out_dir, "intent_graphs.json", &analysis.intent_graphs)?;
    write_json(out_dir, "coverage.json", &analysis.coverage)?;
    write_json(out_dir, "recommendations.json", &analysis.recommendations)?;
    write_json(out_dir, "summary.json", &build_summary(analysis, config))?;
    Ok(())
}

fn write_json<T: Serialize>(out_dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = out_dir.join(name);
    let json = serde_json::to_string_pretty(value).with_context(|| format!("serializing {name}"))?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
