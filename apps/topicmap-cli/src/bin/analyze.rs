use std::{env, path::PathBuf, process};

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use topicmap_cli::{cap_entities, load_evidence, load_pages, write_artifacts};
use topicmap_core::config::AnalysisConfig;
use topicmap_core::evidence::ExternalEvidence;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut pages_path = None;
    let mut evidence_path = None;
    let mut out_dir = PathBuf::from("topical-maps");
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--evidence" | "-e" => {
                if i + 1 < args.len() {
                    evidence_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --evidence requires a file path");
                    process::exit(1);
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    out_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                } else {
                    eprintln!("Error: --out requires a directory");
                    process::exit(1);
                }
            }
            _ if !args[i].starts_with('-') => pages_path = Some(PathBuf::from(&args[i])),
            other => eprintln!("Ignoring unknown flag {other}"),
        }
        i += 1;
    }
    let Some(pages_path) = pages_path else {
        eprintln!("Usage: topicmap-analyze [--evidence <file>] [--out <dir>] <pages file or dir>");
        process::exit(1);
    };

    let config = AnalysisConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;

    println!("Topical Map Analyzer\n====================");
    println!("Pages: {}", pages_path.display());

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
    bar.set_message("loading pages");
    let mut pages = load_pages(&pages_path)?;
    bar.finish_and_clear();
    println!("✅ Loaded {} pages", pages.len());

    cap_entities(&mut pages, config.max_entities_per_page);

    let evidence = match &evidence_path {
        Some(path) => {
            let e = load_evidence(path)?;
            println!("✅ Loaded SERP evidence for {} topics", e.serp.len());
            e
        }
        None => ExternalEvidence::default(),
    };

    let analysis = topicmap_pipeline::run(&pages, &evidence, &config)?;
    println!(
        "📊 {} topics, {} coverage cells, {} recommendations",
        analysis.tree.topics.len(),
        analysis.coverage.len(),
        analysis.recommendations.len()
    );

    write_artifacts(&analysis, &config, &out_dir)?;
    println!("💾 Saved artifacts to {}", out_dir.display());
    Ok(())
}
