//! Narrative Replay CLI
//!
//! A standalone tool to replay an exported note set through the full
//! pipeline and inspect the resulting episodes, narrative, and citations.
//!
//! Usage:
//!   cargo run --bin narrative_replay_cli -- notes.json
//!   cargo run --bin narrative_replay_cli -- notes.json --episodes
//!   cargo run --bin narrative_replay_cli -- notes.json --json > report.json
//!
//! The input file is a JSON array of clinical notes in the import schema.

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};

use casenote_narrative::{build_report, infer_source_format, render_text, ClinicalNote};

fn print_usage(program: &str) {
    eprintln!("Narrative Replay CLI");
    eprintln!();
    eprintln!("Usage: {} <notes.json> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --episodes   Print the episode timeline only");
    eprintln!("  --json       Emit the full report as JSON instead of text");
    eprintln!("  --help       Show this help");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut input: Option<String> = None;
    let mut episodes_only = false;
    let mut as_json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage(&args[0]);
                return Ok(());
            }
            "--episodes" => episodes_only = true,
            "--json" => as_json = true,
            s if s.starts_with('-') => bail!("unknown option: {}", s),
            s => input = Some(s.to_string()),
        }
        i += 1;
    }

    let Some(path) = input else {
        print_usage(&args[0]);
        bail!("no input file given");
    };

    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let notes: Vec<ClinicalNote> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;

    eprintln!(
        "Loaded {} notes, inferred format: {}",
        notes.len(),
        infer_source_format(&notes).display_name()
    );

    let report = build_report(&notes)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "=".repeat(80));
    println!("EPISODE TIMELINE");
    println!("{}", "=".repeat(80));
    for episode in &report.episodes {
        let evidence = match &episode.evidence {
            Some(e) => format!("evidence: note {}", e.note_id),
            None => "no evidence note".to_string(),
        };
        println!(
            "  {:20} {} -> {} ({} days, {})",
            episode.label,
            episode.start,
            episode.end,
            episode.duration_days(),
            evidence,
        );
    }

    if episodes_only {
        return Ok(());
    }

    println!();
    println!("{}", "=".repeat(80));
    println!("NARRATIVE");
    println!("{}", "=".repeat(80));
    println!();
    println!("{}", render_text(&report));

    Ok(())
}
