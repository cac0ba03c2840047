//! `rentradar run` and `rentradar batch`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use rentradar_dedupe::input::{into_batches, load_path};
use rentradar_dedupe::{dedupe_batch, CycleReport, DedupeConfig, DedupeEngine, ListingCandidate};
use tracing::info;

use crate::exit_codes::EXIT_ERROR;
use crate::{load_config, CliError};

fn write_err(e: impl std::fmt::Display) -> CliError {
    CliError::new(EXIT_ERROR, format!("cannot write output: {e}"))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot create {}: {e}", p.display())))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn write_records(out: &mut dyn Write, records: &[ListingCandidate]) -> Result<(), CliError> {
    for record in records {
        serde_json::to_writer(&mut *out, record).map_err(write_err)?;
        out.write_all(b"\n").map_err(write_err)?;
    }
    Ok(())
}

fn summarize(path: &Path, r: &CycleReport) {
    eprintln!(
        "cycle {} ({}): {} processed, {} forwarded, {} new, {} merged, {} suppressed, {} already forwarded, {} unlinkable, {} key conflicts; registry {}",
        r.cycle,
        path.display(),
        r.processed,
        r.forwarded,
        r.new_identities,
        r.merged,
        r.suppressed,
        r.already_forwarded,
        r.unlinkable,
        r.key_conflicts,
        r.registry_size,
    );
}

pub fn cmd_run(
    cycles: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => DedupeConfig::default(),
    };
    info!(name = %config.name, cycles = cycles.len(), "starting run");

    // Load everything up front so a bad file fails before anything is emitted
    let mut inputs = Vec::with_capacity(cycles.len());
    for path in &cycles {
        let candidates = load_path(path).map_err(|e| CliError::dedupe(path, e))?;
        inputs.push(into_batches(candidates));
    }

    let mut engine = DedupeEngine::new(config);
    let mut out = open_output(output.as_deref())?;
    let mut reports = Vec::with_capacity(cycles.len());

    for (path, batches) in cycles.iter().zip(inputs) {
        let cycle = engine.run_cycle(batches);
        write_records(out.as_mut(), &cycle.forwarded)?;
        summarize(path, &cycle.report);
        engine.prune(Utc::now());
        reports.push(cycle.report);
    }
    out.flush().map_err(write_err)?;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write {}: {e}", path.display())))?;
    }
    Ok(())
}

pub fn cmd_batch(file: PathBuf, output: Option<PathBuf>) -> Result<(), CliError> {
    let candidates = load_path(&file).map_err(|e| CliError::dedupe(&file, e))?;
    let total = candidates.len();
    let kept = dedupe_batch(candidates);

    let mut out = open_output(output.as_deref())?;
    write_records(out.as_mut(), &kept)?;
    out.flush().map_err(write_err)?;

    eprintln!("batch ({}): {} records, {} kept, {} dropped", file.display(), total, kept.len(), total - kept.len());
    Ok(())
}
