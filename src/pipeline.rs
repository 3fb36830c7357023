//! Run orchestration.
//!
//! One run turns the stale annotation renderings of the watched folders into
//! a new dated snapshot of markdown notes:
//!
//! 1. flush unsaved editor state (best-effort);
//! 2. convert out-of-date `.skim` files to renderings;
//! 3. create `<dest>/<label> - <date>/` and locate the latest prior snapshot;
//! 4. for each discovered document the staleness oracle deems stale:
//!    extract text → parse blocks → rank concepts → write the note;
//! 5. write `Index.md` and the sidecar record.
//!
//! A second run on the same date first checks the snapshot it is about to
//! rebuild: notes already written there that are still current are kept
//! as-is and stay in the index.
//!
//! Only setup failures (destination uncreatable, invalid exclude globs)
//! abort the run. Per-document failures are logged and the document is
//! left out of the index.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use skim_notes_core::analysis::Analyzer;
use skim_notes_core::blocks::{analysis_text, parse_blocks};
use skim_notes_core::concepts::{rank_concepts, ConceptFilter, RankParams};
use skim_notes_core::models::{AnnotationBlock, Concept, NoteRecord};
use skim_notes_core::note::{note_file_name, render_index, render_note, IndexEntry, INDEX_FILE_NAME};
use skim_notes_core::snapshot::SnapshotNamer;
use skim_notes_core::staleness::{PriorState, Verdict};

use crate::analysis::AnalyzerHandle;
use crate::automation::flush_editor_state;
use crate::config::{AnalysisConfig, Config};
use crate::convert::{convert_all, ConvertSummary};
use crate::error::PipelineError;
use crate::extract::read_rendering;
use crate::progress::{ProgressMode, RunProgressEvent};
use crate::scan::{scan_sources, SourceDocument};
use crate::snapshot::{find_prior_snapshot, Sidecar, Snapshot};
use crate::staleness::StalenessOracle;

/// Options of one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Date of the snapshot being produced.
    pub date: NaiveDate,
    /// Report what would be generated without writing anything.
    pub dry_run: bool,
    pub automation: bool,
    pub convert: bool,
    pub progress: ProgressMode,
}

impl RunOptions {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            dry_run: false,
            automation: true,
            convert: true,
            progress: ProgressMode::Off,
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub snapshot: PathBuf,
    /// Prior snapshot compared against, if any.
    pub prior: Option<PathBuf>,
    pub conversion: Option<ConvertSummary>,
    /// Documents discovered in the watched folders.
    pub found: usize,
    /// Notes written (or, on a dry run, that would be written).
    pub generated: usize,
    /// Documents unchanged since the prior snapshot.
    pub up_to_date: usize,
    /// Notes already current in this date's snapshot from an earlier run.
    pub kept: usize,
    /// Stale documents without any annotation block.
    pub empty: usize,
    /// Documents that could not be read or whose note could not be written.
    pub failed: usize,
}

/// Run the pipeline with the analyzer configured in `config.analysis`.
pub fn run(config: &Config, opts: &RunOptions) -> Result<RunSummary> {
    let analyzer = AnalyzerHandle::new(&config.analysis);
    run_with_analyzer(config, opts, &analyzer)
}

/// Run the pipeline with an explicit analyzer.
pub fn run_with_analyzer(
    config: &Config,
    opts: &RunOptions,
    analyzer: &dyn Analyzer,
) -> Result<RunSummary> {
    let progress = opts.progress.reporter();

    if opts.automation && !opts.dry_run {
        flush_editor_state(&config.automation);
    }

    let conversion = if opts.convert && !opts.dry_run {
        progress.report(RunProgressEvent::Converting);
        Some(convert_all(config)?)
    } else {
        None
    };

    let namer = SnapshotNamer::new(&config.snapshot.label);
    let snapshot_id = namer.id_for(opts.date);
    let dest = config.paths.dest();
    let snapshot_dir = dest.join(snapshot_id.dir_name());

    let prior = find_prior_snapshot(&dest, &namer, &snapshot_id);
    let existing = Snapshot::existing(&dest, &snapshot_id);
    match &prior {
        Some(p) => tracing::info!(prior = %p.id, "comparing against prior snapshot"),
        None => tracing::info!("no prior snapshot; every document will be processed"),
    }

    if !opts.dry_run {
        std::fs::create_dir_all(&snapshot_dir).with_context(|| {
            format!(
                "Failed to create snapshot directory: {}",
                snapshot_dir.display()
            )
        })?;
    }

    let mut summary = RunSummary {
        snapshot: snapshot_dir.clone(),
        prior: prior.as_ref().map(|p| p.path.clone()),
        conversion,
        ..RunSummary::default()
    };

    if existing.is_some() {
        tracing::info!(snapshot = %snapshot_id, "snapshot already exists; current notes are kept");
    }
    let same_day = StalenessOracle::new(existing, config.snapshot.sidecar);
    let oracle = StalenessOracle::new(prior, config.snapshot.sidecar);

    progress.report(RunProgressEvent::Scanning);
    let docs = scan_sources(config)?;
    summary.found = docs.len();
    tracing::info!(found = docs.len(), "scan complete");

    let params = rank_params(&config.analysis);
    let mut entries: Vec<IndexEntry> = Vec::new();
    let mut sidecar = Sidecar::new();
    let total = docs.len() as u64;

    for (i, doc) in docs.iter().enumerate() {
        progress.report(RunProgressEvent::Processing {
            n: i as u64 + 1,
            total,
            key: doc.key.to_string(),
        });

        // Notes written earlier in this run are not "already current".
        let indexed = entries.iter().any(|e| e.key == doc.key);
        if !indexed && same_day.check(doc) == Verdict::UpToDate {
            let file_name = note_file_name(&doc.key);
            if let PriorState::LastRead(date) = same_day.prior_state(&file_name) {
                sidecar.record(&file_name, date);
            }
            entries.push(IndexEntry::new(doc.key.clone()));
            summary.kept += 1;
            continue;
        }

        if !oracle.check(doc).should_process() {
            summary.up_to_date += 1;
            continue;
        }

        let blocks = match load_blocks(doc) {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::warn!("{}", e);
                summary.failed += 1;
                continue;
            }
        };
        if blocks.is_empty() {
            tracing::info!(key = %doc.key, "no annotation blocks; no note written");
            summary.empty += 1;
            continue;
        }

        if opts.dry_run {
            if !entries.iter().any(|e| e.key == doc.key) {
                entries.push(IndexEntry::new(doc.key.clone()));
                summary.generated += 1;
            }
            continue;
        }

        let concepts = concepts_for(analyzer, &blocks, config.analysis.max_chars, &params, doc);
        let record = NoteRecord {
            key: doc.key.clone(),
            source_name: doc.file_name(),
            blocks,
            concepts,
            last_read: doc.modified_date(),
            generated: opts.date,
        };

        match write_note(&snapshot_dir, &record, config.analysis.max_tags) {
            Ok(file_name) => {
                tracing::debug!(key = %record.key, file = %file_name, "note written");
                if let Some(date) = record.last_read {
                    sidecar.record(&file_name, date);
                }
                if entries.iter().any(|e| e.key == record.key) {
                    tracing::debug!(key = %record.key, "note overwritten by a document with the same name");
                } else {
                    entries.push(IndexEntry::new(record.key));
                    summary.generated += 1;
                }
            }
            Err(e) => {
                tracing::warn!("{}", e);
                summary.failed += 1;
            }
        }
    }

    if opts.dry_run {
        print_dry_run(&summary);
        return Ok(summary);
    }

    let index_path = snapshot_dir.join(INDEX_FILE_NAME);
    if let Err(e) = std::fs::write(&index_path, render_index(opts.date, &entries)) {
        tracing::warn!("{}", PipelineError::write(&index_path, e));
    }
    if config.snapshot.sidecar {
        if let Err(e) = sidecar.save(&snapshot_dir) {
            tracing::warn!("{:#}", e);
        }
    }

    print_summary(&summary, opts.date);
    Ok(summary)
}

/// Ranking parameters derived from the `[analysis]` section.
pub fn rank_params(analysis: &AnalysisConfig) -> RankParams {
    RankParams {
        max_concepts: analysis.max_concepts,
        filter: ConceptFilter::new(&analysis.extra_stop_terms),
    }
}

/// Read a rendering and parse its annotation blocks.
pub fn load_blocks(doc: &SourceDocument) -> Result<Vec<AnnotationBlock>, PipelineError> {
    let text = read_rendering(&doc.path).map_err(|e| PipelineError::decode(&doc.path, e))?;
    Ok(parse_blocks(&text))
}

/// Ranked concepts for `blocks`; an analyzer failure degrades to none.
fn concepts_for(
    analyzer: &dyn Analyzer,
    blocks: &[AnnotationBlock],
    max_chars: usize,
    params: &RankParams,
    doc: &SourceDocument,
) -> Vec<Concept> {
    let text = analysis_text(blocks, max_chars);
    match rank_concepts(analyzer, &text, params) {
        Ok(concepts) => concepts,
        Err(e) => {
            tracing::warn!(key = %doc.key, "concepts skipped: {:#}", e);
            Vec::new()
        }
    }
}

/// Write one note into `snapshot_dir`, returning its file name.
fn write_note(
    snapshot_dir: &Path,
    record: &NoteRecord,
    max_tags: usize,
) -> Result<String, PipelineError> {
    let file_name = note_file_name(&record.key);
    let path = snapshot_dir.join(&file_name);
    std::fs::write(&path, render_note(record, max_tags))
        .map_err(|e| PipelineError::write(&path, e))?;
    Ok(file_name)
}

fn print_dry_run(summary: &RunSummary) {
    println!("run {} (dry-run)", summary.snapshot.display());
    println!("  documents found: {}", summary.found);
    println!("  notes to generate: {}", summary.generated);
    println!("  up to date: {}", summary.up_to_date);
    println!("  kept from this snapshot: {}", summary.kept);
    println!("  without annotations: {}", summary.empty);
    println!("  unreadable: {}", summary.failed);
}

fn print_summary(summary: &RunSummary, date: NaiveDate) {
    println!("run {}", date.format("%Y-%m-%d"));
    if let Some(conversion) = &summary.conversion {
        println!(
            "  converted: {} (up to date: {}, failed: {})",
            conversion.converted, conversion.up_to_date, conversion.failed
        );
    }
    match &summary.prior {
        Some(prior) => println!("  prior snapshot: {}", prior.display()),
        None => println!("  prior snapshot: none"),
    }
    println!("  documents found: {}", summary.found);
    println!("  notes generated: {}", summary.generated);
    println!("  up to date: {}", summary.up_to_date);
    if summary.kept > 0 {
        println!("  kept from this snapshot: {}", summary.kept);
    }
    println!("  without annotations: {}", summary.empty);
    println!("  failed: {}", summary.failed);
    println!("  snapshot: {}", summary.snapshot.display());
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use filetime::{set_file_mtime, FileTime};
    use skim_notes_core::analysis::{Analysis, Entity};
    use std::fs;
    use tempfile::TempDir;

    struct Fixed;

    impl Analyzer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn analyze(&self, _text: &str) -> Result<Analysis> {
            Ok(Analysis {
                entities: vec![Entity {
                    text: "Kant".to_string(),
                    label: "PER".to_string(),
                    lemma: "Kant".to_string(),
                }],
                noun_phrases: Vec::new(),
            })
        }
    }

    struct Failing;

    impl Analyzer for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn analyze(&self, _text: &str) -> Result<Analysis> {
            bail!("model missing")
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.base_dir = tmp.path().to_path_buf();
        config.paths.watched = vec!["Philo".to_string()];
        config.automation.enabled = false;
        fs::create_dir_all(tmp.path().join("Philo")).unwrap();
        (tmp, config)
    }

    fn write_rendering(tmp: &TempDir, name: &str, body: &str, mtime: i64) {
        let path = tmp.path().join("Philo").join(name);
        fs::write(&path, body).unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    fn opts(day: NaiveDate) -> RunOptions {
        RunOptions {
            automation: false,
            convert: false,
            ..RunOptions::new(day)
        }
    }

    // 2024-01-10 12:00 UTC; the local date is 2024-01-10 in every time zone
    // between UTC-11 and UTC+11.
    const JAN_10: i64 = 1_704_888_000;

    #[test]
    fn first_run_writes_notes_index_and_sidecar() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: La raison pure\nPage 2: Kant encore", JAN_10);
        write_rendering(&tmp, "Vide.rtf", "Page 3:   ", JAN_10);

        let summary = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).unwrap();
        assert_eq!(summary.found, 2);
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.empty, 1);
        assert!(summary.prior.is_none());

        let snap = config.paths.dest().join("Notes en markdown - 2024-02-01");
        let note = fs::read_to_string(snap.join("Kant.md")).unwrap();
        assert!(note.starts_with("# Kant\n**Source**: `Kant.rtf`\n"));
        assert!(note.contains("**Généré le**: 2024-02-01"));
        assert!(note.contains("`kant`"));
        assert!(note.contains("### Page 2:\nKant encore"));
        assert!(!snap.join("Vide.md").exists());

        let index = fs::read_to_string(snap.join(INDEX_FILE_NAME)).unwrap();
        assert!(index.contains("Nombre de documents traités : 1"));
        assert!(index.contains("- [Kant](Kant.md)"));

        let sidecar = Sidecar::load(&snap).unwrap();
        assert!(sidecar.get("Kant.md").is_some());
    }

    #[test]
    fn second_run_skips_unchanged_documents() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: texte", JAN_10);
        write_rendering(&tmp, "Hegel.rtf", "Page 1: texte", JAN_10);
        run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).unwrap();

        write_rendering(&tmp, "Hegel.rtf", "Page 1: texte\nPage 9: ajout", JAN_10 + 30 * 86_400);
        let summary = run_with_analyzer(&config, &opts(date(2024, 2, 15)), &Fixed).unwrap();
        assert_eq!(summary.up_to_date, 1);
        assert_eq!(summary.generated, 1);
        assert!(summary.prior.is_some());

        let snap = config.paths.dest().join("Notes en markdown - 2024-02-15");
        assert!(snap.join("Hegel.md").exists());
        assert!(!snap.join("Kant.md").exists());
    }

    #[test]
    fn analyzer_failure_still_writes_note() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: texte", JAN_10);
        let summary = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Failing).unwrap();
        assert_eq!(summary.generated, 1);

        let note = fs::read_to_string(
            config
                .paths
                .dest()
                .join("Notes en markdown - 2024-02-01/Kant.md"),
        )
        .unwrap();
        assert!(!note.contains("Concepts clés"));
        assert!(note.contains("## Notes\n### Page 1:\ntexte"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: texte", JAN_10);
        let run_opts = RunOptions {
            dry_run: true,
            ..opts(date(2024, 2, 1))
        };
        let summary = run_with_analyzer(&config, &run_opts, &Fixed).unwrap();
        assert_eq!(summary.generated, 1);
        assert!(!config.paths.dest().exists());
    }

    #[test]
    fn same_day_rerun_keeps_current_notes() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: texte", JAN_10);
        write_rendering(&tmp, "Hegel.rtf", "Page 1: texte", JAN_10);
        let first = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).unwrap();
        assert_eq!(first.generated, 2);

        let snap = config.paths.dest().join("Notes en markdown - 2024-02-01");
        let before = fs::read_to_string(snap.join("Kant.md")).unwrap();

        write_rendering(&tmp, "Hegel.rtf", "Page 1: texte\nPage 4: ajout", JAN_10 + 5 * 86_400);
        let second = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Failing).unwrap();
        assert_eq!(second.kept, 1);
        assert_eq!(second.generated, 1);
        assert_eq!(second.up_to_date, 0);

        assert_eq!(fs::read_to_string(snap.join("Kant.md")).unwrap(), before);
        assert!(fs::read_to_string(snap.join("Hegel.md")).unwrap().contains("ajout"));
        let index = fs::read_to_string(snap.join(INDEX_FILE_NAME)).unwrap();
        assert!(index.contains("Nombre de documents traités : 2"));
        assert!(index.contains("- [Kant](Kant.md)"));
        assert!(Sidecar::load(&snap).unwrap().get("Kant.md").is_some());

        let third = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).unwrap();
        assert_eq!(third.generated, 0);
        assert_eq!(third.kept, 2);
    }

    #[test]
    fn backdated_run_ignores_later_snapshot() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: texte", JAN_10);
        run_with_analyzer(&config, &opts(date(2024, 3, 10)), &Fixed).unwrap();

        let summary = run_with_analyzer(&config, &opts(date(2024, 3, 5)), &Fixed).unwrap();
        assert!(summary.prior.is_none());
        assert_eq!(summary.generated, 1);
    }

    #[test]
    fn note_write_failure_skips_document() {
        let (tmp, config) = setup();
        write_rendering(&tmp, "Kant.rtf", "Page 1: texte", JAN_10);
        write_rendering(&tmp, "Hegel.rtf", "Page 1: texte", JAN_10);
        let snap = config.paths.dest().join("Notes en markdown - 2024-02-01");
        fs::create_dir_all(snap.join("Kant.md")).unwrap();

        let summary = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.generated, 1);

        let index = fs::read_to_string(snap.join(INDEX_FILE_NAME)).unwrap();
        assert!(index.contains("Nombre de documents traités : 1"));
        assert!(index.contains("- [Hegel](Hegel.md)"));
        assert!(!index.contains("Kant"));
    }

    #[test]
    fn shared_stem_counts_once() {
        let (tmp, mut config) = setup();
        config.paths.watched.push("Ses".to_string());
        fs::create_dir_all(tmp.path().join("Ses")).unwrap();
        write_rendering(&tmp, "Kant.rtf", "Page 1: philo", JAN_10);
        let other = tmp.path().join("Ses/Kant.rtf");
        fs::write(&other, "Page 2: ses").unwrap();
        set_file_mtime(&other, FileTime::from_unix_time(JAN_10, 0)).unwrap();

        let summary = run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).unwrap();
        assert_eq!(summary.found, 2);
        assert_eq!(summary.generated, 1);
        let index = fs::read_to_string(
            config
                .paths
                .dest()
                .join("Notes en markdown - 2024-02-01")
                .join(INDEX_FILE_NAME),
        )
        .unwrap();
        assert!(index.contains("Nombre de documents traités : 1"));
    }

    #[test]
    fn uncreatable_destination_is_fatal() {
        let (tmp, mut config) = setup();
        fs::write(tmp.path().join("blocker"), "file").unwrap();
        config.paths.dest_dir = PathBuf::from("blocker/notes");
        assert!(run_with_analyzer(&config, &opts(date(2024, 2, 1)), &Fixed).is_err());
    }
}
