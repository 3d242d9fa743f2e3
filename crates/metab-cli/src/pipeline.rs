//! Pipeline stages and the runnable flows built from them.
//!
//! The stages run in this order:
//! 1. **Load**: read and layout-check the source sheets
//! 2. **Harmonize**: match records, assemble the canonical dataset and cap
//!    outliers in the columns that look normal
//! 3. **Clean**: the Cleaning Engine over the metabolite columns
//! 4. **Filter**: optional RSD / IQR / baseline filters and z-scoring
//! 5. **Normalize**: ranked and normalized variants
//! 6. **Group**: optional phenotype groups and an explicit pair
//! 7. **Write**: every artifact, staged in memory first
//!
//! A flow that fails before step 7 leaves the output directory untouched.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use metab_harmonize::{Harmonized, SourceSheets, harmonize};
use metab_ingest::{
    MasterSheet, MetaboliteSheet, MetadataSheet, PipelineConfig, QcSheet, load_master_sheet,
    load_metabolite_sheet, load_metadata_sheet, load_qc_sheet, read_canonical_dataset,
};
use metab_model::CanonicalDataset;
use metab_output::{
    ArtifactSet, CHANGES_LOG, CLEANED_DATA, CLEANUP_STATS, CleanCounts, FILTER_LOG, FilterCounts,
    HARMONIZED_DATA, HarmonizeCounts, NORMALITY_SUMMARY, NORMALIZED_DATA, NormalizeCounts,
    PATIENTS_SUMMARY, RANKED_DATA, RunManifest, StageCounts, dataset_file_name, ranked_file_name,
    render_audit_report, render_change_log, render_cleanup_stats, render_filter_log,
    render_normality_summary,
};
use metab_qc::{
    CleaningEngine, CleaningOutcome, DistributionNormalizer, FilterOutcome, GroupedDataset,
    NormalizerOutput, apply_feature_filters, apply_groups, clip_normal_columns, pair_file_stem,
    select_pair,
};
use tracing::{debug, info, info_span};

/// The loaded source sheets of one study.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub metabolites: MetaboliteSheet,
    pub metadata: MetadataSheet,
    pub master: MasterSheet,
    pub qc: Option<QcSheet>,
}

impl LoadedSources {
    pub fn sheets(&self) -> SourceSheets<'_> {
        SourceSheets {
            metabolites: &self.metabolites,
            metadata: &self.metadata,
            master: &self.master,
        }
    }
}

/// Matched and assembled records, after the outlier cap.
#[derive(Debug, Clone)]
pub struct HarmonizeRun {
    pub harmonized: Harmonized,
    pub outliers_corrected: usize,
}

/// Results of the clean, filter, normalize and group stages.
#[derive(Debug, Clone)]
pub struct QcRun {
    pub cleaning: CleaningOutcome,
    pub filtered: FilterOutcome,
    pub normality: NormalizerOutput,
    pub grouped: Option<GroupedDataset>,
    /// File stem and rows of the explicitly requested pair.
    pub pair: Option<(String, CanonicalDataset)>,
}

/// What a flow produced, for the terminal summary.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub command: &'static str,
    pub output_dir: PathBuf,
    pub counts: StageCounts,
    pub written: Vec<PathBuf>,
}

pub fn load_qc_sheet_if_configured(config: &PipelineConfig) -> Result<Option<QcSheet>> {
    config
        .inputs
        .qc_file
        .as_deref()
        .map(|path| {
            load_qc_sheet(path, &config.schemas.qc)
                .with_context(|| format!("load qc sheet {}", path.display()))
        })
        .transpose()
}

pub fn load_sources(config: &PipelineConfig) -> Result<LoadedSources> {
    info_span!("load").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let inputs = &config.inputs;
        let metabolites =
            load_metabolite_sheet(&inputs.metabolite_file, &config.schemas.metabolite)
                .with_context(|| {
                    format!("load metabolite sheet {}", inputs.metabolite_file.display())
                })?;
        let metadata = load_metadata_sheet(&inputs.meta_file, &config.schemas.metadata)
            .with_context(|| format!("load metadata sheet {}", inputs.meta_file.display()))?;
        let master = load_master_sheet(&inputs.master_file, &config.schemas.master)
            .with_context(|| format!("load master sheet {}", inputs.master_file.display()))?;
        let qc = load_qc_sheet_if_configured(config)?;
        debug!(duration_ms = start.elapsed().as_millis(), "load complete");
        Ok(LoadedSources {
            metabolites,
            metadata,
            master,
            qc,
        })
    })
}

pub fn harmonize_sources(
    sources: &LoadedSources,
    config: &PipelineConfig,
) -> Result<HarmonizeRun> {
    let mut harmonized = harmonize(sources.sheets()).context("harmonize source sheets")?;
    let outliers_corrected =
        clip_normal_columns(&mut harmonized.assembly.dataset, &config.harmonize)
            .context("cap outliers in harmonized data")?;
    info!(
        valid = harmonized.matched.report.valid.len(),
        two_vial = harmonized.matched.report.two_vial.len(),
        not_in_master = harmonized.matched.report.not_in_master.len(),
        rows = harmonized.assembly.report.rows,
        outliers_corrected,
        "harmonization complete"
    );
    Ok(HarmonizeRun {
        harmonized,
        outliers_corrected,
    })
}

/// Runs clean → filter → normalize → group over `dataset`.
///
/// `source` names the dataset in the change log.
pub fn run_qc(
    dataset: CanonicalDataset,
    source: &str,
    config: &PipelineConfig,
    qc_sheet: Option<&QcSheet>,
) -> Result<QcRun> {
    let cleaning = info_span!("clean").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let outcome = CleaningEngine::new(config.qc.clone())
            .run(dataset, source)
            .context("clean dataset")?;
        debug!(duration_ms = start.elapsed().as_millis(), "clean complete");
        Ok(outcome)
    })?;

    let filtered = info_span!("filter").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let outcome = apply_feature_filters(cleaning.dataset.clone(), &config.filters, qc_sheet)
            .context("apply feature filters")?;
        debug!(duration_ms = start.elapsed().as_millis(), "filter complete");
        Ok(outcome)
    })?;

    let normality = info_span!("normalize").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let output = DistributionNormalizer::new(config.normalizer.clone())
            .run(&filtered.dataset)
            .context("normalize dataset")?;
        debug!(duration_ms = start.elapsed().as_millis(), "normalize complete");
        Ok(output)
    })?;

    let grouping = &config.grouping;
    let grouped = if grouping.groups.is_empty() {
        None
    } else {
        let grouped = apply_groups(&filtered.dataset, &grouping.groups)
            .context("apply phenotype groups")?;
        Some(grouped)
    };
    let pair = match &grouping.compare {
        Some(requested) => {
            let base = grouped.as_ref().map_or(&filtered.dataset, |g| &g.dataset);
            let selected = select_pair(base, requested).context("select compare_groups pair")?;
            Some((pair_file_stem(requested), selected))
        }
        None => None,
    };

    Ok(QcRun {
        cleaning,
        filtered,
        normality,
        grouped,
        pair,
    })
}

pub fn harmonize_counts(run: &HarmonizeRun) -> HarmonizeCounts {
    let harmonized = &run.harmonized;
    let report = &harmonized.matched.report;
    HarmonizeCounts {
        candidates: harmonized.matched.candidate_count,
        valid: report.valid.len(),
        two_vial: report.two_vial.len(),
        not_in_master: report.not_in_master.len(),
        phenotype_mismatches: harmonized.matched.mismatches.len(),
        rows: harmonized.assembly.report.rows,
        unmatched: harmonized.assembly.report.unmatched.len(),
        outliers_corrected: run.outliers_corrected,
    }
}

fn record_qc_counts(counts: &mut StageCounts, run: &QcRun) {
    let summary = &run.cleaning.summary;
    counts.clean = Some(CleanCounts {
        rows_before: summary.rows_before,
        rows_after: summary.rows_after,
        metabolites_before: summary.columns_before,
        metabolites_after: summary.columns_after,
        outliers_replaced: summary.outliers_replaced,
        values_imputed: summary.values_imputed,
    });
    counts.filter = Some(FilterCounts {
        metabolites_before: run.filtered.log.original_count,
        metabolites_after: run.filtered.log.final_count,
    });
    let normality = &run.normality.summary;
    counts.normalize = Some(NormalizeCounts {
        tested: normality.tested,
        failing_before: normality.failing_before,
        failing_after: normality.failing_after,
        transformed: normality.transformed().count(),
        dropped: normality.dropped().count(),
    });
}

fn stage_harmonized(artifacts: &mut ArtifactSet, run: &HarmonizeRun) -> Result<()> {
    let harmonized = &run.harmonized;
    artifacts.stage_dataset(HARMONIZED_DATA, &harmonized.assembly.dataset)?;
    artifacts.stage_text(
        PATIENTS_SUMMARY,
        render_audit_report(&harmonized.matched.report, &harmonized.matched.mismatches)?,
    )?;
    artifacts.stage_text(
        CLEANUP_STATS,
        render_cleanup_stats(&harmonized.assembly.report, run.outliers_corrected)?,
    )?;
    Ok(())
}

fn stage_qc(artifacts: &mut ArtifactSet, run: &QcRun) -> Result<()> {
    artifacts.stage_dataset(CLEANED_DATA, &run.cleaning.dataset)?;
    artifacts.stage_text(CHANGES_LOG, render_change_log(&run.cleaning.log))?;
    artifacts.stage_text(FILTER_LOG, render_filter_log(&run.filtered.log)?)?;
    artifacts.stage_dataset(RANKED_DATA, &run.normality.ranked)?;
    artifacts.stage_dataset(NORMALIZED_DATA, &run.normality.normalized)?;
    artifacts.stage_text(
        NORMALITY_SUMMARY,
        render_normality_summary(&run.normality.summary)?,
    )?;
    if let Some(grouped) = &run.grouped {
        artifacts.stage_dataset(dataset_file_name(&grouped.stem), &grouped.dataset)?;
        artifacts.stage_dataset(ranked_file_name(&grouped.stem), &grouped.ranked)?;
    }
    if let Some((stem, dataset)) = &run.pair {
        artifacts.stage_dataset(dataset_file_name(stem), dataset)?;
    }
    Ok(())
}

fn input_paths(config: &PipelineConfig, primary: &[&Path]) -> Vec<PathBuf> {
    primary
        .iter()
        .map(|path| path.to_path_buf())
        .chain(config.inputs.qc_file.clone())
        .collect()
}

fn finish(
    command: &'static str,
    config: &PipelineConfig,
    inputs: &[PathBuf],
    counts: StageCounts,
    mut artifacts: ArtifactSet,
) -> Result<RunReport> {
    let input_refs: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
    let mut manifest =
        RunManifest::new(command, &input_refs, config).context("build run manifest")?;
    manifest.counts = counts.clone();
    artifacts.stage_manifest(manifest)?;
    let written = artifacts
        .write_to(&config.output_dir)
        .with_context(|| format!("write artifacts to {}", config.output_dir.display()))?;
    Ok(RunReport {
        command,
        output_dir: config.output_dir.clone(),
        counts,
        written,
    })
}

/// `run`: every stage from the source sheets to the normalized variants.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunReport> {
    let sources = load_sources(config)?;
    let harmonized = harmonize_sources(&sources, config)?;
    let source = config.output_dir.join(HARMONIZED_DATA);
    let run = run_qc(
        harmonized.harmonized.assembly.dataset.clone(),
        &source.display().to_string(),
        config,
        sources.qc.as_ref(),
    )?;

    let mut counts = StageCounts {
        harmonize: Some(harmonize_counts(&harmonized)),
        ..StageCounts::default()
    };
    record_qc_counts(&mut counts, &run);

    let mut artifacts = ArtifactSet::new();
    stage_harmonized(&mut artifacts, &harmonized)?;
    stage_qc(&mut artifacts, &run)?;
    let inputs = input_paths(
        config,
        &[
            config.inputs.metabolite_file.as_path(),
            config.inputs.meta_file.as_path(),
            config.inputs.master_file.as_path(),
        ],
    );
    finish("run", config, &inputs, counts, artifacts)
}

/// `harmonize`: match and assemble only.
pub fn run_harmonize(config: &PipelineConfig) -> Result<RunReport> {
    let sources = load_sources(config)?;
    let harmonized = harmonize_sources(&sources, config)?;
    let counts = StageCounts {
        harmonize: Some(harmonize_counts(&harmonized)),
        ..StageCounts::default()
    };
    let mut artifacts = ArtifactSet::new();
    stage_harmonized(&mut artifacts, &harmonized)?;
    let inputs = vec![
        config.inputs.metabolite_file.clone(),
        config.inputs.meta_file.clone(),
        config.inputs.master_file.clone(),
    ];
    finish("harmonize", config, &inputs, counts, artifacts)
}

/// `clean`: the QC stages over a canonical dataset read from `input`.
pub fn run_clean(config: &PipelineConfig, input: &Path) -> Result<RunReport> {
    let dataset = read_canonical_dataset(input)
        .with_context(|| format!("read canonical dataset {}", input.display()))?;
    let qc_sheet = load_qc_sheet_if_configured(config)?;
    let run = run_qc(
        dataset,
        &input.display().to_string(),
        config,
        qc_sheet.as_ref(),
    )?;
    let mut counts = StageCounts::default();
    record_qc_counts(&mut counts, &run);
    let mut artifacts = ArtifactSet::new();
    stage_qc(&mut artifacts, &run)?;
    let inputs = input_paths(config, &[input]);
    finish("clean", config, &inputs, counts, artifacts)
}
