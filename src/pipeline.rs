use std::{
    fmt,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::{
    binaries::check_binaries_available,
    blastdbcmd::{run_blastdbcmd, RecordExtraction},
    config::PipelineConfig,
    error::{PlaseekError, Result},
    foldseek::{filter_m8_file, run_foldseek, FoldseekSearch, StructuralHit},
    runner::ToolRunner,
    sequences::{remove_duplicates, write_fasta},
    tblastn::{filter_by_pident, run_tblastn, TblastnSearch, TranslatedHits},
};

/// The steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    StructuralSearch,
    FilterStructuralHits,
    DedupAndWriteFasta,
    TranslatedSearch,
    FilterTranslatedHits,
    ExtractFinalRecords,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::StructuralSearch => "structural-search",
            Stage::FilterStructuralHits => "filter-structural-hits",
            Stage::DedupAndWriteFasta => "dedup-and-write-fasta",
            Stage::TranslatedSearch => "translated-search",
            Stage::FilterTranslatedHits => "filter-translated-hits",
            Stage::ExtractFinalRecords => "extract-final-records",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

// Picks the first stage from the input suffix: a structure file needs a
// foldseek search, an M8 table is filtered directly.
fn entry_state(input: &Path) -> Result<State> {
    match input.extension().and_then(|ext| ext.to_str()) {
        Some("pdb") => Ok(State::StructuralSearch),
        Some("m8") => Ok(State::FilterStructuralHits),
        _ => Err(PlaseekError::UnsupportedInput(input.to_path_buf())),
    }
}

/// Every file a run reads or writes, derived from the input's stem.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePaths {
    pub m8: PathBuf,
    pub foldseek_tmp: PathBuf,
    pub nodup_fasta: PathBuf,
    pub tblastn_tsv: PathBuf,
    pub accession_list: PathBuf,
    pub outfile: PathBuf,
}

impl PipelinePaths {
    // An .m8 input is reused in place; everything else lands in `work_dir`.
    pub fn derive(input: &Path, work_dir: &Path, outfile: Option<&Path>) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let m8 = if input.extension().is_some_and(|ext| ext == "m8") {
            input.to_path_buf()
        } else {
            work_dir.join(format!("{stem}.m8"))
        };
        Self {
            m8,
            foldseek_tmp: work_dir.join(format!("{stem}_foldseek_tmp")),
            nodup_fasta: work_dir.join(format!("{stem}_nodup.fasta")),
            tblastn_tsv: work_dir.join(format!("{stem}_tblastn.tsv")),
            accession_list: work_dir.join(format!("{stem}_accessions.txt")),
            outfile: outfile
                .map(Path::to_path_buf)
                .unwrap_or_else(|| work_dir.join(format!("{stem}_hits.fasta"))),
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub entry: Stage,
    pub structural_hits: usize,
    pub unique_sequences: usize,
    pub translated_hits: usize,
    pub accessions: usize,
    pub tblastn_duration: Duration,
    pub paths: PipelinePaths,
}

// A stage together with the data handed to it by the previous one.
enum State {
    StructuralSearch,
    FilterStructuralHits,
    DedupAndWriteFasta(Vec<StructuralHit>),
    TranslatedSearch,
    FilterTranslatedHits,
    ExtractFinalRecords(TranslatedHits),
    Done,
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::StructuralSearch => Stage::StructuralSearch,
            State::FilterStructuralHits => Stage::FilterStructuralHits,
            State::DedupAndWriteFasta(_) => Stage::DedupAndWriteFasta,
            State::TranslatedSearch => Stage::TranslatedSearch,
            State::FilterTranslatedHits => Stage::FilterTranslatedHits,
            State::ExtractFinalRecords(_) => Stage::ExtractFinalRecords,
            State::Done => Stage::Done,
        }
    }
}

/// Drives one run from the entry stage to the final FASTA. Stages run one
/// after another and the first error ends the run.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    runner: &'a mut dyn ToolRunner,
    paths: PipelinePaths,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, runner: &'a mut dyn ToolRunner) -> Self {
        let paths = PipelinePaths::derive(&config.input, &config.work_dir, config.outfile.as_deref());
        Self {
            config,
            runner,
            paths,
        }
    }

    pub fn run(mut self) -> Result<PipelineReport> {
        check_binaries_available(&self.config.tools)?;
        let mut state = entry_state(&self.config.input)?;
        let entry = state.stage();
        log::info!("Input {} enters at {entry}", self.config.input.display());

        let mut report = PipelineReport {
            entry,
            structural_hits: 0,
            unique_sequences: 0,
            translated_hits: 0,
            accessions: 0,
            tblastn_duration: Duration::ZERO,
            paths: self.paths.clone(),
        };

        loop {
            log::debug!("Stage: {}", state.stage());
            state = match state {
                State::StructuralSearch => {
                    self.structural_search()?;
                    State::FilterStructuralHits
                }
                State::FilterStructuralHits => {
                    let hits = filter_m8_file(&self.paths.m8, self.config.m8_evalue)?;
                    report.structural_hits = hits.len();
                    State::DedupAndWriteFasta(hits)
                }
                State::DedupAndWriteFasta(hits) => {
                    let records = remove_duplicates(&hits);
                    log::info!(
                        "{} unique sequences out of {} hits, writing {}",
                        records.len(),
                        hits.len(),
                        self.paths.nodup_fasta.display()
                    );
                    write_fasta(&self.paths.nodup_fasta, &records)?;
                    report.unique_sequences = records.len();
                    State::TranslatedSearch
                }
                State::TranslatedSearch => {
                    let start = Instant::now();
                    self.translated_search()?;
                    report.tblastn_duration = start.elapsed();
                    log::info!(
                        "tblastn finished in {:.3} seconds",
                        report.tblastn_duration.as_secs_f64()
                    );
                    State::FilterTranslatedHits
                }
                State::FilterTranslatedHits => {
                    let table = filter_by_pident(
                        &self.paths.tblastn_tsv,
                        self.config.pident,
                        &self.config.sort_column,
                    )?;
                    report.translated_hits = table.len();
                    State::ExtractFinalRecords(table)
                }
                State::ExtractFinalRecords(table) => {
                    report.accessions = self.extract_records(&table)?;
                    State::Done
                }
                State::Done => break,
            };
        }

        log::info!("Done. Records written to {}", self.paths.outfile.display());
        Ok(report)
    }

    fn structural_search(&mut self) -> Result<()> {
        let database = self
            .config
            .foldseek_db
            .as_deref()
            .ok_or(PlaseekError::MissingPath("foldseek database (--foldseek-db-path or FOLDSEEKDB)"))?;
        let search = FoldseekSearch {
            foldseek: &self.config.tools.foldseek,
            structure: &self.config.input,
            database,
            out_m8: &self.paths.m8,
            tmp_dir: self.paths.foldseek_tmp.clone(),
            jobs: self.config.jobs,
        };
        run_foldseek(self.runner, &search)
    }

    fn translated_search(&mut self) -> Result<()> {
        let search = TblastnSearch {
            parallel: &self.config.tools.parallel,
            tblastn: &self.config.tools.tblastn,
            database: &self.config.target_db,
            query_fasta: &self.paths.nodup_fasta,
            out_tsv: &self.paths.tblastn_tsv,
            evalue: self.config.tblastn_evalue,
            block: self.config.block,
            jobs: self.config.jobs,
        };
        run_tblastn(self.runner, &search)
    }

    fn extract_records(&mut self, table: &TranslatedHits) -> Result<usize> {
        let extraction = RecordExtraction {
            parallel: &self.config.tools.parallel,
            blastdbcmd: &self.config.tools.blastdbcmd,
            database: &self.config.target_db,
            accession_list: &self.paths.accession_list,
            outfile: &self.paths.outfile,
            jobs: self.config.jobs,
        };
        run_blastdbcmd(self.runner, &extraction, table)
    }
}

pub fn run_pipeline(config: &PipelineConfig, runner: &mut dyn ToolRunner) -> Result<PipelineReport> {
    Pipeline::new(config, runner).run()
}
