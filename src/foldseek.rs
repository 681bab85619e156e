use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use serde::Deserialize;

use crate::{
    error::{PlaseekError, Result},
    runner::{Invocation, ToolRunner},
};

/// Columns requested from `foldseek easy-search`, in the order they appear
/// in the M8 file.
pub const M8_COLUMNS: [&str; 21] = [
    "query", "theader", "pident", "alnlen", "mismatch", "gapopen", "qstart", "qend", "tstart",
    "tend", "prob", "evalue", "bits", "qlen", "tlen", "qaln", "taln", "tca", "tseq", "taxid",
    "taxname",
];

/// One row of a foldseek M8 table. Fields are positional; the file has no
/// header line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuralHit {
    pub query: String,
    pub theader: String,
    pub pident: f64,
    pub alnlen: u32,
    pub mismatch: u32,
    pub gapopen: u32,
    pub qstart: u32,
    pub qend: u32,
    pub tstart: u32,
    pub tend: u32,
    pub prob: f64,
    pub evalue: f64,
    pub bits: f64,
    pub qlen: u32,
    pub tlen: u32,
    pub qaln: String,
    pub taln: String,
    pub tca: String,
    pub tseq: String,
    pub taxid: String,
    pub taxname: String,
}

// Parse every row of an M8 file. Quoting is disabled since taxonomy names
// may contain stray quote characters.
pub fn read_m8(path: &Path) -> Result<Vec<StructuralHit>> {
    let table_error = |source| PlaseekError::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .quoting(false)
        .from_path(path)
        .map_err(table_error)?;

    reader
        .deserialize()
        .collect::<std::result::Result<Vec<StructuralHit>, _>>()
        .map_err(table_error)
}

/// Keeps hits with an e-value strictly below `threshold`, in input order.
pub fn filter_by_evalue(hits: Vec<StructuralHit>, threshold: f64) -> Vec<StructuralHit> {
    hits.into_iter().filter(|hit| hit.evalue < threshold).collect()
}

pub fn filter_m8_file(path: &Path, threshold: f64) -> Result<Vec<StructuralHit>> {
    let hits = read_m8(path)?;
    let total = hits.len();
    let kept = filter_by_evalue(hits, threshold);
    log::info!(
        "{}: {} of {} structural hits have evalue < {:e}",
        path.display(),
        kept.len(),
        total,
        threshold
    );
    Ok(kept)
}

/// Inputs for a single `foldseek easy-search` call.
#[derive(Debug, Clone)]
pub struct FoldseekSearch<'a> {
    pub foldseek: &'a Path,
    pub structure: &'a Path,
    pub database: &'a Path,
    pub out_m8: &'a Path,
    pub tmp_dir: PathBuf,
    pub jobs: usize,
}

impl FoldseekSearch<'_> {
    pub fn invocation(&self) -> Invocation {
        Invocation::new(self.foldseek)
            .arg("easy-search")
            .arg(self.structure)
            .arg(self.database)
            .arg(self.out_m8)
            .arg(&self.tmp_dir)
            .arg("--format-output")
            .arg(M8_COLUMNS.join(","))
            .arg("--threads")
            .arg(self.jobs.to_string())
    }
}

pub fn run_foldseek(runner: &mut dyn ToolRunner, search: &FoldseekSearch) -> Result<()> {
    log::info!(
        "Searching {} against {} with foldseek",
        search.structure.display(),
        search.database.display()
    );
    runner.run(&search.invocation())
}
