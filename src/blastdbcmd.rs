use std::{collections::HashSet, fs, path::Path};

use crate::{
    error::Result,
    runner::{Invocation, Redirect, ToolRunner},
    tblastn::TranslatedHits,
};

/// Column holding the subject accession in the tblastn table.
pub const ACCESSION_COLUMN: &str = "saccver";

// Accessions in table order, each listed once.
pub fn unique_accessions(table: &TranslatedHits, column: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    Ok(table
        .column(column)?
        .into_iter()
        .filter(|acc| !acc.is_empty() && seen.insert(*acc))
        .map(str::to_string)
        .collect())
}

/// Inputs for pulling the matched records out of the BLAST database.
#[derive(Debug, Clone)]
pub struct RecordExtraction<'a> {
    pub parallel: &'a Path,
    pub blastdbcmd: &'a Path,
    pub database: &'a Path,
    pub accession_list: &'a Path,
    pub outfile: &'a Path,
    pub jobs: usize,
}

impl RecordExtraction<'_> {
    pub fn invocation(&self) -> Invocation {
        Invocation::new(self.parallel)
            .args(["--quote", "--keep-order", "--jobs"])
            .arg(self.jobs.to_string())
            .arg("--arg-file")
            .arg(self.accession_list)
            .arg(self.blastdbcmd)
            .arg("-db")
            .arg(self.database)
            .args(["-entry", "{}"])
            .stdout(Redirect::Create(self.outfile.to_path_buf()))
    }
}

// Write the accession list next to the other intermediates, then fetch every
// entry. Returns how many accessions were requested.
pub fn run_blastdbcmd(
    runner: &mut dyn ToolRunner,
    extraction: &RecordExtraction,
    table: &TranslatedHits,
) -> Result<usize> {
    let accessions = unique_accessions(table, ACCESSION_COLUMN)?;
    if accessions.is_empty() {
        log::warn!(
            "No accessions passed the filters; writing empty {}",
            extraction.outfile.display()
        );
        fs::write(extraction.outfile, "")?;
        return Ok(0);
    }

    let mut list = accessions.join("\n");
    list.push('\n');
    fs::write(extraction.accession_list, list)?;

    log::info!(
        "Extracting {} records from {} into {}",
        accessions.len(),
        extraction.database.display(),
        extraction.outfile.display()
    );
    runner.run(&extraction.invocation())?;
    Ok(accessions.len())
}
