use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord};

use crate::{
    error::{PlaseekError, Result},
    runner::{Invocation, Redirect, ToolRunner},
};

/// Output columns requested from tblastn (`-outfmt 6`). The same names are
/// written as the header line of the result table.
pub const TBLASTN_COLUMNS: [&str; 12] = [
    "qaccver", "saccver", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore",
];

const PIDENT_COLUMN: &str = "pident";

/// A headered tblastn result table. Rows are kept as raw strings since the
/// column set is whatever tblastn was asked to emit.
#[derive(Debug, Clone)]
pub struct TranslatedHits {
    path: PathBuf,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl TranslatedHits {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PlaseekError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row.get(idx).unwrap_or("")).collect())
    }

    pub fn filter_by_pident(mut self, threshold: f64) -> Result<Self> {
        let idx = self.column_index(PIDENT_COLUMN)?;
        let mut kept = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            let value = row.get(idx).unwrap_or("");
            let pident: f64 = value.trim().parse().map_err(|_| PlaseekError::InvalidValue {
                column: PIDENT_COLUMN.to_string(),
                value: value.to_string(),
            })?;
            if pident >= threshold {
                kept.push(row);
            }
        }
        self.rows = kept;
        Ok(self)
    }

    // Stable ascending sort. Purely numeric columns compare as numbers
    // (total order, NaN last), anything else compares as text.
    pub fn sort_by_column(mut self, name: &str) -> Result<Self> {
        let idx = self.column_index(name)?;
        let numeric: Option<Vec<f64>> = self
            .rows
            .iter()
            .map(|row| row.get(idx).unwrap_or("").trim().parse::<f64>().ok())
            .collect();

        match numeric {
            Some(keys) => {
                let mut keyed: Vec<(f64, StringRecord)> = keys.into_iter().zip(self.rows).collect();
                keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
                self.rows = keyed.into_iter().map(|(_, row)| row).collect();
            }
            None => self
                .rows
                .sort_by(|a, b| a.get(idx).unwrap_or("").cmp(b.get(idx).unwrap_or(""))),
        }
        Ok(self)
    }
}

pub fn read_translated_hits(path: &Path) -> Result<TranslatedHits> {
    let table_error = |source| PlaseekError::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quoting(false)
        .from_path(path)
        .map_err(table_error)?;

    let headers = reader.headers().map_err(table_error)?.clone();
    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(table_error)?;

    Ok(TranslatedHits {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Reads a tblastn table, keeps rows with `pident >= threshold` and sorts
/// them by `sort_column`.
pub fn filter_by_pident(path: &Path, threshold: f64, sort_column: &str) -> Result<TranslatedHits> {
    let table = read_translated_hits(path)?;
    let total = table.len();
    let filtered = table.filter_by_pident(threshold)?.sort_by_column(sort_column)?;
    log::info!(
        "{}: {} of {} tblastn hits have pident >= {}",
        path.display(),
        filtered.len(),
        total,
        threshold
    );
    if filtered.is_empty() {
        log::warn!("No tblastn hit reached pident {threshold}");
    }
    Ok(filtered)
}

/// Inputs for the chunked tblastn search.
#[derive(Debug, Clone)]
pub struct TblastnSearch<'a> {
    pub parallel: &'a Path,
    pub tblastn: &'a Path,
    pub database: &'a Path,
    pub query_fasta: &'a Path,
    pub out_tsv: &'a Path,
    pub evalue: f64,
    pub block: usize,
    pub jobs: usize,
}

impl TblastnSearch<'_> {
    // GNU parallel splits the FASTA on record starts and feeds each block
    // to its own tblastn process.
    pub fn invocation(&self) -> Invocation {
        Invocation::new(self.parallel)
            .args(["--quote", "--jobs"])
            .arg(self.jobs.to_string())
            .arg("--block")
            .arg(self.block.to_string())
            .args(["--recstart", ">", "--pipe"])
            .arg(self.tblastn)
            .arg("-db")
            .arg(self.database)
            .arg("-evalue")
            .arg(format!("{:e}", self.evalue))
            .arg("-outfmt")
            .arg(format!("6 {}", TBLASTN_COLUMNS.join(" ")))
            .args(["-query", "-"])
            .stdin(self.query_fasta)
            .stdout(Redirect::Append(self.out_tsv.to_path_buf()))
    }
}

pub fn run_tblastn(runner: &mut dyn ToolRunner, search: &TblastnSearch) -> Result<()> {
    fs::write(search.out_tsv, format!("{}\n", TBLASTN_COLUMNS.join("\t")))?;
    log::info!(
        "Running tblastn of {} against {} ({} jobs, block {})",
        search.query_fasta.display(),
        search.database.display(),
        search.jobs,
        search.block
    );
    runner.run(&search.invocation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tsv(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("hits_tblastn.tsv");
        fs::write(&path, text).unwrap();
        path
    }

    const TABLE: &str = "qaccver\tsaccver\tpident\tevalue\n\
        q1\tNZ_CP002.1\t99.10\t1e-120\n\
        q1\tNZ_CP001.1\t97.99\t1e-150\n\
        q2\tNZ_CP001.1\t100.00\t1e-130\n\
        q2\tNZ_AP003.1\t98.00\t1e-110\n\
        q3\tNZ_CP002.1\t98.50\t1e-140\n";

    #[test]
    fn keeps_rows_at_or_above_threshold_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), TABLE);

        let table = filter_by_pident(&path, 98.0, "saccver").unwrap();
        let accessions = table.column("saccver").unwrap();
        assert_eq!(accessions, vec!["NZ_AP003.1", "NZ_CP001.1", "NZ_CP002.1", "NZ_CP002.1"]);
        for pident in table.column("pident").unwrap() {
            assert!(pident.parse::<f64>().unwrap() >= 98.0);
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), TABLE);

        let table = filter_by_pident(&path, 98.0, "saccver").unwrap();
        let queries = table.column("qaccver").unwrap();
        // NZ_CP002.1 appears for q1 then q3 in the input.
        assert_eq!(queries, vec!["q2", "q2", "q1", "q3"]);
    }

    #[test]
    fn numeric_columns_sort_as_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(
            dir.path(),
            "saccver\tpident\tlength\nA\t99\t100\nB\t99\t20\nC\t99\t3\n",
        );

        let table = filter_by_pident(&path, 0.0, "length").unwrap();
        assert_eq!(table.column("saccver").unwrap(), vec!["C", "B", "A"]);
    }

    #[test]
    fn nan_values_sort_last_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let mut text = String::from("saccver\tpident\tscore\n");
        for i in 0..40 {
            let score = if i % 3 == 0 { "nan".to_string() } else { (40 - i).to_string() };
            text.push_str(&format!("S{i}\t99\t{score}\n"));
        }
        let path = write_tsv(dir.path(), &text);

        let table = filter_by_pident(&path, 98.0, "score").unwrap();
        let scores: Vec<f64> = table
            .column("score")
            .unwrap()
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(scores.len(), 40);
        let first_nan = scores.iter().position(|s| s.is_nan()).unwrap();
        assert!(scores[..first_nan].windows(2).all(|w| w[0] <= w[1]));
        assert!(scores[first_nan..].iter().all(|s| s.is_nan()));

        // NaN rows are ties and keep their input order.
        let accessions = table.column("saccver").unwrap();
        assert_eq!(&accessions[first_nan..first_nan + 3], ["S0", "S3", "S6"]);
    }

    #[test]
    fn non_numeric_pident_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), "saccver\tpident\nA\tabc\n");

        match filter_by_pident(&path, 98.0, "saccver") {
            Err(PlaseekError::InvalidValue { column, value }) => {
                assert_eq!(column, "pident");
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn missing_sort_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), TABLE);

        match filter_by_pident(&path, 98.0, "sacc") {
            Err(PlaseekError::MissingColumn { column, .. }) => assert_eq!(column, "sacc"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn missing_pident_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), "qaccver\tsaccver\nq1\tA\n");
        assert!(matches!(
            filter_by_pident(&path, 98.0, "saccver"),
            Err(PlaseekError::MissingColumn { .. })
        ));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), "saccver\tpident\nA\t99\textra\n");
        assert!(matches!(
            filter_by_pident(&path, 98.0, "saccver"),
            Err(PlaseekError::Table { .. })
        ));
    }

    #[test]
    fn header_only_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(dir.path(), &format!("{}\n", TBLASTN_COLUMNS.join("\t")));
        assert!(filter_by_pident(&path, 98.0, "saccver").unwrap().is_empty());
    }

    #[test]
    fn tblastn_goes_through_parallel() {
        let search = TblastnSearch {
            parallel: Path::new("/bin/parallel"),
            tblastn: Path::new("/bin/tblastn"),
            database: Path::new("/db/plsdb"),
            query_fasta: Path::new("sample_nodup.fasta"),
            out_tsv: Path::new("sample_tblastn.tsv"),
            evalue: 1e-100,
            block: 3000,
            jobs: 4,
        };
        let invocation = search.invocation();
        assert_eq!(invocation.program, PathBuf::from("/bin/parallel"));
        assert_eq!(invocation.stdin, Some(PathBuf::from("sample_nodup.fasta")));
        assert_eq!(
            invocation.stdout,
            Some(Redirect::Append(PathBuf::from("sample_tblastn.tsv")))
        );
        assert_eq!(
            invocation.command_line(),
            "/bin/parallel --quote --jobs 4 --block 3000 --recstart > --pipe /bin/tblastn \
             -db /db/plsdb -evalue 1e-100 -outfmt 6 qaccver saccver pident length mismatch \
             gapopen qstart qend sstart send evalue bitscore -query -"
        );
    }
}
