use std::{ffi::OsString, path::PathBuf};

use clap::{Args, Parser};

use crate::{
    binaries::resolve_binary,
    config::{
        PipelineConfig, ToolPaths, DEFAULT_BLOCK, DEFAULT_JOBS, DEFAULT_PIDENT, DEFAULT_SORT_COLUMN,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    binaries: BinaryArgs,

    /// a protein structure (.pdb) or a foldseek hit table (.m8)
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// foldseek database to search the structure against
    #[arg(long, value_name = "PATH", env = "FOLDSEEKDB")]
    foldseek_db_path: Option<PathBuf>,

    #[command(flatten)]
    tblastn: TblastnArgs,

    /// number of parallel jobs handed to parallel and foldseek
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    jobs: usize,

    /// where to write the extracted database records (default is <stem>_hits.fasta)
    #[arg(short, long, value_name = "FILE")]
    outfile_path: Option<PathBuf>,

    /// directory for intermediate files
    #[arg(long, value_name = "DIR", default_value = ".")]
    work_dir: PathBuf,
}

/// Locations of the external programs; each defaults to a lookup on PATH.
#[derive(Args, Debug)]
#[command(next_help_heading = "Binaries")]
struct BinaryArgs {
    /// path to the parallel executable
    #[arg(long, value_name = "FILE")]
    parallel_binary_path: Option<PathBuf>,

    /// path to the tblastn executable
    #[arg(long, value_name = "FILE")]
    tblastn_binary_path: Option<PathBuf>,

    /// path to the foldseek executable
    #[arg(long, value_name = "FILE")]
    foldseek_binary_path: Option<PathBuf>,

    /// path to the blastdbcmd executable
    #[arg(long, value_name = "FILE")]
    blastdbcmd_binary_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Filtering and tblastn")]
struct TblastnArgs {
    /// BLAST nucleotide database searched by tblastn and read by blastdbcmd
    #[arg(long, value_name = "PATH")]
    target_sequence_db_path: PathBuf,

    /// e-value threshold for tblastn
    #[arg(long, default_value = "1e-100")]
    evalue: f64,

    /// block size for splitting the tblastn query between jobs
    #[arg(long, default_value_t = DEFAULT_BLOCK)]
    block: usize,

    /// foldseek hits must have an e-value below this
    #[arg(long, default_value = "1e-10")]
    m8_evalue: f64,

    /// tblastn hits must have at least this percent identity
    #[arg(long, default_value_t = DEFAULT_PIDENT)]
    pident: f64,

    /// column used to order the filtered tblastn hits
    #[arg(long, value_name = "COLUMN", default_value = DEFAULT_SORT_COLUMN)]
    sort_by: String,
}

impl Cli {
    // Collapse the arguments into a config. `path_var` is the PATH value used
    // for binaries that were not given explicitly.
    pub fn into_config(self, path_var: Option<OsString>) -> PipelineConfig {
        let path_var = path_var.as_deref();
        let b = self.binaries;
        let tools = ToolPaths {
            parallel: resolve_binary("parallel", b.parallel_binary_path, path_var),
            tblastn: resolve_binary("tblastn", b.tblastn_binary_path, path_var),
            foldseek: resolve_binary("foldseek", b.foldseek_binary_path, path_var),
            blastdbcmd: resolve_binary("blastdbcmd", b.blastdbcmd_binary_path, path_var),
        };

        let mut config = PipelineConfig::new(tools, self.input, self.tblastn.target_sequence_db_path);
        config.foldseek_db = self.foldseek_db_path;
        config.tblastn_evalue = self.tblastn.evalue;
        config.block = self.tblastn.block;
        config.jobs = self.jobs;
        config.m8_evalue = self.tblastn.m8_evalue;
        config.pident = self.tblastn.pident;
        config.sort_column = self.tblastn.sort_by;
        config.work_dir = self.work_dir;
        config.outfile = self.outfile_path;
        config
    }
}
