use std::path::PathBuf;

pub const DEFAULT_M8_EVALUE: f64 = 1e-10;
pub const DEFAULT_TBLASTN_EVALUE: f64 = 1e-100;
pub const DEFAULT_PIDENT: f64 = 98.0;
pub const DEFAULT_SORT_COLUMN: &str = "saccver";
pub const DEFAULT_BLOCK: usize = 3000;
pub const DEFAULT_JOBS: usize = 4;

/// Locations of the external programs the pipeline shells out to.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPaths {
    pub parallel: PathBuf,
    pub tblastn: PathBuf,
    pub foldseek: PathBuf,
    pub blastdbcmd: PathBuf,
}

/// Fully resolved settings for one run. Built by the CLI layer; nothing
/// below it reads the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub tools: ToolPaths,
    pub input: PathBuf,
    pub foldseek_db: Option<PathBuf>,
    pub target_db: PathBuf,
    pub tblastn_evalue: f64,
    pub block: usize,
    pub jobs: usize,
    pub m8_evalue: f64,
    pub pident: f64,
    pub sort_column: String,
    pub work_dir: PathBuf,
    pub outfile: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(tools: ToolPaths, input: PathBuf, target_db: PathBuf) -> Self {
        Self {
            tools,
            input,
            foldseek_db: None,
            target_db,
            tblastn_evalue: DEFAULT_TBLASTN_EVALUE,
            block: DEFAULT_BLOCK,
            jobs: DEFAULT_JOBS,
            m8_evalue: DEFAULT_M8_EVALUE,
            pident: DEFAULT_PIDENT,
            sort_column: DEFAULT_SORT_COLUMN.to_string(),
            work_dir: PathBuf::from("."),
            outfile: None,
        }
    }
}
