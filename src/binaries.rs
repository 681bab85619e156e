use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use crate::{
    config::ToolPaths,
    error::{PlaseekError, Result},
};

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// Walk a PATH-style list of directories and return the first executable file
// called `name`.
pub fn find_on_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

// An explicit path always wins. Otherwise search PATH, and fall back to the
// bare name so that validation reports the tool as missing.
pub fn resolve_binary(name: &str, explicit: Option<PathBuf>, path_var: Option<&OsStr>) -> PathBuf {
    explicit
        .or_else(|| path_var.and_then(|p| find_on_path(name, p)))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn ensure_exists(tool: &'static str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PlaseekError::BinaryNotFound {
            tool,
            path: path.to_path_buf(),
        })
    }
}

/// Fails with the first tool whose configured path does not exist.
pub fn check_binaries_available(tools: &ToolPaths) -> Result<()> {
    ensure_exists("parallel", &tools.parallel)?;
    ensure_exists("tblastn", &tools.tblastn)?;
    ensure_exists("foldseek", &tools.foldseek)?;
    ensure_exists("blastdbcmd", &tools.blastdbcmd)?;
    log::debug!("All external binaries found: {tools:?}");
    Ok(())
}
