use std::{
    ffi::OsString,
    fs::{File, OpenOptions},
    path::PathBuf,
    process::{Command, Output, Stdio},
};

use crate::error::{PlaseekError, Result};

/// Where a tool's standard output should go.
#[derive(Debug, Clone, PartialEq)]
pub enum Redirect {
    Create(PathBuf),
    Append(PathBuf),
}

/// One external program call: the program, its arguments and optional
/// stdin/stdout files.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<Redirect>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            stdout: None,
        }
    }

    // Arguments stay OS strings so non UTF-8 paths reach the tool untouched.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout(mut self, redirect: Redirect) -> Self {
        self.stdout = Some(redirect);
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program_name();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Runs external programs. The pipeline only talks to the outside world
/// through this trait.
pub trait ToolRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()>;
}

/// Blocks on each program via `std::process`, failing on a non-zero exit.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    // Without a redirect the tool writes straight to our stdout, so only
    // stderr ends up in the returned output.
    fn execute(invocation: &Invocation) -> Result<Output> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        command.stdin(match &invocation.stdin {
            Some(path) => Stdio::from(File::open(path)?),
            None => Stdio::null(),
        });
        match &invocation.stdout {
            Some(Redirect::Create(path)) => {
                command.stdout(Stdio::from(File::create(path)?));
            }
            Some(Redirect::Append(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::inherit());
            }
        }

        command.output().map_err(|source| PlaseekError::ToolLaunch {
            program: invocation.program_name(),
            source,
        })
    }
}

impl ToolRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        log::debug!("Running: {}", invocation.command_line());
        let output = Self::execute(invocation)?;

        if !output.status.success() {
            return Err(PlaseekError::ToolFailed {
                program: invocation.program_name(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
