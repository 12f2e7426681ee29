//! Invocation of the external diff and compression binaries.
//!
//! Every process the estimator starts goes through [`ToolRunner`]. The
//! production implementation, [`SystemTools`], blocks the pipeline until the
//! child exits; there is no timeout, so a hung tool hangs the run.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use crate::config::ToolPaths;
use crate::error::{EstimateError, IoContext, Result};

/// External tools, by logical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tool {
    Bsdiff,
    Gzip,
    Brotli,
    /// archive-patcher's file-by-file generator, run through `java -jar`.
    FileByFile,
}

impl Tool {
    pub fn id(&self) -> &'static str {
        match self {
            Tool::Bsdiff => "bsdiff",
            Tool::Gzip => "gzip",
            Tool::Brotli => "brotli",
            Tool::FileByFile => "file-by-file-generator",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One call of an external tool.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub args: Vec<OsString>,
    /// File fed to the child's stdin.
    pub stdin: Option<PathBuf>,
    /// File receiving the child's stdout.
    pub stdout: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            args: Vec::new(),
            stdin: None,
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Value following `flag` in the argument list.
    pub fn flag_value(&self, flag: &str) -> Option<&Path> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(Path::new)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

/// Trait for running external tools
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion; any non-zero exit is an error.
    async fn run(&self, invocation: &ToolInvocation) -> Result<()>;
}

/// Program and leading arguments for one resolved tool.
#[derive(Debug, Clone)]
struct ResolvedTool {
    program: PathBuf,
    prefix: Vec<OsString>,
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemTools {
    resolved: BTreeMap<Tool, ResolvedTool>,
}

impl SystemTools {
    /// Resolve every tool in `needed` from its override or `PATH`.
    ///
    /// # Errors
    ///
    /// [`EstimateError::ExternalToolFailure`] if a binary cannot be found and
    /// [`EstimateError::MissingInput`] if the file-by-file jar is missing.
    pub fn resolve(paths: &ToolPaths, needed: &BTreeSet<Tool>) -> Result<Self> {
        let mut resolved = BTreeMap::new();
        for &tool in needed {
            let entry = match tool {
                Tool::Bsdiff => plain(find_binary("bsdiff", paths.bsdiff.as_deref())?),
                Tool::Gzip => plain(find_binary("gzip", paths.gzip.as_deref())?),
                Tool::Brotli => plain(find_binary("brotli", paths.brotli.as_deref())?),
                Tool::FileByFile => {
                    let java = find_binary("java", paths.java.as_deref())?;
                    let jar = paths.file_by_file_jar.clone().unwrap_or_else(ToolPaths::default_jar);
                    if !jar.is_file() {
                        return Err(EstimateError::missing(jar));
                    }
                    ResolvedTool {
                        program: java,
                        prefix: vec!["-jar".into(), jar.into_os_string()],
                    }
                }
            };
            debug!("{tool}: {}", entry.program.display());
            resolved.insert(tool, entry);
        }
        Ok(Self { resolved })
    }
}

fn plain(program: PathBuf) -> ResolvedTool {
    ResolvedTool {
        program,
        prefix: Vec::new(),
    }
}

/// Finds the path of a binary, honouring an explicit override.
fn find_binary(name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => which::which(path),
        None => which::which(name),
    }
    .map_err(|_| EstimateError::tool(name, format!("no `{name}` on PATH, please install or fix PATH")))
}

#[async_trait]
impl ToolRunner for SystemTools {
    async fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        let tool = invocation.tool;
        let resolved = self
            .resolved
            .get(&tool)
            .ok_or_else(|| EstimateError::tool(tool.id(), "tool was not resolved at setup"))?;

        let mut command = Command::new(&resolved.program);
        command.args(&resolved.prefix).args(&invocation.args);

        if let Some(path) = &invocation.stdin {
            let file = std::fs::File::open(path).io_context(|| format!("open {}", path.display()))?;
            command.stdin(Stdio::from(file));
        }
        if let Some(path) = &invocation.stdout {
            let file = std::fs::File::create(path).io_context(|| format!("create {}", path.display()))?;
            command.stdout(Stdio::from(file));
        }

        let rendered = render(&resolved.program, resolved.prefix.iter().chain(&invocation.args));
        debug!("running {rendered}");

        let status = command
            .status()
            .await
            .map_err(|e| EstimateError::tool(tool.id(), format!("could not start `{rendered}`: {e}")))?;

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
            return Err(EstimateError::tool(
                tool.id(),
                format!("problem running `{rendered}`, returned {code}"),
            ));
        }
        Ok(())
    }
}

fn render<'a>(program: &Path, args: impl Iterator<Item = &'a OsString>) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
