use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::config::{EstimatorConfig, FailurePolicy, ToolPaths};

#[derive(Parser, Debug)]
#[command(name = "apkdelta")]
#[command(version)]
#[command(about = "Estimate the sizes of APK update patches", long_about = None)]
#[command(after_help = "Estimates only: there is no guarantee that any store produces \
patches of these sizes.\n\nExamples:\n  \
  apkdelta --old-file v1.apk --new-file v2.apk\n  \
  apkdelta --old-file v1.apk --new-file v2.apk --strategies bsdiff,fbfv1 --csv\n  \
  apkdelta --old-file v1.apk --new-file v2.apk --save-patch out/patch")]
pub struct Cli {
    /// The "old" archive to generate patches from
    #[arg(long, value_name = "FILE")]
    pub old_file: PathBuf,

    /// The "new" archive to generate patches to
    #[arg(long, value_name = "FILE")]
    pub new_file: PathBuf,

    /// Path prefix to save the generated compressed patches under
    #[arg(long, value_name = "PREFIX")]
    pub save_patch: Option<PathBuf>,

    /// Directory for scratch files (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Delta strategies to run (default: all)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub strategies: Vec<String>,

    /// Compressions to apply (default: all)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub compressions: Vec<String>,

    /// Keep going when a strategy fails instead of aborting the run
    #[arg(long)]
    pub keep_going: bool,

    /// Print exact byte counts as CSV instead of a table
    #[arg(long)]
    pub csv: bool,

    /// Quiet mode (only warnings and errors)
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (log every external command)
    #[arg(short = 'v')]
    pub verbose: bool,

    /// bsdiff binary
    #[arg(long, value_name = "PATH")]
    pub bsdiff: Option<PathBuf>,

    /// gzip binary
    #[arg(long, value_name = "PATH")]
    pub gzip: Option<PathBuf>,

    /// brotli binary
    #[arg(long, value_name = "PATH")]
    pub brotli: Option<PathBuf>,

    /// java binary used to run the file-by-file generator
    #[arg(long, value_name = "PATH")]
    pub java: Option<PathBuf>,

    /// file-by-file generator jar (default: lib/file-by-file-tools.jar next to the executable)
    #[arg(long, value_name = "JAR")]
    pub fbf_jar: Option<PathBuf>,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Warn
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn config(&self) -> EstimatorConfig {
        let mut config = EstimatorConfig::new(&self.old_file, &self.new_file);
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = dir.clone();
        }
        config.save_patch = self.save_patch.clone();
        config.strategies = self.strategies.clone();
        config.compressions = self.compressions.clone();
        config.failure_policy = if self.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        };
        config
    }

    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            bsdiff: self.bsdiff.clone(),
            gzip: self.gzip.clone(),
            brotli: self.brotli.clone(),
            java: self.java.clone(),
            file_by_file_jar: self.fbf_jar.clone(),
        }
    }
}
