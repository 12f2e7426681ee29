//! Drives the strategy × compression matrix.
//!
//! For each selected strategy the patch artifact is computed once in its own
//! scratch subdirectory. Every selected compression is then applied to that
//! artifact and the compressed size recorded. The artifact is removed after
//! the last compression pass; the run's scratch directory is removed when
//! the run ends, whether it succeeded or not.

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::compression::{CompressionDescriptor, CompressionRegistry};
use crate::config::{EstimatorConfig, FailurePolicy};
use crate::delta::{StrategyDescriptor, StrategyRegistry};
use crate::error::{EstimateError, IoContext, Result};
use crate::scratch::{RunScratch, copy_file, file_size, remove_file_if_exists};
use crate::tools::{Tool, ToolRunner};

/// Row or column label of the result matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub display_name: String,
}

/// A strategy row excluded from the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
}

/// Patch sizes by (strategy id, compression id), in priority order.
#[derive(Debug, Clone, Default)]
pub struct PatchSizeMatrix {
    strategies: Vec<Label>,
    compressions: Vec<Label>,
    sizes: HashMap<(String, String), u64>,
    failures: Vec<StrategyFailure>,
}

impl PatchSizeMatrix {
    /// Completed strategies, in run order.
    pub fn strategies(&self) -> &[Label] {
        &self.strategies
    }

    pub fn compressions(&self) -> &[Label] {
        &self.compressions
    }

    pub fn get(&self, strategy: &str, compression: &str) -> Option<u64> {
        self.sizes
            .get(&(strategy.to_string(), compression.to_string()))
            .copied()
    }

    pub fn failures(&self) -> &[StrategyFailure] {
        &self.failures
    }
}

/// Orchestrates one estimation run over immutable registries.
pub struct Estimator<'a> {
    strategies: &'a StrategyRegistry,
    compressions: &'a CompressionRegistry,
    tools: &'a dyn ToolRunner,
}

/// Strategies and compressions a run will use, resolved up front.
struct Plan<'r> {
    strategies: Vec<&'r StrategyDescriptor>,
    compressions: Vec<&'r CompressionDescriptor>,
}

impl<'a> Estimator<'a> {
    pub fn new(strategies: &'a StrategyRegistry, compressions: &'a CompressionRegistry, tools: &'a dyn ToolRunner) -> Self {
        Self {
            strategies,
            compressions,
            tools,
        }
    }

    /// External tools the configured run needs, for setup-time resolution.
    pub fn required_tools(strategies: &StrategyRegistry, compressions: &CompressionRegistry, config: &EstimatorConfig) -> Result<BTreeSet<Tool>> {
        let mut tools: BTreeSet<Tool> = BTreeSet::new();
        for strategy in strategies.select(&config.strategies)? {
            tools.extend(strategy.required_tools());
        }
        for compression in compressions.select(&config.compressions)? {
            tools.extend(compression.required_tool());
        }
        Ok(tools)
    }

    fn plan(&self, config: &EstimatorConfig) -> Result<Plan<'a>> {
        Ok(Plan {
            strategies: self.strategies.select(&config.strategies)?,
            compressions: self.compressions.select(&config.compressions)?,
        })
    }

    /// Run every selected strategy against every selected compression.
    ///
    /// # Errors
    ///
    /// Configuration problems fail before any strategy runs. Under
    /// [`FailurePolicy::Abort`] the first failing strategy ends the run with
    /// [`EstimateError::StrategyFailed`].
    pub async fn run(&self, config: &EstimatorConfig) -> Result<PatchSizeMatrix> {
        config.validate()?;
        let plan = self.plan(config)?;

        let mut matrix = PatchSizeMatrix {
            compressions: plan
                .compressions
                .iter()
                .map(|c| Label {
                    id: c.id.to_string(),
                    display_name: c.display_name.to_string(),
                })
                .collect(),
            ..PatchSizeMatrix::default()
        };

        let scratch = RunScratch::new(&config.temp_dir)?;
        for strategy in &plan.strategies {
            info!("{}: running", strategy.display_name);
            match self.run_strategy(strategy, &plan.compressions, config, &scratch).await {
                Ok(sizes) => {
                    info!("{}: completed", strategy.display_name);
                    for (compression, size) in sizes {
                        matrix.sizes.insert((strategy.id.to_string(), compression), size);
                    }
                    matrix.strategies.push(Label {
                        id: strategy.id.to_string(),
                        display_name: strategy.display_name.to_string(),
                    });
                }
                Err(source) => {
                    let err = EstimateError::StrategyFailed {
                        strategy: strategy.id.to_string(),
                        source: Box::new(source),
                    };
                    if config.failure_policy == FailurePolicy::Abort {
                        return Err(err);
                    }
                    warn!("{err}");
                    matrix.failures.push(StrategyFailure {
                        strategy: strategy.id.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        scratch.close()?;
        Ok(matrix)
    }

    /// Compute one strategy's artifact and its compressed sizes.
    async fn run_strategy(
        &self,
        strategy: &StrategyDescriptor,
        compressions: &[&CompressionDescriptor],
        config: &EstimatorConfig,
        scratch: &RunScratch,
    ) -> Result<Vec<(String, u64)>> {
        let dir = scratch.strategy_dir(strategy.id).await?;
        let artifact = strategy
            .run(&config.old_file, &config.new_file, &dir, self.tools)
            .await?;

        let mut sizes = Vec::with_capacity(compressions.len());
        for compression in compressions {
            let compressed = compression.compress(&artifact, self.tools).await?;
            let size = file_size(&compressed).await?;
            info!(
                "{} + {}: {size} bytes",
                strategy.display_name, compression.display_name
            );

            if let Some(prefix) = &config.save_patch {
                // No point saving an untouched copy of the new archive.
                if !(strategy.id == "identity" && compression.is_identity()) {
                    let target = saved_patch_path(prefix, strategy, compression);
                    copy_file(&compressed, &target).await?;
                }
            }
            if compressed != artifact {
                remove_file_if_exists(&compressed).await?;
            }
            sizes.push((compression.id.to_string(), size));
        }

        remove_file_if_exists(&artifact).await?;
        tokio::fs::remove_dir_all(&dir)
            .await
            .io_context(|| format!("remove {}", dir.display()))?;
        Ok(sizes)
    }
}

/// `<prefix><strategy ext><compression ext>`
pub fn saved_patch_path(prefix: &Path, strategy: &StrategyDescriptor, compression: &CompressionDescriptor) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_os_string();
    name.push(strategy.patch_extension);
    name.push(compression.extension);
    PathBuf::from(name)
}
