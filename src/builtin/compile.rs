//! The `compile` task and the compiler collaborator it drives

use crate::config::{BuidlConfig, SolcConfig};
use crate::error::Result;
use crate::runner::environment::Artifact;
use anyhow::{anyhow, bail, Context as _};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Turns Solidity sources into artifacts
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, sources: &[PathBuf], solc: &SolcConfig) -> anyhow::Result<Vec<Artifact>>;
}

/// Invokes an external `solc` binary
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    binary: String,
}

impl Default for SolcCompiler {
    fn default() -> Self {
        SolcCompiler {
            binary: "solc".to_string(),
        }
    }
}

impl SolcCompiler {
    pub fn new(binary: impl Into<String>) -> Self {
        SolcCompiler {
            binary: binary.into(),
        }
    }
}

#[derive(Deserialize)]
struct CombinedOutput {
    contracts: BTreeMap<String, CombinedContract>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct CombinedContract {
    abi: Value,
    bin: String,
}

/// Parse `solc --combined-json abi,bin` output. Keys look like
/// `path/to/File.sol:Contract`; older compilers encode the ABI as a string.
pub fn parse_combined_json(output: &str) -> anyhow::Result<(Vec<Artifact>, Option<String>)> {
    let parsed: CombinedOutput =
        serde_json::from_str(output).context("unexpected solc output")?;

    let mut artifacts = Vec::with_capacity(parsed.contracts.len());
    for (key, contract) in parsed.contracts {
        let contract_name = key.rsplit(':').next().unwrap_or(&key).to_string();
        let abi = match contract.abi {
            Value::String(encoded) => serde_json::from_str(&encoded)
                .with_context(|| format!("invalid ABI for {}", contract_name))?,
            abi => abi,
        };
        artifacts.push(Artifact {
            contract_name,
            abi,
            bytecode: format!("0x{}", contract.bin.trim_start_matches("0x")),
        });
    }

    Ok((artifacts, parsed.version))
}

#[async_trait]
impl Compiler for SolcCompiler {
    async fn compile(&self, sources: &[PathBuf], solc: &SolcConfig) -> anyhow::Result<Vec<Artifact>> {
        let mut command = Command::new(&self.binary);
        command.arg("--combined-json").arg("abi,bin");
        if solc.optimizer.enabled {
            command
                .arg("--optimize")
                .arg("--optimize-runs")
                .arg(solc.optimizer.runs.to_string());
        }
        command.args(sources);

        let output = command
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("compilation failed:\n{}", stderr.trim());
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| anyhow!("solc output is not UTF-8"))?;
        let (artifacts, version) = parse_combined_json(&stdout)?;

        if let Some(version) = version {
            if !version.starts_with(&solc.version) {
                tracing::warn!(
                    configured = %solc.version,
                    found = %version,
                    "solc version doesn't match the configured one"
                );
            }
        }

        Ok(artifacts)
    }
}

/// All `.sol` files under the sources directory, sorted
pub fn find_sources(sources_dir: &Path) -> Result<Vec<PathBuf>> {
    if !sources_dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = sources_dir.join("**").join("*.sol");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| anyhow!("invalid sources pattern: {}", e))?;

    let mut sources = Vec::new();
    for entry in entries {
        sources.push(entry.map_err(|e| anyhow!("can't read sources: {}", e))?);
    }
    sources.sort();
    Ok(sources)
}

/// Compile the project's sources and store the artifacts. Returns the
/// names of the compiled contracts.
pub async fn compile_project(
    compiler: &dyn Compiler,
    config: &BuidlConfig,
    artifacts: &crate::runner::environment::Artifacts,
) -> Result<Vec<String>> {
    let sources = find_sources(&config.paths.sources)?;
    if sources.is_empty() {
        tracing::info!(dir = %config.paths.sources.display(), "no sources to compile");
        return Ok(Vec::new());
    }

    tracing::info!(count = sources.len(), "compiling sources");
    let compiled = compiler.compile(&sources, &config.solc).await?;

    let mut names = Vec::with_capacity(compiled.len());
    for artifact in compiled {
        names.push(artifact.contract_name.clone());
        artifacts.persist(artifact).await?;
    }

    tracing::info!(contracts = ?names, "compilation finished");
    Ok(names)
}
