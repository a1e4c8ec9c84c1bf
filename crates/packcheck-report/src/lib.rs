//! Phase vocabulary and run reporting for the packcheck harness
//!
//! Every check the harness performs is attributed to exactly one phase, so
//! a failure names the tool that caused it.

use std::fmt;
use std::path::PathBuf;

use serde_json::json;

/// One phase of the pack -> install -> compile -> run cycle.
///
/// Phases execute strictly in declaration order; no phase starts before the
/// previous one's subprocess has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pack,
    Provision,
    SeedFixtures,
    WriteManifest,
    Install,
    WriteCompilerConfig,
    CompileTsc,
    RunTscOutput,
    CompileEsbuild,
    RunEsbuildOutput,
}

impl Phase {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pack => "pack",
            Self::Provision => "provision",
            Self::SeedFixtures => "seed-fixtures",
            Self::WriteManifest => "write-manifest",
            Self::Install => "install",
            Self::WriteCompilerConfig => "write-compiler-config",
            Self::CompileTsc => "compile-tsc",
            Self::RunTscOutput => "run-tsc-output",
            Self::CompileEsbuild => "compile-esbuild",
            Self::RunEsbuildOutput => "run-esbuild-output",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; -1 when the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    #[must_use]
    pub fn from_output(output: &std::process::Output) -> Self {
        Self {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.code == 0
    }

    /// Short diagnostic string for error messages: stderr if present,
    /// otherwise stdout, trimmed.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        format!("exit code {}: {text}", self.code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Failed,
}

/// Outcome of one phase, with one detail line per failed expectation.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub status: CheckStatus,
    pub details: Vec<String>,
    pub output: Option<ToolOutput>,
}

impl PhaseReport {
    #[must_use]
    pub const fn passed(phase: Phase) -> Self {
        Self {
            phase,
            status: CheckStatus::Passed,
            details: Vec::new(),
            output: None,
        }
    }

    #[must_use]
    pub const fn failed(phase: Phase, details: Vec<String>) -> Self {
        Self {
            phase,
            status: CheckStatus::Failed,
            details,
            output: None,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: ToolOutput) -> Self {
        self.output = Some(output);
        self
    }
}

/// Full account of one harness run.
///
/// The workspace and archive paths are the ones the run used; both are
/// removed by the time the caller sees this report, and callers asserting on
/// cleanup check exactly that.
#[derive(Debug, Clone)]
pub struct Report {
    pub phases: Vec<PhaseReport>,
    pub workspace_path: PathBuf,
    pub archive_path: PathBuf,
}

impl Report {
    #[must_use]
    pub fn new(workspace_path: PathBuf, archive_path: PathBuf) -> Self {
        Self {
            phases: Vec::new(),
            workspace_path,
            archive_path,
        }
    }

    pub fn record(&mut self, phase_report: PhaseReport) {
        self.phases.push(phase_report);
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.phases
            .iter()
            .all(|p| p.status == CheckStatus::Passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PhaseReport> {
        self.phases
            .iter()
            .filter(|p| p.status == CheckStatus::Failed)
    }

    #[must_use]
    pub fn find(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "passed": self.passed(),
            "workspace": self.workspace_path.display().to_string(),
            "archive": self.archive_path.display().to_string(),
            "phases": self.phases.iter().map(|p| {
                json!({
                    "phase": p.phase.name(),
                    "status": match p.status {
                        CheckStatus::Passed => "passed",
                        CheckStatus::Failed => "failed",
                    },
                    "details": p.details,
                    "output": p.output.as_ref().map(|o| json!({
                        "code": o.code,
                        "stdout": o.stdout,
                        "stderr": o.stderr,
                    })),
                })
            }).collect::<Vec<_>>(),
        })
    }
}

/// Fatal setup failures. Verification failures (missing artifacts, non-zero
/// compile/run exits) are reported through [`Report`] instead and never
/// abort the run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("packcheck: ERR_PACK: {tool}: {detail}")]
    Pack { tool: String, detail: String },

    #[error("packcheck: ERR_PROVISION: {detail}")]
    Provision { detail: String },

    #[error("packcheck: ERR_SEED: {path}: {detail}")]
    Seed { path: String, detail: String },

    #[error("packcheck: ERR_SYNTHESIS: {path}: {detail}")]
    Synthesis { path: String, detail: String },

    #[error("packcheck: ERR_INSTALL: {tool}: {detail}")]
    Install { tool: String, detail: String },

    #[error("packcheck: ERR_TOOL_SPAWN: {tool}: {detail}")]
    Spawn { tool: String, detail: String },
}

impl HarnessError {
    #[must_use]
    pub fn pack(tool: &str, detail: impl Into<String>) -> Self {
        Self::Pack {
            tool: tool.to_string(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn provision(detail: impl Into<String>) -> Self {
        Self::Provision {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn seed(path: &std::path::Path, detail: impl Into<String>) -> Self {
        Self::Seed {
            path: path.display().to_string(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn synthesis(path: &std::path::Path, detail: impl Into<String>) -> Self {
        Self::Synthesis {
            path: path.display().to_string(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn install(tool: &str, detail: impl Into<String>) -> Self {
        Self::Install {
            tool: tool.to_string(),
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn spawn(tool: &str, detail: impl Into<String>) -> Self {
        Self::Spawn {
            tool: tool.to_string(),
            detail: detail.into(),
        }
    }
}
