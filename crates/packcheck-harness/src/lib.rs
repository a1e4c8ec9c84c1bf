//! Packcheck harness - single-shot pack/install/compile/run orchestration
//!
//! Drives one full packaging/consumption cycle against opaque external
//! tools and reports pass/fail per phase. Fatal setup failures (pack,
//! provision, install) abort the run; compile/run/artifact checks are
//! verification phases that mark the report failed and keep going.
//! Workspace and archive cleanup is unconditional on every exit path.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use packcheck_report::{HarnessError, Phase, PhaseReport, Report};

pub mod toolset;
pub mod workspace;

pub use toolset::{Toolset, run_tool};
pub use workspace::{Archive, SeededFixture, Workspace};

/// One configured integration run. Single-shot: failed runs are not
/// retried or resumed.
pub struct Harness {
    project_root: PathBuf,
    fixtures: Vec<PathBuf>,
    extends: String,
    scratch_root: Option<PathBuf>,
    toolset: Toolset,
}

impl Harness {
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, extends: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            fixtures: Vec::new(),
            extends: extends.into(),
            scratch_root: None,
            toolset: Toolset::default(),
        }
    }

    #[must_use]
    pub fn fixtures(mut self, fixtures: Vec<PathBuf>) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Confine all scratch state (workspace and archive destination) to the
    /// given directory instead of the system temp directory.
    #[must_use]
    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn toolset(mut self, toolset: Toolset) -> Self {
        self.toolset = toolset;
        self
    }

    /// Execute the full cycle once.
    ///
    /// Phases run strictly sequentially; each blocks until its subprocess
    /// has exited. The workspace and archive are removed before this
    /// returns, on the error path too.
    ///
    /// # Errors
    ///
    /// Returns a `HarnessError` for fatal setup failures: pack, provision,
    /// fixture seeding, manifest/config synthesis, install, or a tool that
    /// cannot be launched at all.
    pub fn run(&self) -> Result<Report, HarnessError> {
        let scratch = self.scratch_root.as_deref();

        let archive = Archive::pack(&self.toolset, &self.project_root, scratch)?;
        let workspace = Workspace::provision(scratch)?;

        let mut report = Report::new(
            workspace.path().to_path_buf(),
            archive.path().to_path_buf(),
        );
        report.record(PhaseReport::passed(Phase::Pack));
        report.record(PhaseReport::passed(Phase::Provision));

        let seeded = workspace.seed(&self.fixtures)?;
        report.record(PhaseReport::passed(Phase::SeedFixtures));

        workspace.write_manifest()?;
        report.record(PhaseReport::passed(Phase::WriteManifest));

        self.install(&workspace, &archive)?;
        report.record(PhaseReport::passed(Phase::Install));

        workspace.write_compiler_config(&self.extends)?;
        report.record(PhaseReport::passed(Phase::WriteCompilerConfig));

        self.compile_tsc(&workspace, &seeded, &mut report)?;
        self.run_compiled(&workspace, &workspace.tsc_out_dir(), Phase::RunTscOutput, &mut report)?;
        self.compile_esbuild(&workspace, &seeded, &mut report)?;
        self.run_compiled(
            &workspace,
            &workspace.esbuild_out_dir(),
            Phase::RunEsbuildOutput,
            &mut report,
        )?;

        // Workspace and archive drop here; teardown is best-effort and
        // never masks a verification failure already in the report.
        Ok(report)
    }

    fn install(&self, workspace: &Workspace, archive: &Archive) -> Result<(), HarnessError> {
        let tool = self.toolset.installer.first().cloned().unwrap_or_default();
        let output = run_tool(&self.toolset.install_argv(archive.path()), workspace.path())?;
        if output.success() {
            Ok(())
        } else {
            Err(HarnessError::install(&tool, output.diagnostic()))
        }
    }

    fn compile_tsc(
        &self,
        workspace: &Workspace,
        seeded: &[SeededFixture],
        report: &mut Report,
    ) -> Result<(), HarnessError> {
        let output = run_tool(&self.toolset.tsc_argv(), workspace.path())?;
        let phase_report = if output.success() {
            verify_artifacts(
                Phase::CompileTsc,
                &workspace.tsc_out_dir(),
                &expected_tsc_artifacts(seeded),
            )
        } else {
            PhaseReport::failed(Phase::CompileTsc, vec![output.diagnostic()])
        };
        report.record(phase_report.with_output(output));
        Ok(())
    }

    fn compile_esbuild(
        &self,
        workspace: &Workspace,
        seeded: &[SeededFixture],
        report: &mut Report,
    ) -> Result<(), HarnessError> {
        let inputs: Vec<String> = seeded
            .iter()
            .map(|f| format!("src/{}", f.file_name))
            .collect();
        let argv = self.toolset.esbuild_argv(&inputs, "dist-esbuild");

        let output = run_tool(&argv, workspace.path())?;
        let phase_report = if output.success() {
            verify_artifacts(
                Phase::CompileEsbuild,
                &workspace.esbuild_out_dir(),
                &expected_esbuild_artifacts(seeded),
            )
        } else {
            PhaseReport::failed(Phase::CompileEsbuild, vec![output.diagnostic()])
        };
        report.record(phase_report.with_output(output));
        Ok(())
    }

    /// Run every compiled `*.test.js` under `out_dir` through the test
    /// runner in a fresh process and require a zero exit.
    fn run_compiled(
        &self,
        workspace: &Workspace,
        out_dir: &Path,
        phase: Phase,
        report: &mut Report,
    ) -> Result<(), HarnessError> {
        let test_files = compiled_test_files(workspace.path(), out_dir);
        if test_files.is_empty() {
            report.record(PhaseReport::failed(
                phase,
                vec![format!(
                    "no compiled *.test.js artifacts in {}",
                    out_dir.display()
                )],
            ));
            return Ok(());
        }

        let output = run_tool(&self.toolset.run_argv(&test_files), workspace.path())?;
        let phase_report = if output.success() {
            PhaseReport::passed(phase)
        } else {
            PhaseReport::failed(phase, vec![output.diagnostic()])
        };
        report.record(phase_report.with_output(output));
        Ok(())
    }
}

/// Expected toolchain A output: one `.js` per fixture plus one `.d.ts` per
/// fixture with public exports.
#[must_use]
pub fn expected_tsc_artifacts(seeded: &[SeededFixture]) -> BTreeSet<String> {
    let mut expected = BTreeSet::new();
    for fixture in seeded {
        expected.insert(format!("{}.js", fixture.stem));
        if fixture.has_exports {
            expected.insert(format!("{}.d.ts", fixture.stem));
        }
    }
    expected
}

/// Expected toolchain B output: one `.js` per fixture, never declarations.
#[must_use]
pub fn expected_esbuild_artifacts(seeded: &[SeededFixture]) -> BTreeSet<String> {
    seeded
        .iter()
        .map(|f| format!("{}.js", f.stem))
        .collect()
}

/// Compare an output directory against the expected artifact names. Every
/// missing and every unexpected name is its own detail line, so the report
/// says exactly which expectation failed.
#[must_use]
pub fn verify_artifacts(
    phase: Phase,
    out_dir: &Path,
    expected: &BTreeSet<String>,
) -> PhaseReport {
    let actual = match list_file_names(out_dir) {
        Ok(names) => names,
        Err(detail) => {
            return PhaseReport::failed(
                phase,
                vec![format!("output directory {}: {detail}", out_dir.display())],
            );
        }
    };

    let mut details = Vec::new();
    for name in expected {
        if !actual.contains(name) {
            details.push(format!("missing expected artifact {name}"));
        }
    }
    for name in &actual {
        if !expected.contains(name) {
            details.push(format!("unexpected artifact {name}"));
        }
    }

    if details.is_empty() {
        PhaseReport::passed(phase)
    } else {
        PhaseReport::failed(phase, details)
    }
}

/// Collect `*.ts` fixture files from a directory, sorted by name.
///
/// # Errors
///
/// Returns `HarnessError::Seed` if the directory cannot be read.
pub fn fixtures_from_dir(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let entries = fs::read_dir(dir).map_err(|e| HarnessError::seed(dir, e.to_string()))?;

    let mut fixtures = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::seed(dir, e.to_string()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ts") {
            fixtures.push(path);
        }
    }
    fixtures.sort();
    Ok(fixtures)
}

fn list_file_names(dir: &Path) -> Result<BTreeSet<String>, String> {
    let entries = fs::read_dir(dir).map_err(|e| e.to_string())?;
    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        if entry.path().is_file() {
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// Compiled test artifacts under `out_dir`, as paths relative to the
/// workspace root, sorted for deterministic runner invocations.
fn compiled_test_files(workspace_root: &Path, out_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(out_dir) else {
        return Vec::new();
    };

    let mut files: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".test.js") {
                let relative = out_dir
                    .strip_prefix(workspace_root)
                    .unwrap_or(out_dir)
                    .join(&name);
                Some(relative.display().to_string())
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}
