//! Ephemeral consumer workspace and packed archive lifecycle
//!
//! Both are scratch state owned exclusively by the harness for the length of
//! one run. Removal happens on `Drop`, so teardown runs on every exit path,
//! including fatal early returns and panicking assertions, and is tolerant
//! of partially built or already-removed state.

use std::fs;
use std::path::{Path, PathBuf};

use packcheck_report::HarnessError;
use serde_json::json;
use tempfile::TempDir;

use crate::toolset::{Toolset, run_tool};

/// A fixture file copied into the workspace's source directory.
///
/// Whether the fixture carries a public export decides if the type-checking
/// compiler is expected to emit a declaration file for it.
#[derive(Debug, Clone)]
pub struct SeededFixture {
    pub file_name: String,
    pub stem: String,
    pub has_exports: bool,
}

/// Uniquely named scratch directory simulating a downstream consumer.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh `packcheck-*` directory under `scratch_root`, or the
    /// system temp directory when none is given.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Provision` if the directory cannot be
    /// allocated.
    pub fn provision(scratch_root: Option<&Path>) -> Result<Self, HarnessError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("packcheck-");

        let dir = match scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| HarnessError::provision(e.to_string()))?;

        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn src_dir(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    #[must_use]
    pub fn tsc_out_dir(&self) -> PathBuf {
        self.dir.path().join("dist")
    }

    #[must_use]
    pub fn esbuild_out_dir(&self) -> PathBuf {
        self.dir.path().join("dist-esbuild")
    }

    /// Copy fixture files into `src/`, flat, preserving file names.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Seed` on the first fixture that cannot be
    /// read or copied.
    pub fn seed(&self, fixtures: &[PathBuf]) -> Result<Vec<SeededFixture>, HarnessError> {
        let src = self.src_dir();
        fs::create_dir_all(&src).map_err(|e| HarnessError::seed(&src, e.to_string()))?;

        let mut seeded = Vec::new();
        for fixture in fixtures {
            let file_name = fixture
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| HarnessError::seed(fixture, "fixture has no file name"))?
                .to_string();

            let content = fs::read_to_string(fixture)
                .map_err(|e| HarnessError::seed(fixture, e.to_string()))?;
            let dest = src.join(&file_name);
            fs::write(&dest, &content).map_err(|e| HarnessError::seed(&dest, e.to_string()))?;

            let stem = file_name
                .strip_suffix(".ts")
                .unwrap_or(&file_name)
                .to_string();
            seeded.push(SeededFixture {
                stem,
                has_exports: has_public_exports(&content),
                file_name,
            });
        }

        Ok(seeded)
    }

    /// Write the fixed consumer manifest (`package.json`) into the
    /// workspace root. Content is literal, not derived from any input.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Synthesis` if the file cannot be written.
    pub fn write_manifest(&self) -> Result<(), HarnessError> {
        let manifest = json!({
            "name": "test-project",
            "version": "1.0.0",
            "type": "commonjs",
        });
        self.write_json("package.json", &manifest)
    }

    /// Write a `tsconfig.json` extending the installed preset, scoping
    /// input and output to the workspace's `src/` and `dist/` directories.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Synthesis` if the file cannot be written.
    pub fn write_compiler_config(&self, extends: &str) -> Result<(), HarnessError> {
        let config = json!({
            "extends": extends,
            "include": ["src"],
            "compilerOptions": {
                "rootDir": "./src",
                "outDir": "./dist",
            },
        });
        self.write_json("tsconfig.json", &config)
    }

    fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<(), HarnessError> {
        let path = self.dir.path().join(name);
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| HarnessError::synthesis(&path, e.to_string()))?;
        fs::write(&path, text).map_err(|e| HarnessError::synthesis(&path, e.to_string()))
    }
}

fn has_public_exports(source: &str) -> bool {
    source
        .lines()
        .any(|line| line.trim_start().starts_with("export "))
}

/// The packed distribution archive, held in its own scratch destination
/// directory so removal on `Drop` takes the archive with it.
pub struct Archive {
    #[allow(dead_code)]
    dest: TempDir,
    path: PathBuf,
}

impl Archive {
    /// Run the packager against `project_root` with a fresh destination
    /// directory and require exactly one produced file.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Pack` if the packager exits non-zero or
    /// produces zero or multiple files, and `HarnessError::Spawn` if it
    /// cannot be launched.
    pub fn pack(
        toolset: &Toolset,
        project_root: &Path,
        scratch_root: Option<&Path>,
    ) -> Result<Self, HarnessError> {
        let tool = toolset.packager.first().cloned().unwrap_or_default();

        let mut builder = tempfile::Builder::new();
        builder.prefix("packcheck-archive-");
        let dest = match scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| HarnessError::provision(e.to_string()))?;

        let output = run_tool(&toolset.pack_argv(dest.path()), project_root)?;
        if !output.success() {
            return Err(HarnessError::pack(&tool, output.diagnostic()));
        }

        let mut produced = Vec::new();
        let entries = fs::read_dir(dest.path())
            .map_err(|e| HarnessError::pack(&tool, e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| HarnessError::pack(&tool, e.to_string()))?;
            produced.push(entry.path());
        }

        match produced.as_slice() {
            [only] => Ok(Self {
                path: only.clone(),
                dest,
            }),
            _ => Err(HarnessError::pack(
                &tool,
                format!("produced {} archives, expected exactly 1", produced.len()),
            )),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
