//! External tool commands and blocking subprocess invocation
//!
//! Every external collaborator is an opaque command prefix; the harness only
//! appends phase-specific arguments and inspects the exit status. Defaults
//! target the npm/TypeScript chain, and each prefix is overridable so the
//! harness itself can be tested against substitute tool scripts.

use std::path::Path;
use std::process::Command;

use packcheck_report::{HarnessError, ToolOutput};

/// Command prefixes for the five external tools plus the peer packages
/// installed alongside the archive.
#[derive(Debug, Clone)]
pub struct Toolset {
    /// Packager; invoked as `<prefix> <dest_dir>` in the project root.
    pub packager: Vec<String>,
    /// Package manager; invoked as `<prefix> <archive> <peers...>` in the
    /// workspace.
    pub installer: Vec<String>,
    /// Type-checking, declaration-emitting compiler; invoked bare in the
    /// workspace and reads its configuration from `tsconfig.json`.
    pub tsc: Vec<String>,
    /// Fast transpiler; invoked as `<prefix> <inputs...> --outdir <dir>
    /// --format=cjs --platform=node` in the workspace.
    pub esbuild: Vec<String>,
    /// Test runner; invoked as `<prefix> <test files...>` in the workspace.
    pub runner: Vec<String>,
    /// Extra specifiers installed next to the archive.
    pub peer_packages: Vec<String>,
}

impl Default for Toolset {
    fn default() -> Self {
        Self {
            packager: vec![
                "npm".to_string(),
                "pack".to_string(),
                "--pack-destination".to_string(),
            ],
            installer: vec!["npm".to_string(), "install".to_string()],
            tsc: vec!["./node_modules/.bin/tsc".to_string()],
            esbuild: vec!["./node_modules/.bin/esbuild".to_string()],
            runner: vec!["node".to_string(), "--test".to_string()],
            peer_packages: vec![
                "typescript".to_string(),
                "esbuild".to_string(),
                "@tsconfig/node24".to_string(),
                "@types/node".to_string(),
            ],
        }
    }
}

impl Toolset {
    #[must_use]
    pub fn pack_argv(&self, dest_dir: &Path) -> Vec<String> {
        let mut argv = self.packager.clone();
        argv.push(dest_dir.display().to_string());
        argv
    }

    #[must_use]
    pub fn install_argv(&self, archive: &Path) -> Vec<String> {
        let mut argv = self.installer.clone();
        argv.push(archive.display().to_string());
        argv.extend(self.peer_packages.iter().cloned());
        argv
    }

    #[must_use]
    pub fn tsc_argv(&self) -> Vec<String> {
        self.tsc.clone()
    }

    #[must_use]
    pub fn esbuild_argv(&self, inputs: &[String], out_dir: &str) -> Vec<String> {
        let mut argv = self.esbuild.clone();
        argv.extend(inputs.iter().cloned());
        argv.push("--outdir".to_string());
        argv.push(out_dir.to_string());
        argv.push("--format=cjs".to_string());
        argv.push("--platform=node".to_string());
        argv
    }

    #[must_use]
    pub fn run_argv(&self, test_files: &[String]) -> Vec<String> {
        let mut argv = self.runner.clone();
        argv.extend(test_files.iter().cloned());
        argv
    }
}

/// Run one external tool to completion, capturing its output.
///
/// Blocks until the subprocess exits; a non-zero exit is not an error here,
/// the caller decides whether it is fatal or a failed check.
///
/// # Errors
///
/// Returns `HarnessError::Spawn` if the tool binary cannot be launched at
/// all, or if the argument vector is empty.
pub fn run_tool(argv: &[String], cwd: &Path) -> Result<ToolOutput, HarnessError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(HarnessError::spawn("<none>", "empty command"));
    };

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| HarnessError::spawn(program, e.to_string()))?;

    Ok(ToolOutput::from_output(&output))
}
