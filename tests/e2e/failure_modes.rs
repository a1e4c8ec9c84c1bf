//! E2E tests for failure attribution and unconditional cleanup
//! Tests that each failing tool marks exactly its own phase and that
//! scratch state never survives a run

use packcheck_harness::Harness;
use packcheck_report::{CheckStatus, HarnessError, Phase};

use super::support::FakeSetup;

fn harness_for(setup: &FakeSetup) -> Harness {
    Harness::new(setup.project_root(), "@example/preset")
        .fixtures(setup.fixtures())
        .scratch_root(setup.scratch())
        .toolset(setup.toolset())
}

#[test]
fn test_failing_fixture_fails_both_run_phases() {
    let setup = FakeSetup::new();
    setup.add_fixture(
        "broken.test.ts",
        "// MUST_FAIL: deliberately failing fixture\n",
    );

    let report = harness_for(&setup).run().unwrap();

    assert!(!report.passed());
    // Compilation itself succeeded; only the runs failed.
    assert_eq!(
        report.find(Phase::CompileTsc).unwrap().status,
        CheckStatus::Passed
    );
    assert_eq!(
        report.find(Phase::RunTscOutput).unwrap().status,
        CheckStatus::Failed
    );
    assert_eq!(
        report.find(Phase::CompileEsbuild).unwrap().status,
        CheckStatus::Passed
    );
    assert_eq!(
        report.find(Phase::RunEsbuildOutput).unwrap().status,
        CheckStatus::Failed
    );
}

#[test]
fn test_runner_failure_carries_captured_output() {
    let setup = FakeSetup::new();
    setup.add_fixture("broken.test.ts", "// MUST_FAIL\n");

    let report = harness_for(&setup).run().unwrap();

    let failed = report.find(Phase::RunTscOutput).unwrap();
    assert_eq!(failed.status, CheckStatus::Failed);
    assert!(failed.details[0].contains("assertion failed"));
    assert!(
        failed
            .output
            .as_ref()
            .unwrap()
            .stderr
            .contains("broken.test.js")
    );
}

#[test]
fn test_missing_declaration_is_a_per_artifact_verification_failure() {
    let setup = FakeSetup::new();
    // Compiler variant that never emits declaration files.
    setup.write_script(
        "tsc.sh",
        r#"mkdir -p dist
for f in src/*.ts; do
  stem=$(basename "$f" .ts)
  cp "$f" "dist/$stem.js"
done
"#,
    );

    let report = harness_for(&setup).run().unwrap();

    assert!(!report.passed());
    let compile = report.find(Phase::CompileTsc).unwrap();
    assert_eq!(compile.status, CheckStatus::Failed);
    assert_eq!(
        compile.details,
        vec!["missing expected artifact example.d.ts".to_string()]
    );
    // Later phases still ran; verification failures never abort the cycle.
    assert_eq!(
        report.find(Phase::RunEsbuildOutput).unwrap().status,
        CheckStatus::Passed
    );
}

#[test]
fn test_compiler_nonzero_exit_fails_only_its_phase() {
    let setup = FakeSetup::new();
    setup.write_script("esbuild.sh", "echo 'transform error' >&2\nexit 1\n");

    let report = harness_for(&setup).run().unwrap();

    assert_eq!(
        report.find(Phase::CompileTsc).unwrap().status,
        CheckStatus::Passed
    );
    let compile_b = report.find(Phase::CompileEsbuild).unwrap();
    assert_eq!(compile_b.status, CheckStatus::Failed);
    assert!(compile_b.details[0].contains("transform error"));
    // No toolchain B output means the run phase fails too, on its own check.
    let run_b = report.find(Phase::RunEsbuildOutput).unwrap();
    assert_eq!(run_b.status, CheckStatus::Failed);
    assert_eq!(setup.scratch_entry_count(), 0);
}

#[test]
fn test_install_failure_is_fatal_and_still_cleans_up() {
    let setup = FakeSetup::new();
    setup.write_script("install.sh", "echo 'E404 not found' >&2\nexit 1\n");

    let result = harness_for(&setup).run();

    match result {
        Err(HarnessError::Install { detail, .. }) => {
            assert!(detail.contains("E404"));
        }
        other => panic!("expected fatal install failure, got {other:?}"),
    }
    // The already-provisioned workspace and the archive are gone.
    assert_eq!(setup.scratch_entry_count(), 0);
}

#[test]
fn test_packager_producing_no_archive_is_fatal() {
    let setup = FakeSetup::new();
    setup.write_script("pack.sh", "exit 0\n");

    let result = harness_for(&setup).run();

    assert!(matches!(result, Err(HarnessError::Pack { .. })));
    assert_eq!(setup.scratch_entry_count(), 0);
}

#[test]
fn test_packager_nonzero_exit_is_fatal() {
    let setup = FakeSetup::new();
    setup.write_script("pack.sh", "echo 'pack blew up' >&2\nexit 2\n");

    let result = harness_for(&setup).run();

    match result {
        Err(HarnessError::Pack { detail, .. }) => {
            assert!(detail.contains("pack blew up"));
        }
        other => panic!("expected fatal pack failure, got {other:?}"),
    }
    assert_eq!(setup.scratch_entry_count(), 0);
}
