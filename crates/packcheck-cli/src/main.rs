//! Packcheck CLI
//!
//! Drives one pack/install/compile/run cycle against a project and prints a
//! per-phase report.

use clap::{Arg, ArgAction, Command};
use packcheck_harness::{Harness, fixtures_from_dir};
use packcheck_report::{CheckStatus, Report};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let matches = Command::new("packcheck")
        .version("0.1.0")
        .about("Pack/install/compile/run integration check for distributable packages")
        .arg(
            Arg::new("project-root")
                .value_name("DIR")
                .help("Project to pack and verify")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("extends")
                .long("extends")
                .value_name("SPECIFIER")
                .help("Compiler-configuration preset the synthesized tsconfig extends")
                .required(true)
                .num_args(1),
        )
        .arg(
            Arg::new("src")
                .long("src")
                .value_name("DIR")
                .help("Fixture source directory (default: <project-root>/src)")
                .num_args(1),
        )
        .arg(
            Arg::new("scratch")
                .long("scratch")
                .value_name("DIR")
                .help("Directory for scratch state instead of the system temp dir")
                .num_args(1),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the report as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let project_root = PathBuf::from(
        matches
            .get_one::<String>("project-root")
            .map_or("", String::as_str),
    );
    let extends = matches
        .get_one::<String>("extends")
        .map_or("", String::as_str);
    let src_dir = matches
        .get_one::<String>("src")
        .map_or_else(|| project_root.join("src"), PathBuf::from);
    let scratch = matches.get_one::<String>("scratch").map(PathBuf::from);
    let json = matches.get_flag("json");

    match execute(&project_root, extends, &src_dir, scratch) {
        Ok(report) => {
            if json {
                println!("{}", report.to_json());
            } else {
                print!("{}", render_report(&report));
            }
            process::exit(i32::from(!report.passed()));
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn execute(
    project_root: &Path,
    extends: &str,
    src_dir: &Path,
    scratch: Option<PathBuf>,
) -> Result<Report, anyhow::Error> {
    let fixtures = fixtures_from_dir(src_dir)?;

    let mut harness = Harness::new(project_root, extends).fixtures(fixtures);
    if let Some(scratch) = scratch {
        harness = harness.scratch_root(scratch);
    }

    Ok(harness.run()?)
}

fn render_report(report: &Report) -> String {
    let mut out = String::new();
    for phase in &report.phases {
        match phase.status {
            CheckStatus::Passed => {
                out.push_str(&format!("ok   {}\n", phase.phase));
            }
            CheckStatus::Failed => {
                out.push_str(&format!("FAIL {}\n", phase.phase));
                for detail in &phase.details {
                    out.push_str(&format!("     {detail}\n"));
                }
                if let Some(output) = &phase.output {
                    for line in output.stderr.lines().chain(output.stdout.lines()) {
                        out.push_str(&format!("     | {line}\n"));
                    }
                }
            }
        }
    }
    out.push_str(if report.passed() {
        "packcheck: all checks passed\n"
    } else {
        "packcheck: checks failed\n"
    });
    out
}
