// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Thin CLI shell over the `luxera` core: load a project file, dispatch
//! one or every job it names, and report the resulting cache hits and
//! result directories. All of the actual work lives in the library; this
//! binary only parses arguments and prints.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use luxera::{
    compute_job_hash, dispatch_job, load_project, CancellationToken, DispatchOutcome, JobSpec, OcclusionCache,
    Project,
};

#[derive(Parser)]
#[clap(name = "luxera-cli", version, about = "Drive luxera project files from the command line")]
struct Cli {
    /// Logging verbosity: repeat for more detail (-v, -vv, -vvv).
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a project file, run its schema migrations, and print the
    /// resulting schema version and job count. Does not dispatch anything.
    Validate {
        /// Path to the project JSON file.
        project: PathBuf,
    },
    /// Dispatch a single job by id.
    Run {
        /// Path to the project JSON file.
        project: PathBuf,
        /// The `id` of the job in `project.jobs` to dispatch.
        job_id: String,
    },
    /// Dispatch every job listed in the project, in file order.
    RunAll {
        /// Path to the project JSON file.
        project: PathBuf,
    },
}

fn load_project_file(path: &Path) -> Result<(Project, PathBuf), String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let raw: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| format!("failed to parse {} as JSON: {e}", path.display()))?;
    let mut project = load_project(raw).map_err(|e| format!("invalid project file: {e}"))?;
    let root_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    if project.root_dir.is_none() {
        project.root_dir = Some(root_dir.to_string_lossy().to_string());
    }
    Ok((project, root_dir))
}

fn run_one(project: &Project, job: &JobSpec, project_root: &Path, occlusion: &OcclusionCache) -> Result<(), String> {
    let token = CancellationToken::new();
    match dispatch_job(project, job, project_root, occlusion, &token) {
        Ok(DispatchOutcome::Cached { result_dir }) => {
            log::info!("job {} already complete at {}", job.id, result_dir.display());
            Ok(())
        }
        Ok(DispatchOutcome::Computed { result_dir, job_hash }) => {
            log::info!("job {} computed -> {} (hash {})", job.id, result_dir.display(), job_hash);
            Ok(())
        }
        Err(e) => Err(format!("job {} failed: {e}", job.id)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = luxera::logging::setup_logging(cli.verbose) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Command::Validate { project } => load_project_file(project).map(|(p, _)| {
            println!("schema_version: {}", p.schema_version);
            println!("jobs: {}", p.jobs.len());
            println!("luminaires: {}", p.luminaires.len());
        }),
        Command::Run { project, job_id } => load_project_file(project).and_then(|(p, root)| {
            let job = p
                .jobs
                .iter()
                .find(|j| &j.id == job_id)
                .ok_or_else(|| format!("no job with id {job_id} in {}", project.display()))?;
            let hash = compute_job_hash(&p, job).map_err(|e| e.to_string())?;
            log::debug!("job {job_id} hashes to {hash}");
            let occlusion = OcclusionCache::new();
            run_one(&p, job, &root, &occlusion)
        }),
        Command::RunAll { project } => load_project_file(project).and_then(|(p, root)| {
            let occlusion = OcclusionCache::new();
            for job in &p.jobs {
                run_one(&p, job, &root, &occlusion)?;
            }
            Ok(())
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
