//! Plan-driven CSV cleaning with model-generated transformations.
//!
//! `scour run` profiles a dataset, obtains a numbered cleaning plan, and
//! executes each step as sandboxed transformation code, retrying until the
//! step's effect is acceptable. `profile`, `plan` and `steps` expose the
//! intermediate stages for inspection and scripting.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use scour::core::plan::{Plan, segment_plan};
use scour::core::profile::profile_frame;
use scour::engine::{EngineConfig, FatalStepFailure, run_plan};
use scour::io::collab::{CommandCodeGenerator, CommandPlanner, Planner};
use scour::io::config::{ScourConfig, load_config};
use scour::io::dataset::{read_csv, write_csv};
use scour::io::prompt::PromptEngine;
use scour::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "scour",
    version,
    about = "Plan-driven tabular data cleaning with sandboxed transformations"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "scour.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print dataset quality signals as JSON.
    Profile {
        /// CSV dataset to profile.
        dataset: PathBuf,
    },
    /// Ask the planner collaborator for a cleaning plan and print it.
    Plan {
        /// CSV dataset to plan for.
        dataset: PathBuf,
    },
    /// Segment a plan file and print one line per step.
    Steps {
        /// Plan text file.
        plan: PathBuf,
    },
    /// Execute a cleaning plan against a dataset.
    Run {
        /// CSV dataset to clean.
        dataset: PathBuf,
        /// Plan text file. When omitted, the planner collaborator is asked.
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Where to write the cleaned CSV. Defaults to `<dataset>.cleaned.csv`.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory for attempt artifacts and history.
        #[arg(long, default_value = ".scour")]
        run_dir: PathBuf,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        if let Some(fatal) = err.downcast_ref::<FatalStepFailure>() {
            eprintln!("{fatal}");
            std::process::exit(exit_codes::STEP_FAILED);
        }
        eprintln!("{err:#}");
        std::process::exit(exit_codes::INVALID);
    }
    std::process::exit(exit_codes::OK);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Profile { dataset } => cmd_profile(&dataset),
        Command::Plan { dataset } => cmd_plan(&dataset, &config),
        Command::Steps { plan } => cmd_steps(&plan),
        Command::Run {
            dataset,
            plan,
            output,
            run_dir,
        } => cmd_run(&dataset, plan.as_deref(), output.as_deref(), &run_dir, &config),
    }
}

fn cmd_profile(dataset: &Path) -> Result<()> {
    let frame = read_csv(dataset)?;
    let profile = profile_frame(&frame);
    let mut payload = serde_json::to_string_pretty(&profile).context("serialize profile")?;
    payload.push('\n');
    print!("{payload}");
    Ok(())
}

fn cmd_plan(dataset: &Path, config: &ScourConfig) -> Result<()> {
    let frame = read_csv(dataset)?;
    let plan_text = request_plan(&frame, config)?;
    println!("{}", plan_text.trim_end());
    Ok(())
}

fn cmd_steps(plan_path: &Path) -> Result<()> {
    let text = fs::read_to_string(plan_path)
        .with_context(|| format!("read {}", plan_path.display()))?;
    let plan = segment_plan(&text);
    for step in plan.steps() {
        let first_line = step.text.lines().next().unwrap_or("");
        println!("{}: {}", step.ordinal, first_line);
    }
    Ok(())
}

fn cmd_run(
    dataset_path: &Path,
    plan_path: Option<&Path>,
    output: Option<&Path>,
    run_dir: &Path,
    config: &ScourConfig,
) -> Result<()> {
    // Collaborator commands are a configuration problem; surface it before
    // touching the run directory or burning retry attempts on it.
    if !config.codegen.is_configured() {
        bail!("codegen.command is not configured; set [codegen] command in the config file");
    }
    if plan_path.is_none() && !config.planner.is_configured() {
        bail!("planner.command is not configured; set [planner] command or pass --plan");
    }

    let dataset = read_csv(dataset_path)?;
    let plan = load_plan(&dataset, plan_path, config)?;

    let generator = CommandCodeGenerator {
        command: config.codegen.clone(),
        timeout: Duration::from_secs(config.codegen_timeout_secs),
        output_limit_bytes: config.output_limit_bytes,
    };
    let outcome = run_plan(
        dataset,
        plan,
        &generator,
        &EngineConfig::from(config),
        run_dir,
    )?;

    let output = output.map_or_else(|| default_output(dataset_path), Path::to_path_buf);
    write_csv(&output, &outcome.dataset)?;
    println!(
        "completed {} step(s) in {} attempt(s); wrote {}",
        outcome.steps_completed,
        outcome.history.len(),
        output.display()
    );
    Ok(())
}

fn load_plan(
    dataset: &scour::core::frame::Frame,
    plan_path: Option<&Path>,
    config: &ScourConfig,
) -> Result<Plan> {
    let text = match plan_path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => request_plan(dataset, config)?,
    };
    Ok(segment_plan(&text))
}

fn request_plan(frame: &scour::core::frame::Frame, config: &ScourConfig) -> Result<String> {
    let profile = profile_frame(frame);
    let prompt = PromptEngine::new().render_planner(&profile)?;
    let planner = CommandPlanner {
        command: config.planner.clone(),
        timeout: Duration::from_secs(config.planner_timeout_secs),
        output_limit_bytes: config.output_limit_bytes,
    };
    planner.plan(&prompt)
}

fn default_output(dataset: &Path) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned());
    dataset.with_file_name(format!("{stem}.cleaned.csv"))
}
