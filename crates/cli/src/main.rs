//! UWS Engine CLI - operator command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tabled::Tabled;
use uws_sdk::{CreateJobRequest, JobPhase, UwsClient, WaitOptions};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "uws")]
#[command(about = "UWS Engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the UWS engine's HTTP surface
    #[arg(long, env = "UWS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Identity sent as X-Auth-Request-User
    #[arg(long, env = "UWS_USER")]
    user: String,

    /// Bearer token forwarded to the Policy hook on start (optional)
    #[arg(long, env = "UWS_ACCESS_TOKEN")]
    access_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a job, one PARAM=VALUE per repeated --param
    Submit {
        /// Parameter in `id=value` form; may be repeated
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Client-opaque correlation tag
        #[arg(long)]
        run_id: Option<String>,

        /// Start the job immediately (phase=RUN) instead of leaving it PENDING
        #[arg(long)]
        start: bool,
    },

    /// Start a PENDING/HELD job
    Start {
        job_id: i64,
    },

    /// Fetch a job, optionally long-polling for a phase change
    Get {
        job_id: i64,

        /// Seconds to long-poll for (spec §4.4); -1 means the server's max
        #[arg(long)]
        wait: Option<i64>,
    },

    /// List the caller's own jobs
    List {
        /// Repeatable phase filter, e.g. --phase EXECUTING --phase QUEUED
        #[arg(long = "phase")]
        phases: Vec<String>,

        /// Only jobs created strictly after this ISO-8601 timestamp
        #[arg(long)]
        after: Option<String>,

        /// Max rows returned
        #[arg(long)]
        count: Option<usize>,
    },

    /// Delete a job
    Delete {
        job_id: i64,
    },

    /// Read or modify destruction time
    Destruction {
        job_id: i64,

        /// New ISO-8601 UTC destruction time; omit to just read the current value
        #[arg(long)]
        set: Option<String>,
    },

    /// Read or modify execution duration in seconds
    ExecutionDuration {
        job_id: i64,

        /// New value in seconds; omit to just read the current value
        #[arg(long)]
        set: Option<i64>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected id=value, got '{s}'"))
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "job_id")]
    job_id: i64,
    phase: String,
    href: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut client = UwsClient::connect(&cli.base_url, &cli.user).context("building client")?;
    if let Some(token) = &cli.access_token {
        client = client.with_access_token(token.clone());
    }

    match cli.command {
        Commands::Submit { params, run_id, start } => {
            let job_id = client
                .create_job(CreateJobRequest { run_id, parameters: params, start })
                .await
                .context("creating job")?;
            println!("{}", "✓ Job created".green().bold());
            println!("  {} {}", "job_id:".bold(), job_id);
        }

        Commands::Start { job_id } => {
            client.start_job(job_id).await.context("starting job")?;
            println!("{}", format!("✓ Job {job_id} started").green().bold());
        }

        Commands::Get { job_id, wait } => {
            let job = client
                .get_job(job_id, WaitOptions { wait_secs: wait, wait_phase: None })
                .await
                .context("fetching job")?;

            println!("{} {}", "Job".cyan().bold(), job.job_id);
            println!("  {} {}", "owner:".bold(), job.owner);
            println!("  {} {}", "phase:".bold(), phase_colored(job.phase));
            if let Some(run_id) = &job.run_id {
                println!("  {} {}", "run_id:".bold(), run_id);
            }
            println!("  {} {}", "creation_time:".bold(), job.creation_time);
            println!("  {} {}", "destruction_time:".bold(), job.destruction_time);
            println!("  {} {}", "execution_duration:".bold(), job.execution_duration);
            if !job.parameters.is_empty() {
                println!("  {}", "parameters:".bold());
                for p in &job.parameters {
                    println!("    - {} = {}", p.id, p.value);
                }
            }
            if !job.results.is_empty() {
                println!("  {}", "results:".bold());
                for r in &job.results {
                    println!("    - {} -> {}", r.result_id, r.url);
                }
            }
            if let Some(error) = &job.error {
                println!("  {} {} {}", "error:".bold().red(), error.error_type, error.message);
                if let Some(detail) = &error.detail {
                    println!("    {detail}");
                }
            }
        }

        Commands::List { phases, after, count } => {
            let phases: Vec<JobPhase> = phases
                .iter()
                .map(|p| p.to_uppercase().parse())
                .collect::<Result<_, _>>()
                .map_err(|e: uws_sdk::SdkError| anyhow::anyhow!("{e}"))?;
            let summaries = client
                .list_jobs(&phases, after.as_deref(), count)
                .await
                .context("listing jobs")?;

            if summaries.is_empty() {
                println!("{}", "No jobs found".yellow());
            } else {
                let rows: Vec<JobRow> = summaries
                    .into_iter()
                    .map(|s| JobRow { job_id: s.job_id, phase: s.phase.to_string(), href: s.href })
                    .collect();
                println!("{}", tabled::Table::new(rows));
            }
        }

        Commands::Delete { job_id } => {
            client.delete_job(job_id).await.context("deleting job")?;
            println!("{}", format!("✓ Job {job_id} deleted").green().bold());
        }

        Commands::Destruction { job_id, set } => match set {
            Some(value) => {
                client.update_destruction(job_id, &value).await.context("updating destruction")?;
                println!("{}", format!("✓ destruction set to {value}").green().bold());
            }
            None => {
                let job = client
                    .get_job(job_id, WaitOptions::default())
                    .await
                    .context("fetching job")?;
                println!("{}", job.destruction_time);
            }
        },

        Commands::ExecutionDuration { job_id, set } => match set {
            Some(value) => {
                client
                    .update_execution_duration(job_id, value)
                    .await
                    .context("updating execution duration")?;
                println!("{}", format!("✓ executionduration set to {value}").green().bold());
            }
            None => {
                let job = client
                    .get_job(job_id, WaitOptions::default())
                    .await
                    .context("fetching job")?;
                println!("{}", job.execution_duration);
            }
        },
    }

    Ok(())
}

fn phase_colored(phase: JobPhase) -> colored::ColoredString {
    match phase {
        JobPhase::Completed => phase.to_string().green(),
        JobPhase::Error | JobPhase::Aborted => phase.to_string().red(),
        JobPhase::Executing | JobPhase::Queued => phase.to_string().cyan(),
        _ => phase.to_string().normal(),
    }
}
