//! Simple SDK Example
//!
//! Demonstrates basic usage of the UWS engine SDK against a running daemon.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package uws-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --example simple
//!    ```

use uws_sdk::{CreateJobRequest, JobPhase, UwsClient, WaitOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("UWS Engine SDK - Simple Example");
    println!("================================\n");

    println!("1. Connecting as 'alice'...");
    let client = UwsClient::connect("http://127.0.0.1:8080", "alice")?;
    println!("   ✓ Client ready\n");

    println!("2. Creating and starting a job...");
    let job_id = client
        .create_job(CreateJobRequest {
            run_id: Some("example-run".to_string()),
            parameters: vec![("pos".to_string(), "RANGE 0 360 -2 2".to_string())],
            start: true,
        })
        .await?;
    println!("   ✓ Job created: {job_id}\n");

    println!("3. Waiting for completion...");
    let job = client
        .get_job(
            job_id,
            WaitOptions {
                wait_secs: Some(30),
                wait_phase: None,
            },
        )
        .await?;
    println!("   ✓ Phase: {}\n", job.phase);

    match job.phase {
        JobPhase::Completed => {
            println!("4. Results:");
            for result in &job.results {
                println!("   - {} -> {}", result.result_id, result.url);
            }
        }
        JobPhase::Error => {
            let detail = client.get_error(job_id).await?;
            println!("4. Job failed:\n{detail}");
        }
        other => println!("4. Job still {other} after the wait budget"),
    }

    println!("\n5. Listing jobs...");
    let jobs = client.list_jobs(&[], None, Some(10)).await?;
    for summary in &jobs {
        println!("   - #{} [{}] {}", summary.job_id, summary.phase, summary.href);
    }

    Ok(())
}
