//! Job command implementation.

use anyhow::Result;
use console::style;

use qbridge_adapter_ibm::IbmJob;

use super::common::{OutputFormat, connect, load_preferences, spinner, styled_status};

/// Execute the job command.
pub async fn execute(
    token: Option<&str>,
    instance: Option<&str>,
    job_id: &str,
    refresh: bool,
    format: Option<OutputFormat>,
) -> Result<()> {
    let format = format
        .or(load_preferences()?.format)
        .unwrap_or_default();
    let provider = connect(token, instance).await?;

    let spinner = spinner(&format!("Fetching job {job_id}..."))?;
    let job = provider.service().job(job_id).await;
    spinner.finish_and_clear();
    let mut job = job.map_err(|e| anyhow::anyhow!("Failed to get job '{job_id}': {e}"))?;

    if refresh {
        job.refresh()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to refresh job '{job_id}': {e}"))?;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&job.summary())?);
        }
        OutputFormat::Table => print_job(&job),
    }

    Ok(())
}

fn print_job(job: &IbmJob) {
    let summary = job.summary();

    println!("{} Job {}\n", style("→").cyan().bold(), style(&summary.job_id).bold());
    println!("  Status:   {}", styled_status(summary.status).bold());
    if summary.retired_backend {
        println!("  Backend:  {} {}", summary.backend, style("(retired)").dim());
    } else {
        println!("  Backend:  {}", summary.backend);
    }
    println!(
        "  Created:  {}",
        summary.creation_date.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(name) = &summary.name {
        println!("  Name:     {name}");
    }
    if !summary.tags.is_empty() {
        println!("  Tags:     {}", summary.tags.join(", "));
    }

    if let IbmJob::Composite(composite) = job {
        println!("\n  Sub-jobs ({}):", composite.sub_jobs().len());
        for (position, sub_job) in composite.sub_jobs().iter().enumerate() {
            let index = sub_job.composite_index().unwrap_or(position);
            println!(
                "    {:>3}  {:<28}  {}",
                index,
                style(sub_job.job_id().as_str()).dim(),
                styled_status(sub_job.status())
            );
        }
    }
}
