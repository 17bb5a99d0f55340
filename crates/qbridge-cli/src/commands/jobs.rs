//! Jobs command implementation.
//!
//! Lists jobs of the selected instance, newest first by default.

use anyhow::Result;
use console::style;

use qbridge_adapter_ibm::query::DEFAULT_JOB_LIMIT;
use qbridge_adapter_ibm::{IbmJob, JobQuery};

use super::common::{
    OutputFormat, connect, load_preferences, parse_datetime, spinner, styled_status,
};

/// Command-line options of `qbridge jobs`.
#[derive(Debug, Clone, Default)]
pub struct JobsOptions {
    pub limit: Option<usize>,
    pub all: bool,
    pub skip: usize,
    pub backend: Option<String>,
    pub status: Vec<String>,
    pub name: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub tags: Vec<String>,
    pub tags_operator: String,
    pub ascending: bool,
    pub ignore_composite_jobs: bool,
    pub format: Option<OutputFormat>,
}

/// Translate command-line options into a listing query.
///
/// `default_limit` applies when neither `--limit` nor `--all` is given.
pub fn build_query(options: &JobsOptions, default_limit: Option<usize>) -> Result<JobQuery> {
    let limit = if options.all {
        None
    } else {
        Some(
            options
                .limit
                .or(default_limit)
                .unwrap_or(DEFAULT_JOB_LIMIT),
        )
    };

    let mut query = JobQuery::new().with_limit(limit).with_skip(options.skip);

    if let Some(backend) = &options.backend {
        query = query.with_backend(backend.as_str());
    }
    match options.status.as_slice() {
        [] => {}
        [one] => query = query.with_status(one.as_str()),
        many => query = query.with_status(many.to_vec()),
    }
    if let Some(pattern) = &options.name {
        query = query.with_name(pattern.as_str());
    }
    if let Some(since) = &options.since {
        query = query.with_start(parse_datetime(since)?);
    }
    if let Some(until) = &options.until {
        query = query.with_end(parse_datetime(until)?);
    }
    if !options.tags.is_empty() {
        query = query.with_tags(options.tags.iter().cloned(), options.tags_operator.as_str());
    }
    if options.ascending {
        query = query.ascending();
    }
    if options.ignore_composite_jobs {
        query = query.ignoring_composite_jobs();
    }

    // Reject bad status names and tag operators before connecting
    query.to_filter()?;
    Ok(query)
}

/// Execute the jobs command.
pub async fn execute(
    token: Option<&str>,
    instance: Option<&str>,
    options: JobsOptions,
) -> Result<()> {
    let preferences = load_preferences()?;
    let query = build_query(&options, preferences.default_limit)?;
    let format = options.format.or(preferences.format).unwrap_or_default();

    let provider = connect(token, instance).await?;

    let spinner = spinner("Fetching jobs...")?;
    let jobs = provider.service().jobs(&query).await;
    spinner.finish_and_clear();
    let jobs = jobs?;

    match format {
        OutputFormat::Json => {
            let summaries: Vec<_> = jobs.iter().map(IbmJob::summary).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Table => print_table(&jobs),
    }

    Ok(())
}

fn print_table(jobs: &[IbmJob]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }

    println!("{} {} job(s):\n", style("→").cyan().bold(), jobs.len());

    println!(
        "  {:<40}  {:<12}  {:<24}  {:<16}  {}",
        style("JOB ID").bold(),
        style("STATUS").bold(),
        style("BACKEND").bold(),
        style("CREATED").bold(),
        style("NAME").bold()
    );
    println!("  {}", "-".repeat(110));

    for job in jobs {
        let summary = job.summary();
        let backend = if summary.retired_backend {
            format!("{} (retired)", summary.backend)
        } else {
            summary.backend.clone()
        };
        let mut name = summary.name.unwrap_or_default();
        if summary.sub_jobs > 0 {
            name = format!("{name} [{} sub-jobs]", summary.sub_jobs);
        }

        println!(
            "  {:<40}  {:<12}  {:<24}  {:<16}  {}",
            style(&summary.job_id).dim(),
            styled_status(summary.status),
            backend,
            summary.creation_date.format("%Y-%m-%d %H:%M"),
            name.trim(),
        );
    }
}
