//! Backends command implementation.

use anyhow::Result;
use console::style;

use qbridge_adapter_ibm::BackendFilter;

use super::common::{connect, spinner};

/// Build the backend filter from command-line options.
pub fn build_filter(
    name: Option<String>,
    min_qubits: Option<u32>,
    simulator: Option<bool>,
    operational: bool,
) -> BackendFilter {
    let mut filter = BackendFilter {
        name,
        ..BackendFilter::default()
    };
    if let Some(n) = min_qubits {
        filter = filter.with_min_qubits(n);
    }
    if let Some(simulator) = simulator {
        filter = filter.with_simulator(simulator);
    }
    if operational {
        filter = filter.with_operational(true);
    }
    filter
}

/// Execute the backends command.
pub async fn execute(
    token: Option<&str>,
    instance: Option<&str>,
    name: Option<String>,
    min_qubits: Option<u32>,
    simulator: Option<bool>,
    operational: bool,
) -> Result<()> {
    let provider = connect(token, instance).await?;
    let filter = build_filter(name, min_qubits, simulator, operational);

    let spinner = spinner("Checking backends...")?;
    let backends = provider.service().backends(&filter).await;
    let mut availability = Vec::with_capacity(backends.len());
    for backend in &backends {
        availability.push(backend.availability().await?);
    }
    spinner.finish_and_clear();

    let instance = provider
        .instance()
        .map_or_else(|| "default instance".to_string(), ToString::to_string);
    println!(
        "{} Backends available to {}:\n",
        style("qbridge").cyan().bold(),
        style(instance).bold()
    );

    if backends.is_empty() {
        println!("  No backends match.");
        return Ok(());
    }

    for (backend, avail) in backends.iter().zip(&availability) {
        println!(
            "  {} {} {}",
            if avail.is_available {
                style("●").green()
            } else {
                style("○").yellow()
            },
            style(backend.name()).bold(),
            if backend.is_simulator() {
                "(simulator)"
            } else {
                ""
            }
        );
        println!("    Qubits: {}", backend.num_qubits());
        if let Some(depth) = avail.queue_depth {
            println!("    Pending jobs: {depth}");
        }
        if !avail.is_available {
            println!(
                "    Status: {}",
                avail
                    .status_message
                    .as_deref()
                    .unwrap_or("offline or maintenance")
            );
        }
        println!();
    }

    Ok(())
}
