//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - IBM Quantum jobs from Rust",
        style("qbridge").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qbridge-hal          Job status, backends and credentials");
    println!("  qbridge-adapter-ibm  IBM Quantum job listing and accounts");
    println!("  qbridge-cli          Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/qbridge-dev/qbridge").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
