//! Account command implementation.
//!
//! Save, show or delete the account stored on disk.

use anyhow::Result;
use console::style;

use qbridge_adapter_ibm::{delete_account, save_account, saved_account};
use qbridge_hal::AccountStore;

/// Show only the last four characters of a token.
pub fn redact_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

/// Execute `account save`.
pub fn execute_save(
    api_token: &str,
    url: Option<&str>,
    hub: Option<&str>,
    group: Option<&str>,
    project: Option<&str>,
    overwrite: bool,
) -> Result<()> {
    let store = AccountStore::default_location()?;
    let account = save_account(&store, api_token, url, hub, group, project, overwrite)?;

    println!(
        "{} Account saved to {}",
        style("✓").green().bold(),
        style(store.path().display()).cyan()
    );
    if let Some(instance) = &account.instance {
        println!("  Instance: {instance}");
    }
    Ok(())
}

/// Execute `account show`.
pub fn execute_show() -> Result<()> {
    let store = AccountStore::default_location()?;
    let Some(account) = saved_account(&store)? else {
        println!("No account saved.");
        println!(
            "  Run {} to save one",
            style("qbridge account save --api-token <TOKEN>").cyan()
        );
        return Ok(());
    };

    println!("{} Saved account\n", style("→").cyan().bold());
    println!("  Token:    {}", redact_token(&account.token));
    println!("  URL:      {}", account.url);
    match &account.instance {
        Some(instance) => println!("  Instance: {instance}"),
        None => println!("  Instance: {}", style("first available").dim()),
    }
    println!("  File:     {}", store.path().display());
    Ok(())
}

/// Execute `account delete`.
pub fn execute_delete() -> Result<()> {
    let store = AccountStore::default_location()?;
    delete_account(&store)?;
    println!("{} Saved account deleted", style("✓").green().bold());
    Ok(())
}
