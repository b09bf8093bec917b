//! Human-readable rendering of repository state.

use anyhow::Result;
use chrono::{DateTime, Utc};
use cvmfs_core::Repository;
use std::io::Write;

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// One-line summary of a repository.
pub fn format_summary(repo: &dyn Repository) -> String {
    let replicated = if repo.has_been_replicated() {
        format_time(repo.last_replication())
    } else {
        "never".to_string()
    };
    let replicating = if repo.replicating() { " (replicating)" } else { "" };

    format!(
        "{:<32} {:<9} {:<10} last replication: {}{}",
        repo.fqrn(),
        repo.repository_type(),
        repo.version(),
        replicated,
        replicating,
    )
}

/// Print the full state of a repository.
pub fn print_info(repo: &dyn Repository, writer: &mut dyn Write) -> Result<()> {
    let manifest = repo.manifest();

    writeln!(writer, "Repository:       {}", repo.fqrn())?;
    writeln!(writer, "Location:         {}", repo.storage_location())?;
    writeln!(writer, "Type:             {}", repo.repository_type())?;
    writeln!(writer, "Version:          {}", repo.version())?;
    if let Some(revision) = manifest.revision {
        writeln!(writer, "Revision:         {}", revision)?;
    }
    if let Some(root) = &manifest.root_catalog {
        writeln!(writer, "Root catalog:     {}", root)?;
    }
    if let Some(published) = manifest
        .last_modified
        .and_then(|t| DateTime::from_timestamp(t, 0))
    {
        writeln!(writer, "Published:        {}", format_time(published))?;
    }

    if repo.has_been_replicated() {
        writeln!(writer, "Last replication: {}", format_time(repo.last_replication()))?;
    } else {
        writeln!(writer, "Last replication: never")?;
    }
    match repo.replicating_since() {
        Some(since) => writeln!(writer, "Replicating:      since {}", format_time(since))?,
        None => writeln!(writer, "Replicating:      no")?,
    }

    Ok(())
}

/// Print a table of repositories.
pub fn print_list(repos: &[&dyn Repository], writer: &mut dyn Write) -> Result<()> {
    if repos.is_empty() {
        writeln!(writer, "No repositories found.")?;
        return Ok(());
    }
    for repo in repos {
        writeln!(writer, "{}", format_summary(*repo))?;
    }
    writeln!(writer, "{}", "-".repeat(80))?;
    writeln!(writer, "{} repositories", repos.len())?;
    Ok(())
}
