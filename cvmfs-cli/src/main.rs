//! cvmfs-repo: inspect CVMFS repositories and trigger replication.
//!
//! Supports:
//! - Listing repositories installed on this machine
//! - Showing the state of a local or remote repository
//! - Starting replication on a stratum1
//! - Checking that a remote replica belongs to a local stratum0
//!
//! # Usage
//!
//! ```bash
//! # List local repositories (only stratum0s)
//! cvmfs-repo list --stratum0
//!
//! # Show a local repository by name, or a remote one by URL
//! cvmfs-repo info example.org
//! cvmfs-repo info http://stratum1.example.org/cvmfs/example.org
//!
//! # Ask a stratum1 to replicate
//! cvmfs-repo replicate http://stratum1.example.org/cvmfs/example.org
//!
//! # Verify a replica before registering it
//! cvmfs-repo check-replica http://stratum1.example.org/cvmfs/example.org
//! ```

mod report;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use cvmfs_core::{
    CvmfsConfig, LocalRepository, RemoteRepository, Repository, all_local, all_local_stratum0,
};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "cvmfs-repo")]
#[command(author = "CVMFS Tools Contributors")]
#[command(version = "0.1.0")]
#[command(about = "CVMFS repository inspection and replication tool")]
struct Cli {
    /// TOML file overriding the CVMFS installation layout
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List repositories configured on this machine
    List {
        /// Only show stratum0 repositories
        #[arg(long)]
        stratum0: bool,
    },

    /// Display the state of a repository
    Info {
        /// Local repository name or remote repository URL
        repo: String,
    },

    /// Start replication on a remote stratum1
    Replicate {
        /// Repository URL
        url: String,
    },

    /// Check that a URL serves a replica of a local stratum0
    #[command(name = "check-replica")]
    CheckReplica {
        /// Repository URL
        url: String,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cvmfs_repo=info".parse()?)
                .add_directive("cvmfs_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CvmfsConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    debug!("Using configuration root {:?}", config.config_root);

    match cli.command {
        Commands::List { stratum0 } => cmd_list(&config, stratum0),
        Commands::Info { repo } => cmd_info(&config, &repo),
        Commands::Replicate { url } => cmd_replicate(&config, &url),
        Commands::CheckReplica { url } => cmd_check_replica(&config, &url),
    }
}

/// Whether `repo` names a remote repository rather than a local one.
fn is_url(repo: &str) -> bool {
    repo.contains("://")
}

fn cmd_list(config: &CvmfsConfig, stratum0: bool) -> Result<()> {
    let repos = if stratum0 {
        all_local_stratum0(config)?
    } else {
        all_local(config)?
    };
    let mut repos: Vec<&dyn Repository> = repos.iter().map(|r| r as &dyn Repository).collect();
    repos.sort_by(|a, b| a.fqrn().cmp(b.fqrn()));
    report::print_list(&repos, &mut std::io::stdout())
}

fn cmd_info(config: &CvmfsConfig, repo: &str) -> Result<()> {
    if is_url(repo) {
        let remote = RemoteRepository::open(repo, config)
            .with_context(|| format!("Failed to open {}", repo))?;
        report::print_info(&remote, &mut std::io::stdout())?;
        println!("REST API:         {}", if remote.has_rest_api()? { "yes" } else { "no" });
    } else {
        let local = LocalRepository::open(repo, config)
            .with_context(|| format!("Failed to open {}", repo))?;
        report::print_info(&local, &mut std::io::stdout())?;
        println!("Server config:    {}", local.server_config_path().display());
    }
    Ok(())
}

fn cmd_replicate(config: &CvmfsConfig, url: &str) -> Result<()> {
    let remote =
        RemoteRepository::open(url, config).with_context(|| format!("Failed to open {}", url))?;
    if !remote.has_rest_api()? {
        bail!("{} does not offer a control API", remote);
    }
    remote.start_replication()?;
    println!("Replication of {} started at {}", remote.fqrn(), remote);
    Ok(())
}

fn cmd_check_replica(config: &CvmfsConfig, url: &str) -> Result<()> {
    let remote = match RemoteRepository::open(url, config) {
        Ok(remote) => remote,
        Err(e) if e.is_not_found() => bail!("{} does not point to a CVMFS replica", url),
        Err(e) => return Err(e).with_context(|| format!("Failed to open {}", url)),
    };

    let fqrn = remote.fqrn();
    let local = match LocalRepository::open(fqrn, config) {
        Ok(local) => local,
        Err(e) if e.is_not_found() => bail!("the stratum 0 of {} was not found", fqrn),
        Err(e) => return Err(e).with_context(|| format!("Failed to open local {}", fqrn)),
    };

    println!(
        "{} is a replica of local {} repository {}",
        remote,
        local.repository_type(),
        local.fqrn()
    );
    Ok(())
}
