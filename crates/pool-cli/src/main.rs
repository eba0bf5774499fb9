//! Command-line front end for pool job construction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pool_core::{
    hash_to_display_hex, BlockTemplate, JobBuilder, JobSettings, MiningJob, PoolConfig,
    ShareSubmission,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Build Stratum jobs and candidate blocks from a block template
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short = 'd', long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the mining.notify message for a template
    Notify {
        #[command(flatten)]
        job: JobArgs,

        /// Tell miners to drop older work
        #[arg(long)]
        clean_jobs: bool,
    },

    /// Rebuild the block for a submitted share
    Candidate {
        #[command(flatten)]
        job: JobArgs,

        /// Share JSON: nonce, extranonce1, extranonce2, optional version_mask and ntime
        #[arg(short, long)]
        share: PathBuf,
    },
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Pool configuration JSON
    #[arg(short, long)]
    config: PathBuf,

    /// getblocktemplate result JSON
    #[arg(short, long)]
    template: PathBuf,

    /// Job id to use
    #[arg(long, default_value = "0")]
    job_id: String,

    /// Header timestamp (default: now)
    #[arg(long)]
    timestamp: Option<u32>,
}

impl JobArgs {
    fn build(&self, clean_jobs: bool) -> Result<MiningJob> {
        let settings = load_settings(&self.config)?;
        let json = read(&self.template)?;
        let template = BlockTemplate::from_json(&json)
            .with_context(|| format!("Failed to parse block template: {:?}", self.template))?;

        let mut builder = JobBuilder::new(&settings, &template)
            .job_id(self.job_id.clone())
            .clean_jobs(clean_jobs);
        if let Some(timestamp) = self.timestamp {
            builder = builder.timestamp(timestamp);
        }
        let job = builder.build().context("Failed to build mining job")?;

        info!(
            job_id = job.job_id(),
            height = job.height(),
            difficulty = job.difficulty(),
            "Job ready"
        );
        Ok(job)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn load_settings(path: &Path) -> Result<JobSettings> {
    let config = PoolConfig::from_file(path)
        .with_context(|| format!("Failed to load pool config: {:?}", path))?;
    config
        .validate()
        .with_context(|| format!("Invalid pool config: {:?}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Warnings always; -d adds debug output from both crates.
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.debug {
        filter = filter
            .add_directive("pool_core=debug".parse()?)
            .add_directive("pool_cli=debug".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Notify { job, clean_jobs } => {
            let job = job.build(clean_jobs)?;
            println!("{}", serde_json::to_string_pretty(&job.notify())?);
        }
        Command::Candidate { job, share } => {
            let job = job.build(true)?;
            let submission: ShareSubmission = serde_json::from_str(&read(&share)?)
                .with_context(|| format!("Failed to parse share: {:?}", share))?;
            let candidate = job
                .candidate(&submission)
                .context("Failed to reconstruct candidate block")?;

            println!("hash:         {}", hash_to_display_hex(&candidate.hash()));
            println!("merkle_root:  {}", hash_to_display_hex(&candidate.merkle_root()));
            println!("header:       {}", hex::encode(candidate.header_bytes()));
            println!("meets_target: {}", candidate.meets_target());
            println!("block:        {}", candidate.serialize_hex());
        }
    }

    Ok(())
}
