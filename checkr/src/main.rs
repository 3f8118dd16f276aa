/*
checkr - main.rs
Fetches one Reddit comment, asks the LLM for an archive query and a claim abstract,
then scores the archive articles against that abstract.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use checkr::pipeline::{CheckReport, Checkr};

#[derive(Parser, Debug)]
#[command(name = "checkr", about = "Check a Reddit comment against the news archive")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Comment permalink (overrides `target.permalink`)
    #[arg(long, value_name = "URL")]
    permalink: Option<String>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // API credentials usually live in .env
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = load_config(args.config).await?;

    let permalink = match args.permalink.as_deref().or(config.permalink()) {
        Some(p) => p.to_string(),
        None => {
            error!("no comment permalink given (use --permalink or [target] permalink)");
            anyhow::bail!("no comment permalink configured");
        }
    };

    let checkr = Checkr::from_config(&config)?;
    info!(%permalink, "checking comment");

    let report = checkr.run(&permalink).await?;
    print_report(&report);

    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default_path = ?default_path, override_path = ?override_path, "configuration loaded");
    Ok(config)
}

fn print_report(report: &CheckReport) {
    if let Some(created) = report.comment.created_utc {
        println!("\nComment created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    match &report.parsed.comment_abstract {
        Some(abstract_text) => println!("\nComment Abstract: {}\n", abstract_text),
        None => println!("No comment abstract found in the model response."),
    }

    match &report.parsed.search_url {
        Some(url) => println!("Archive search URL: {}\n", url),
        None => println!("No valid archive search URL found in the model response."),
    }

    if !report.searched {
        return;
    }

    if report.scores.is_empty() {
        println!("No scored articles.");
        return;
    }

    for score in &report.scores {
        println!(
            "Article URL: {}, Similarity Score: {:.4}",
            score.web_url.as_deref().unwrap_or("-"),
            score.score
        );
    }

    if let Some(best) = report.best_match() {
        println!(
            "\nBest match ({:.4}): {}",
            best.score,
            best.headline
                .as_deref()
                .or(best.web_url.as_deref())
                .unwrap_or("-")
        );
    }
}
