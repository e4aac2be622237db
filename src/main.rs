// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use actorflow::config::{load_and_validate_config, FlowBuilder};
use actorflow::engine::FlowReport;

/// Runs a flow definition.
#[derive(Debug, Parser)]
#[command(name = "actorflow", version, about)]
struct Cli {
    /// Flow definition (YAML)
    flow: PathBuf,

    /// Flow variable, overriding the definition. Repeatable.
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable)]
    vars: Vec<(String, String)>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Set up and clean up only, printing the actor tree
    #[arg(long)]
    dry_run: bool,
}

fn parse_variable(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = load_and_validate_config(&cli.flow)
        .with_context(|| format!("loading {}", cli.flow.display()))?;
    let builder = cli
        .vars
        .iter()
        .fold(FlowBuilder::new(), |builder, (name, value)| {
            builder.with_variable(name, value)
        });
    let mut flow = builder.build(&config)?;

    println!("📋 Flow: {} ({})", config.name, cli.flow.display());
    println!("🛡️  Failure Strategy: {:?}", config.failure_strategy);

    if cli.dry_run {
        let setup = flow.set_up().await;
        println!("\n🌳 Actors:\n{}", flow.describe().await);
        flow.tear_down().await;
        setup?;
        println!("✅ Set up and cleaned up without errors");
        return Ok(());
    }

    let handle = flow.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop("interrupted");
        }
    });

    let report = flow.run().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &FlowReport) {
    println!("\n📊 Result: {}", report.state);
    println!("⏱️  Duration: {:?}", report.duration);
    if let Some(reason) = &report.stop_reason {
        println!("🛑 Stop reason: {}", reason);
    }
    if !report.outputs.is_empty() {
        println!("\n📤 Output tokens:");
        for token in &report.outputs {
            println!("   {}", token.summary());
        }
    }
    if !report.errors.is_empty() {
        println!("\n⚠️  Non-fatal errors:");
        for entry in &report.errors {
            match &entry.token {
                Some(token) => println!("   {}: {} [{}]", entry.actor, entry.message, token),
                None => println!("   {}: {}", entry.actor, entry.message),
            }
        }
    }
}
