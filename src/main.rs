// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use hooktree::backends::PrefixWriter;
use hooktree::config::RuntimeBuilder;
use hooktree::engine::{MultiTreeRunner, StatusEvent, StatusReceiver};
use hooktree::errors::ExecutionError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: hooktree <project-file> <target> [--exclude NAME]... [--json]";

struct Args {
    project: PathBuf,
    target: String,
    excluded: Vec<String>,
    json: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut excluded = Vec::new();
        let mut json = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--json" => json = true,
                "--exclude" | "-x" => match args.next() {
                    Some(name) => excluded.push(name),
                    None => bail!("--exclude needs a name"),
                },
                "-h" | "--help" => bail!("{}", USAGE),
                flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
                _ => positional.push(arg),
            }
        }

        match <[String; 2]>::try_from(positional) {
            Ok([project, target]) => Ok(Self {
                project: PathBuf::from(project),
                target,
                excluded,
                json,
            }),
            Err(_) => bail!("{}", USAGE),
        }
    }
}

fn format_event(event: &StatusEvent) -> String {
    let mut line = format!("[{}] {} {}", event.tree, event.node.id, event.node.status);
    if let Some(root) = event.ancestors.last() {
        line.push_str(&format!(" ({} {})", root.id, root.aggregated_status));
    }
    if let Some(error) = &event.error {
        line.push_str(&format!(": {}", error));
    }
    line
}

/// Print status events until every sender is gone.
async fn print_events(mut rx: StatusReceiver, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "failed to encode status event"),
            }
        } else {
            println!("{}", format_event(&event));
        }
    }
}

/// Stream each task's output to stderr, one prefix per node.
fn attach_output(runner: &MultiTreeRunner) {
    for tree_runner in runner.runners() {
        let tree = tree_runner.tree();
        for idx in tree.indices() {
            if let Some(output) = tree.node(idx).main.output() {
                let prefix = format!("{} | ", tree.node_id(idx));
                output.add_sink(PrefixWriter::new(prefix, io::stderr()));
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let (runner, events) = RuntimeBuilder::from_file(&args.project, &args.target, &args.excluded)
        .with_context(|| format!("cannot run '{}' from {}", args.target, args.project.display()))?;
    let runner = Arc::new(runner);

    if !args.json {
        attach_output(&runner);
    }
    let printer = tokio::spawn(print_events(events, args.json));

    let on_interrupt = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, canceling");
                runner.cancel().await;
            }
        })
    };

    let outcome = runner.run().await;
    on_interrupt.abort();

    // the runner holds the last senders
    drop(runner);
    if let Err(e) = printer.await {
        warn!(error = %e, "status printer stopped early");
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(ExecutionError::Failed(errors)) => {
            for (node_id, error) in errors.iter() {
                eprintln!("{} failed: {}", node_id, error);
                if let Some(output) = error.output().filter(|o| !o.is_empty()) {
                    eprintln!("{}", output.trim_end());
                }
            }
            bail!("{} task(s) failed", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hooktree=warn")))
        .with_writer(io::stderr)
        .init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
