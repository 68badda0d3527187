use std::sync::Arc;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::engine::{split_filter_csv, SinkRef};
use crate::generator::TargetOs;
use crate::output::console::{self, ConsoleSink};
use crate::output::{CollectingSink, HitCounter, OutputFormat};
use crate::runner::{self, Runner};

fn print_banner() {
    const BANNER: &str = r#"
  _                                      _                       _
 | |_ _ __ __ ___   _____ _ __ ___  __ _| |      _ __  _ __ ___ | |__   ___
 | __| '__/ _` \ \ / / _ \ '__/ __|/ _` | |_____| '_ \| '__/ _ \| '_ \ / _ \
 | |_| | | (_| |\ V /  __/ |  \__ \ (_| | |_____| |_) | | | (_) | |_) |  __/
  \__|_|  \__,_| \_/ \___|_|  |___/\__,_|_|     | .__/|_|  \___/|_.__/ \___|
                                                |_|
       path-traversal probing tool
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<12}: {}", label, value);
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn init_tracing(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("traversal_probe={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: runner::Options,
    workers: usize,
    output: Option<String>,
    output_format: OutputFormat,
    hide_content: bool,
    no_color: bool,
    verbose: u8,
    list_payloads: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let template = args
        .url
        .or(cfg.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "a URL template is required (--url)".to_string())?;
    let placeholder = args
        .placeholder
        .or(cfg.placeholder)
        .unwrap_or_else(|| crate::engine::DEFAULT_PLACEHOLDER.to_string());

    let os = TargetOs::parse(&args.os.or(cfg.os).unwrap_or_else(|| "linux".to_string()));
    let max_depth = args.max_depth.or(cfg.max_depth).unwrap_or(5);
    let custom_file = args
        .file
        .or(cfg.file)
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    let filter_status = args
        .filter_status
        .or(cfg.filter_status)
        .unwrap_or_else(|| "200".to_string());
    let filter_size = args.filter_size.or(cfg.filter_size).unwrap_or_default();

    let concurrency = args
        .concurrency
        .or(cfg.concurrency)
        .filter(|c| *c > 0);
    let workers = args.workers.or(cfg.workers).unwrap_or(4).max(1);
    let timeout_seconds = args.timeout.or(cfg.timeout).filter(|t| *t > 0);
    let follow_redirects = if args.no_follow_redirects {
        false
    } else {
        cfg.follow_redirects.unwrap_or(true)
    };

    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text or json"))?,
        None => output
            .as_deref()
            .and_then(crate::output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };
    let hide_content = args.hide_content || cfg.hide_content.unwrap_or(false);

    Ok(RunConfig {
        options: runner::Options {
            template,
            placeholder,
            os,
            max_depth,
            custom_file,
            status_filters: split_filter_csv(&filter_status),
            size_filters: split_filter_csv(&filter_size),
            concurrency,
            timeout_seconds,
            follow_redirects,
        },
        workers,
        output,
        output_format,
        hide_content,
        no_color,
        verbose: args.verbose,
        list_payloads: args.list_payloads,
    })
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;
    let payloads = runner.payloads();

    if run.list_payloads {
        for payload in payloads.iter() {
            println!("{}", payload);
        }
        return Ok(());
    }

    let options = runner.options();
    format_kv_line("Target", &options.template);
    format_kv_line("Placeholder", &options.placeholder);
    match options.custom_file.as_deref() {
        Some(file) => format_kv_line("File", file),
        None => format_kv_line(
            "Files",
            &format!(
                "{} ({})",
                runner.generator().target_files().join(","),
                options.os.label()
            ),
        ),
    }
    format_kv_line("Max depth", &options.max_depth.to_string());
    format_kv_line("Payloads", &payloads.len().to_string());
    format_kv_line(
        "Filters",
        &runner.filters().summary().unwrap_or_else(|| "none".to_string()),
    );
    if !runner.filters().ignored_sizes().is_empty() {
        format_kv_line(
            "Ignored",
            &format!(
                "size filters {} (only the first entry is used)",
                runner.filters().ignored_sizes().join(",")
            ),
        );
    }
    format_kv_line(
        "Concurrency",
        &options
            .concurrency
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unbounded".to_string()),
    );
    format_kv_line("Redirects", format_bool(options.follow_redirects));
    println!();

    let pb = console::progress_bar(payloads.len() as u64)?;
    let hits = HitCounter::new_ref();
    let collector = CollectingSink::new_ref();
    let mut sinks: Vec<SinkRef> = Vec::new();
    sinks.push(Arc::new(ConsoleSink::new(Some(pb.clone()), !run.hide_content)));
    sinks.push(hits.clone());
    if run.output.is_some() {
        sinks.push(collector.clone());
    }

    let summary = runner.run(sinks).await.map_err(|e| e.to_string())?;
    pb.finish_and_clear();

    if !hits.any() {
        println!(
            "{}{}{} {}",
            "[".bold().white(),
            "INF".bold().blue(),
            "]".bold().white(),
            "No path traversal vulnerability found in this endpoint"
        );
    }

    if run.verbose > 0 {
        let c = summary.counters;
        format_kv_line(
            "Requests",
            &format!(
                "dispatched={} responded={} failed={} filtered={} no-signature={} hits={}",
                c.dispatched,
                c.responded,
                c.transport_failures,
                c.filtered,
                c.signature_mismatch,
                c.hits
            ),
        );
    }

    if let Some(outfile_path) = run.output.as_deref() {
        let rendered = crate::output::render(&collector.records(), run.output_format)
            .map_err(|e| format!("failed to render output: {e}"))?;
        let mut outfile = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(outfile_path)
            .await
            .map_err(|e| format!("failed to open output file: {e}"))?;
        outfile
            .write_all(&rendered)
            .await
            .map_err(|_| "failed to write output file".to_string())?;
    }

    println!();
    println!(
        ":: Completed :: {} hit(s) :: scan took {}s ::",
        summary.hits,
        summary.elapsed.as_secs()
    );

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{}", e);
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    if args.init_config {
        let path = config::default_config_path()
            .ok_or_else(|| "could not determine home directory".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!("wrote default config to {}", path.display());
        } else {
            println!("config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose, run.no_color);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(run.workers)
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
