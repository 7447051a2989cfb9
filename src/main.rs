mod args;
mod client;

use std::path::Path;

use clap::Parser;
use log::{debug, warn, LevelFilter};
use snafu::{prelude::*, ErrorCompat};

use crate::args::{Args, Command};
use crate::client::config_reader::ClientConfig;
use crate::client::io_common::build_client;
use crate::client::printed::set_as_printed;
use crate::client::{ClientResult, ParsingJsonSnafu};

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

/// The configuration file, with the command line overrides applied.
fn load_config(args: &Args) -> ClientResult<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::read(path)?,
        None => ClientConfig::default(),
    };
    if let Some(s) = &args.server {
        config.server.base_url = Some(s.clone());
    }
    if let Some(t) = &args.csrf_token {
        config.server.csrf_token = Some(t.clone());
    }
    if let Some(id) = args.tally_id {
        config.tally_id = Some(id);
    }
    if let Command::Import {
        total_steps,
        totals,
        offsets,
        poll_delay_ms,
        max_task_polls,
        network_retries,
    } = &args.command
    {
        let import = &mut config.import;
        import.total_steps = total_steps.or(import.total_steps);
        import.totals = totals.clone().or_else(|| import.totals.clone());
        import.offsets = offsets.clone().or_else(|| import.offsets.clone());
        import.poll_delay_ms = poll_delay_ms.or(import.poll_delay_ms);
        import.max_task_polls = max_task_polls.or(import.max_task_polls);
        import.network_retries = network_retries.or(import.network_retries);
    }
    debug!("load_config: {:?}", config);
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> ClientResult<()> {
    let s = serde_json::to_string_pretty(value).context(ParsingJsonSnafu {})?;
    println!("{}", s);
    Ok(())
}

async fn run(args: Args) -> ClientResult<()> {
    let config = load_config(&args)?;
    match args.command {
        Command::Import { .. } => {
            let destination = client::run_import(&config).await?;
            println!("{}", destination);
        }
        Command::CentersStations { center_ids } => {
            let res = client::run_centers_stations(&config, &center_ids).await?;
            print_json(&res)?;
        }
        Command::Regions { region_names } => {
            let res = client::run_regions(&config, &region_names).await?;
            print_json(&res)?;
        }
        Command::Export {
            kind,
            filters,
            out_dir,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| ".".to_string());
            let path =
                client::run_export(&config, kind, filters.as_deref(), Path::new(&out_dir)).await?;
            println!("{}", path.display());
        }
        Command::Printed { url } => {
            let url = match url {
                Some(u) => Some(config.server.url(&u)?),
                None => None,
            };
            let http = build_client(&config.server)?;
            if !set_as_printed(&http, url.as_deref()).await {
                warn!("The cover was not marked as printed");
            }
        }
        Command::ReplayBarcode { script } => {
            let report = client::run_replay(&config, &script)?;
            print_json(&report)?;
        }
        Command::VerifyCenter {
            center_number,
            center_number_copy,
            station_number,
            station_number_copy,
        } => {
            client::run_verify_center(
                &center_number,
                &center_number_copy,
                &station_number,
                &station_number_copy,
            )?;
            println!("Center details match");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(s) = source {
            eprintln!("  caused by: {}", s);
            source = s.source();
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
