use clap;
use log;
use sensorlink::{
    config::Settings, coordinator, logging_state::SharedToggle, sink::LogSink,
};
use simple_logger;
use std::{path::Path, sync::Arc};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    time::{self, Duration},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = clap::Command::new("sensorlink-master")
        .version("0.1.0")
        .arg(
            clap::arg!(config: -c --config <FILE> "json settings file")
                .env("SENSORLINK_CONFIG"),
        )
        .arg(
            clap::arg!(listen: --listen <ADDRESS> "local link address")
                .env("SENSORLINK_LISTEN"),
        )
        .arg(
            clap::arg!(peer: -p --peer <ADDRESS> "remote unit address, repeat in id order")
                .action(clap::ArgAction::Append)
                .value_delimiter(',')
                .env("SENSORLINK_PEERS"),
        )
        .arg(
            clap::arg!(store: -s --store <DIR> "log store directory")
                .env("SENSORLINK_STORE"),
        )
        .arg(
            clap::arg!(interval: -i --interval <MS> "log interval in milliseconds")
                .value_parser(clap::value_parser!(u64))
                .env("SENSORLINK_LOG_INTERVAL"),
        )
        .arg(
            clap::arg!(loglevel: -l --loglevel <LOGLEVEL> "loglevel")
                .value_parser([
                    clap::builder::PossibleValue::new("error"),
                    clap::builder::PossibleValue::new("warn"),
                    clap::builder::PossibleValue::new("info"),
                    clap::builder::PossibleValue::new("debug"),
                    clap::builder::PossibleValue::new("trace"),
                ])
                .env("SENSORLINK_LOGLEVEL"),
        )
        .get_matches();
    match app
        .get_one::<String>("loglevel")
        .unwrap_or(&String::from("info"))
        .as_str()
    {
        "error" => {
            simple_logger::init_with_level(log::Level::Error)?;
        }
        "warn" => {
            simple_logger::init_with_level(log::Level::Warn)?;
        }
        "info" => {
            simple_logger::init_with_level(log::Level::Info)?;
        }
        "debug" => {
            simple_logger::init_with_level(log::Level::Debug)?;
        }
        "trace" => {
            simple_logger::init_with_level(log::Level::Trace)?;
        }
        _ => {
            simple_logger::init_with_level(log::Level::Info)?;
        }
    }

    let mut settings = match app.get_one::<String>("config") {
        Some(path) => Settings::from_file(Path::new(path))?,
        None => Settings::default(),
    };
    if let Some(listen) = app.get_one::<String>("listen") {
        settings.listen = listen.clone();
    }
    if let Some(peers) = app.get_many::<String>("peer") {
        settings.peers = peers.cloned().collect();
    }
    if let Some(store) = app.get_one::<String>("store") {
        settings.store_dir = store.clone();
    }
    if let Some(interval) = app.get_one::<u64>("interval") {
        settings.log_interval_ms = *interval;
    }

    let toggle = SharedToggle::default();
    let mut coordinator = coordinator::start(settings, toggle.clone(), Arc::new(LogSink)).await?;

    // every line on stdin is one press of the logging button
    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            toggle.press();
            time::sleep(Duration::from_millis(100)).await;
            toggle.release();
        }
        log::debug!("stdin closed, button input stopped");
    });

    coordinator
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;
    Ok(())
}
