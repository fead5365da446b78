// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SPP Bridge command line.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spp_bridge::bluetooth::{BluezDirectory, RfcommTransport};
use spp_bridge::commands::{self, CommandReply};
use spp_bridge::config::Config;
use spp_bridge::{BridgeController, BridgeEvent, Subscriber};

#[derive(Parser)]
#[command(name = "spp-bridge", version, about = "Bluetooth serial bridge for line-oriented peers")]
struct Cli {
    /// Configuration file. Defaults to the user configuration directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How events and replies are printed.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Listen to the peer and print events until interrupted.
    Listen {
        /// Name of the bonded peer.
        #[arg(long)]
        device: Option<String>,

        /// Address of the bonded peer.
        #[arg(long)]
        address: Option<String>,
    },
    /// Print bonded peers.
    Peers,
    /// Read commands from stdin, one per line.
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per line.
    Json,
    /// Bare telemetry numbers and prefixed status lines.
    Legacy,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries events
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("spp_bridge=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("Starting SPP Bridge v{}...", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Mode::Listen { device, address } = &cli.mode {
        if let Some(device) = device {
            config.bluetooth.device_name = device.clone();
            config.bluetooth.device_address = None;
        }
        if let Some(address) = address {
            config.bluetooth.device_address = Some(address.clone());
        }
    }
    info!("Configuration loaded");

    let directory = Arc::new(BluezDirectory::new().await?);
    let transport = Arc::new(RfcommTransport::new(config.bluetooth.rfcomm_channel));
    let controller = BridgeController::from_config(directory, transport, &config)?;

    match cli.mode {
        Mode::Listen { .. } => listen(&controller, cli.format).await?,
        Mode::Peers => {
            let peers = controller.list_paired_peers().await;
            print_reply(&CommandReply::Peers(peers.entries()), cli.format)?;
        }
        Mode::Serve => serve(&controller, cli.format).await?,
    }

    info!("SPP Bridge stopped");
    Ok(())
}

async fn listen(controller: &BridgeController, format: OutputFormat) -> Result<()> {
    let (subscriber, mut rx) = Subscriber::channel();
    info!("{}", controller.start_listening(subscriber).await?);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    print_event(&event, format)?;
                    if event == BridgeEvent::Disconnected {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                controller.stop_listening().await?;
                while let Ok(event) = rx.try_recv() {
                    print_event(&event, format)?;
                }
                break;
            }
        }
    }

    info!("Final status: {}", controller.status().as_str());
    Ok(())
}

async fn serve(controller: &BridgeController, format: OutputFormat) -> Result<()> {
    let (subscriber, mut rx) = Subscriber::channel();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    let reply = commands::dispatch(controller, &line, &subscriber).await;
                    print_reply(&reply, format)?;
                }
                None => break,
            },
            Some(event) = rx.recv() => print_event(&event, format)?,
        }
    }

    controller.stop_listening().await?;
    while let Ok(event) = rx.try_recv() {
        print_event(&event, format)?;
    }
    Ok(())
}

fn print_event(event: &BridgeEvent, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", event.to_wire().to_json()?),
        OutputFormat::Legacy => println!("{}", event.to_legacy_line()),
    }
    Ok(())
}

fn print_reply(reply: &CommandReply, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(reply)?),
        OutputFormat::Legacy => println!("{}", reply.to_text()),
    }
    Ok(())
}
