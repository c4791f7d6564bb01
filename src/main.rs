use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use ultramat_rs::device::MeasurementPoints;
use ultramat_rs::gatherer::GathererEvent;
use ultramat_rs::{
    connect, init_logger, log_info, ConfigClient, DeviceVariant, Gatherer, GathererConfig,
    SerialConfig, SessionHandle, SessionInfo, SessionSink,
};

#[derive(Parser)]
#[command(name = "ultramat-cli")]
#[command(about = "CLI tool for Graupner Ultramat chargers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record sessions as JSON lines on stdout
    Gather {
        port: String,
        /// Charger model, overriding the configuration file
        #[arg(short, long)]
        variant: Option<DeviceVariant>,
        /// JSON gatherer configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Read or set the device user name
    UserName {
        port: String,
        #[arg(long)]
        set: Option<String>,
    },
    /// Read or set the name of a battery memory
    MemoryName {
        port: String,
        number: u8,
        #[arg(long)]
        set: Option<String>,
    },
    /// Dump the setup words of a battery memory
    MemorySetup { port: String, number: u8 },
    /// Dump the setup words of a channel
    ChannelSetup { port: String, channel: u8 },
    /// List the supported chargers
    Devices,
}

/// Prints every sink call as one JSON object per line.
struct JsonLinesSink<W: Write + Send> {
    out: W,
    next_handle: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    fn emit(&mut self, value: serde_json::Value) {
        if let Err(e) = writeln!(self.out, "{value}") {
            log::error!("Failed to write output: {e}");
        }
    }
}

impl<W: Write + Send> SessionSink for JsonLinesSink<W> {
    fn create_session(&mut self, key: &str, outlet: usize, info: &SessionInfo) -> SessionHandle {
        self.next_handle += 1;
        let handle = SessionHandle(self.next_handle);
        self.emit(json!({
            "time": Utc::now(),
            "event": "create",
            "session": handle.0,
            "key": key,
            "outlet": outlet,
            "info": info,
        }));
        handle
    }

    fn append(&mut self, handle: SessionHandle, points: &MeasurementPoints) {
        self.emit(json!({
            "time": Utc::now(),
            "event": "append",
            "session": handle.0,
            "points": points,
        }));
    }

    fn finalize(&mut self, handle: SessionHandle) {
        self.emit(json!({ "time": Utc::now(), "event": "finalize", "session": handle.0 }));
    }

    fn discard(&mut self, handle: SessionHandle) {
        self.emit(json!({ "time": Utc::now(), "event": "discard", "session": handle.0 }));
    }

    fn notify(&mut self, event: &GathererEvent) {
        self.emit(json!({ "time": Utc::now(), "event": "notify", "detail": event }));
    }
}

async fn config_client(port: &str) -> anyhow::Result<ConfigClient<ultramat_rs::SerialTransport>> {
    let transport = connect(port, SerialConfig::default())
        .await
        .with_context(|| format!("opening {port}"))?;
    let mut client = ConfigClient::new(transport);
    client.begin_config().await?;
    Ok(client)
}

fn print_words(words: &[u16]) {
    for (n, word) in words.iter().enumerate() {
        println!("{n:3}: {word:5} (0x{word:04X})");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Gather { port, variant, config } => {
            let mut config = match config {
                Some(path) => GathererConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => GathererConfig::default(),
            };
            if let Some(variant) = variant {
                config.variant = variant;
            }
            config.validate()?;

            let transport = connect(&port, config.serial.clone())
                .await
                .with_context(|| format!("opening {port}"))?;
            let sink = JsonLinesSink {
                out: std::io::stdout(),
                next_handle: 0,
            };
            let mut gatherer = Gatherer::new(transport, sink, config);

            let handle = gatherer.handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log_info("Stopping");
                    handle.stop();
                }
            });

            let outcome = gatherer.run().await?;
            log_info(&format!(
                "{:?}: {} frames, {} sessions kept, {} discarded",
                outcome.reason, outcome.frames, outcome.sessions_finalized, outcome.sessions_discarded
            ));
        }
        Commands::UserName { port, set } => {
            let mut client = config_client(&port).await?;
            if let Some(name) = set {
                client.write_user_name(&name).await?;
            }
            println!("{}", client.read_user_name().await?);
            client.end_config().await?;
        }
        Commands::MemoryName { port, number, set } => {
            let mut client = config_client(&port).await?;
            if let Some(name) = set {
                client.write_memory_name(number, &name).await?;
            }
            println!("{}", client.read_memory_name(number).await?);
            client.end_config().await?;
        }
        Commands::MemorySetup { port, number } => {
            let mut client = config_client(&port).await?;
            let setup = client.read_memory_setup(number).await?;
            print_words(&setup.words);
            client.end_config().await?;
        }
        Commands::ChannelSetup { port, channel } => {
            if !(1..=2).contains(&channel) {
                bail!("channel must be 1 or 2");
            }
            let mut client = config_client(&port).await?;
            let setup = client.read_channel_setup(channel).await?;
            print_words(&setup.words);
            client.end_config().await?;
        }
        Commands::Devices => {
            for variant in DeviceVariant::ALL {
                let layout = variant.layout();
                println!(
                    "{:<20} {:>3} bytes, {} outlet(s){}",
                    variant.name(),
                    layout.frame_len,
                    layout.outlet_count(),
                    if layout.linked.is_some() { ", linkable" } else { "" }
                );
            }
        }
    }

    Ok(())
}
