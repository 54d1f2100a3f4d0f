//! Sofia command line.
//!
//! # Usage
//!
//! ```bash
//! # Create a room link, optionally end-to-end encrypted
//! sofia new-room --e2ee
//!
//! # Show what a room link configures
//! sofia inspect 'http://localhost:3000/rooms/abcd-1234?hq=true#c2VjcmV0'
//!
//! # Fetch connection details for a room
//! sofia details 'http://localhost:3000/rooms/abcd-1234' --name Ana
//!
//! # Start or stop server-side recording
//! LK_RECORD_ENDPOINT=https://rec.example/api/record sofia record start abcd-1234
//! ```

use std::io::{self, Write};

use clap::{Parser, Subcommand, ValueEnum};
use sofia_client::{
    ClientConfig, ConnectionDetailResolver, HttpResolver, ROOM_ID_RANDOM_BYTES, RecordingAction,
    RecordingControl, RoomEntry, SystemEnv,
};
use sofia_core::{ConnectionDetailsRequest, Environment, RequestId};
use sofia_crypto::PASSPHRASE_LENGTH;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sofia video conference client tools
#[derive(Parser, Debug)]
#[command(name = "sofia")]
#[command(about = "Sofia video conference client tools")]
#[command(version)]
struct Args {
    #[command(flatten)]
    config: ClientConfig,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new room link
    NewRoom {
        /// Generate a passphrase and encrypt media end to end
        #[arg(long)]
        e2ee: bool,
    },
    /// Show the session settings a room link encodes
    Inspect {
        /// Room link
        link: String,
    },
    /// Fetch connection details for a room link
    Details {
        /// Room link
        link: String,
        /// Participant display name
        #[arg(long)]
        name: String,
    },
    /// Start or stop recording a room
    Record {
        /// Start or stop
        action: RecordArg,
        /// Room name
        room: String,
        /// The room is end-to-end encrypted
        #[arg(long)]
        encrypted: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RecordArg {
    Start,
    Stop,
}

impl From<RecordArg> for RecordingAction {
    fn from(arg: RecordArg) -> Self {
        match arg {
            RecordArg::Start => Self::Start,
            RecordArg::Stop => Self::Stop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut out = io::stdout().lock();
    match args.command {
        Command::NewRoom { e2ee } => new_room(&args.config, e2ee, &mut out)?,
        Command::Inspect { link } => inspect(&args.config, &link, &mut out)?,
        Command::Details { link, name } => details(&args.config, &link, name, &mut out).await?,
        Command::Record { action, room, encrypted } => {
            let mut control = RecordingControl::new(args.config.recording_url()?);
            control.request(action.into(), &room, encrypted).await?;
            writeln!(out, "recording {action:?} requested for {room}")?;
        },
    }

    Ok(())
}

fn new_room(
    config: &ClientConfig,
    e2ee: bool,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let env = SystemEnv::new();

    let mut room_random = [0u8; ROOM_ID_RANDOM_BYTES];
    env.random_bytes(&mut room_random);
    let mut passphrase_random = [0u8; PASSPHRASE_LENGTH];
    if e2ee {
        env.random_bytes(&mut passphrase_random);
    }

    let entry = RoomEntry::generate(&room_random, e2ee.then_some(&passphrase_random));
    let link = entry.link(&config.origin_url()?)?;
    writeln!(out, "{link}")?;
    Ok(())
}

fn inspect(
    config: &ClientConfig,
    link: &str,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let entry = RoomEntry::parse(link)?;
    let session = entry.session_config(config.show_settings_menu, config.monitor());
    let profile = session.quality_profile(false);

    writeln!(out, "room:       {}", session.room_name)?;
    writeln!(out, "region:     {}", session.region.as_deref().unwrap_or("-"))?;
    writeln!(out, "e2ee:       {}", session.encryption.enabled())?;
    writeln!(out, "quality:    {}", serde_json::to_string(&profile)?)?;
    if config.record_endpoint.is_some() {
        let recordable = if entry.encrypted() { "no (encrypted)" } else { "yes" };
        writeln!(out, "recordable: {recordable}")?;
    }
    Ok(())
}

async fn details(
    config: &ClientConfig,
    link: &str,
    name: String,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let entry = RoomEntry::parse(link)?;
    let resolver = HttpResolver::new(config.connection_details_url()?);
    let request = ConnectionDetailsRequest {
        id: RequestId(1),
        room_name: entry.room_name,
        participant_name: name,
        region: entry.region,
    };

    let details = resolver.resolve(&request).await?;
    details.validate()?;
    writeln!(out, "{details:#?}")?;
    Ok(())
}
