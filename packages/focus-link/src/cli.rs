use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "focus-session",
    version,
    about = "Headset focus session runner",
    long_about = "Reads attention telemetry from a headset telemetry server (directly or through\n\
                  focus-relay), scores a fixed focus window and uploads readings to the session API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one scored play session
    Play(PlayArgs),
    /// Check that the session API is reachable
    Health(HealthArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Direct TCP connection to the telemetry server
    Tcp,
    /// WebSocket connection through focus-relay
    Relay,
}

#[derive(Args)]
pub struct PlayArgs {
    /// How to reach the telemetry server
    #[arg(long, value_enum, default_value_t = TransportKind::Tcp, env = "FOCUS_TRANSPORT")]
    pub transport: TransportKind,

    /// Telemetry server host (tcp transport)
    #[arg(long, default_value = "127.0.0.1", env = "FOCUS_TELEMETRY_HOST")]
    pub host: String,

    /// Telemetry server port (tcp transport)
    #[arg(long, default_value_t = 13854, env = "FOCUS_TELEMETRY_PORT")]
    pub port: u16,

    /// Relay WebSocket url (relay transport)
    #[arg(long, default_value = "ws://127.0.0.1:13855", env = "FOCUS_RELAY_URL")]
    pub relay_url: String,

    #[command(flatten)]
    pub api: ApiArgs,

    /// Bearer token for the session API
    #[arg(long, env = "FOCUS_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Game id for the started session
    #[arg(long, env = "FOCUS_GAME_ID")]
    pub game_id: Option<i64>,

    /// Prescription id for the started session
    #[arg(long, env = "FOCUS_PRESCRIPTION_ID")]
    pub prescription_id: Option<i64>,

    /// App config JSON with bearerToken, gameId and prescriptionId
    #[arg(long, conflicts_with_all = ["token", "game_id", "prescription_id"])]
    pub app_config: Option<PathBuf>,

    /// Session id to use when the start response carries none (testing only)
    #[arg(long, env = "FOCUS_SESSION_ID_OVERRIDE")]
    pub session_id_override: Option<i64>,

    /// Milliseconds between reading uploads
    #[arg(long, default_value_t = 1000)]
    pub post_interval_ms: u64,

    /// Do not log request bodies
    #[arg(long, default_value_t = false)]
    pub quiet_requests: bool,

    /// Score only, do not contact the session API
    #[arg(long, default_value_t = false)]
    pub no_upload: bool,

    /// Skip the startup health check
    #[arg(long, default_value_t = false)]
    pub skip_health_check: bool,

    /// Focus window length in seconds
    #[arg(long, default_value_t = 30)]
    pub duration: u64,

    /// Attention at or above this counts as focused
    #[arg(long, default_value_t = 50)]
    pub attention_threshold: u8,

    /// Signal quality at or below this starts the window (0 is best)
    #[arg(long, default_value_t = 25)]
    pub good_signal: u8,

    /// Consumer tick in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Write raw samples to this CSV file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApiArgs {
    /// Base url of the session API
    #[arg(long, default_value = "http://127.0.0.1:8000", env = "FOCUS_API_BASE")]
    pub api_base: String,
}

#[derive(Args)]
pub struct HealthArgs {
    #[command(flatten)]
    pub api: ApiArgs,
}
