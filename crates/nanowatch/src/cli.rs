use clap::Parser;

use nanowatch_core::session::DEFAULT_BLOCK_COUNT;
use nanowatch_core::transport::DEFAULT_URL;

/// nanowatch — follow a Nano account over a persistent websocket session.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Websocket endpoint of the account/price service.
    #[arg(long, default_value = DEFAULT_URL, env = "NANOWATCH_URL")]
    pub url: String,

    /// Account address to track. Without it the connection opens but no
    /// requests are sent.
    #[arg(long, env = "NANOWATCH_ADDRESS")]
    pub address: Option<String>,

    /// Local currency code for price quotes.
    #[arg(long, default_value = "USD", env = "NANOWATCH_CURRENCY")]
    pub currency: String,

    /// History size requested until the server reports a block count.
    #[arg(long, default_value_t = DEFAULT_BLOCK_COUNT, env = "NANOWATCH_FALLBACK_BLOCK_COUNT")]
    pub fallback_block_count: u64,

    /// Re-send the account requests every N seconds (0 disables).
    #[arg(long, default_value = "0", env = "NANOWATCH_REFRESH_SECS")]
    pub refresh_secs: u64,
}
