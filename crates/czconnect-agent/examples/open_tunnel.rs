//! Space Tunnel Demo
//!
//! Opens a tunnel through a space proxy and performs a bare HTTP/1.1
//! request against a service inside the space.
//!
//! # Usage
//!
//! ```bash
//! # Identity on the command line
//! cargo run --example open_tunnel -- \
//!     --org-id org-1 --org-api-key key-1 --space-id staging \
//!     --host orders.svc --port 80
//!
//! # Identity from the environment
//! export CZ_ORG_ID=org-1 CZ_ORG_API_KEY=key-1 CZ_SPACE_ID=staging
//! cargo run --example open_tunnel -- --host orders.svc
//! ```

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use czconnect_agent::SpaceProxyAgent;
use czconnect_common::{ConnectTarget, IdentityOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Open a tunnel through a space proxy")]
struct Args {
    /// Organization id (falls back to CZ_ORG_ID)
    #[arg(long)]
    org_id: Option<String>,

    /// Organization API key (falls back to CZ_ORG_API_KEY)
    #[arg(long)]
    org_api_key: Option<String>,

    /// Space id (falls back to CZ_SPACE_ID)
    #[arg(long)]
    space_id: Option<String>,

    /// Hub base URL override (falls back to CZ_HUB_SERVER_BASE_URL)
    #[arg(long)]
    hub_base_url: Option<String>,

    /// Target host inside the space
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Target port inside the space
    #[arg(long, default_value_t = 80)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let options = IdentityOptions {
        org_id: args.org_id,
        org_api_key: args.org_api_key,
        space_id: args.space_id,
        hub_base_url: args.hub_base_url,
    };

    let agent = SpaceProxyAgent::new(options)?;
    let target = ConnectTarget::new(args.host, args.port);

    let mut tunnel = agent.connect(&target).await?;
    tunnel
        .write_all(
            format!(
                "GET / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
                target.host
            )
            .as_bytes(),
        )
        .await?;

    let mut response = String::new();
    tunnel.read_to_string(&mut response).await?;
    println!("{response}");

    Ok(())
}
