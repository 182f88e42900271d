//! framepilot - run a bridge session against a simulated page
//!
//! Mounts an app the way a host page would, with chosen schemes answering
//! the handshake probes, then sends requests from inside the mounted frame
//! and prints each reply as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use serde_json::Value;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use framebridge::BridgeConfig;
use framebridge::BridgeSession;
use framebridge::InvokeHost;
use framebridge::Platform;
use framebridge::sim::ScriptedHost;
use framebridge::sim::SimulatedPage;
use frameproto::LoadingProtocol;
use frameproto::RuntimeInfo;
use frameproto::ZomeCallRequest;

/// Longest a single request may take before the pilot gives up on it.
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "framepilot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Id of the app to mount
    #[arg(long)]
    app_id: String,

    /// Query string of the host page, e.g. "?foo=bar"
    #[arg(long, default_value = "")]
    query: String,

    /// Platform the simulated webview runs on
    #[arg(long, value_enum, default_value_t = PlatformArg::Other)]
    platform: PlatformArg,

    /// Loading protocol that answers probes (repeatable)
    #[arg(long = "serve", value_enum)]
    serve: Vec<ServeArg>,

    /// Port of the runtime's http server
    #[arg(long, default_value = "8889")]
    http_port: u16,

    /// Path to a JSON bridge config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error or a directive list)
    #[arg(long, default_value = "warn")]
    log: String,

    /// Zome call to sign, as JSON
    #[arg(long)]
    sign: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PlatformArg {
    Windows,
    Other,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Windows => Platform::Windows,
            PlatformArg::Other => Platform::Other,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ServeArg {
    Assets,
    Localhost,
    LocaltestMe,
}

impl From<ServeArg> for LoadingProtocol {
    fn from(arg: ServeArg) -> Self {
        match arg {
            ServeArg::Assets => LoadingProtocol::Assets,
            ServeArg::Localhost => LoadingProtocol::LocalhostSubdomain,
            ServeArg::LocaltestMe => LoadingProtocol::LocaltestMe,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    BridgeConfig::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Requests to send from the mounted frame, in order.
fn requests(sign: Option<&str>) -> Result<Vec<Value>> {
    let mut out = vec![
        json!({ "type": "get-app-runtime-info" }),
        json!({ "type": "get-locales" }),
    ];
    if let Some(sign) = sign {
        let call: ZomeCallRequest = serde_json::from_str(sign).context("Invalid --sign zome call")?;
        out.push(json!({ "type": "sign-zome-call", "zomeCall": call }));
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_ref())?;
    let requests = requests(cli.sign.as_deref())?;

    let mut page = SimulatedPage::new(cli.platform.into()).with_query(cli.query.clone());
    for serve in &cli.serve {
        page = page.serving((*serve).into());
    }
    let page = Arc::new(page.ready());

    let scripted = ScriptedHost::new(RuntimeInfo {
        http_server_port: cli.http_port,
        app_port: 8888,
        admin_port: 8000,
    });
    let host = Arc::new(InvokeHost::new(Arc::new(scripted)));

    tracing::info!(app = %cli.app_id, platform = ?cli.platform, serve = ?cli.serve, "starting simulated session");
    let session = BridgeSession::builder(cli.app_id.as_str(), page.clone(), host)
        .config(config)
        .start()
        .await
        .context("Bridge session did not start")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "protocol": session.protocol(),
            "confirmed": session.protocol_confirmed(),
            "frame": session.frame().src,
        }))?
    );

    for request in requests {
        let mut rx = page
            .post_from_frame(session.frame().id, request.clone())
            .context("App frame is no longer mounted")?;
        let reply = tokio::time::timeout(REPLY_TIMEOUT, rx.recv())
            .await
            .context("Timed out waiting for a reply")?
            .context("Reply port closed without a reply")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "request": request["type"], "reply": reply }))?
        );
    }

    session.shutdown().await;
    Ok(())
}
