use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use cardshot::{
    memory::MemoryBackend, BrowserPool, CardRenderer, ConsumerConfigSource, HelpKind, NightMode,
    PoolConfig, RenderRequest, RenderedCard, StaticConsumerConfig, SubscriptionList,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "cardshot", version, about = "Render preview cards to PNG")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one content card from a JSON payload or API response.
    Render(RenderArgs),
    /// Render a subscription list card.
    Subscriptions(SubscriptionArgs),
    /// Render the user or admin help card.
    Help(HelpArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Output PNG path.
    #[arg(long)]
    output: PathBuf,

    /// Consumer id whose settings apply.
    #[arg(long)]
    consumer: Option<String>,

    /// Consumer settings JSON, keyed by consumer id.
    #[arg(long)]
    consumers: Option<PathBuf>,

    /// Force night mode on or off for this render.
    #[arg(long, value_enum)]
    night: Option<NightSwitch>,

    /// Maximum number of concurrent surfaces.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Chrome/Chromium binary (defaults to auto-detection or CHROME_PATH).
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Rendering backend.
    #[arg(long, value_enum, default_value_t = BackendChoice::Chrome)]
    backend: BackendChoice,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Content type: video, article, bangumi, live, dynamic or user.
    #[arg(long = "type")]
    content_type: String,

    /// Input JSON (payload or full API response).
    #[arg(long)]
    input: PathBuf,

    /// Hide numeric user ids.
    #[arg(long)]
    hide_id: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct SubscriptionArgs {
    /// Input JSON with `users`, `bangumis` and `accountFollows`.
    #[arg(long)]
    input: PathBuf,

    /// Card title.
    #[arg(long, default_value = "订阅列表")]
    title: String,

    /// Hide numeric user ids.
    #[arg(long)]
    hide_id: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct HelpArgs {
    /// Which help card to render.
    #[arg(long, value_enum, default_value_t = HelpChoice::User)]
    kind: HelpChoice,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HelpChoice {
    User,
    Admin,
}

impl From<HelpChoice> for HelpKind {
    fn from(choice: HelpChoice) -> Self {
        match choice {
            HelpChoice::User => HelpKind::User,
            HelpChoice::Admin => HelpKind::Admin,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NightSwitch {
    On,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendChoice {
    /// Headless Chrome
    Chrome,
    /// In-process backend producing placeholder PNGs
    Memory,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args).await,
        Command::Subscriptions(args) => cmd_subscriptions(args).await,
        Command::Help(args) => cmd_help(args).await,
    }
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let f = File::open(path).with_context(|| format!("open input '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse JSON from '{}'", path.display()))
}

fn make_pool(common: &CommonArgs) -> anyhow::Result<BrowserPool> {
    let mut config = PoolConfig::from_env()?;
    if let Some(n) = common.max_concurrent {
        config.max_concurrent = n;
    }
    if let Some(chrome) = &common.chrome {
        config.chrome_path = Some(chrome.clone());
    }

    let pool = match common.backend {
        BackendChoice::Memory => BrowserPool::new(config, MemoryBackend::new())?,
        #[cfg(feature = "cdp")]
        BackendChoice::Chrome => BrowserPool::chrome(config)?,
        #[cfg(not(feature = "cdp"))]
        BackendChoice::Chrome => {
            anyhow::bail!("built without the `cdp` feature; use --backend memory")
        }
    };
    Ok(pool)
}

/// Consumer settings from `--consumers`, with `--night` applied on top.
/// Returns the source and the consumer id to render for.
fn consumer_source(
    common: &CommonArgs,
) -> anyhow::Result<(Arc<dyn ConsumerConfigSource>, Option<String>)> {
    let mut consumers = match &common.consumers {
        Some(path) => StaticConsumerConfig::from_json_file(path)?,
        None => StaticConsumerConfig::new(),
    };

    let mut consumer = common.consumer.clone();
    if let Some(night) = common.night {
        let id = consumer.get_or_insert_with(|| "cli".to_string()).clone();
        let mut settings = consumers.settings(&id).unwrap_or_default();
        settings.night_mode.mode = match night {
            NightSwitch::On => NightMode::On,
            NightSwitch::Off => NightMode::Off,
        };
        consumers.insert(id, settings);
    }
    Ok((Arc::new(consumers), consumer))
}

async fn finish(
    pool: &BrowserPool,
    result: cardshot::Result<RenderedCard>,
    output: &Path,
) -> anyhow::Result<()> {
    // Shut down before reporting so Chrome never outlives the process
    pool.shutdown().await?;
    let card = result?;
    std::fs::write(output, &card.png)
        .with_context(|| format!("write '{}'", output.display()))?;
    info!(
        "Wrote {} ({}x{}, {} bytes)",
        output.display(),
        card.width,
        card.height,
        card.png.len()
    );
    Ok(())
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let response = read_json(&args.input)?;
    let mut request = RenderRequest::from_api_response(&args.content_type, response)?;
    request.display.show_id = !args.hide_id;

    let (consumers, consumer) = consumer_source(&args.common)?;
    request.consumer = consumer;

    let pool = make_pool(&args.common)?;
    let renderer = CardRenderer::new(pool.clone(), consumers);
    let result = tokio::time::timeout(Duration::from_secs(120), renderer.render(&request))
        .await
        .unwrap_or_else(|_| Err(cardshot::Error::Other("render timed out".into())));
    finish(&pool, result, &args.common.output).await
}

async fn cmd_subscriptions(args: SubscriptionArgs) -> anyhow::Result<()> {
    let raw = read_json(&args.input)?;
    let list: SubscriptionList =
        serde_json::from_value(raw).context("parse subscription list")?;

    let (consumers, consumer) = consumer_source(&args.common)?;
    let pool = make_pool(&args.common)?;
    let renderer = CardRenderer::new(pool.clone(), consumers);
    let result = renderer
        .render_subscription_list(&list, consumer.as_deref(), !args.hide_id, &args.title)
        .await;
    finish(&pool, result, &args.common.output).await
}

async fn cmd_help(args: HelpArgs) -> anyhow::Result<()> {
    let (consumers, consumer) = consumer_source(&args.common)?;
    let pool = make_pool(&args.common)?;
    let renderer = CardRenderer::new(pool.clone(), consumers);
    let result = renderer
        .render_help_card(args.kind.into(), consumer.as_deref())
        .await;
    finish(&pool, result, &args.common.output).await
}
