//! browser-hints CLI
//!
//! Loads a page fixture into a simulated tab, shows link hints for it and
//! types keys at them. Frame timeouts and re-measurement run on real time.

use anyhow::Context;
use browser_hints::{BrowserSession, FrameId, HintsMode, HintsOptions, KeyPress, PageFixture, TabSession, ToFrame};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "browser-hints")]
#[command(version)]
#[command(about = "Keyboard link hints for page fixtures", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show hints for a page fixture, then type keys at them
    Run {
        /// Page fixture (JSON)
        #[arg(value_name = "FIXTURE")]
        fixture: PathBuf,

        /// Hints mode
        #[arg(long, short = 'm', default_value = "click")]
        mode: HintsMode,

        /// Keys to type once hints are shown
        #[arg(long, short = 'k', default_value = "")]
        keys: String,

        /// Hints options (JSON)
        #[arg(long, short = 'o', value_name = "PATH")]
        options: Option<PathBuf>,
    },

    /// Print the JSON schema of frame commands
    Schema,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Command::Schema => {
            let schema = schemars::schema_for!(ToFrame);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Command::Run {
            fixture,
            mode,
            keys,
            options,
        } => run(&fixture, mode, &keys, options.as_deref()).await?,
    }
    Ok(())
}

async fn run(fixture: &Path, mode: HintsMode, keys: &str, options: Option<&Path>) -> anyhow::Result<()> {
    let options = match options {
        Some(path) => HintsOptions::load(path).with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => HintsOptions::default(),
    };
    let json = std::fs::read_to_string(fixture).with_context(|| format!("Failed to read {}", fixture.display()))?;
    let fixture = PageFixture::from_json(&json)?;

    let mut browser = BrowserSession::new(options)?;
    let id = browser.open_tab(&fixture, Instant::now())?;
    let tab = browser.tab_mut(id)?;

    tab.enter_hints(mode, Instant::now())?;
    settle(tab).await?;
    println!("Hints ({} mode):", mode);
    for view in tab.renderer().visible_hints() {
        println!("  {:<6} element {:<4} at ({:.0}, {:.0})", view.hint, view.index, view.x, view.y);
    }

    for press in KeyPress::sequence(keys) {
        tab.press(&press, Instant::now())?;
        settle(tab).await?;
    }

    for frame in tab.frame_ids() {
        print_activations(tab, frame)?;
    }
    for opened in tab.opened_tabs() {
        let place = if opened.foreground { "foreground" } else { "background" };
        println!("Opened {} in a {} tab", opened.url, place);
    }
    println!("State: {}", tab.controller().state().name());
    Ok(())
}

/// Wait out frame timeouts until collection has finished
async fn settle(tab: &mut TabSession) -> anyhow::Result<()> {
    while tab.controller().state().name() == "collecting" {
        let Some(deadline) = tab.next_deadline() else {
            log::warn!("Top frame is not answering");
            break;
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        tab.tick(Instant::now())?;
    }
    Ok(())
}

fn print_activations(tab: &TabSession, frame: FrameId) -> anyhow::Result<()> {
    let page = tab.page(frame)?;
    for activation in page.activations() {
        let dom = page.dom();
        let tag = dom.tag_name(activation.node).unwrap_or("?");
        let id = dom
            .element(activation.node)
            .and_then(|element| element.attribute("id"))
            .map(|id| format!("#{}", id))
            .unwrap_or_default();
        println!("{:?} <{}{}> in {}", activation.kind, tag.to_lowercase(), id, frame);
    }
    Ok(())
}
