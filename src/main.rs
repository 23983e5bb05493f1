use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ibdm::services::llm::CompletionClient;
use ibdm::services::{Generator, KeywordInterpreter, LlmGenerator, TemplateGenerator};
use ibdm::store::{FileSessionStore, SessionStore};
use ibdm::{DialogueMoveEngine, EngineConfig, Session, StaticDomain};

const DEFAULT_DOMAIN: &str = include_str!("../demos/nda.toml");

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;

    let domain = match std::env::args().nth(1) {
        Some(path) => StaticDomain::load(&path).with_context(|| format!("loading domain {path}"))?,
        None => StaticDomain::from_toml_str(DEFAULT_DOMAIN).context("loading built-in domain")?,
    };
    let config = match std::env::var("IBDM_CONFIG") {
        Ok(path) => EngineConfig::load(&path).with_context(|| format!("loading config {path}"))?,
        Err(_) => EngineConfig::default(),
    };

    let interpreter = KeywordInterpreter::from_domain(&domain);
    let templates = TemplateGenerator::from_domain(&domain);
    // A completion server only rephrases; the template text is the fallback.
    let generator: Arc<dyn Generator> = match std::env::var("IBDM_LLM_URL") {
        Ok(url) => {
            info!(%url, "rephrasing through completion server");
            let client = CompletionClient::new(url, config.collaborator_timeout());
            Arc::new(LlmGenerator::new(client, templates))
        }
        Err(_) => Arc::new(templates),
    };
    let engine = Arc::new(DialogueMoveEngine::new(
        Arc::new(domain),
        Arc::new(interpreter),
        generator,
        config,
    ));

    info!(domain = engine.domain().name(), "domain loaded");
    let mut session = Session::new(engine);
    info!(session = %session.id(), "console session started");

    let opening = session.open().await?;
    say(&opening.text());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !session.is_finished() {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        match session.respond(&line).await {
            Ok(exchange) => say(&exchange.text()),
            Err(e) => eprintln!("[turn dropped: {e}]"),
        }
    }

    let dir = std::env::var("IBDM_SESSION_DIR").unwrap_or_else(|_| "sessions".to_string());
    let mut store = FileSessionStore::new(dir);
    store.save(&session.snapshot()).context("saving session")?;
    info!(summary = ?session.summary(), "session closed");
    Ok(())
}

fn say(text: &str) {
    if !text.is_empty() {
        println!("{text}");
    }
}
