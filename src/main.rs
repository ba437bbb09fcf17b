use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::net::TcpListener;

use rag_chat_agent::api;
use rag_chat_agent::config::AgentConfig;
use rag_chat_agent::index::vector_index::VectorIndex;
use rag_chat_agent::llm::engine::ConversationEngine;
use rag_chat_agent::providers::openai::OpenAIProvider;
use rag_chat_agent::providers::traits::ChatProvider;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the HTTP API server instead of the interactive prompt
    #[arg(long)]
    server: bool,

    /// Port for the API server (overrides AGENT_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    colored::control::set_override(true);
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Startup preconditions: credential, config, and a loadable index.
    // Any of these failing should stop the process, not individual requests.
    let config = AgentConfig::from_env().context("configuration")?;
    let index = VectorIndex::load(&config.index_path, config.embedding_dimension)
        .context("loading vector index")?;
    log::info!(
        "loaded vector index from {} ({} passages, dimension {})",
        config.index_path.display(),
        index.len(),
        index.dimension()
    );

    let provider: Arc<dyn ChatProvider> = Arc::new(OpenAIProvider::new(&config));
    let engine = Arc::new(ConversationEngine::new(provider, Arc::new(index), &config));

    if args.server {
        run_api_server(engine, args.port.unwrap_or(config.port)).await
    } else {
        run_repl(engine).await
    }
}

async fn run_api_server(engine: Arc<ConversationEngine>, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let app = api::create_api(engine);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    log::info!("API server listening on {}", addr);
    println!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn run_repl(engine: Arc<ConversationEngine>) -> anyhow::Result<()> {
    let opening = engine.start_conversation();
    println!("{}", opening.green());
    println!(
        "{}",
        "Commands: /start /clear /models /model <name> [temperature] /history /quit".dimmed()
    );

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                rl.add_history_entry(input);

                if input == "/quit" || input == "/exit" {
                    break;
                }

                if let Err(e) = handle_input(&engine, input).await {
                    println!("{}", e.to_string().red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

async fn handle_input(engine: &Arc<ConversationEngine>, input: &str) -> anyhow::Result<()> {
    match input {
        "/start" => {
            let opening = engine.start_conversation();
            println!("{}", opening.green());
        }
        "/clear" => {
            engine.clear_memory();
            println!("{}", "Memory cleared".yellow());
        }
        "/models" => {
            let models = engine.available_models().await?;
            println!("{}", "Available models:".bold());
            for model in models {
                if model == engine.model() {
                    println!("  {} {}", model.green(), "(active)".dimmed());
                } else {
                    println!("  {}", model);
                }
            }
        }
        "/history" => {
            for turn in engine.history() {
                println!("{}: {}", turn.speaker.as_str().bold(), turn.text);
            }
        }
        command if command.starts_with("/model ") => {
            let rest = command.trim_start_matches("/model ").trim();
            let mut parts = rest.split_whitespace();
            let model = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("usage: /model <name> [temperature]"))?;
            let temperature = match parts.next() {
                Some(raw) => raw.parse::<f32>().context("temperature must be a number")?,
                None => engine.temperature(),
            };

            engine.change_model(model, temperature).await?;
            println!(
                "{}",
                format!("Switched to {} (temperature {})", model, temperature).yellow()
            );
        }
        command if command.starts_with('/') => {
            println!("{}", "Unknown command".red());
        }
        message => {
            let response = engine.respond(message).await?;
            println!("🤖 {}", response.answer.cyan());

            if !response.passages.is_empty() {
                println!("{}", "Sources:".dimmed());
                for passage in &response.passages {
                    println!("{}", format!("  {}. {}", passage.rank, passage.source).dimmed());
                }
            }
            println!(
                "{}",
                format!("[{} tokens]", response.usage.total_tokens).dimmed()
            );
        }
    }

    Ok(())
}
