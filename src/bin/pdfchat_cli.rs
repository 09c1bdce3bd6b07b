//! Terminal client for pdfchat.
//!
//! `upload` and `ask` run a single request. `chat` keeps a session of answered questions as
//! tabs, with the same strip and overflow menu behaviour as the web UI.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfchat::client::{ChatCommand, ClientError, QueryTab, RagClient, TabSession, command::HELP};
use pdfchat::logging;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "pdfchat-cli", version, about = "Upload PDFs and ask questions about them")]
struct Cli {
    /// Base URL of the pdfchat service.
    #[arg(long, env = "PDFCHAT_URL", default_value = "http://localhost:3002")]
    url: String,
    /// Collection to upload into and query (defaults to the server's collection).
    #[arg(long, global = true)]
    collection: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, default_value_t = 300)]
    timeout: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a PDF.
    Upload {
        /// PDF to upload.
        path: PathBuf,
    },
    /// Ask one question and print the answer.
    Ask {
        /// Question text.
        question: Vec<String>,
    },
    /// Interactive session with tabs.
    Chat {
        /// Width of the tab strip.
        #[arg(long, default_value_t = 1000)]
        width: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_client_tracing();
    let cli = Cli::parse();

    let client = RagClient::new(&cli.url, Duration::from_secs(cli.timeout))
        .context("failed to build HTTP client")?;
    let collection = cli.collection.as_deref();

    match cli.command {
        Command::Upload { path } => {
            let receipt = client.upload_pdf(&path, collection).await?;
            println!(
                "{} ({} chunks in '{}')",
                receipt.message, receipt.chunks_indexed, receipt.collection
            );
        }
        Command::Ask { question } => {
            let answer = client.query(&question.join(" "), collection).await?;
            println!("{}", answer.answer);
            for source in &answer.sources {
                println!("  source: {}", serde_json::Value::Object(source.clone()));
            }
        }
        Command::Chat { width } => chat(&client, collection, width).await?,
    }
    Ok(())
}

async fn chat(client: &RagClient, collection: Option<&str>, width: u32) -> Result<()> {
    let mut session = TabSession::new(width);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Connected. Type /help for commands.");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        let command = match ChatCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            ChatCommand::Empty => {}
            ChatCommand::Ask(question) => {
                let response = client.query(&question, collection).await;
                match session.record_response(&question, response) {
                    Ok(_) => {
                        if let Some(tab) = session.active() {
                            print_tab(tab);
                        }
                    }
                    Err(error) => report(&error),
                }
            }
            ChatCommand::Upload(path) => match client.upload_pdf(&path, collection).await {
                Ok(receipt) => println!("{} ({} chunks)", receipt.message, receipt.chunks_indexed),
                Err(error) => report(&error),
            },
            ChatCommand::Tabs => {
                print_strip(&session);
                if let Some(tab) = session.active() {
                    print_tab(tab);
                }
            }
            ChatCommand::Open(id) => {
                if session.select(id) {
                    if let Some(tab) = session.active() {
                        print_tab(tab);
                    }
                } else {
                    eprintln!("no tab {id}");
                }
            }
            ChatCommand::Close(id) => {
                let Some(target) = id.or_else(|| session.active().map(|tab| tab.id)) else {
                    eprintln!("no tab is open");
                    continue;
                };
                if session.close_tab(target) {
                    print_strip(&session);
                } else {
                    eprintln!("no tab {target}");
                }
            }
            ChatCommand::Overflow => print_overflow(&session),
            ChatCommand::Find(text) => {
                session.set_overflow_search(&text);
                print_overflow(&session);
            }
            ChatCommand::NextPage => {
                session.next_overflow_page();
                print_overflow(&session);
            }
            ChatCommand::PrevPage => {
                session.prev_overflow_page();
                print_overflow(&session);
            }
            ChatCommand::Width(width) => {
                session.resize(width);
                print_strip(&session);
            }
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Quit => break,
        }
    }
    Ok(())
}

fn report(error: &ClientError) {
    tracing::debug!(error = ?error, "Request failed");
    eprintln!("error: {error}");
}

fn print_tab(tab: &QueryTab) {
    println!("[{}] {} ({})", tab.id, tab.query, tab.timestamp);
    println!("{}", tab.answer);
    if !tab.sources.is_empty() {
        println!("({} sources)", tab.sources.len());
    }
}

fn print_strip(session: &TabSession) {
    let layout = session.layout();
    let active = session.active().map(|tab| tab.id);
    let labels: Vec<String> = layout
        .visible
        .iter()
        .map(|tab| {
            let marker = if Some(tab.id) == active { "*" } else { "" };
            format!("{marker}{} {}", tab.id, truncate(&tab.query, 20))
        })
        .collect();
    println!("| {} |", labels.join(" | "));
    if !layout.overflow.is_empty() {
        println!("  +{} more (/more)", layout.overflow.len());
    }
}

fn print_overflow(session: &TabSession) {
    let menu = session.overflow_menu();
    if menu.matches == 0 {
        println!("overflow menu is empty");
        return;
    }
    for tab in &menu.entries {
        println!("  {} {} ({})", tab.id, tab.query, tab.timestamp);
    }
    println!(
        "page {}/{} ({} matching '{}')",
        menu.page + 1,
        menu.total_pages,
        menu.matches,
        session.overflow_search()
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
