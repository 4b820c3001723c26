//! ollama-cli: 本地推理服务器的命令行工具
//!
//! Usage:
//!   ollama-cli list                                List local models
//!   ollama-cli chat <user> <chat> <text>           Send a stored chat turn
//!   ollama-cli history <user> [chat]               Show stored chats
//!   ollama-cli help                                Show all commands

use anyhow::{bail, Context};
use ollama_lib_rust::store::DeleteScope;
use ollama_lib_rust::types::GenerateRequest;
use ollama_lib_rust::{CallOptions, ClientConfig, DeleteOutcome, OllamaClient};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "version" | "--version" | "-V" => cmd_version().await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => run(cmd, &args[2..]).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"ollama-cli: 本地推理服务器命令行工具

USAGE:
    ollama-cli <COMMAND> [ARGS]

COMMANDS:
    list                            List local models
    ps                              List models loaded in memory
    show <model>                    Show model details
    generate <model> <prompt>       One completion
    chat <user> <chat> <text>       Send a chat turn and store it
    history <user> [chat]           Show stored chats of a user
    delete-chat <user> <chat>       Delete one stored chat
    delete-user <user> --confirm    Delete every chat of a user
    delete-all --confirm            Delete every stored chat
    blob-exists <digest>            Check whether the server has a blob
    version                         Show client and server versions
    help                            Show this help message

ENVIRONMENT:
    OLLAMA_HOST, OLLAMA_PORT        Server address (default 127.0.0.1:11434)
    OLLAMA_MODEL                    Default model
    OLLAMA_CHAT_STORE               Conversation store file
    RUST_LOG                        Log filter (default info)"#
    );
}

fn client() -> anyhow::Result<OllamaClient> {
    OllamaClient::builder()
        .config(ClientConfig::from_env())
        .build()
        .context("cannot create client")
}

fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> anyhow::Result<&'a str> {
    match args.get(idx) {
        Some(v) => Ok(v.as_str()),
        None => bail!("missing <{name}>; see `ollama-cli help`"),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn print_value(v: &Value) -> anyhow::Result<()> {
    match v {
        Value::String(s) => println!("{s}"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn print_outcome(outcome: DeleteOutcome) {
    match outcome {
        DeleteOutcome::Deleted => println!("deleted"),
        DeleteOutcome::AlreadyAbsent => println!("nothing to delete"),
    }
}

async fn cmd_version() -> anyhow::Result<()> {
    println!("ollama-cli {}", env!("CARGO_PKG_VERSION"));
    match client()?.version(CallOptions::new().retries(0)).await {
        Ok(v) => println!("server {}", v.as_str().unwrap_or("unknown")),
        Err(e) => println!("server unreachable: {e}"),
    }
    Ok(())
}

async fn run(cmd: &str, args: &[String]) -> anyhow::Result<()> {
    let client = client()?;
    let store = client.store();

    match cmd {
        "list" => {
            let models = client.list_models(CallOptions::default()).await?;
            for m in models.as_array().map(Vec::as_slice).unwrap_or_default() {
                println!("{}", m.get("name").and_then(Value::as_str).unwrap_or("?"));
            }
        }
        "ps" => print_value(&client.running_models(CallOptions::default()).await?)?,
        "show" => {
            let model = arg(args, 0, "model")?;
            print_value(&client.show_model(model, CallOptions::default()).await?)?;
        }
        "generate" => {
            let model = arg(args, 0, "model")?;
            let prompt = args.get(1..).map(|p| p.join(" ")).unwrap_or_default();
            if prompt.is_empty() {
                bail!("missing <prompt>");
            }
            let reply = client
                .generate(GenerateRequest::new(model, prompt), CallOptions::default())
                .await?;
            print_value(&reply)?;
        }
        "chat" => {
            let user = arg(args, 0, "user")?;
            let chat = arg(args, 1, "chat")?;
            let text = args.get(2..).map(|p| p.join(" ")).unwrap_or_default();
            if text.is_empty() {
                bail!("missing <text>");
            }
            let reply = client.chat().conversation(user, chat).message(text).send().await?;
            print_value(&reply)?;
        }
        "history" => {
            let user = arg(args, 0, "user")?;
            match args.get(1) {
                Some(chat_id) => match store.get_chat(user, chat_id).await? {
                    Some(chat) => {
                        for m in &chat.messages {
                            println!("[{}] {:?}: {}", m.timestamp.to_rfc3339(), m.role, m.content);
                        }
                    }
                    None => println!("no chat '{chat_id}' for user '{user}'"),
                },
                None => {
                    for (id, chat) in store.list_chats(user).await? {
                        println!("{id}\t{}\t{} messages", chat.model, chat.messages.len());
                    }
                }
            }
        }
        "delete-chat" => {
            let user = arg(args, 0, "user")?;
            let chat = arg(args, 1, "chat")?;
            print_outcome(store.delete(DeleteScope::chat(user, chat), false).await?);
        }
        "delete-user" => {
            let user = arg(args, 0, "user")?;
            let confirm = has_flag(args, "--confirm");
            print_outcome(store.delete(DeleteScope::user(user), confirm).await?);
        }
        "delete-all" => {
            let confirm = has_flag(args, "--confirm");
            print_outcome(store.delete(DeleteScope::All, confirm).await?);
        }
        "blob-exists" => {
            let digest = arg(args, 0, "digest")?;
            let present = client.check_blob(digest, CallOptions::default()).await?;
            println!("{}", if present { "present" } else { "absent" });
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
    Ok(())
}
