use std::io::Write;

use eyre::{Context, Result};
use qa_chat::cli::{Action, Command, SendArgs};
use qa_chat::client::{ArcTransport, HttpTransport};
use qa_chat::config::{Configuration, init_logger, verbose};
use qa_chat::models::{ConversationId, Page, Role, SendOptions};
use qa_chat::store::{ConversationStore, SendOutcome, StoreState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::{signal, task};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Command::new();
    if cmd.version() {
        cmd.print_version();
        return Ok(());
    }

    better_panic::Settings::auto().install();

    let config = cmd.get_config()?;
    Configuration::init(config.clone())?;
    init_logger(&config.log)?;
    verbose!("[+] Logger initialized");

    let Some(action) = cmd.action() else {
        eyre::bail!("No command given, see --help");
    };

    let transport: ArcTransport = HttpTransport::from(&config.api).into();
    verbose!("[+] Using endpoint {}", config.api.endpoint);
    let store = ConversationStore::with_paging(transport, config.paging.clone());

    match action {
        Action::List { skip, limit } => {
            let limit = limit.unwrap_or(config.paging.conversations_limit);
            store
                .list_conversations_page(Page { skip: *skip, limit })
                .await;
            let state = store.snapshot();
            check_error(state.error())?;
            print_conversations(&state);
        }
        Action::Create { title } => {
            let Some(convo) = store.create_conversation(title.as_str()).await else {
                return check_error(store.snapshot().error());
            };
            println!("{}\t{}", convo.id(), convo.title());
        }
        Action::Delete { id } => {
            if !store.delete_conversation(*id).await {
                return check_error(store.snapshot().error());
            }
            println!("Deleted conversation {}", id);
        }
        Action::History { id } => {
            store.select_conversation(Some(*id)).await;
            let state = store.snapshot();
            check_error(state.messages_error())?;
            print_messages(&state);
        }
        Action::Send {
            id,
            content,
            options,
        } => {
            let options = options.to_options().await?;
            store.select_conversation(Some(*id)).await;
            check_error(store.snapshot().messages_error())?;
            send(&store, *id, content, options).await?;
        }
        Action::Chat { id, options } => chat(&store, *id, options).await?,
    }

    Ok(())
}

async fn chat(store: &ConversationStore, id: ConversationId, args: &SendArgs) -> Result<()> {
    store.select_conversation(Some(id)).await;
    let state = store.snapshot();
    check_error(state.messages_error())?;
    print_messages(&state);

    let options = args.to_options().await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().wrap_err("flushing stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.wrap_err("reading input")?,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            return Ok(());
        };

        let content = line.trim();
        if content.is_empty() {
            continue;
        }
        if content == "/quit" {
            return Ok(());
        }

        if let Err(err) = send(store, id, content, options.clone()).await {
            eprintln!("Error: {}", err);
        }
    }
}

/// Send `content` and print the reply as it streams in. Ctrl-C stops the
/// reply without leaving the program.
async fn send(
    store: &ConversationStore,
    id: ConversationId,
    content: &str,
    options: SendOptions,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let done = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        task::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let printer = {
        let mut rx = store.subscribe();
        let done = done.clone();
        task::spawn(async move {
            let mut printed = String::new();
            loop {
                tokio::select! {
                    biased;
                    _ = done.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let state = rx.borrow_and_update();
                let buffer = state.streaming();
                if buffer.belongs_to(id) && buffer.content().len() > printed.len() {
                    if let Some(delta) = buffer.content().get(printed.len()..) {
                        print!("{}", delta);
                        let _ = std::io::stdout().flush();
                        printed.push_str(delta);
                    }
                }
            }
            printed
        })
    };

    let outcome = store.send_message(id, content, options, &cancel).await;
    done.cancel();
    interrupt.abort();
    let printed = printer.await.wrap_err("waiting for output")?;

    let state = store.snapshot();
    match outcome {
        SendOutcome::Completed => {
            // Updates can coalesce, print whatever the live view missed
            let reply = state
                .messages()
                .iter()
                .rev()
                .find(|m| m.role() == Role::Assistant)
                .map(|m| m.content())
                .unwrap_or_default();
            if let Some(rest) = reply.strip_prefix(printed.as_str()) {
                print!("{}", rest);
            }
            println!();
            Ok(())
        }
        SendOutcome::Cancelled => {
            println!("\n[cancelled]");
            Ok(())
        }
        SendOutcome::Rejected => eyre::bail!("conversation {} is busy", id),
        SendOutcome::Failed | SendOutcome::RolledBack => {
            if !printed.is_empty() {
                println!();
            }
            check_error(state.messages_error())?;
            eyre::bail!("sending message failed")
        }
    }
}

fn check_error(error: Option<&str>) -> Result<()> {
    match error {
        Some(err) => eyre::bail!("{}", err),
        None => Ok(()),
    }
}

fn print_conversations(state: &StoreState) {
    for convo in state.conversations() {
        println!(
            "{}\t{}\t{}",
            convo.id(),
            convo.updated_at().format("%Y-%m-%d %H:%M"),
            convo.title()
        );
    }
    println!(
        "({} of {} conversations)",
        state.conversations().len(),
        state.total()
    );
}

fn print_messages(state: &StoreState) {
    for message in state.messages() {
        println!("[{}] {}: {}", message.id(), message.role(), message.content());
    }
}
