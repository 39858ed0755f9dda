/// MarketLink chat client - interactive terminal entry point
use marketlink_core::{ChatConfig, ChatSession};
use marketlink_core::viewport::ScrollAction;
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let config = ChatConfig::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    info!("Starting MarketLink chat client");
    info!("   API: {}", config.api_base_url);
    info!("   Channel: {}", config.ws_base_url);

    let mut session = ChatSession::new(config);
    session.start();

    print_usage();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(input) => {
                        if !handle_input(&mut session, input.trim()) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            event = session.next_event() => {
                if let Some(event) = event {
                    session.handle_event(event);
                    render_update(&mut session);
                }
            }
        }
    }

    session.dispose();
    info!("Chat client stopped");
    Ok(())
}

fn print_usage() {
    println!("Commands:");
    println!("  /list         show conversations");
    println!("  /open <n>     open the n-th conversation");
    println!("  /older        load older messages");
    println!("  /reload       reload the current conversation");
    println!("  /quit         exit");
    println!("  anything else is sent as a message");
}

/// Returns false when the client should exit
fn handle_input(session: &mut ChatSession, input: &str) -> bool {
    match input.split_whitespace().next() {
        Some("/quit") => return false,
        Some("/list") => {
            if session.roster().is_empty() {
                println!("No conversations");
            }
            for (i, conv) in session.roster().iter().enumerate() {
                let badge = if conv.unread_count > 0 {
                    format!(" ({} unread)", conv.unread_count)
                } else {
                    String::new()
                };
                println!(
                    "  [{}] {} with {}{} - {}",
                    i + 1,
                    conv.listing_title,
                    conv.other_user_name,
                    badge,
                    conv.last_message
                );
            }
        }
        Some("/open") => {
            let index = input
                .split_whitespace()
                .nth(1)
                .and_then(|s| s.parse::<usize>().ok())
                .and_then(|i| i.checked_sub(1));
            match index.and_then(|i| session.roster().get(i).cloned()) {
                Some(conv) => session.select_conversation(&conv),
                None => println!("Usage: /open <n> (see /list)"),
            }
        }
        Some("/older") => {
            if session.has_more_messages() {
                session.load_older_messages();
            } else {
                println!("No older messages");
            }
        }
        Some("/reload") => session.reload(),
        Some(_) if !input.is_empty() => {
            session.set_composer(input);
            session.send_message();
        }
        _ => {}
    }
    true
}

fn render_update(session: &mut ChatSession) {
    if let Some(error) = session.error() {
        eprintln!("! {}", error);
    }

    match session.take_scroll_action() {
        ScrollAction::JumpToBottom => {
            // Fresh conversation: show the loaded tail
            let title = session
                .selected_conversation()
                .map(|c| format!("{} with {}", c.listing_title, c.other_user_name))
                .unwrap_or_else(|| "conversation".to_string());
            println!("--- {} ---", title);
            for msg in session.messages() {
                print_message(msg);
            }
            if session.has_more_messages() {
                println!("    (/older to load earlier messages)");
            }
        }
        ScrollAction::SmoothToBottom => {
            if let Some(msg) = session.messages().last() {
                print_message(msg);
            }
        }
        ScrollAction::RestoreOffset(_) => {
            println!(
                "--- loaded older messages ({} total) ---",
                session.messages().len()
            );
        }
        ScrollAction::None => {}
    }
}

fn print_message(msg: &marketlink_core::ChatMessage) {
    println!(
        "[{}] {}: {}",
        msg.created_at.format("%H:%M"),
        msg.sender_id,
        msg.content
    );
}
