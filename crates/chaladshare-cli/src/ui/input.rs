//! Command input handling.
//!
//! Each line typed at the prompt is parsed into a `Command` and applied to
//! the friends controller. List positions are the 1-based numbers shown by
//! the renderer.

use tracing::warn;

use chaladshare_core::friends::View;
use chaladshare_core::messages::Message;

use crate::app::{App, AppState};
use crate::ui::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tab(View),
    Search(String),
    Page(u32),
    NextPage,
    PrevPage,
    Unfriend(usize),
    Accept(usize),
    Decline(usize),
    Refresh,
    Help,
    Logout,
    Quit,
}

/// Parse one input line. Returns an error message for malformed input.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "tab" | "t" => Command::Tab(parse_view(rest)?),
        "1" | "friends" => Command::Tab(View::Connections),
        "2" | "requests" => Command::Tab(View::Requests),
        "3" | "add" => Command::Tab(View::Add),
        // Clearing the search is just an empty search
        "search" | "s" | "/" => Command::Search(rest.to_string()),
        "page" => Command::Page(parse_number(rest, "page")?),
        "next" | "n" => Command::NextPage,
        "prev" | "p" => Command::PrevPage,
        "unfriend" | "u" => Command::Unfriend(parse_number(rest, "friend")? as usize),
        "accept" | "a" => Command::Accept(parse_number(rest, "request")? as usize),
        "decline" | "d" => Command::Decline(parse_number(rest, "request")? as usize),
        "refresh" | "r" => Command::Refresh,
        "help" | "h" | "?" => Command::Help,
        "logout" => Command::Logout,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{}'. Type 'help' for commands.", other)),
    };
    Ok(Some(command))
}

fn parse_view(arg: &str) -> Result<View, String> {
    match arg.to_lowercase().as_str() {
        "friends" | "1" => Ok(View::Connections),
        "requests" | "2" => Ok(View::Requests),
        "add" | "3" => Ok(View::Add),
        _ => Err("Usage: tab friends|requests|add".to_string()),
    }
}

fn parse_number(arg: &str, what: &str) -> Result<u32, String> {
    match arg.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("Expected a {} number, got '{}'", what, arg)),
    }
}

/// Parse and apply one line of input
pub async fn handle_line(app: &mut App, line: &str) {
    match parse_command(line) {
        Ok(Some(command)) => apply_command(app, command).await,
        Ok(None) => {}
        Err(message) => println!("{}", message),
    }
}

async fn apply_command(app: &mut App, command: Command) {
    let locale = app.config.locale;
    let coordinator = &mut app.coordinator;

    match command {
        Command::Tab(view) => coordinator.set_view(view),
        Command::Search(text) => {
            if coordinator.view() != View::Connections {
                coordinator.set_view(View::Connections);
            }
            coordinator.on_query_change(text);
        }
        Command::Page(n) => {
            if !coordinator.set_page(n) {
                println!("Already on page {}", coordinator.page().page_number);
            }
        }
        Command::NextPage => {
            if !coordinator.next_page() {
                println!("No more pages");
            }
        }
        Command::PrevPage => {
            if !coordinator.prev_page() {
                println!("Already on the first page");
            }
        }
        Command::Unfriend(position) => {
            let target = coordinator
                .connections()
                .entries()
                .get(position - 1)
                .map(|e| (e.subject_id, e.name()));
            match target {
                Some((subject_id, name)) => {
                    if let Err(e) = coordinator.unfriend(subject_id) {
                        println!("{}", e.user_message(Message::UnfriendFailed, locale));
                    } else {
                        println!("Removed {}", name);
                    }
                }
                None => println!("No friend #{} on this page", position),
            }
        }
        Command::Accept(position) | Command::Decline(position) => {
            let accept = matches!(command, Command::Accept(_));
            let request_id = coordinator
                .requests()
                .entries()
                .get(position - 1)
                .map(|r| r.request_id);
            let Some(request_id) = request_id else {
                println!("No request #{}", position);
                return;
            };
            let (result, fallback) = if accept {
                (coordinator.accept(request_id), Message::AcceptFailed)
            } else {
                (coordinator.decline(request_id), Message::DeclineFailed)
            };
            if let Err(e) = result {
                println!("{}", e.user_message(fallback, locale));
            }
        }
        Command::Refresh => coordinator.refresh(),
        Command::Help => render::print_help(),
        Command::Logout => {
            if let Err(e) = app.logout().await {
                warn!(error = %e, "Logout failed");
                println!("Logout failed: {}", e);
            }
            app.state = AppState::Quitting;
        }
        Command::Quit => app.state = AppState::Quitting,
    }
}
