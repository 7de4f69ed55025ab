//! Plain-text rendering of the friends views.

use std::io::{self, Write};

use chaladshare_core::friends::{TabCoordinator, View};
use chaladshare_core::messages::{Locale, Message};
use chaladshare_core::utils::{format_date, pluralize, truncate_string};

use crate::app::App;

/// Display names longer than this are cut with an ellipsis
const NAME_WIDTH: usize = 32;

pub fn render(app: &App) {
    let text = render_view(&app.coordinator, app.config.locale);
    println!("\n{}", text);
}

pub fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub fn print_help() {
    println!(
        "Commands:
  tab friends|requests|add   switch view (or 1, 2, 3)
  search <text>              search friends; 'search' alone clears
  next | prev | page <n>     page through friends
  unfriend <n>               remove friend number n
  accept <n> | decline <n>   answer request number n
  refresh                    reload the current view
  logout | quit"
    );
}

/// The tab bar followed by the active view
pub fn render_view(coordinator: &TabCoordinator, locale: Locale) -> String {
    let mut out = tab_bar(coordinator);
    out.push('\n');
    match coordinator.view() {
        View::Connections => render_connections(coordinator, locale, &mut out),
        View::Requests => render_requests(coordinator, locale, &mut out),
        View::Add => {
            out.push_str("  ");
            out.push_str(Message::AddFriendsPlaceholder.text(locale));
            out.push('\n');
        }
    }
    out
}

fn tab_bar(coordinator: &TabCoordinator) -> String {
    View::all()
        .iter()
        .map(|view| {
            let label = match view {
                View::Requests => format!("{} ({})", view.label(), coordinator.request_badge()),
                _ => view.label().to_string(),
            };
            if *view == coordinator.view() {
                format!("[{}]", label)
            } else {
                format!(" {} ", label)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn render_connections(coordinator: &TabCoordinator, locale: Locale, out: &mut String) {
    let page = coordinator.page();
    if !page.query.is_empty() {
        out.push_str(&format!("  Search: \"{}\"\n", page.query));
    }

    let entries = coordinator.connections().entries();
    if entries.is_empty() {
        let message = if coordinator.is_loading() {
            Message::Loading
        } else {
            Message::NoMatchingFriends
        };
        out.push_str(&format!("  {}\n", message.text(locale)));
        return;
    }

    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!("  {:>3}. {}\n", i + 1, truncate_string(&entry.name(), NAME_WIDTH)));
    }

    let mut footer = format!(
        "  Page {} / {}  ·  {}",
        page.page_number,
        page.total_pages(),
        pluralize(page.total_count, "friend", "friends")
    );
    let nav: Vec<&str> = [(page.has_prev(), "prev"), (page.has_next(), "next")]
        .iter()
        .filter(|(shown, _)| *shown)
        .map(|(_, word)| *word)
        .collect();
    if !nav.is_empty() {
        footer.push_str(&format!("  ·  {}", nav.join(" | ")));
    }
    if let Some(last) = coordinator.connections().last_refreshed() {
        footer.push_str(&format!("  ·  updated {}", last.age_display()));
    }
    if coordinator.is_loading() {
        footer.push_str(&format!("  ·  {}", Message::Loading.text(locale)));
    }
    out.push_str(&footer);
    out.push('\n');
}

fn render_requests(coordinator: &TabCoordinator, locale: Locale, out: &mut String) {
    let requests = coordinator.requests().entries();
    if requests.is_empty() {
        let message = if coordinator.is_loading() {
            Message::LoadingRequests
        } else {
            Message::NoRequests
        };
        out.push_str(&format!("  {}\n", message.text(locale)));
        return;
    }

    for (i, request) in requests.iter().enumerate() {
        out.push_str(&format!(
            "  {:>3}. {:<width$}  {}\n",
            i + 1,
            truncate_string(&request.name(), NAME_WIDTH),
            format_date(request.sent_at()),
            width = NAME_WIDTH
        ));
    }
}
