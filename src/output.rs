//! Terminal rendering of items and session status.

use comfy_table::{Cell, Table};

use crate::api::types::Item;
use crate::commands::SessionStatus;

pub fn items_table(items: &[Item]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description"]);
    for item in items {
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(&item.name),
            Cell::new(&item.description),
        ]);
    }
    table
}

pub fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("No items yet.");
        return;
    }
    println!("{}", items_table(items));
}

pub fn print_item(item: &Item) {
    println!("ID:          {}", item.id);
    println!("Name:        {}", item.name);
    println!("Description: {}", item.description);
    if let Some(email) = item.email.as_deref().filter(|e| !e.is_empty()) {
        println!("Owner:       {}", email);
    }
}

pub fn status_line(status: &SessionStatus) -> String {
    if !status.authenticated {
        return "Not logged in".to_string();
    }
    let user = status.username.as_deref().unwrap_or("unknown");
    match status.expires_in {
        Some(secs) if secs <= 0 => {
            format!("Logged in as {} (access token expired, will refresh on next request)", user)
        }
        Some(secs) => format!("Logged in as {} (access token valid for {})", user, human_duration(secs)),
        None => format!("Logged in as {}", user),
    }
}

fn human_duration(secs: i64) -> String {
    if secs >= 3600 {
        format!("{} hours", secs / 3600)
    } else if secs >= 60 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}
