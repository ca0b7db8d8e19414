//! Printing responses and notifications

use colored::*;
use tsquery_protocol::{Group, Message, Notification};

pub fn print_message(message: &Message, json: bool) {
    if json {
        match serde_json::to_string_pretty(message) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
        return;
    }

    let groups: Vec<&Group> = message.groups().collect();
    let many = groups.len() > 1;
    for (i, group) in groups.iter().enumerate() {
        if many {
            println!("{}", format!("{})", i + 1).dimmed());
        }
        print_group(group, if many { "   " } else { "" });
    }

    let status = format!(
        "error id={} msg={}",
        message.error().get("id").unwrap_or("?"),
        message.message().unwrap_or_default()
    );
    if message.is_ok() {
        println!("{}", status.green());
    } else {
        println!("{}", status.red());
        if let Some(extra) = message.extra_message() {
            println!("{}", extra.red());
        }
    }
}

pub fn print_notification(notification: &Notification, json: bool) {
    if json {
        match serde_json::to_string(notification) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
        return;
    }

    let pairs: Vec<String> = notification
        .group()
        .iter()
        .map(|p| match p.value() {
            Some(value) => format!("{}={}", p.key(), value),
            None => p.key().to_string(),
        })
        .collect();
    println!(
        "{} {}",
        format!("[notify {}]", notification.event()).blue(),
        pairs.join(" ")
    );
}

fn print_group(group: &Group, indent: &str) {
    let width = group.iter().map(|p| p.key().len()).max().unwrap_or(0);
    for pair in group.iter() {
        let key = format!("{:width$}", pair.key(), width = width);
        println!("{}{}  {}", indent, key.yellow(), pair.value().unwrap_or(""));
    }
}
