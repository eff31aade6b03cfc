//! Command-line client for the voice reminder daemon
//!
//! Usage: remind <command> [args]

use anyhow::{anyhow, Result};
use chrono::{Local, Utc};
use dotenvy::dotenv;
use std::time::Duration;

use voice_reminder::core::time_format::{describe_until, format_epoch_millis, resolve_fire_time};
use voice_reminder::core::Config;
use voice_reminder::features::reminders::{Reminder, StoreStats};
use voice_reminder::ipc::{connect_with_retry, CommandReply, DaemonEvent, IpcClient};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

const USAGE: &str = "\
Usage: remind <command> [args]

Commands:
  add <when> <message...>   Create a reminder. <when> is a duration (30m, 1h30m, 2d),
                            a clock time (HH:MM) or an RFC 3339 timestamp
  list [--all]              Show pending reminders (--all includes completed)
  show <id>                 Show one reminder
  cancel <id>               Cancel and delete a reminder
  reconcile                 Re-register timers from the store
  purge                     Delete completed reminders
  clear                     Cancel and delete every reminder
  stats                     Show store counts
  status                    Show daemon status
  export                    Print all reminders as JSON
  import <file>             Import reminders from an export file
  say <message...>          Speak a message once through the daemon's voice
  watch                     Print reminders as they fire";

#[tokio::main]
async fn main() {
    dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&log_level)).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };
    if command == "help" || command == "--help" || command == "-h" {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::from_env()?;
    let mut client = connect_with_retry(&config.socket_path, 3, Duration::from_millis(500))
        .await
        .map_err(|e| anyhow!("{e}. Is reminderd running?"))?;

    match command.as_str() {
        "add" => {
            if args.len() < 3 {
                return Err(anyhow!("Usage: remind add <when> <message...>"));
            }
            let fire_at = resolve_fire_time(&args[1], &Local::now()).ok_or_else(|| {
                anyhow!("Could not understand time '{}'. Try 30m, 1h30m, 14:30 or an RFC 3339 timestamp", args[1])
            })?;
            let message = args[2..].join(" ");
            let id = client
                .create_reminder(message, fire_at.timestamp_millis())
                .await?;
            let reply = await_reply(&mut client, &id).await?;
            println!("{}", reply_text(&reply));
        }
        "list" => {
            let include_completed = args.iter().any(|a| a == "--all");
            let id = client.list_reminders(include_completed).await?;
            let reply = await_reply(&mut client, &id).await?;
            let reminders: Vec<Reminder> = parse_data(&reply)?;
            if reminders.is_empty() {
                println!("No reminders");
            }
            let now = Utc::now().timestamp_millis();
            for reminder in &reminders {
                println!("{}", format_row(reminder, now));
            }
        }
        "show" => {
            let id = client.get_reminder(parse_id(args.get(1))?).await?;
            let reply = await_reply(&mut client, &id).await?;
            let reminder: Reminder = parse_data(&reply)?;
            println!("{}", format_row(&reminder, Utc::now().timestamp_millis()));
            println!("  alarm id: {}", reminder.alarm_id);
            println!("  created:  {}", format_epoch_millis(reminder.created_at));
        }
        "cancel" => {
            let id = client.cancel_reminder(parse_id(args.get(1))?).await?;
            let reply = await_reply(&mut client, &id).await?;
            println!("{}", reply_text(&reply));
        }
        "reconcile" => {
            let id = client.reconcile().await?;
            let reply = await_reply(&mut client, &id).await?;
            println!("{}", reply_text(&reply));
        }
        "purge" => {
            let id = client.purge_completed().await?;
            let reply = await_reply(&mut client, &id).await?;
            println!("{}", reply_text(&reply));
        }
        "clear" => {
            let id = client.clear_all().await?;
            let reply = await_reply(&mut client, &id).await?;
            println!("{}", reply_text(&reply));
        }
        "stats" => {
            let id = client.get_stats().await?;
            let reply = await_reply(&mut client, &id).await?;
            let stats: StoreStats = parse_data(&reply)?;
            println!("Total:     {}", stats.total);
            println!("Scheduled: {}", stats.scheduled);
            println!("Completed: {}", stats.completed);
            if let Some(next) = stats.next_fire_at {
                println!(
                    "Next:      {} ({})",
                    format_epoch_millis(next),
                    describe_until(next, Utc::now().timestamp_millis())
                );
            }
        }
        "status" => {
            client.request_status().await?;
            print_status(&mut client).await?;
        }
        "export" => {
            let id = client.export_reminders().await?;
            let reply = await_reply(&mut client, &id).await?;
            let json: String = parse_data(&reply)?;
            println!("{json}");
        }
        "import" => {
            let path = args
                .get(1)
                .ok_or_else(|| anyhow!("Usage: remind import <file>"))?;
            let data = std::fs::read_to_string(path)
                .map_err(|e| anyhow!("Failed to read {path}: {e}"))?;
            let id = client.import_reminders(data).await?;
            let reply = await_reply(&mut client, &id).await?;
            println!("{}", reply_text(&reply));
        }
        "say" => {
            if args.len() < 2 {
                return Err(anyhow!("Usage: remind say <message...>"));
            }
            let id = client.preview_speech(args[1..].join(" ")).await?;
            // The daemon answers once speaking has finished
            let reply = client
                .wait_for_response(&id, config.speech.timeout + RESPONSE_TIMEOUT)
                .await?;
            let text = reply_text(&reply);
            if !reply.success {
                return Err(anyhow!("{text}"));
            }
            println!("{text}");
        }
        "watch" => {
            println!("Watching for reminders (Ctrl-C to stop)");
            while let Some(event) = client.recv().await {
                if let DaemonEvent::ReminderFired { title, message, .. } = event {
                    println!("🔔 {title}: {message}");
                }
            }
            return Err(anyhow!("Connection to daemon closed"));
        }
        other => {
            return Err(anyhow!("Unknown command '{other}'\n\n{USAGE}"));
        }
    }

    Ok(())
}

async fn await_reply(client: &mut IpcClient, request_id: &str) -> Result<CommandReply> {
    let reply = client.wait_for_response(request_id, RESPONSE_TIMEOUT).await?;
    if reply.success {
        Ok(reply)
    } else {
        Err(anyhow!(
            "{}",
            reply.message.unwrap_or_else(|| "Command failed".to_string())
        ))
    }
}

async fn print_status(client: &mut IpcClient) -> Result<()> {
    let reply = tokio::time::timeout(RESPONSE_TIMEOUT, async {
        while let Some(event) = client.recv().await {
            if let DaemonEvent::StatusUpdate {
                uptime_seconds,
                pending_reminders,
                registered_timers,
                connected_clients,
            } = event
            {
                return Some((uptime_seconds, pending_reminders, registered_timers, connected_clients));
            }
        }
        None
    })
    .await
    .map_err(|_| anyhow!("No status from daemon"))?;

    let (uptime, pending, timers, clients) =
        reply.ok_or_else(|| anyhow!("Connection to daemon closed"))?;
    println!("Uptime:   {}s", uptime);
    println!("Pending:  {}", pending);
    println!("Timers:   {}", timers);
    println!("Clients:  {}", clients);
    Ok(())
}

fn reply_text(reply: &CommandReply) -> String {
    reply.message.clone().unwrap_or_else(|| "Done".to_string())
}

fn parse_data<T: serde::de::DeserializeOwned>(reply: &CommandReply) -> Result<T> {
    let data = reply
        .data
        .clone()
        .ok_or_else(|| anyhow!("Daemon response carried no data"))?;
    Ok(serde_json::from_value(data)?)
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow!("Missing reminder id"))?;
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| anyhow!("Invalid reminder id: {raw}"))
}

fn format_row(reminder: &Reminder, now_millis: i64) -> String {
    let when = if reminder.is_scheduled {
        format!(
            "{} ({})",
            format_epoch_millis(reminder.fire_at_epoch_millis),
            describe_until(reminder.fire_at_epoch_millis, now_millis)
        )
    } else {
        format_epoch_millis(reminder.fire_at_epoch_millis)
    };
    format!(
        "#{:<5} {:<10} {}  {}",
        reminder.id,
        reminder.status().to_string(),
        when,
        reminder.message
    )
}
