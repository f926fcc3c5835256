#![cfg(not(tarpaulin_include))]

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime};
use log::info;

use crate::error::ClientError;
use crate::form::{WidgetRole, WidgetValue};
use crate::gateway::{RemoteGateway, TemplateRef};
use crate::mode::{JSON_VALIDATE_DEBOUNCE, Mode};
use crate::session::{PageSession, SessionEvent};
use crate::validate;
use crate::validate::JsonStatus;

/// Runs the interactive client loop against a backend.
pub async fn run(base_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = RemoteGateway::new(base_url).with_page_path("/");
    let mut session = PageSession::new();
    let mut status = String::from("ok");

    info!("client started against {}", base_url);
    println!("docx-filler client, type 'help' for commands");

    loop {
        print!("({}) > ", status);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        status = match command {
            "q" => break,
            "help" => {
                print_help();
                String::from("ok")
            }
            "load" => report(load_template(&gateway, &mut session, rest).await),
            "clear" => report(session.apply(SessionEvent::FileCleared)),
            "show" => {
                show_session(&session);
                String::from("ok")
            }
            "set" => report(set_scalar(&mut session, rest)),
            "check" => report(set_toggle(&mut session, rest, true)),
            "uncheck" => report(set_toggle(&mut session, rest, false)),
            "item" => report(set_item_field(&mut session, rest)),
            "text" => report(set_item_text(&mut session, rest)),
            "add" => report(session.apply(SessionEvent::GroupItemAdded {
                group: rest.to_string(),
            })),
            "rm" => report(remove_item(&mut session, rest)),
            "mode" => report(switch_mode(&mut session, rest)),
            "json" => report(edit_json(&mut session, rest).await),
            "example" => report(copy_example(&mut session)),
            "generate" => report(generate(&gateway, &mut session).await),
            "download" => report(download(&gateway, rest).await),
            "templates" => report(list_templates(&gateway).await),
            "usetpl" => report(use_template(&gateway, &mut session, rest).await),
            "savetpl" => report(save_template(&gateway, &session, rest).await),
            "deltpl" => report(delete_template(&gateway, rest).await),
            "history" => report(list_history(&gateway, rest).await),
            "histdata" => report(history_data(&gateway, rest).await),
            "histdl" => report(history_download(&gateway, rest).await),
            "histdel" => report(history_delete(&gateway, rest).await),
            _ => String::from("invalid command"),
        };
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  load <path>: Upload a .docx template and build the form");
    println!("  clear: Drop the loaded template and form");
    println!("  show: Print the form, mode and JSON status");
    println!("  set <variable> <value>: Fill a text field");
    println!("  check/uncheck <variable>: Flip a checkbox");
    println!("  item <group> <index> <field> <value>: Fill a group item field");
    println!("  text <group> <index> <value>: Fill a free-text group item");
    println!("  add <group>: Append a group item");
    println!("  rm <group> <index>: Remove a group item");
    println!("  mode <form|json>: Switch editing mode");
    println!("  json <text>: Replace the raw JSON buffer (validated after 500ms)");
    println!("  example: Copy an example payload into the JSON buffer");
    println!("  generate: Request document generation");
    println!("  download <filename>: Save a generated document");
    println!("  templates / usetpl <id> / savetpl <name> [description] / deltpl <id>");
    println!("  history [limit] / histdata <id> / histdl <id> / histdel <id>");
}

/// Renders a result as a status string, printing any error for the user.
fn report(result: Result<(), ClientError>) -> String {
    match result {
        Ok(()) => String::from("ok"),
        Err(err) => {
            println!("{}", err);
            match err {
                ClientError::Network(_) => String::from("network error"),
                ClientError::Server(_) => String::from("server error"),
                ClientError::Validation(_) => String::from("invalid"),
                ClientError::AuthExpired { .. } => String::from("auth expired"),
            }
        }
    }
}

async fn load_template(
    gateway: &RemoteGateway,
    session: &mut PageSession,
    path: &str,
) -> Result<(), ClientError> {
    if path.is_empty() {
        return Err(ClientError::Validation("Usage: load <path>".to_string()));
    }
    let path = Path::new(path);
    validate::validate_template_path(path)?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("template.docx")
        .to_string();
    let bytes =
        fs::read(path).map_err(|e| ClientError::Validation(format!("Cannot read file: {}", e)))?;

    session.apply(SessionEvent::FileSelected {
        filename: filename.clone(),
        bytes: bytes.clone(),
    })?;

    let parsed = gateway.parse_template(&filename, bytes).await?;
    let count = parsed.variables.as_object().map(|m| m.len()).unwrap_or(0);
    session.apply(SessionEvent::TemplateParsed {
        variables: parsed.variables,
        template_file: parsed.template_file,
    })?;

    println!("Template loaded. Fields found: {}", count);
    Ok(())
}

fn show_session(session: &PageSession) {
    match session.mode() {
        Mode::Form => println!("Mode: form"),
        Mode::Text => println!("Mode: json"),
    }

    match session.form() {
        None => println!("No template loaded"),
        Some(form) => {
            for name in form.variables() {
                if let Some(group) = form.group(name) {
                    println!("{} (array):", name);
                    for &index in &group.items {
                        print!("  [{}]", index);
                        for id in form.item_widget_ids(name, index) {
                            if let Some(widget) = form.widget(&id) {
                                if let WidgetValue::Text(text) = &widget.value {
                                    print!(" {}={:?}", widget.label, text);
                                }
                            }
                        }
                        println!();
                    }
                } else if let Some(widget) = form.widget(&crate::form::scalar_widget_id(name)) {
                    match (&widget.role, &widget.value) {
                        (WidgetRole::Toggle { .. }, WidgetValue::Toggle(on)) => {
                            println!("{}: [{}]", widget.label, if *on { "x" } else { " " })
                        }
                        (_, WidgetValue::Text(text)) => {
                            println!("{}: {:?}", widget.label, text)
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    match session.json_status() {
        JsonStatus::Empty => {}
        JsonStatus::Valid => println!("JSON buffer: valid"),
        JsonStatus::Invalid(msg) => println!("JSON buffer: {}", msg),
    }
}

fn set_scalar(session: &mut PageSession, rest: &str) -> Result<(), ClientError> {
    let (name, value) = split_arg(rest, "Usage: set <variable> <value>")?;
    session.apply(SessionEvent::TextEdited {
        widget_id: crate::form::scalar_widget_id(&name),
        value,
    })
}

fn set_toggle(session: &mut PageSession, rest: &str, on: bool) -> Result<(), ClientError> {
    if rest.is_empty() {
        return Err(ClientError::Validation(
            "Usage: check|uncheck <variable>".to_string(),
        ));
    }
    session.apply(SessionEvent::ToggleEdited {
        widget_id: crate::form::scalar_widget_id(rest),
        on,
    })
}

fn set_item_field(session: &mut PageSession, rest: &str) -> Result<(), ClientError> {
    let parts: Vec<&str> = rest.splitn(4, ' ').collect();
    if parts.len() < 4 {
        return Err(ClientError::Validation(
            "Usage: item <group> <index> <field> <value>".to_string(),
        ));
    }
    let index = parse_index(parts[1])?;
    session.apply(SessionEvent::TextEdited {
        widget_id: crate::form::group_field_id(parts[0], index, parts[2]),
        value: parts[3].to_string(),
    })
}

fn set_item_text(session: &mut PageSession, rest: &str) -> Result<(), ClientError> {
    let parts: Vec<&str> = rest.splitn(3, ' ').collect();
    if parts.len() < 3 {
        return Err(ClientError::Validation(
            "Usage: text <group> <index> <value>".to_string(),
        ));
    }
    let index = parse_index(parts[1])?;
    session.apply(SessionEvent::TextEdited {
        widget_id: crate::form::group_text_id(parts[0], index),
        value: parts[2].to_string(),
    })
}

fn remove_item(session: &mut PageSession, rest: &str) -> Result<(), ClientError> {
    let (group, index) = split_arg(rest, "Usage: rm <group> <index>")?;
    let index = parse_index(&index)?;
    session.apply(SessionEvent::GroupItemRemoved { group, index })
}

fn switch_mode(session: &mut PageSession, rest: &str) -> Result<(), ClientError> {
    let mode = match rest {
        "form" => Mode::Form,
        "json" => Mode::Text,
        _ => {
            return Err(ClientError::Validation(
                "Usage: mode <form|json>".to_string(),
            ));
        }
    };
    session.apply(SessionEvent::ModeSwitched(mode))
}

async fn edit_json(session: &mut PageSession, rest: &str) -> Result<(), ClientError> {
    session.apply(SessionEvent::JsonEdited {
        text: rest.to_string(),
        at: Instant::now(),
    })?;

    // let the debounce window pass, then run the coalesced validation
    tokio::time::sleep(JSON_VALIDATE_DEBOUNCE).await;
    if let Some(status) = session.poll_validation(Instant::now()) {
        match status {
            JsonStatus::Valid => println!("JSON is valid"),
            JsonStatus::Invalid(msg) => println!("{}", msg),
            JsonStatus::Empty => {}
        }
    }
    Ok(())
}

fn copy_example(session: &mut PageSession) -> Result<(), ClientError> {
    session.apply(SessionEvent::ExampleCopied)?;
    println!("{}", session.json_text());
    println!("Example copied, now in json mode");
    Ok(())
}

async fn generate(gateway: &RemoteGateway, session: &mut PageSession) -> Result<(), ClientError> {
    if !session.has_template() {
        return Err(ClientError::Validation(
            "Please upload a DOCX template".to_string(),
        ));
    }
    let data = session.collect_payload()?;

    // session file from parse-template wins over re-uploading
    let template = match session.template_file() {
        Some(file) => TemplateRef::Session(file.to_string()),
        None => {
            let local = session.uploaded_file().ok_or_else(|| {
                ClientError::Validation("Please upload a DOCX template".to_string())
            })?;
            TemplateRef::Upload {
                filename: local.filename.clone(),
                bytes: local.bytes.clone(),
            }
        }
    };

    session.apply(SessionEvent::GenerateStarted)?;
    let result = gateway.generate(template, &data).await;
    session.apply(SessionEvent::GenerateFinished)?;

    let filename = result?;
    println!(
        "Document generated: {} (fetch it with 'download {}')",
        filename, filename
    );
    Ok(())
}

async fn download(gateway: &RemoteGateway, filename: &str) -> Result<(), ClientError> {
    if filename.is_empty() {
        return Err(ClientError::Validation(
            "Usage: download <filename>".to_string(),
        ));
    }
    let bytes = gateway.download(filename).await?;
    fs::write(filename, &bytes)
        .map_err(|e| ClientError::Validation(format!("Cannot write file: {}", e)))?;
    println!("Saved {} ({} bytes)", filename, bytes.len());
    Ok(())
}

async fn list_templates(gateway: &RemoteGateway) -> Result<(), ClientError> {
    let templates = gateway.list_templates().await?;
    if templates.is_empty() {
        println!("No saved templates");
    }
    for t in templates {
        println!(
            "  #{} {} - {} ({})",
            t.id,
            t.name,
            t.description.unwrap_or_default(),
            format_timestamp(&t.created_at)
        );
    }
    Ok(())
}

async fn use_template(
    gateway: &RemoteGateway,
    session: &mut PageSession,
    rest: &str,
) -> Result<(), ClientError> {
    let id = parse_id(rest, "Usage: usetpl <id>")?;
    let detail = gateway.get_template(id).await?;
    session.apply(SessionEvent::TemplateParsed {
        variables: detail.variables,
        template_file: detail.template_file,
    })?;
    println!("Template '{}' loaded from the library", detail.name);
    Ok(())
}

async fn save_template(
    gateway: &RemoteGateway,
    session: &PageSession,
    rest: &str,
) -> Result<(), ClientError> {
    let template_file = session
        .template_file()
        .ok_or_else(|| ClientError::Validation("Please upload a DOCX template first".to_string()))?;
    if rest.is_empty() {
        return Err(ClientError::Validation(
            "Usage: savetpl <name> [description]".to_string(),
        ));
    }
    let mut parts = rest.splitn(2, ' ');
    let name = parts.next().unwrap_or("");
    let description = parts.next().unwrap_or("");

    gateway
        .save_template(template_file, name, description)
        .await?;
    println!("Template '{}' saved", name);
    Ok(())
}

async fn delete_template(gateway: &RemoteGateway, rest: &str) -> Result<(), ClientError> {
    let id = parse_id(rest, "Usage: deltpl <id>")?;
    gateway.delete_template(id).await?;
    println!("Template #{} deleted", id);
    Ok(())
}

async fn list_history(gateway: &RemoteGateway, rest: &str) -> Result<(), ClientError> {
    let limit = if rest.is_empty() {
        20
    } else {
        rest.parse::<u32>()
            .map_err(|_| ClientError::Validation("Usage: history [limit]".to_string()))?
    };
    let entries = gateway.list_history(limit).await?;
    if entries.is_empty() {
        println!("No generated documents yet");
    }
    for e in entries {
        println!(
            "  #{} {} from '{}' ({}, {} bytes)",
            e.id,
            e.output_filename,
            e.template_name.unwrap_or_default(),
            format_timestamp(&e.created_at),
            e.file_size.unwrap_or(0)
        );
    }
    Ok(())
}

async fn history_data(gateway: &RemoteGateway, rest: &str) -> Result<(), ClientError> {
    let id = parse_id(rest, "Usage: histdata <id>")?;
    let data = gateway.get_history_data(id).await?;
    println!(
        "{} ({})",
        data.output_filename,
        format_timestamp(&data.created_at)
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&data.json_data).unwrap_or_default()
    );
    Ok(())
}

async fn history_download(gateway: &RemoteGateway, rest: &str) -> Result<(), ClientError> {
    let id = parse_id(rest, "Usage: histdl <id>")?;
    let bytes = gateway.download_history_entry(id).await?;
    let filename = format!("history_{}.docx", id);
    fs::write(&filename, &bytes)
        .map_err(|e| ClientError::Validation(format!("Cannot write file: {}", e)))?;
    println!("Saved {} ({} bytes)", filename, bytes.len());
    Ok(())
}

async fn history_delete(gateway: &RemoteGateway, rest: &str) -> Result<(), ClientError> {
    let id = parse_id(rest, "Usage: histdel <id>")?;
    gateway.delete_history_entry(id).await?;
    println!("History entry #{} deleted", id);
    Ok(())
}

fn split_arg(rest: &str, usage: &str) -> Result<(String, String), ClientError> {
    let mut parts = rest.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) if !a.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(ClientError::Validation(usage.to_string())),
    }
}

fn parse_index(text: &str) -> Result<usize, ClientError> {
    text.parse::<usize>()
        .map_err(|_| ClientError::Validation(format!("Invalid item index: {}", text)))
}

fn parse_id(text: &str, usage: &str) -> Result<i64, ClientError> {
    text.parse::<i64>()
        .map_err(|_| ClientError::Validation(usage.to_string()))
}

/// Renders a server timestamp for listing output; falls back to the raw
/// string when the format is unexpected.
fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}
