//! hitl-chat - terminal driver for a human-in-the-loop agent backend
//!
//! Plain lines are sent as human turns; slash commands answer interrupts and
//! control the session. Logs go to stderr as JSON.

use hitl_client::config::ClientConfig;
use hitl_client::interrupt::{Decision, Interrupt};
use hitl_client::message::{Checkpoint, Message, Role};
use hitl_client::session::{SessionError, SessionEvent, StreamSession};
use hitl_client::transport::{HttpTransport, LoggingTransport, RunTransport, StaticToken};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  <text>                  send a message (or answer a question interrupt)
  /approve                accept the pending action as proposed
  /edit key=json ...      accept with changed arguments
  /ignore                 skip the pending action
  /respond text           answer the interrupt in words
  /draft text             save a reply without sending it
  /retry                  resend a failed resume
  /stop                   abort the current run
  /regenerate <checkpoint>
  /thread <id|new>        switch conversation
  /artifact <id>          open or close an artifact
  /context key=json ...   set context for the open artifact
  /help  /quit";

/// One parsed line of user input
#[derive(Debug, PartialEq)]
enum Input {
    Say(String),
    Approve,
    Edit(Map<String, Value>),
    Ignore,
    Respond(String),
    Draft(String),
    Retry,
    Stop,
    Regenerate(String),
    Thread(Option<String>),
    Artifact(String),
    Context(Map<String, Value>),
    Help,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hitl_client=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    let api_url = config.require_api_url()?.to_string();
    let tokens = Arc::new(StaticToken::new(config.api_token.clone().unwrap_or_default()));
    let transport = LoggingTransport::new(HttpTransport::new(&api_url, &config, tokens)?);

    tracing::info!(
        api_url = %api_url,
        assistant_id = %config.assistant_id,
        "Starting chat session"
    );

    let mut session = StreamSession::new(transport, &config);
    tokio::spawn(print_events(session.subscribe()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Ok(None) => {}
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(input)) => {
                        let switching = matches!(input, Input::Thread(_));
                        if let Err(e) = execute(&mut session, input) {
                            println!("! {e}");
                        }
                        if switching {
                            printed = session.messages().len();
                        }
                    }
                    Err(usage) => println!("! {usage}"),
                }
            }
            more = session.next_update(), if session.is_loading() => {
                if more && !session.is_loading() {
                    printed = print_new_messages(session.messages(), printed);
                }
            }
        }
    }

    session.stop();
    Ok(())
}

fn execute<T: RunTransport + 'static>(
    session: &mut StreamSession<T>,
    input: Input,
) -> Result<(), SessionError> {
    match input {
        Input::Say(text) => {
            session.submit_text(&text, Vec::new())?;
        }
        Input::Approve => {
            session.respond(Decision::Approve)?;
        }
        Input::Edit(changes) => {
            session.respond(Decision::Edit(changes))?;
        }
        Input::Ignore => {
            session.respond(Decision::Ignore)?;
        }
        Input::Respond(text) => {
            session.respond(Decision::Respond(text))?;
        }
        Input::Draft(text) => session.set_draft(text)?,
        Input::Retry => {
            session.retry_resume()?;
        }
        Input::Stop => session.stop(),
        Input::Regenerate(checkpoint) => {
            session.regenerate(Checkpoint::from_id(checkpoint))?;
        }
        // History is loaded by whoever owns thread storage; the driver starts empty
        Input::Thread(thread_id) => session.switch_thread(thread_id, Vec::new()),
        Input::Artifact(id) => {
            session.artifacts_mut().open(id);
            match session.artifacts().open_id() {
                Some(open) => println!("* artifact {open} open"),
                None => println!("* artifact closed"),
            }
        }
        Input::Context(context) => session.artifacts_mut().set_context(context),
        Input::Help => println!("{HELP}"),
        Input::Quit => {}
    }
    Ok(())
}

/// Parse one line; `Ok(None)` for blank input
fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(Input::Say(line.to_string())));
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    let input = match (name, rest) {
        ("approve", "") => Input::Approve,
        ("ignore", "") => Input::Ignore,
        ("retry", "") => Input::Retry,
        ("stop", "") => Input::Stop,
        ("help", "") => Input::Help,
        ("quit" | "exit", "") => Input::Quit,
        ("edit", pairs) if !pairs.is_empty() => Input::Edit(parse_pairs(pairs)?),
        ("context", pairs) if !pairs.is_empty() => Input::Context(parse_pairs(pairs)?),
        ("respond", text) if !text.is_empty() => Input::Respond(text.to_string()),
        ("draft", text) => Input::Draft(text.to_string()),
        ("regenerate", checkpoint) if !checkpoint.is_empty() => {
            Input::Regenerate(checkpoint.to_string())
        }
        ("thread", "new") => Input::Thread(None),
        ("thread", id) if !id.is_empty() => Input::Thread(Some(id.to_string())),
        ("artifact", id) if !id.is_empty() => Input::Artifact(id.to_string()),
        _ => return Err(format!("unrecognised command '/{command}', try /help")),
    };
    Ok(Some(input))
}

/// `key=json` pairs; values that are not JSON are taken as strings
fn parse_pairs(pairs: &str) -> Result<Map<String, Value>, String> {
    pairs
        .split_whitespace()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
            let value =
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}

/// Print assistant and tool output past `printed`; returns the new mark
fn print_new_messages(messages: &[Message], printed: usize) -> usize {
    for message in messages.iter().skip(printed).filter(|m| !m.is_hidden()) {
        match message.role {
            Role::Human => {}
            Role::Assistant => {
                let text = message.text();
                if !text.is_empty() {
                    println!("assistant: {text}");
                }
                for call in &message.tool_calls {
                    println!("  -> {}({})", call.name, call.args);
                }
            }
            Role::Tool => println!("  <- {}", message.text()),
        }
    }
    messages.len()
}

fn describe_interrupt(interrupt: &Interrupt) -> String {
    let mut lines = vec![format!("? {}", interrupt.prompt)];
    if let Some(request) = &interrupt.action_request {
        lines.push(format!(
            "  action: {} {}",
            request.action,
            Value::Object(request.args.clone())
        ));
    }

    let config = interrupt.config;
    let options: Vec<&str> = [
        (config.approve && interrupt.action_request.is_some(), "/approve"),
        (config.edit, "/edit"),
        (config.ignore, "/ignore"),
        (interrupt.accepts_text(), "/respond"),
    ]
    .into_iter()
    .filter_map(|(allowed, name)| allowed.then_some(name))
    .collect();
    lines.push(format!("  options: {}", options.join(" ")));
    lines.join("\n")
}

async fn print_events(events: broadcast::Receiver<SessionEvent>) {
    let mut events = BroadcastStream::new(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(SessionEvent::Interrupted(interrupt)) => {
                println!("{}", describe_interrupt(&interrupt));
            }
            Ok(SessionEvent::InterruptCleared) => println!("* resumed"),
            Ok(SessionEvent::ThreadIdAssigned(id)) => println!("* thread {id}"),
            Ok(SessionEvent::ThreadSwitched { thread_id }) => {
                println!("* switched to {}", thread_id.as_deref().unwrap_or("a new thread"));
            }
            Ok(SessionEvent::Error { message }) => println!("! {message}"),
            Ok(SessionEvent::Custom(value)) => println!("~ {value}"),
            Ok(
                SessionEvent::MessagesChanged { .. }
                | SessionEvent::Loading(_)
                | SessionEvent::FirstToken
                | SessionEvent::Metadata(_),
            ) => {}
            Err(e) => tracing::warn!(error = %e, "Event printer fell behind"),
        }
    }
}
