//! Terminal front end for the setup assistant interview.

use crate::app::print_notice;
use anyhow::Result;
use quill_client::Notice;
use quill_setup_assistant::{
    AssistantEvent, PendingInput, SessionError, SetupAssistant, SetupProgress, CATEGORIES,
};
use std::io::Write;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
    time::Duration,
};
use tracing::{debug, info};
use url::Url;

const EVENT_WAIT: Duration = Duration::from_millis(250);

pub async fn run(base: &Url, project: &str, notebook_url: &str) -> Result<()> {
    let assistant = match SetupAssistant::connect(base, project, notebook_url).await {
        Ok(assistant) => assistant,
        Err(error) => {
            print_notice(&connect_notice(&error));
            return Ok(());
        },
    };
    info!("Setup assistant connected for project {}", project);

    let stdin = BufReader::new(tokio::io::stdin()).lines();
    converse(assistant, stdin, &mut std::io::stdout()).await
}

fn connect_notice(error: &SessionError) -> Notice {
    match error {
        SessionError::InvalidEndpoint { .. } => {
            Notice::error("Invalid Backend URL", error.to_string())
        },
        _ => Notice::error(
            "Connection Failed",
            "Could not reach the setup assistant. Make sure the backend is running.",
        ),
    }
}

fn lost_notice() -> Notice {
    Notice::error(
        "Connection Lost",
        "The setup assistant disconnected before finishing.",
    )
    .with_action("Run the setup command again to start a new session")
}

/// Drive the interview until it finishes, the connection drops or input ends.
pub async fn converse<R, W>(
    mut assistant: SetupAssistant,
    mut lines: Lines<R>,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        if let Some(pending) = assistant.pending_input().cloned() {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                debug!("Input closed, leaving setup");
                break;
            };
            match assistant.respond(&answer(&pending, &line)).await {
                Ok(()) => {},
                Err(SessionError::EmptyResponse) => continue,
                Err(error) => {
                    debug!("Respond failed: {}", error);
                    writeln!(out, "{}", lost_notice())?;
                    break;
                },
            }
            continue;
        }

        let Some(event) = assistant.next_event(EVENT_WAIT).await else {
            continue;
        };
        write!(out, "{}", render(&event, assistant.progress()))?;
        if finishes(&event) {
            break;
        }
    }
    assistant.shutdown();
    Ok(())
}

/// A number picks that option; anything else is sent as typed.
fn answer(pending: &PendingInput, line: &str) -> String {
    if let PendingInput::Options(options) = pending {
        if let Some(option) = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| options.get(i))
        {
            return option.clone();
        }
    }
    line.to_string()
}

fn finishes(event: &AssistantEvent) -> bool {
    matches!(
        event,
        AssistantEvent::Complete(_)
            | AssistantEvent::Redirect(_)
            | AssistantEvent::Failed(_)
            | AssistantEvent::Closed
    )
}

fn render(event: &AssistantEvent, progress: &SetupProgress) -> String {
    match event {
        AssistantEvent::Message { content, input } => {
            let mut text = format!("\n{content}\n");
            if let Some(PendingInput::Options(options)) = input {
                for (i, option) in options.iter().enumerate() {
                    text.push_str(&format!("  {}. {option}\n", i + 1));
                }
            }
            text
        },
        AssistantEvent::Progress { .. } => match progress.current() {
            Some(step) => format!(
                "[{}/{}] {}\n",
                progress.completed() + 1,
                CATEGORIES.len(),
                step.name
            ),
            None => String::new(),
        },
        AssistantEvent::Complete(payload) => {
            let mut text = String::new();
            if !payload.message.is_empty() {
                text.push_str(&format!("\n{}\n", payload.message));
            }
            text.push_str(&format!("{}\n", Notice::success("Setup complete")));
            text
        },
        AssistantEvent::Redirect(route) => format!("Continue in the editor: {route}\n"),
        AssistantEvent::Failed(message) => {
            format!("{}\n", Notice::error("Setup Failed", message.clone()))
        },
        AssistantEvent::Closed => format!("{}\n", lost_notice()),
    }
}
