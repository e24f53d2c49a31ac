//! Line-oriented scene editor with autosave.
//!
//! Plain lines are appended to the scene. Lines starting with `:` are
//! commands; start a line with `::` to append text that begins with a colon.

use crate::app::print_notice;
use anyhow::{Context, Result};
use quill::{session, Config, Document, Notifications, SessionConfig, SessionEvent, SessionHandle};
use quill_client::{Backend, Notice, NoticeContext};
use std::{io::Write, sync::Arc};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
    sync::broadcast::{self, error::RecvError},
    time::Instant,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    Append(String),
    Replace(String),
    Save,
    Switch(String),
    Print,
    Notices,
    Dismiss(usize),
    Help,
    Quit,
    Unknown(String),
}

impl EditorCommand {
    pub fn parse(line: &str) -> Self {
        if let Some(escaped) = line.strip_prefix("::") {
            return EditorCommand::Append(format!(":{escaped}"));
        }
        let Some(command) = line.strip_prefix(':') else {
            return EditorCommand::Append(line.to_string());
        };

        let (name, arg) = match command.split_once(' ') {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };
        match name {
            "w" => EditorCommand::Save,
            "q" => EditorCommand::Quit,
            "p" => EditorCommand::Print,
            "n" => EditorCommand::Notices,
            "h" => EditorCommand::Help,
            "r" => EditorCommand::Replace(arg.to_string()),
            "e" if !arg.is_empty() => EditorCommand::Switch(arg.to_string()),
            "d" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => EditorCommand::Dismiss(n - 1),
                _ => EditorCommand::Unknown(line.to_string()),
            },
            _ => EditorCommand::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "\
text      append a line
:r TEXT   replace the whole scene
:w        save now
:e ID     switch to another scene
:p        print the scene and its save status
:n        list notices
:d N      dismiss notice N
:q        save if needed and quit
";

pub async fn run(backend: Arc<dyn Backend>, config: &Config, scene: &str) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin()).lines();
    edit(backend, config, scene, stdin, &mut std::io::stdout()).await
}

pub async fn edit<R, W>(
    backend: Arc<dyn Backend>,
    config: &Config,
    scene: &str,
    mut lines: Lines<R>,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let document = match fetch(backend.as_ref(), scene).await {
        Ok(document) => document,
        Err(notice) => {
            print_notice(&notice);
            return Ok(());
        },
    };

    let (handle, task) = session::spawn(backend.clone(), SessionConfig::from(config));
    let mut events = handle.subscribe();
    let mut notices = Notifications::new(config.notice_capacity);
    writeln!(out, "Editing {} ({} words). :h for help.", document.title(), document.word_count())?;
    handle.open(document);

    loop {
        tokio::select! {
            biased;

            event = events.recv() => match event {
                Ok(event) => on_event(event, &mut notices, out)?,
                Err(RecvError::Lagged(missed)) => warn!("Missed {} session events", missed),
                Err(RecvError::Closed) => break,
            },

            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    quit(&handle);
                    break;
                };
                match EditorCommand::parse(&line) {
                    EditorCommand::Quit => {
                        quit(&handle);
                        break;
                    },
                    command => apply(command, &handle, backend.as_ref(), &mut notices, out).await?,
                }
            },
        }
    }

    task.await.context("Autosave session panicked")?;
    drain(&mut events, &mut notices, out)?;
    Ok(())
}

async fn fetch(backend: &dyn Backend, id: &str) -> Result<Document, Notice> {
    backend
        .scene(&id.into())
        .await
        .map(Document::from)
        .map_err(|error| Notice::from_error(&error, NoticeContext::Scene))
}

async fn apply<W: Write>(
    command: EditorCommand,
    handle: &SessionHandle,
    backend: &dyn Backend,
    notices: &mut Notifications,
    out: &mut W,
) -> Result<()> {
    match command {
        EditorCommand::Append(text) => {
            let needs_break = handle
                .snapshot()
                .is_some_and(|doc| !doc.content().is_empty() && !doc.content().ends_with('\n'));
            let line = if needs_break {
                format!("\n{text}\n")
            } else {
                format!("{text}\n")
            };
            handle.append(&line);
        },
        EditorCommand::Replace(text) => {
            handle.edit(text);
        },
        EditorCommand::Save => handle.save_now(),
        EditorCommand::Switch(id) => match fetch(backend, &id).await {
            Ok(document) => {
                writeln!(out, "Editing {} ({} words)", document.title(), document.word_count())?;
                handle.open(document);
            },
            Err(notice) => show(notice, notices, out)?,
        },
        EditorCommand::Print => {
            if let Some(doc) = handle.snapshot() {
                write!(out, "{}", doc.content())?;
                if !doc.content().is_empty() && !doc.content().ends_with('\n') {
                    writeln!(out)?;
                }
                let dirty = if doc.is_dirty() { ", unsaved changes" } else { "" };
                writeln!(
                    out,
                    "-- {} [{}] {} words {}{dirty}",
                    doc.title(),
                    doc.id(),
                    doc.word_count(),
                    doc.status().label()
                )?;
            }
        },
        EditorCommand::Notices => {
            notices.expire(Instant::now());
            if notices.is_empty() {
                writeln!(out, "No notices")?;
            }
            for (i, notice) in notices.iter().enumerate() {
                writeln!(out, "{}. {notice}", i + 1)?;
            }
        },
        EditorCommand::Dismiss(index) => {
            if notices.dismiss(index).is_none() {
                writeln!(out, "No notice {}", index + 1)?;
            }
        },
        EditorCommand::Help => write!(out, "{HELP}")?,
        EditorCommand::Unknown(line) => writeln!(out, "Unknown command {line:?}, :h for help")?,
        EditorCommand::Quit => {},
    }
    Ok(())
}

/// Save unsaved content, then stop the session once in-flight saves finish.
fn quit(handle: &SessionHandle) {
    if handle.snapshot().is_some_and(|doc| doc.is_dirty()) {
        handle.save_now();
    }
    handle.shutdown();
}

fn on_event<W: Write>(event: SessionEvent, notices: &mut Notifications, out: &mut W) -> Result<()> {
    match event {
        SessionEvent::Saved { id, at } => {
            writeln!(out, "[{id}] Saved {}", at.format("%H:%M:%S"))?;
        },
        SessionEvent::SaveFailed { id, notice } => {
            debug!("Save of {} failed", id);
            show(notice, notices, out)?;
        },
        SessionEvent::SaveStarted(id) => debug!("Saving {}", id),
        SessionEvent::TreeInvalidated => {},
    }
    Ok(())
}

fn drain<W: Write>(
    events: &mut broadcast::Receiver<SessionEvent>,
    notices: &mut Notifications,
    out: &mut W,
) -> Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => on_event(event, notices, out)?,
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return Ok(()),
        }
    }
}

fn show<W: Write>(notice: Notice, notices: &mut Notifications, out: &mut W) -> Result<()> {
    writeln!(out, "{notice}")?;
    notices.push(notice, Instant::now());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_client::mock::{MockBackend, MockFailure};

    #[test]
    fn parses_commands() {
        use EditorCommand::*;

        assert_eq!(EditorCommand::parse("It was night."), Append("It was night.".into()));
        assert_eq!(EditorCommand::parse("::w"), Append(":w".into()));
        assert_eq!(EditorCommand::parse(":w"), Save);
        assert_eq!(EditorCommand::parse(":q"), Quit);
        assert_eq!(EditorCommand::parse(":r Fresh start."), Replace("Fresh start.".into()));
        assert_eq!(EditorCommand::parse(":r"), Replace(String::new()));
        assert_eq!(EditorCommand::parse(":e scene-2"), Switch("scene-2".into()));
        assert_eq!(EditorCommand::parse(":e"), Unknown(":e".into()));
        assert_eq!(EditorCommand::parse(":d 2"), Dismiss(1));
        assert_eq!(EditorCommand::parse(":d 0"), Unknown(":d 0".into()));
        assert_eq!(EditorCommand::parse(":x"), Unknown(":x".into()));
    }

    fn backend() -> Arc<MockBackend> {
        Arc::new(
            MockBackend::new()
                .with_scene("s-1", "Dock", "Waves.")
                .with_scene("s-2", "Harbor", "Gulls."),
        )
    }

    async fn session(backend: &Arc<MockBackend>, scene: &str, input: &'static str) -> String {
        let mut out = Vec::new();
        let lines = input.as_bytes().lines();
        edit(backend.clone(), &Config::default(), scene, lines, &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn appended_lines_are_saved_on_quit() {
        let backend = backend();

        let out = session(&backend, "s-1", "The tide turned.\n:q\n").await;

        assert_eq!(
            backend.scene_content("s-1").as_deref(),
            Some("Waves.\nThe tide turned.\n")
        );
        assert!(out.starts_with("Editing Dock (1 words)"));
        assert!(out.contains("[s-1] Saved"));
    }

    #[tokio::test(start_paused = true)]
    async fn switching_flushes_the_previous_scene() {
        let backend = backend();

        session(&backend, "s-1", ":r Calm water.\n:e s-2\nMore gulls.\n:q\n").await;

        assert_eq!(backend.scene_content("s-1").as_deref(), Some("Calm water."));
        assert_eq!(
            backend.scene_content("s-2").as_deref(),
            Some("Gulls.\nMore gulls.\n")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn quitting_clean_sends_nothing() {
        let backend = backend();

        session(&backend, "s-1", ":p\n:q\n").await;

        assert!(backend.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_reported() {
        let backend = backend();
        backend.fail_next_save(MockFailure::Server);

        let out = session(&backend, "s-1", ":r Lost words.\n:q\n").await;

        assert!(out.contains("Server Error"));
        assert_eq!(backend.scene_content("s-1").as_deref(), Some("Waves."));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_scene_opens_nothing() {
        let backend = backend();

        let out = session(&backend, "nope", ":r x\n:q\n").await;

        assert!(out.is_empty());
        assert!(backend.saves().is_empty());
    }
}
