use crate::{cli::Cli, commands};
use anyhow::Context as _;
use marten_core::{parse_keys, Input, KeymapConfig, Notice, NoticeKind, Outcome};
use std::{
    io::{self, BufRead},
    sync::Arc,
};
use tracing::info;

pub fn handle(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.keymap {
        Some(path) => KeymapConfig::from_file(path)
            .with_context(|| format!("Failed to load keymap {}", path.display()))?,
        None => KeymapConfig::from_ron(commands::DEMO_KEYMAP)
            .context("Failed to parse built-in demo keymap")?,
    };

    let mut dispatcher = commands::echo_dispatcher(&config)?;

    // The registry never changes after setup, so the status listener can
    // keep its own copy for mode names.
    let registry = dispatcher.registry().clone();
    dispatcher.subscribe(Arc::new(move |notice: &Notice| {
        let name = |mode| registry.name(mode).unwrap_or("?");
        match &notice.kind {
            NoticeKind::Transition => {
                println!("-- mode: {} -> {}", name(notice.old_mode), name(notice.new_mode));
            },
            NoticeKind::HandlerFailed { message } => {
                println!(
                    "-- handler {} failed: {message}",
                    notice.label.as_deref().unwrap_or("?")
                );
            },
            NoticeKind::Consumed => {},
        }
    }));

    info!(keymap = ?cli.keymap, "starting repl");
    println!("marten keymap driver");
    println!("  key notation per line (e.g. `<C-x>h`), `@name` raises a named event,");
    println!("  a blank line is one idle tick, Ctrl-D quits.");

    let mut out = Vec::new();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            dispatcher.tick();
            continue;
        }

        if let Some(name) = trimmed.strip_prefix('@') {
            let outcome = dispatcher.dispatch(&mut out, &Input::named(name));
            report(trimmed, outcome, &mut out);
            continue;
        }

        match parse_keys(trimmed) {
            Ok(chords) => {
                for chord in chords {
                    let outcome = dispatcher.dispatch(&mut out, &Input::Key(chord));
                    report(&chord.to_string(), outcome, &mut out);
                }
                let pending = dispatcher.pending_keys();
                if !pending.is_empty() {
                    let rendered: Vec<_> = pending.iter().map(ToString::to_string).collect();
                    println!("   pending: {}-", rendered.join(" "));
                }
            },
            Err(e) => println!("!! {e}"),
        }
    }

    Ok(())
}

fn report(input: &str, outcome: Outcome, out: &mut Vec<String>) {
    match outcome {
        Outcome::Handled if out.is_empty() => println!("   {input} handled"),
        Outcome::Handled => {
            for action in out.drain(..) {
                println!("   {input} => {action}");
            }
        },
        Outcome::Unhandled => println!("   {input} unhandled"),
    }
}
