use marten_core::{ActionRegistry, Dispatcher, EntryConfig, KeymapConfig, Step};

pub mod check;
pub mod repl;

/// Keymap used when no `--keymap` file is given: an Emacs-flavored map with a
/// `C-x` prefix and a completion mode entered from `Tab`.
pub const DEMO_KEYMAP: &str = r#"(
    modes: {
        "global": (
            bindings: {
                Key((key: Char('j'), ctrl: true)): Chain((actions: [(action: "eval-line")])),
                Key((key: Named(Tab))): Chain((actions: [(action: "history-comp", target: "history")])),
                Key((key: Char('x'), ctrl: true)): Prefix("ctl-x"),
                Named("shell_activated"): Chain((actions: [(action: "refresh")])),
            },
        ),
        "ctl-x": (
            bindings: {
                Key((key: Char('h'))): Chain((actions: [(action: "mark-all")])),
                Key((key: Char('s'), ctrl: true)): Chain((actions: [(action: "save-buffer")])),
            },
        ),
        "history": (
            bindings: {
                Key((key: Named(Tab))): Chain((actions: [(action: "next-completion")])),
                Key((key: Named(Enter))): Chain((actions: [(action: "accept", target: "global")])),
            },
        ),
    },
    prefix_timeout: 30,
)"#;

/// Every action label a config mentions, in first-appearance order.
pub fn collect_labels(config: &KeymapConfig) -> Vec<String> {
    let mut labels = Vec::new();
    let mut push = |chain: &marten_core::ChainConfig, labels: &mut Vec<String>| {
        for action in &chain.actions {
            if !labels.contains(&action.action) {
                labels.push(action.action.clone());
            }
        }
    };
    for mode in config.modes.values() {
        for entry in mode.bindings.values() {
            if let EntryConfig::Chain(chain) = entry {
                push(chain, &mut labels);
            }
        }
        if let Some(fallback) = &mode.fallback {
            push(fallback, &mut labels);
        }
    }
    labels
}

/// Build a dispatcher from a config where every referenced action echoes its
/// own label. Good enough to watch bindings resolve and modes transition
/// without a real application behind them.
pub fn echo_dispatcher(config: &KeymapConfig) -> anyhow::Result<Dispatcher<Vec<String>>> {
    let mut actions = ActionRegistry::new();
    for label in collect_labels(config) {
        let tag = label.clone();
        actions.register_simple(label, move |out: &mut Vec<String>, _| {
            out.push(tag.clone());
            Step::Consumed
        });
    }

    let mut dispatcher = Dispatcher::new();
    dispatcher.apply_config(config, &actions)?;
    Ok(dispatcher)
}
