use crate::{cli::Cli, commands};
use anyhow::Context as _;
use marten_core::{BindingInfo, KeymapConfig};

/// Load and resolve a keymap, then print every mode's bindings the way a
/// help buffer would show them.
pub fn handle(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.keymap {
        Some(path) => KeymapConfig::from_file(path)
            .with_context(|| format!("Failed to load keymap {}", path.display()))?,
        None => KeymapConfig::from_ron(commands::DEMO_KEYMAP)
            .context("Failed to parse built-in demo keymap")?,
    };

    let dispatcher = commands::echo_dispatcher(&config)?;

    for (mode, name) in dispatcher.registry().iter() {
        let rows: Vec<_> = dispatcher.bindings(mode).collect();
        if rows.is_empty() {
            continue;
        }
        println!("[ {name} ]");
        for (input, info) in rows {
            match info {
                BindingInfo::Chain(binding) => {
                    let labels: Vec<_> = binding
                        .chain
                        .iter()
                        .map(|entry| entry.label.as_deref().unwrap_or("?"))
                        .collect();
                    println!("{:>16} : {}", input.to_string(), labels.join(", "));
                },
                BindingInfo::Prefix(submap) => {
                    let submap_name = dispatcher.registry().name(submap).unwrap_or("?");
                    println!("{:>16} : prefix -> {submap_name}", input.to_string());
                },
            }
        }
    }

    println!("ok: {} modes", dispatcher.registry().len());
    Ok(())
}
