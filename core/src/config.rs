use crate::{
    binding::{Binding, ChainPolicy, HandlerEntry},
    dispatch::Dispatcher,
    error::{Error, Result},
    event::Input,
    mode::Mode,
    Action, HandlerError, Step,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{path::Path, sync::Arc};

/// Complete keymap configuration loaded from RON.
///
/// Handlers cannot live in a config file, so bindings reference actions by
/// label; [`Dispatcher::apply_config`] resolves the labels against an
/// [`ActionRegistry`] supplied by the embedding application.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeymapConfig {
    /// Map of mode names to their definitions, in declaration order. The
    /// "global" mode may appear here like any other; it exists regardless.
    pub modes: IndexMap<String, ModeConfig>,

    /// Which mode to start in; defaults to "global".
    #[serde(default)]
    pub initial_mode: Option<String>,

    /// Idle ticks before a pending prefix resets.
    #[serde(default)]
    pub prefix_timeout: Option<u32>,
}

/// Definition of a single mode.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModeConfig {
    /// Bindings for this mode.
    #[serde(default)]
    pub bindings: IndexMap<Input, EntryConfig>,

    /// Catch-all chain for inputs with no literal binding.
    #[serde(default)]
    pub fallback: Option<ChainConfig>,
}

/// What one input is bound to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum EntryConfig {
    /// Run these labeled actions.
    Chain(ChainConfig),

    /// Enter the named submap and await a continuation key.
    Prefix(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub actions: Vec<ActionConfig>,

    #[serde(default)]
    pub policy: ChainPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionConfig {
    /// Label of a registered action.
    pub action: String,

    /// Mode entered when this action consumes the event.
    #[serde(default)]
    pub target: Option<String>,
}

impl KeymapConfig {
    /// Load configuration from a RON string.
    pub fn from_ron(ron_str: &str) -> Result<Self> {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(ron_str)
            .map_err(|e| Error::Config {
                message: e.to_string(),
            })
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_ron(&contents)
    }

    /// Save configuration to a RON string.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            Error::Config {
                message: e.to_string(),
            }
        })
    }
}

/// Named actions the embedding application exposes to config-driven keymaps.
pub struct ActionRegistry<C> {
    actions: IndexMap<SmolStr, Action<C>>,
}

impl<C> ActionRegistry<C> {
    pub fn new() -> Self {
        Self {
            actions: IndexMap::new(),
        }
    }

    /// Register an action under a label. Re-registering a label replaces the
    /// prior action.
    pub fn register(
        &mut self,
        label: impl Into<SmolStr>,
        action: impl Fn(&mut C, &Input) -> std::result::Result<Step, HandlerError>
            + Send
            + Sync
            + 'static,
    ) {
        self.actions.insert(label.into(), Arc::new(action));
    }

    /// Register an action that cannot fail.
    pub fn register_simple(
        &mut self,
        label: impl Into<SmolStr>,
        action: impl Fn(&mut C, &Input) -> Step + Send + Sync + 'static,
    ) {
        self.register(label, move |ctx, input| Ok(action(ctx, input)));
    }

    pub fn get(&self, label: &str) -> Option<&Action<C>> {
        self.actions.get(label)
    }

    /// Registered labels in registration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(|label| label.as_str())
    }
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    /// Declare the modes and install the bindings a [`KeymapConfig`]
    /// describes, resolving action labels against `actions`.
    ///
    /// Fails closed: an unknown action label or an undeclared mode name
    /// anywhere in the config leaves an error at load time rather than a
    /// dead key at dispatch time. Modes are declared in config order before
    /// any binding is installed, so forward references between modes work.
    pub fn apply_config(&mut self, config: &KeymapConfig, actions: &ActionRegistry<C>) -> Result<()> {
        for name in config.modes.keys() {
            self.declare_mode(name.as_str());
        }

        for (name, mode_config) in &config.modes {
            let mode = self.mode_by_name(name)?;
            for (input, entry) in &mode_config.bindings {
                match entry {
                    EntryConfig::Chain(chain) => {
                        let binding = self.chain_from_config(chain, actions)?;
                        self.rebind(mode, input.clone(), binding)?;
                    },
                    EntryConfig::Prefix(submap_name) => {
                        let submap = self.mode_by_name(submap_name)?;
                        let Input::Key(chord) = input else {
                            return Err(Error::Config {
                                message: format!(
                                    "prefix binding for {input} in mode {name:?} must be a key chord"
                                ),
                            });
                        };
                        self.bind_prefix(mode, *chord, submap)?;
                    },
                }
            }
            if let Some(chain) = &mode_config.fallback {
                let binding = self.chain_from_config(chain, actions)?;
                self.set_fallback(mode, binding)?;
            }
        }

        if let Some(ticks) = config.prefix_timeout {
            self.set_prefix_timeout(ticks);
        }
        if let Some(initial) = &config.initial_mode {
            let mode = self.mode_by_name(initial)?;
            self.set_mode(mode)?;
        }
        Ok(())
    }

    fn mode_by_name(&self, name: &str) -> Result<Mode> {
        self.registry().get(name).ok_or_else(|| Error::UndeclaredMode {
            name: name.to_string(),
        })
    }

    fn chain_from_config(
        &self,
        chain: &ChainConfig,
        actions: &ActionRegistry<C>,
    ) -> Result<Binding<C>> {
        let mut entries = Vec::with_capacity(chain.actions.len());
        for action_config in &chain.actions {
            let action = actions
                .get(&action_config.action)
                .ok_or_else(|| Error::UnknownAction {
                    label: action_config.action.clone(),
                })?;
            let mut entry = HandlerEntry::<C> {
                action: Arc::clone(action),
                target: None,
                label: Some(SmolStr::new(&action_config.action)),
                once: false,
            };
            if let Some(target_name) = &action_config.target {
                entry.target = Some(self.mode_by_name(target_name)?);
            }
            entries.push(entry);
        }
        Ok(Binding::new(entries).with_policy(chain.policy))
    }
}

// TODO: layered configs (user overrides merged over an application default
// map), once more than one config source exists.
