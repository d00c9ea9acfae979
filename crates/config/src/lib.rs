//! Configuration discovery and loading.
//!
//! A single TOML file (`rollick.toml`) found project-local or under
//! `~/.config/rollick/`, with `${ENV_VAR}` substitution applied to the
//! raw text before parsing.

mod env_subst;
mod loader;
mod schema;

pub use {
    env_subst::substitute_env,
    loader::{clear_config_dir, discover_and_load, load_config, set_config_dir},
    schema::{BotConfig, DatabaseConfig, LocaleConfig, RollickConfig, WebAppConfig},
};
