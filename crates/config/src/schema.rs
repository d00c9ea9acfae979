//! Config schema.

use {secrecy::SecretString, serde::Deserialize};

/// Root configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RollickConfig {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub locale: LocaleConfig,
    pub webapp: WebAppConfig,
}

/// Bot identity and operator access.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Telegram bot token. `ROLLICK_BOT_TOKEN` in the environment takes
    /// precedence over the file value.
    pub token: Option<SecretString>,

    /// User ids allowed to run admin commands.
    pub owners: Vec<u64>,
}

impl BotConfig {
    /// Resolve the token: environment first, then the config file.
    pub fn resolve_token(&self) -> anyhow::Result<String> {
        if let Ok(token) = std::env::var("ROLLICK_BOT_TOKEN") {
            return Ok(token);
        }
        use secrecy::ExposeSecret;
        self.token
            .as_ref()
            .map(|t| t.expose_secret().to_string())
            .ok_or_else(|| {
                anyhow::anyhow!("no bot token: set ROLLICK_BOT_TOKEN or bot.token in rollick.toml")
            })
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.contains(&user_id)
    }
}

/// Relational store location.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:rollick.db".to_string(),
        }
    }
}

/// Localization defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Fallback locale when the user has no usable language code.
    pub default: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: "uk".to_string(),
        }
    }
}

/// Mini-app launch points. Launchers for unset games reply that the app
/// is unavailable.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebAppConfig {
    /// URL of the rock-paper-scissors mini-app.
    pub rps_url: Option<String>,

    /// URL of the tic-tac-toe mini-app.
    pub ttt_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = RollickConfig::default();
        assert!(cfg.bot.token.is_none());
        assert!(cfg.bot.owners.is_empty());
        assert_eq!(cfg.database.url, "sqlite:rollick.db");
        assert_eq!(cfg.locale.default, "uk");
        assert!(cfg.webapp.rps_url.is_none());
    }

    #[test]
    fn webapp_urls_parse() {
        let cfg: RollickConfig =
            toml::from_str("[webapp]\nrps_url = \"https://games.example/rps\"").unwrap();
        assert_eq!(cfg.webapp.rps_url.as_deref(), Some("https://games.example/rps"));
        assert!(cfg.webapp.ttt_url.is_none());
    }

    #[test]
    fn owner_check() {
        let cfg: RollickConfig = toml::from_str("[bot]\nowners = [1, 2]").unwrap();
        assert!(cfg.bot.is_owner(1));
        assert!(!cfg.bot.is_owner(3));
    }
}
