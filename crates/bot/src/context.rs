//! Shared handler context and reward/timing constants.

use std::time::Duration;

use {
    teloxide::{
        Bot,
        prelude::Requester,
        types::{Me, User as TgUser},
    },
    tokio::sync::OnceCell,
    tracing::{info, warn},
};

use {
    rollick_l10n::Catalog,
    rollick_store::{Store, UserProfile},
    rollick_tracker::GameTracker,
};

/// XP granted to a referrer when an invited user starts the bot.
pub const REFERRAL_XP: i64 = 50;
/// XP granted to a known user joining a group chat.
pub const GROUP_JOIN_XP: i64 = 10;
/// XP granted per group message.
pub const GROUP_ACTIVITY_XP: i64 = 1;

/// How long a group game prompt waits for a reply.
pub const PROMPT_TTL: Duration = Duration::from_secs(30);
/// Pause after the bot's dice animation before announcing the result.
pub const DICE_SUSPENSE: Duration = Duration::from_secs(4);
/// Pause after the bot reveals its RPS choice.
pub const RPS_SUSPENSE: Duration = Duration::from_secs(1);
/// Delay before transient game messages are deleted from the chat.
pub const CLEANUP_DELAY: Duration = Duration::from_secs(20);

/// Launch URLs for the game mini-apps. An unset URL disables that
/// launcher.
#[derive(Debug, Clone, Default)]
pub struct WebApps {
    pub rps: Option<String>,
    pub ttt: Option<String>,
}

/// Shared state for all handlers, injected via the dispatcher.
pub struct BotContext {
    pub store: Store,
    pub tracker: GameTracker,
    pub catalog: Catalog,
    pub webapps: WebApps,
    owners: Vec<u64>,
    me: OnceCell<Me>,
}

impl BotContext {
    pub fn new(
        store: Store,
        tracker: GameTracker,
        catalog: Catalog,
        owners: Vec<u64>,
        webapps: WebApps,
    ) -> Self {
        Self {
            store,
            tracker,
            catalog,
            webapps,
            owners,
            me: OnceCell::new(),
        }
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.contains(&user_id)
    }

    /// The bot's own identity, fetched once and cached.
    pub async fn me(&self, bot: &Bot) -> anyhow::Result<&Me> {
        self.me
            .get_or_try_init(|| async { Ok(bot.get_me().await?) })
            .await
    }

    /// Make sure the user has a durable record and a fresh activity
    /// timestamp. Runs at the top of every handled interaction; store
    /// failures degrade to a warning (the interaction itself proceeds).
    pub async fn ensure_user(&self, user: &TgUser) {
        let id = user.id.0 as i64;
        match self.store.get_user(id).await {
            Ok(Some(_)) => {
                if let Err(e) = self.store.touch_activity(id).await {
                    warn!(user = id, error = %e, "failed to touch activity");
                }
            },
            Ok(None) => match self.store.create_user(id, &profile_of(user), None).await {
                Ok(_) => info!(user = id, "created user"),
                Err(e) => warn!(user = id, error = %e, "failed to create user"),
            },
            Err(e) => warn!(user = id, error = %e, "failed to load user"),
        }
    }
}

/// Profile fields captured from a transport user.
pub fn profile_of(user: &TgUser) -> UserProfile {
    UserProfile {
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        language_code: user.language_code.clone(),
    }
}

/// Locale hint for the catalog, straight from the transport.
pub fn locale_of(user: &TgUser) -> Option<&str> {
    user.language_code.as_deref()
}
