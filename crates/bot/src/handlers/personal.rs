//! Private-chat surface: registration, menus, profile, leaderboard and
//! settings screens.

use {
    anyhow::Result,
    teloxide::{Bot, prelude::*, types::User as TgUser},
    tracing::{info, warn},
};

use crate::{
    commands::parse_referral,
    context::{BotContext, REFERRAL_XP, locale_of, profile_of},
    handlers::{callback_target, edit_screen, send_screen},
    keyboards,
};

// ── /start and registration ──────────────────────────────────────────────

/// Greet the user, creating their record on first contact. A `ref_<id>`
/// payload credits the referrer, but only for genuinely new users and
/// never for self-referrals.
pub async fn start(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    args: &str,
    ctx: &BotContext,
) -> Result<()> {
    let id = user.id.0 as i64;
    let locale = locale_of(user);

    let text = match ctx.store.get_user(id).await? {
        Some(_) => {
            ctx.store.touch_activity(id).await?;
            ctx.catalog.render(
                locale,
                "hello",
                &[("name", user.first_name.clone())],
            )
        },
        None => {
            let referrer = match parse_referral(args).filter(|r| *r != id) {
                Some(r) => ctx.store.get_user(r).await?.map(|u| u.user_id),
                None => None,
            };
            ctx.store.create_user(id, &profile_of(user), referrer).await?;
            info!(user = id, referrer, "registered user");

            match referrer {
                Some(r) => {
                    let total = ctx.store.add_xp(r, REFERRAL_XP).await?;
                    info!(referrer = r, total, "referral bonus granted");
                    ctx.catalog.render(
                        locale,
                        "hello-referral",
                        &[
                            ("name", user.first_name.clone()),
                            ("referrer_bonus", REFERRAL_XP.to_string()),
                        ],
                    )
                },
                None => ctx.catalog.render(
                    locale,
                    "hello-new-user",
                    &[("name", user.first_name.clone())],
                ),
            }
        },
    };

    send_screen(
        bot,
        msg.chat.id,
        text,
        keyboards::main_menu(&ctx.catalog, locale),
    )
    .await
}

// ── Commands ─────────────────────────────────────────────────────────────

pub async fn help(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let locale = locale_of(user);
    send_screen(
        bot,
        msg.chat.id,
        help_text(ctx, locale),
        keyboards::main_menu(&ctx.catalog, locale),
    )
    .await
}

pub async fn about(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let locale = locale_of(user);
    send_screen(
        bot,
        msg.chat.id,
        ctx.catalog.msg(locale, "about"),
        keyboards::main_menu(&ctx.catalog, locale),
    )
    .await
}

pub async fn profile(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let locale = locale_of(user);
    let text = profile_text(ctx, user.id.0 as i64, locale).await?;
    send_screen(
        bot,
        msg.chat.id,
        text,
        keyboards::profile(&ctx.catalog, locale),
    )
    .await
}

pub async fn top(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let locale = locale_of(user);
    let text = top_text(ctx, locale, 10).await?;
    send_screen(bot, msg.chat.id, text, keyboards::top(&ctx.catalog, locale)).await
}

pub async fn settings(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let locale = locale_of(user);
    send_screen(
        bot,
        msg.chat.id,
        ctx.catalog.msg(locale, "settings"),
        keyboards::settings(&ctx.catalog, locale),
    )
    .await
}

// ── Callbacks ────────────────────────────────────────────────────────────

pub async fn cb_main_menu(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let text = ctx.catalog.render(
        locale,
        "hello",
        &[("name", q.from.first_name.clone())],
    );
    edit_screen(bot, chat, id, text, keyboards::main_menu(&ctx.catalog, locale)).await;
    Ok(None)
}

pub async fn cb_help(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    edit_screen(
        bot,
        chat,
        id,
        help_text(ctx, locale),
        keyboards::main_menu(&ctx.catalog, locale),
    )
    .await;
    Ok(None)
}

pub async fn cb_about(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    edit_screen(
        bot,
        chat,
        id,
        ctx.catalog.msg(locale, "about"),
        keyboards::main_menu(&ctx.catalog, locale),
    )
    .await;
    Ok(None)
}

pub async fn cb_profile(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let text = profile_text(ctx, q.from.id.0 as i64, locale).await?;
    edit_screen(bot, chat, id, text, keyboards::profile(&ctx.catalog, locale)).await;
    Ok(None)
}

pub async fn cb_achievements(
    bot: &Bot,
    q: &CallbackQuery,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let user_id = q.from.id.0 as i64;

    let (xp, bonuses) = match ctx.store.get_user(user_id).await? {
        Some(u) => (u.xp, u.bonuses),
        None => (0, 0),
    };
    let referrals = ctx.store.count_referrals(user_id).await?;

    let earned = earned_achievements(xp, referrals);
    let list = if earned.is_empty() {
        ctx.catalog.msg(locale, "achievements-none")
    } else {
        earned
            .iter()
            .map(|key| ctx.catalog.msg(locale, key))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let stats = ctx.catalog.render(
        locale,
        "achievements-stats",
        &[
            ("xp", xp.to_string()),
            ("bonuses", bonuses.to_string()),
            ("referrals", referrals.to_string()),
        ],
    );
    let text = format!(
        "{}\n\n{list}\n\n{stats}",
        ctx.catalog.msg(locale, "achievements-title")
    );

    edit_screen(bot, chat, id, text, keyboards::profile(&ctx.catalog, locale)).await;
    Ok(None)
}

pub async fn cb_my_bonuses(
    bot: &Bot,
    q: &CallbackQuery,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let (xp, bonuses) = match ctx.store.get_user(q.from.id.0 as i64).await? {
        Some(u) => (u.xp, u.bonuses),
        None => (0, 0),
    };
    let text = ctx.catalog.render(
        locale,
        "my-bonuses",
        &[("bonuses", bonuses.to_string()), ("xp", xp.to_string())],
    );
    edit_screen(bot, chat, id, text, keyboards::profile(&ctx.catalog, locale)).await;
    Ok(None)
}

pub async fn cb_referral(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let user_id = q.from.id.0 as i64;

    let me = ctx.me(bot).await?;
    let link = format!("https://t.me/{}?start=ref_{user_id}", me.username());
    let count = ctx.store.count_referrals(user_id).await?;

    let text = ctx.catalog.render(
        locale,
        "referral-info",
        &[
            ("link", link),
            ("count", count.to_string()),
            ("bonus", REFERRAL_XP.to_string()),
        ],
    );
    edit_screen(bot, chat, id, text, keyboards::profile(&ctx.catalog, locale)).await;
    Ok(None)
}

pub async fn cb_top(
    bot: &Bot,
    q: &CallbackQuery,
    page: &str,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);

    let text = match page {
        "me" => {
            let user_id = q.from.id.0 as i64;
            let rank = ctx.store.rank_of(user_id).await?;
            let total = ctx.store.count_users().await?;
            let position = ctx.catalog.render(
                locale,
                "top-your-position",
                &[("position", rank.to_string()), ("total", total.to_string())],
            );
            format!("{}\n\n{position}", top_text(ctx, locale, 10).await?)
        },
        _ => top_text(ctx, locale, 10).await?,
    };

    edit_screen(bot, chat, id, text, keyboards::top(&ctx.catalog, locale)).await;
    Ok(None)
}

pub async fn cb_settings(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    edit_screen(
        bot,
        chat,
        id,
        ctx.catalog.msg(locale, "settings"),
        keyboards::settings(&ctx.catalog, locale),
    )
    .await;
    Ok(None)
}

pub async fn cb_settings_section(
    bot: &Bot,
    q: &CallbackQuery,
    section: &str,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);

    let (text, keyboard) = match section {
        "notifications" => (
            ctx.catalog.msg(locale, "settings-notifications"),
            keyboards::notification_settings(&ctx.catalog, locale),
        ),
        "language" => (
            ctx.catalog.msg(locale, "settings-language"),
            keyboards::language_settings(&ctx.catalog, locale),
        ),
        "privacy" => (
            ctx.catalog.msg(locale, "settings-privacy"),
            keyboards::privacy_settings(&ctx.catalog, locale),
        ),
        _ => {
            warn!(section, "unrecognized settings section");
            return Ok(Some(ctx.catalog.msg(locale, "generic-error")));
        },
    };
    edit_screen(bot, chat, id, text, keyboard).await;
    Ok(None)
}

/// A choice inside a settings submenu. Preferences are not persisted;
/// the acknowledgment toast is the whole feature for now.
pub async fn cb_setting_saved(
    bot: &Bot,
    q: &CallbackQuery,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let locale = locale_of(&q.from);
    if let Some((chat, id)) = callback_target(q) {
        edit_screen(
            bot,
            chat,
            id,
            ctx.catalog.msg(locale, "settings"),
            keyboards::settings(&ctx.catalog, locale),
        )
        .await;
    }
    Ok(Some(ctx.catalog.msg(locale, "settings-saved")))
}

// ── Shared text builders ─────────────────────────────────────────────────

fn help_text(ctx: &BotContext, locale: Option<&str>) -> String {
    ctx.catalog.render(
        locale,
        "help",
        &[("referral_bonus", REFERRAL_XP.to_string())],
    )
}

pub(crate) async fn profile_text(
    ctx: &BotContext,
    user_id: i64,
    locale: Option<&str>,
) -> Result<String> {
    let Some(user) = ctx.store.get_user(user_id).await? else {
        // ensure_user runs before every handler, so this is unexpected.
        anyhow::bail!("user {user_id} has no record");
    };
    let rank = ctx.store.rank_of(user_id).await?;
    let referrals = ctx.store.count_referrals(user_id).await?;

    Ok(ctx.catalog.render(
        locale,
        "profile-info",
        &[
            ("name", user.display_name()),
            ("user_id", user_id.to_string()),
            ("xp", user.xp.to_string()),
            ("bonuses", user.bonuses.to_string()),
            ("referrals", referrals.to_string()),
            ("rank", rank.to_string()),
            ("last_activity", format_ts(user.last_activity)),
            ("registered_at", format_ts(user.created_at)),
        ],
    ))
}

pub(crate) async fn top_text(
    ctx: &BotContext,
    locale: Option<&str>,
    limit: i64,
) -> Result<String> {
    let users = ctx.store.top_users(limit).await?;
    let mut lines = vec![ctx.catalog.msg(locale, "top-title")];
    for (index, user) in users.iter().enumerate() {
        lines.push(ctx.catalog.render(
            locale,
            "top-item",
            &[
                ("medal", medal_for(index + 1).to_string()),
                ("position", (index + 1).to_string()),
                ("name", user.display_name()),
                ("xp", user.xp.to_string()),
            ],
        ));
    }
    Ok(lines.join("\n"))
}

fn medal_for(position: usize) -> &'static str {
    match position {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "🏅",
    }
}

/// Catalog keys of the achievements unlocked at the given totals.
fn earned_achievements(xp: i64, referrals: i64) -> Vec<&'static str> {
    const XP_TIERS: [(i64, &str); 6] = [
        (10, "ach-xp-10"),
        (50, "ach-xp-50"),
        (100, "ach-xp-100"),
        (250, "ach-xp-250"),
        (500, "ach-xp-500"),
        (1000, "ach-xp-1000"),
    ];
    const REFERRAL_TIERS: [(i64, &str); 3] =
        [(1, "ach-ref-1"), (5, "ach-ref-5"), (10, "ach-ref-10")];

    let mut earned = Vec::new();
    for (threshold, key) in XP_TIERS {
        if xp >= threshold {
            earned.push(key);
        }
    }
    for (threshold, key) in REFERRAL_TIERS {
        if referrals >= threshold {
            earned.push(key);
        }
    }
    earned
}

fn format_ts(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievements_unlock_at_thresholds() {
        assert!(earned_achievements(0, 0).is_empty());
        assert_eq!(earned_achievements(10, 0), vec!["ach-xp-10"]);
        assert_eq!(
            earned_achievements(120, 1),
            vec!["ach-xp-10", "ach-xp-50", "ach-xp-100", "ach-ref-1"]
        );
        assert_eq!(earned_achievements(9, 0), Vec::<&str>::new());
        // Top tier unlocks everything.
        assert_eq!(earned_achievements(1000, 10).len(), 9);
    }

    #[test]
    fn medals_for_podium_positions() {
        assert_eq!(medal_for(1), "🥇");
        assert_eq!(medal_for(2), "🥈");
        assert_eq!(medal_for(3), "🥉");
        assert_eq!(medal_for(4), "🏅");
        assert_eq!(medal_for(100), "🏅");
    }

    #[test]
    fn timestamps_render_human_readable() {
        // 2024-01-15 12:30:00 UTC
        assert_eq!(format_ts(1_705_321_800_000), "15.01.2024 12:30");
        assert_eq!(format_ts(i64::MAX), "-");
    }
}
