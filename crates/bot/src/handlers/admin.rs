//! Owner-only commands for adjusting balances, plus the liveness ping.

use {
    anyhow::Result,
    teloxide::{Bot, prelude::*, types::User as TgUser},
    tracing::{info, warn},
};

use crate::context::{BotContext, locale_of};

pub async fn ping(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    bot.send_message(msg.chat.id, ctx.catalog.msg(locale_of(user), "ping"))
        .await?;
    Ok(())
}

pub async fn add_xp(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    args: &str,
    ctx: &BotContext,
) -> Result<()> {
    adjust_balance(bot, msg, user, args, ctx, Balance::Xp).await
}

pub async fn add_bonus(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    args: &str,
    ctx: &BotContext,
) -> Result<()> {
    adjust_balance(bot, msg, user, args, ctx, Balance::Bonuses).await
}

#[derive(Clone, Copy)]
enum Balance {
    Xp,
    Bonuses,
}

async fn adjust_balance(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    args: &str,
    ctx: &BotContext,
    balance: Balance,
) -> Result<()> {
    let locale = locale_of(user);
    if !ctx.is_owner(user.id.0) {
        warn!(user = user.id.0, "balance command from non-owner");
        bot.send_message(msg.chat.id, ctx.catalog.msg(locale, "admin-not-allowed"))
            .await?;
        return Ok(());
    }

    let usage_key = match balance {
        Balance::Xp => "admin-usage-xp",
        Balance::Bonuses => "admin-usage-bonus",
    };
    if args.trim().is_empty() {
        bot.send_message(msg.chat.id, ctx.catalog.msg(locale, usage_key))
            .await?;
        return Ok(());
    }
    let Some((target, amount)) = parse_id_amount(args) else {
        bot.send_message(msg.chat.id, ctx.catalog.msg(locale, "admin-args-numeric"))
            .await?;
        return Ok(());
    };

    let Some(target_user) = ctx.store.get_user(target).await? else {
        let text = ctx.catalog.render(
            locale,
            "admin-user-not-found",
            &[("user_id", target.to_string())],
        );
        bot.send_message(msg.chat.id, text).await?;
        return Ok(());
    };

    let (total, reply_key) = match balance {
        Balance::Xp => (ctx.store.add_xp(target, amount).await?, "admin-xp-added"),
        Balance::Bonuses => (
            ctx.store.add_bonuses(target, amount).await?,
            "admin-bonus-added",
        ),
    };
    info!(owner = user.id.0, target, amount, total, "balance adjusted");

    let text = ctx.catalog.render(
        locale,
        reply_key,
        &[
            ("amount", amount.to_string()),
            ("name", target_user.display_name()),
            ("total", total.to_string()),
        ],
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Parse "<user_id> <amount>" with both parts numeric. The amount may be
/// negative to take a balance away.
fn parse_id_amount(args: &str) -> Option<(i64, i64)> {
    let mut parts = args.split_whitespace();
    let id = parts.next()?.parse().ok()?;
    let amount = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((id, amount))
}
