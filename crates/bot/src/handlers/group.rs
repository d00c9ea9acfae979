//! Group-chat surface: reply-based dice and RPS duels, activity XP and
//! membership tracking.
//!
//! A group game is a short conversation: the player runs `/dice` or
//! `/rps`, the bot replies with a prompt, and the player answers the
//! prompt with the right emoji. The tracker holds the session between
//! those two messages; an unanswered prompt expires and is deleted.

use std::sync::Arc;

use {
    anyhow::Result,
    teloxide::{
        Bot,
        prelude::*,
        types::{ChatId, ChatMemberUpdated, MessageId, ParseMode, ReplyParameters, User as TgUser},
    },
    tracing::{debug, info, warn},
};

use {
    rollick_games::{dice, rps},
    rollick_tracker::GameKind,
};

use crate::{
    context::{
        BotContext, CLEANUP_DELAY, DICE_SUSPENSE, GROUP_ACTIVITY_XP, GROUP_JOIN_XP, PROMPT_TTL,
        RPS_SUSPENSE, locale_of,
    },
    handlers::games::choice_label,
    handlers::personal::{profile_text, top_text},
};

// ── Membership updates ───────────────────────────────────────────────────

/// Greet a group when the bot itself is added to it.
pub async fn bot_membership(bot: Bot, upd: ChatMemberUpdated, ctx: Arc<BotContext>) -> Result<()> {
    if !(upd.chat.is_group() || upd.chat.is_supergroup()) {
        return Ok(());
    }
    let me = ctx.me(&bot).await?;
    if upd.new_chat_member.user.id != me.user.id {
        return Ok(());
    }
    let became_present =
        upd.new_chat_member.kind.is_present() && !upd.old_chat_member.kind.is_present();
    if !became_present {
        return Ok(());
    }

    info!(chat = upd.chat.id.0, "added to chat");
    let text = ctx.catalog.render(
        None,
        "group-welcome",
        &[("chat_title", upd.chat.title().unwrap_or_default().to_string())],
    );
    bot.send_message(upd.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

// ── Commands ─────────────────────────────────────────────────────────────

pub async fn help(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let text = ctx.catalog.msg(locale_of(user), "group-help");
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn top(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let text = top_text(ctx, locale_of(user), 3).await?;
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn profile(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let text = profile_text(ctx, user.id.0 as i64, locale_of(user)).await?;
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

pub async fn stats(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    bot.send_message(msg.chat.id, ctx.catalog.msg(locale_of(user), "group-stats-soon"))
        .await?;
    Ok(())
}

/// Open a dice session and prompt the player to roll.
pub async fn dice_prompt(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    open_session(bot, msg, user, ctx, GameKind::Dice, "group-dice-prompt").await
}

/// Open an RPS session and prompt the player to pick an emoji.
pub async fn rps_prompt(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    open_session(bot, msg, user, ctx, GameKind::Rps, "group-rps-prompt").await
}

async fn open_session(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    ctx: &BotContext,
    game: GameKind,
    prompt_key: &str,
) -> Result<()> {
    let chat = msg.chat.id.0;
    let user_id = user.id.0;

    // One game at a time per player per chat.
    let other = match game {
        GameKind::Dice => GameKind::Rps,
        GameKind::Rps => GameKind::Dice,
    };
    if ctx.tracker.is_active(chat, other, user_id) {
        debug!(chat, user = user_id, %game, "blocked by other active game");
        return Ok(());
    }
    ctx.tracker.start(chat, game, user_id);

    let text = ctx.catalog.render(
        locale_of(user),
        prompt_key,
        &[("name", user.first_name.clone())],
    );
    let prompt = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    // An unanswered prompt expires with its session and disappears.
    let cleanup_bot = bot.clone();
    let chat_id = msg.chat.id;
    let prompt_id = prompt.id;
    ctx.tracker.expire_after(chat, game, user_id, PROMPT_TTL, async move {
        if let Err(e) = cleanup_bot.delete_message(chat_id, prompt_id).await {
            debug!(chat = chat_id.0, error = %e, "expired prompt delete failed");
        }
    });
    Ok(())
}

// ── Message dispatch ─────────────────────────────────────────────────────

/// Route a non-command group message: game replies first, then join
/// bookkeeping, then plain-text activity XP.
pub async fn message(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let chat = msg.chat.id.0;
    let user_id = user.id.0;

    if msg.dice().is_some()
        && ctx.tracker.is_active(chat, GameKind::Dice, user_id)
        && replied_to_me(bot, msg, ctx).await
    {
        return dice_reply(bot, msg, user, ctx).await;
    }

    if let Some(choice) = msg.text().and_then(|t| emoji_choice(t.trim())) {
        if ctx.tracker.is_active(chat, GameKind::Rps, user_id)
            && replied_to_me(bot, msg, ctx).await
        {
            return rps_reply(bot, msg, user, choice, ctx).await;
        }
    }

    if let Some(members) = msg.new_chat_members() {
        return members_joined(msg, members, ctx).await;
    }

    if msg.text().is_some() {
        return text_activity(bot, msg, user, ctx).await;
    }
    Ok(())
}

async fn replied_to_me(bot: &Bot, msg: &Message, ctx: &BotContext) -> bool {
    let Some(reply) = msg.reply_to_message() else {
        return false;
    };
    match ctx.me(bot).await {
        Ok(me) => reply.from.as_ref().is_some_and(|u| u.id == me.user.id),
        Err(e) => {
            warn!(error = %e, "could not resolve own identity");
            false
        },
    }
}

/// Resolve a dice duel: the player already rolled via the 🎲 emoji, the
/// bot rolls back and announces the result after a short pause.
async fn dice_reply(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let Some(player) = msg.dice().map(|d| d.value) else {
        return Ok(());
    };
    let chat = msg.chat.id;
    let user_id = user.id.0 as i64;

    // Close the session first so the prompt-expiry timer stands down.
    ctx.tracker.end(chat.0, GameKind::Dice, user.id.0);

    let house_msg = bot.send_dice(chat).await?;
    let house = house_msg.dice().map(|d| d.value).unwrap_or_default();
    tokio::time::sleep(DICE_SUSPENSE).await;

    let outcome = dice::outcome(player, house);
    let xp = dice::reward(outcome);
    let total = ctx.store.add_xp(user_id, xp).await?;
    info!(
        chat = chat.0,
        user = user_id,
        player,
        house,
        outcome = outcome.as_str(),
        xp,
        "group dice round"
    );

    let locale = locale_of(user);
    let text = ctx.catalog.render(
        locale,
        "group-dice-result",
        &[
            ("player_roll", player.to_string()),
            ("house_roll", house.to_string()),
            (
                "result_text",
                ctx.catalog.msg(locale, &format!("dice-{}", outcome.as_str())),
            ),
            ("xp", xp.to_string()),
            ("total", total.to_string()),
        ],
    );
    let result_msg = bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    let prompt = msg.reply_to_message().map(|r| r.id);
    schedule_cleanup(bot, chat, transient_ids(msg.id, prompt, house_msg.id, result_msg.id));
    Ok(())
}

/// Resolve an RPS duel: the player's emoji is in, the bot reveals its own
/// choice and announces the result.
async fn rps_reply(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    player: rps::Choice,
    ctx: &BotContext,
) -> Result<()> {
    let chat = msg.chat.id;
    let user_id = user.id.0 as i64;

    ctx.tracker.end(chat.0, GameKind::Rps, user.id.0);

    let house = {
        let mut rng = rand::rng();
        rps::Choice::random(&mut rng)
    };
    let house_msg = bot
        .send_message(chat, choice_emoji(house))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    tokio::time::sleep(RPS_SUSPENSE).await;

    let outcome = rps::outcome(player, house);
    let xp = rps::reward(outcome);
    let total = ctx.store.add_xp(user_id, xp).await?;
    info!(
        chat = chat.0,
        user = user_id,
        player = player.as_str(),
        house = house.as_str(),
        outcome = outcome.as_str(),
        xp,
        "group rps round"
    );

    let locale = locale_of(user);
    let text = ctx.catalog.render(
        locale,
        "group-rps-result",
        &[
            ("player_choice", choice_label(ctx, locale, player)),
            ("house_choice", choice_label(ctx, locale, house)),
            (
                "result_text",
                ctx.catalog.msg(locale, &format!("rps-{}", outcome.as_str())),
            ),
            ("xp", xp.to_string()),
            ("total", total.to_string()),
        ],
    );
    let result_msg = bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    let prompt = msg.reply_to_message().map(|r| r.id);
    schedule_cleanup(bot, chat, transient_ids(msg.id, prompt, house_msg.id, result_msg.id));
    Ok(())
}

/// Welcome XP for known users joining the chat. Unknown members are left
/// alone until they talk to the bot themselves.
async fn members_joined(msg: &Message, members: &[TgUser], ctx: &BotContext) -> Result<()> {
    for member in members {
        if member.is_bot {
            continue;
        }
        let id = member.id.0 as i64;
        if ctx.store.get_user(id).await?.is_none() {
            continue;
        }
        ctx.store
            .record_chat_membership(id, msg.chat.id.0, false)
            .await?;
        let total = ctx.store.add_xp(id, GROUP_JOIN_XP).await?;
        info!(chat = msg.chat.id.0, user = id, total, "join bonus granted");
    }
    Ok(())
}

/// Every plain message earns a sliver of XP and refreshes the member's
/// admin flag.
async fn text_activity(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let id = user.id.0 as i64;
    ctx.store.add_xp(id, GROUP_ACTIVITY_XP).await?;

    let is_admin = match bot.get_chat_member(msg.chat.id, user.id).await {
        Ok(member) => member.kind.is_privileged(),
        Err(e) => {
            // Degrade to non-admin; the flag refreshes on the next message.
            warn!(chat = msg.chat.id.0, user = id, error = %e, "admin check failed");
            false
        },
    };
    ctx.store
        .record_chat_membership(id, msg.chat.id.0, is_admin)
        .await?;
    Ok(())
}

// ── Emoji mapping ────────────────────────────────────────────────────────

pub(crate) fn emoji_choice(text: &str) -> Option<rps::Choice> {
    match text {
        "🤜" => Some(rps::Choice::Rock),
        "🧳" => Some(rps::Choice::Paper),
        "✂️" | "✂" => Some(rps::Choice::Scissors),
        _ => None,
    }
}

fn choice_emoji(choice: rps::Choice) -> &'static str {
    match choice {
        rps::Choice::Rock => "🤜",
        rps::Choice::Paper => "🧳",
        rps::Choice::Scissors => "✂️",
    }
}

/// Everything a finished round leaves behind: the player's reply, the
/// prompt it answered, the bot's counter-move and the result itself.
fn transient_ids(
    player: MessageId,
    prompt: Option<MessageId>,
    house: MessageId,
    result: MessageId,
) -> Vec<MessageId> {
    let mut ids = vec![player, house, result];
    ids.extend(prompt);
    ids
}

fn schedule_cleanup(bot: &Bot, chat: ChatId, ids: Vec<MessageId>) {
    let bot = bot.clone();
    tokio::spawn(async move {
        tokio::time::sleep(CLEANUP_DELAY).await;
        for id in ids {
            if let Err(e) = bot.delete_message(chat, id).await {
                debug!(chat = chat.0, message = id.0, error = %e, "cleanup delete failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_mapping_round_trips() {
        for choice in rps::Choice::ALL {
            assert_eq!(emoji_choice(choice_emoji(choice)), Some(choice));
        }
        // The scissors emoji arrives with or without the variation selector.
        assert_eq!(emoji_choice("✂"), Some(rps::Choice::Scissors));
        assert_eq!(emoji_choice("🎲"), None);
        assert_eq!(emoji_choice("rock"), None);
    }

    #[test]
    fn cleanup_covers_the_whole_round() {
        let ids = transient_ids(MessageId(1), Some(MessageId(2)), MessageId(3), MessageId(4));
        assert_eq!(ids.len(), 4);
        // The result announcement is swept along with the rest.
        assert!(ids.contains(&MessageId(4)));

        let no_prompt = transient_ids(MessageId(1), None, MessageId(3), MessageId(4));
        assert_eq!(no_prompt, vec![MessageId(1), MessageId(3), MessageId(4)]);
    }
}
