//! Update handlers, split by surface: private-chat menus, game screens,
//! group-chat flows and owner commands. The dispatcher funnels every
//! update into one of the three endpoints here.

pub mod admin;
pub mod games;
pub mod group;
pub mod personal;

use std::sync::Arc;

use {
    anyhow::Result,
    teloxide::{
        Bot,
        prelude::*,
        types::{ChatId, InlineKeyboardMarkup, Message, MessageId, ParseMode},
    },
    tracing::{debug, warn},
};

use crate::{
    commands::Command,
    context::{BotContext, locale_of},
};

/// Command entry point for every chat kind.
pub async fn command(bot: Bot, msg: Message, cmd: Command, ctx: Arc<BotContext>) -> Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let private = msg.chat.is_private();

    // /start bootstraps the user itself so a referral payload can land in
    // the freshly created row.
    if let Command::Start(args) = &cmd {
        if private {
            return personal::start(&bot, &msg, &user, args, &ctx).await;
        }
        return Ok(());
    }
    ctx.ensure_user(&user).await;

    match cmd {
        Command::Help if private => personal::help(&bot, &msg, &user, &ctx).await,
        Command::Help => group::help(&bot, &msg, &user, &ctx).await,
        Command::About if private => personal::about(&bot, &msg, &user, &ctx).await,
        Command::Profile if private => personal::profile(&bot, &msg, &user, &ctx).await,
        Command::Profile => group::profile(&bot, &msg, &user, &ctx).await,
        Command::Top if private => personal::top(&bot, &msg, &user, &ctx).await,
        Command::Top => group::top(&bot, &msg, &user, &ctx).await,
        Command::Settings if private => personal::settings(&bot, &msg, &user, &ctx).await,
        Command::Dice if private => games::dice_screen_cmd(&bot, &msg, &user, &ctx).await,
        Command::Dice => group::dice_prompt(&bot, &msg, &user, &ctx).await,
        Command::Rps if private => games::rps_screen_cmd(&bot, &msg, &user, &ctx).await,
        Command::Rps => group::rps_prompt(&bot, &msg, &user, &ctx).await,
        Command::RpsApp if private => games::rps_app_cmd(&bot, &msg, &user, &ctx).await,
        Command::TttApp if private => games::ttt_app_cmd(&bot, &msg, &user, &ctx).await,
        Command::Stats if !private => group::stats(&bot, &msg, &user, &ctx).await,
        Command::Ping => admin::ping(&bot, &msg, &user, &ctx).await,
        Command::AddXp(args) => admin::add_xp(&bot, &msg, &user, &args, &ctx).await,
        Command::AddBonus(args) => admin::add_bonus(&bot, &msg, &user, &args, &ctx).await,
        // A private-only command in a group (or vice versa) is ignored.
        _ => Ok(()),
    }
}

/// Callback-query entry point. Routes on the button payload; a failed or
/// unrecognized payload answers with a generic error toast so the button
/// spinner always stops.
pub async fn callback(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> Result<()> {
    ctx.ensure_user(&q.from).await;
    let data = q.data.clone().unwrap_or_default();

    match route_callback(&bot, &q, &data, &ctx).await {
        Ok(Some(toast)) => {
            bot.answer_callback_query(q.id.clone()).text(toast).await?;
        },
        Ok(None) => {
            bot.answer_callback_query(q.id.clone()).await?;
        },
        Err(e) => {
            warn!(%data, error = %e, "callback handler failed");
            let toast = ctx.catalog.msg(locale_of(&q.from), "generic-error");
            bot.answer_callback_query(q.id.clone()).text(toast).await?;
        },
    }
    Ok(())
}

/// Dispatch a callback payload. Returns an optional toast for the
/// answer-callback acknowledgment.
async fn route_callback(
    bot: &Bot,
    q: &CallbackQuery,
    data: &str,
    ctx: &BotContext,
) -> Result<Option<String>> {
    match data {
        "main_menu" => personal::cb_main_menu(bot, q, ctx).await,
        "profile" => personal::cb_profile(bot, q, ctx).await,
        "achievements" => personal::cb_achievements(bot, q, ctx).await,
        "my_bonuses" => personal::cb_my_bonuses(bot, q, ctx).await,
        "referral" => personal::cb_referral(bot, q, ctx).await,
        "help" => personal::cb_help(bot, q, ctx).await,
        "about" => personal::cb_about(bot, q, ctx).await,
        "games_menu" => games::cb_games_menu(bot, q, ctx).await,
        "game:dice" => games::cb_dice_screen(bot, q, ctx).await,
        "game:rps" => games::cb_rps_screen(bot, q, ctx).await,
        "dice:roll" => games::cb_dice_roll(bot, q, ctx).await,
        "settings" => personal::cb_settings(bot, q, ctx).await,
        _ => {
            if let Some(choice) = data.strip_prefix("rps:") {
                return games::cb_rps_choice(bot, q, choice, ctx).await;
            }
            if let Some(page) = data.strip_prefix("top:") {
                return personal::cb_top(bot, q, page, ctx).await;
            }
            if let Some(section) = data.strip_prefix("settings:") {
                return personal::cb_settings_section(bot, q, section, ctx).await;
            }
            if data.starts_with("notifications:")
                || data.starts_with("language:")
                || data.starts_with("privacy:")
            {
                return personal::cb_setting_saved(bot, q, ctx).await;
            }
            warn!(data, "unrecognized callback payload");
            Ok(Some(ctx.catalog.msg(locale_of(&q.from), "generic-error")))
        },
    }
}

/// Fallback for non-command messages: mini-app results in private chats,
/// game replies and activity accounting in groups.
pub async fn message(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }
    ctx.ensure_user(&user).await;

    if msg.chat.is_private() {
        if msg.web_app_data().is_some() {
            return games::webapp_result(&bot, &msg, &user, &ctx).await;
        }
        return Ok(());
    }
    if msg.chat.is_group() || msg.chat.is_supergroup() {
        return group::message(&bot, &msg, &user, &ctx).await;
    }
    Ok(())
}

/// Send an HTML message with an inline keyboard.
pub(crate) async fn send_screen(
    bot: &Bot,
    chat: ChatId,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> Result<()> {
    bot.send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Edit a menu message in place. Telegram rejects edits that leave the
/// message unchanged (a double-pressed button); that outcome is fine, so
/// edit failures are logged and swallowed.
pub(crate) async fn edit_screen(
    bot: &Bot,
    chat: ChatId,
    message: MessageId,
    text: String,
    keyboard: InlineKeyboardMarkup,
) {
    let result = bot
        .edit_message_text(chat, message, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await;
    if let Err(e) = result {
        debug!(error = %e, "message edit skipped");
    }
}

/// Chat and message id behind a callback query, when Telegram still lets
/// us reach the message.
pub(crate) fn callback_target(q: &CallbackQuery) -> Option<(ChatId, MessageId)> {
    let message = q.message.as_ref()?;
    Some((message.chat().id, message.id()))
}
