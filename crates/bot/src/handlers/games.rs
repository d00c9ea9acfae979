//! Private-chat game screens: inline-button dice and rock-paper-scissors,
//! plus mini-app score ingestion.

use {
    anyhow::Result,
    serde::Deserialize,
    teloxide::{
        Bot,
        prelude::*,
        types::{ParseMode, User as TgUser},
    },
    tracing::{info, warn},
    url::Url,
};

use rollick_games::{Outcome, dice, rps};

use crate::{
    context::{BotContext, locale_of},
    handlers::{callback_target, edit_screen, send_screen},
    keyboards,
};

// ── Commands ─────────────────────────────────────────────────────────────

pub async fn dice_screen_cmd(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    ctx: &BotContext,
) -> Result<()> {
    let locale = locale_of(user);
    send_screen(
        bot,
        msg.chat.id,
        ctx.catalog.msg(locale, "dice-start"),
        keyboards::dice_game(&ctx.catalog, locale),
    )
    .await
}

pub async fn rps_screen_cmd(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    ctx: &BotContext,
) -> Result<()> {
    let locale = locale_of(user);
    send_screen(
        bot,
        msg.chat.id,
        ctx.catalog.msg(locale, "rps-start"),
        keyboards::rps_game(&ctx.catalog, locale),
    )
    .await
}

// ── Callbacks ────────────────────────────────────────────────────────────

pub async fn cb_games_menu(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    edit_screen(
        bot,
        chat,
        id,
        ctx.catalog.msg(locale, "games-menu"),
        keyboards::games_menu(&ctx.catalog, locale),
    )
    .await;
    Ok(None)
}

pub async fn cb_dice_screen(
    bot: &Bot,
    q: &CallbackQuery,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    edit_screen(
        bot,
        chat,
        id,
        ctx.catalog.msg(locale, "dice-start"),
        keyboards::dice_game(&ctx.catalog, locale),
    )
    .await;
    Ok(None)
}

pub async fn cb_rps_screen(
    bot: &Bot,
    q: &CallbackQuery,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    edit_screen(
        bot,
        chat,
        id,
        ctx.catalog.msg(locale, "rps-start"),
        keyboards::rps_game(&ctx.catalog, locale),
    )
    .await;
    Ok(None)
}

/// Resolve one dice round and show the result on the same screen.
pub async fn cb_dice_roll(bot: &Bot, q: &CallbackQuery, ctx: &BotContext) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let user_id = q.from.id.0 as i64;

    // The thread-local rng is not Send, so the round resolves before any
    // await point.
    let (player, house, outcome) = {
        let mut rng = rand::rng();
        dice::play(&mut rng)
    };
    let xp = dice::reward(outcome);
    ctx.store.add_xp(user_id, xp).await?;
    info!(user = user_id, player, house, outcome = outcome.as_str(), xp, "dice round");

    let text = ctx.catalog.render(
        locale,
        "dice-result",
        &[
            ("player_roll", player.to_string()),
            ("house_roll", house.to_string()),
            (
                "result_text",
                ctx.catalog.msg(locale, &format!("dice-{}", outcome.as_str())),
            ),
            ("xp", xp.to_string()),
        ],
    );
    edit_screen(bot, chat, id, text, keyboards::dice_game(&ctx.catalog, locale)).await;
    Ok(None)
}

/// Resolve one RPS round for a button press carrying the player's choice.
pub async fn cb_rps_choice(
    bot: &Bot,
    q: &CallbackQuery,
    raw_choice: &str,
    ctx: &BotContext,
) -> Result<Option<String>> {
    let Some((chat, id)) = callback_target(q) else {
        return Ok(None);
    };
    let locale = locale_of(&q.from);
    let user_id = q.from.id.0 as i64;

    let (player, house, outcome) = {
        let mut rng = rand::rng();
        rps::play(&mut rng, raw_choice)
    };
    let xp = rps::reward(outcome);
    ctx.store.add_xp(user_id, xp).await?;
    info!(
        user = user_id,
        player = player.as_str(),
        house = house.as_str(),
        outcome = outcome.as_str(),
        xp,
        "rps round"
    );

    let text = ctx.catalog.render(
        locale,
        "rps-result",
        &[
            ("player_choice", choice_label(ctx, locale, player)),
            ("house_choice", choice_label(ctx, locale, house)),
            (
                "result_text",
                ctx.catalog.msg(locale, &format!("rps-{}", outcome.as_str())),
            ),
            ("xp", xp.to_string()),
        ],
    );
    edit_screen(bot, chat, id, text, keyboards::rps_game(&ctx.catalog, locale)).await;
    Ok(None)
}

pub(crate) fn choice_label(ctx: &BotContext, locale: Option<&str>, choice: rps::Choice) -> String {
    ctx.catalog.msg(locale, &format!("rps-{}", choice.as_str()))
}

// ── Mini-app launchers ───────────────────────────────────────────────────

pub async fn rps_app_cmd(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    launch_app(bot, msg, user, ctx, ctx.webapps.rps.as_deref(), "webapp-rps-title").await
}

pub async fn ttt_app_cmd(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    launch_app(bot, msg, user, ctx, ctx.webapps.ttt.as_deref(), "webapp-ttt-title").await
}

/// Offer a reply-keyboard button that opens the mini-app; its score comes
/// back as a `web_app_data` message. Without a configured URL the game is
/// reported as unavailable.
async fn launch_app(
    bot: &Bot,
    msg: &Message,
    user: &TgUser,
    ctx: &BotContext,
    url: Option<&str>,
    title_key: &str,
) -> Result<()> {
    let locale = locale_of(user);
    let Some(url) = url.and_then(|u| Url::parse(u).ok()) else {
        warn!(key = title_key, "mini-app launch without a usable url");
        bot.send_message(msg.chat.id, ctx.catalog.msg(locale, "webapp-unavailable"))
            .await?;
        return Ok(());
    };

    let text = ctx.catalog.render(
        locale,
        "webapp-launch",
        &[("game", ctx.catalog.msg(locale, title_key))],
    );
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::webapp_launch(&ctx.catalog, locale, url))
        .await?;
    Ok(())
}

// ── Mini-app results ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WebAppPayload {
    #[serde(rename = "playerCount")]
    score: i64,
}

/// Scores far beyond anything the mini-apps can produce. The payload is
/// attacker-controlled, so the reward math must not overflow on it.
const SCORE_LIMIT: i64 = 1_000_000;

/// Outcome and XP for a mini-app score. Positive scores win and pay out
/// per three points, negative scores lose with a consolation floor.
pub fn webapp_reward(score: i64) -> (Outcome, i64) {
    let score = score.clamp(-SCORE_LIMIT, SCORE_LIMIT);
    if score > 0 {
        (Outcome::Win, ((score / 3) * 15).max(15))
    } else if score == 0 {
        (Outcome::Draw, 5)
    } else {
        (Outcome::Lose, ((-score / 2) * 2).max(2))
    }
}

/// Handle a `web_app_data` message from the game mini-app. A payload that
/// fails to parse gets an error reply instead of silently dropping.
pub async fn webapp_result(bot: &Bot, msg: &Message, user: &TgUser, ctx: &BotContext) -> Result<()> {
    let Some(data) = msg.web_app_data() else {
        return Ok(());
    };
    let locale = locale_of(user);

    let score = match serde_json::from_str::<WebAppPayload>(&data.data) {
        Ok(payload) => payload.score,
        Err(e) => {
            warn!(user = user.id.0, error = %e, "malformed mini-app payload");
            bot.send_message(msg.chat.id, ctx.catalog.msg(locale, "webapp-error"))
                .await?;
            return Ok(());
        },
    };

    let (outcome, xp) = webapp_reward(score);
    ctx.store.add_xp(user.id.0 as i64, xp).await?;
    info!(user = user.id.0, score, outcome = outcome.as_str(), xp, "mini-app round");

    let text = ctx.catalog.render(
        locale,
        "webapp-result",
        &[
            // Shown without the sign; the result line already says lost.
            ("score", score.unsigned_abs().to_string()),
            (
                "result_text",
                ctx.catalog.msg(locale, &format!("webapp-{}", outcome.as_str())),
            ),
            ("xp", xp.to_string()),
        ],
    );
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::main_menu(&ctx.catalog, locale))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(9, Outcome::Win, 45)]
    #[case(3, Outcome::Win, 15)]
    #[case(1, Outcome::Win, 15)]
    #[case(0, Outcome::Draw, 5)]
    #[case(-1, Outcome::Lose, 2)]
    #[case(-4, Outcome::Lose, 4)]
    #[case(-10, Outcome::Lose, 10)]
    fn webapp_scores_map_to_rewards(
        #[case] score: i64,
        #[case] outcome: Outcome,
        #[case] xp: i64,
    ) {
        assert_eq!(webapp_reward(score), (outcome, xp));
    }

    #[test]
    fn webapp_reward_survives_extreme_scores() {
        // Hostile payloads can carry any i64; the clamp keeps the math in
        // range instead of panicking or wrapping.
        assert_eq!(webapp_reward(i64::MIN), (Outcome::Lose, 1_000_000));
        assert_eq!(webapp_reward(i64::MAX), (Outcome::Win, 4_999_995));
        assert_eq!(webapp_reward(-SCORE_LIMIT - 1), webapp_reward(-SCORE_LIMIT));
        let (_, xp) = webapp_reward(i64::MIN + 1);
        assert!(xp > 0);
    }

    #[test]
    fn webapp_payload_parses_camel_case() {
        let payload: WebAppPayload = serde_json::from_str(r#"{"playerCount": 12}"#).unwrap();
        assert_eq!(payload.score, 12);
        assert!(serde_json::from_str::<WebAppPayload>("not json").is_err());
    }
}
