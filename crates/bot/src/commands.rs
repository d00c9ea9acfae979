//! Command definitions for private and group chats.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Main menu; an optional `ref_<id>` argument carries a referral.
    Start(String),
    Help,
    About,
    Profile,
    Top,
    Settings,
    Dice,
    Rps,
    /// Launch the rock-paper-scissors mini-app.
    #[command(rename = "rps_app")]
    RpsApp,
    /// Launch the tic-tac-toe mini-app.
    #[command(rename = "ttt_app")]
    TttApp,
    Stats,
    Ping,
    #[command(rename = "add_xp")]
    AddXp(String),
    #[command(rename = "add_bonus")]
    AddBonus(String),
}

/// Extract a referrer id from a `/start` payload of the form `ref_<id>`.
pub fn parse_referral(args: &str) -> Option<i64> {
    args.trim().strip_prefix("ref_")?.parse().ok()
}
