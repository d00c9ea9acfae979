//! Update routing and the long-polling loop.

use std::sync::Arc;

use {
    anyhow::Result,
    teloxide::{Bot, dispatching::UpdateHandler, dptree, prelude::*},
    tracing::{debug, info},
};

use crate::{commands::Command, context::BotContext, handlers};

/// The full routing tree: callback queries, the bot's own membership
/// changes, then messages (commands first, everything else after).
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::callback))
        .branch(Update::filter_my_chat_member().endpoint(handlers::group::bot_membership))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handlers::command),
                )
                .endpoint(handlers::message),
        )
}

/// Run the dispatcher until shutdown.
pub async fn run(bot: Bot, ctx: Arc<BotContext>) -> Result<()> {
    let me = ctx.me(&bot).await?;
    info!(username = me.username(), "starting dispatcher");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![ctx])
        .default_handler(|update| async move {
            debug!(id = update.id.0, "unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}
