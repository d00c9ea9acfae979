//! Inline keyboard layouts. Button labels come from the catalog, button
//! payloads are the callback-data strings parsed in `handlers`.

use {
    teloxide::types::{
        ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
        WebAppInfo,
    },
    url::Url,
};

use rollick_l10n::Catalog;

fn btn(c: &Catalog, locale: Option<&str>, label_key: &str, data: &str) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(c.msg(locale, label_key), data.to_string())
}

pub fn main_menu(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            btn(c, locale, "btn-profile", "profile"),
            btn(c, locale, "btn-top", "top:1"),
        ],
        vec![
            btn(c, locale, "btn-games", "games_menu"),
            btn(c, locale, "btn-settings", "settings"),
        ],
        vec![
            btn(c, locale, "btn-help", "help"),
            btn(c, locale, "btn-about", "about"),
        ],
    ])
}

pub fn games_menu(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            btn(c, locale, "btn-dice", "game:dice"),
            btn(c, locale, "btn-rps", "game:rps"),
        ],
        vec![btn(c, locale, "btn-main-menu", "main_menu")],
    ])
}

pub fn dice_game(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![btn(c, locale, "btn-roll", "dice:roll")],
        vec![btn(c, locale, "btn-back", "games_menu")],
    ])
}

pub fn rps_game(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            btn(c, locale, "btn-rock", "rps:rock"),
            btn(c, locale, "btn-paper", "rps:paper"),
            btn(c, locale, "btn-scissors", "rps:scissors"),
        ],
        vec![btn(c, locale, "btn-back", "games_menu")],
    ])
}

pub fn profile(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            btn(c, locale, "btn-achievements", "achievements"),
            btn(c, locale, "btn-bonuses", "my_bonuses"),
        ],
        vec![btn(c, locale, "btn-referral", "referral")],
        vec![btn(c, locale, "btn-main-menu", "main_menu")],
    ])
}

pub fn top(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            btn(c, locale, "btn-top-all", "top:1"),
            btn(c, locale, "btn-top-me", "top:me"),
        ],
        vec![btn(c, locale, "btn-main-menu", "main_menu")],
    ])
}

pub fn settings(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            btn(c, locale, "btn-notifications", "settings:notifications"),
            btn(c, locale, "btn-language", "settings:language"),
        ],
        vec![btn(c, locale, "btn-privacy", "settings:privacy")],
        vec![btn(c, locale, "btn-main-menu", "main_menu")],
    ])
}

pub fn notification_settings(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("🔔 On", "notifications:all_on"),
            InlineKeyboardButton::callback("🔕 Off", "notifications:all_off"),
        ],
        vec![btn(c, locale, "btn-back", "settings")],
    ])
}

pub fn language_settings(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("🇺🇦 Українська", "language:uk"),
            InlineKeyboardButton::callback("🇬🇧 English", "language:en"),
        ],
        vec![btn(c, locale, "btn-back", "settings")],
    ])
}

pub fn privacy_settings(c: &Catalog, locale: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("👁️ Public", "privacy:public"),
            InlineKeyboardButton::callback("🕶️ Private", "privacy:private"),
        ],
        vec![btn(c, locale, "btn-back", "settings")],
    ])
}

/// Reply keyboard with a single web-app button. Only this button kind
/// delivers the app's score back as a `web_app_data` message.
pub fn webapp_launch(c: &Catalog, locale: Option<&str>, url: Url) -> KeyboardMarkup {
    KeyboardMarkup::new([[
        KeyboardButton::new(c.msg(locale, "btn-open-app"))
            .request(ButtonRequest::WebApp(WebAppInfo { url })),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin("en").unwrap()
    }

    #[test]
    fn main_menu_has_six_buttons() {
        let kb = main_menu(&catalog(), Some("en"));
        let count: usize = kb.inline_keyboard.iter().map(|row| row.len()).sum();
        assert_eq!(count, 6);
    }

    #[test]
    fn rps_keyboard_covers_all_choices() {
        let kb = rps_game(&catalog(), Some("en"));
        let payloads: Vec<String> = kb
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(d) => Some(d.clone()),
                _ => None,
            })
            .collect();
        for choice in ["rps:rock", "rps:paper", "rps:scissors"] {
            assert!(payloads.contains(&choice.to_string()), "missing {choice}");
        }
    }

    #[test]
    fn webapp_button_carries_the_url() {
        let url = Url::parse("https://games.example/rps").unwrap();
        let kb = webapp_launch(&catalog(), Some("en"), url.clone());
        assert_eq!(
            kb.keyboard[0][0].request,
            Some(ButtonRequest::WebApp(WebAppInfo { url }))
        );
    }
}
