//! Message catalogs: key + named substitutions → rendered text.
//!
//! Presentation only — no game or persistence logic lives here. Catalogs
//! are flat TOML tables of templates with `{placeholder}` slots. Built-in
//! Ukrainian and English catalogs are embedded; extra locales can be
//! loaded at runtime.

use std::collections::HashMap;

use tracing::warn;

const UK: &str = include_str!("../locales/uk.toml");
const EN: &str = include_str!("../locales/en.toml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to parse locale {locale}: {source}")]
    Parse {
        locale: String,
        source: toml::de::Error,
    },
    #[error("locale {0} is not a flat table of strings")]
    Shape(String),
}

/// Localization catalog with a fallback locale.
pub struct Catalog {
    default_locale: String,
    locales: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    /// Catalog with the embedded locales ("uk", "en").
    pub fn builtin(default_locale: &str) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            default_locale: default_locale.to_string(),
            locales: HashMap::new(),
        };
        catalog.add_locale("uk", UK)?;
        catalog.add_locale("en", EN)?;
        Ok(catalog)
    }

    /// Parse and register a locale from TOML text. Replaces an existing
    /// locale of the same name.
    pub fn add_locale(&mut self, name: &str, raw: &str) -> Result<(), CatalogError> {
        let table: toml::Table = toml::from_str(raw).map_err(|source| CatalogError::Parse {
            locale: name.to_string(),
            source,
        })?;
        let mut messages = HashMap::new();
        for (key, value) in table {
            let toml::Value::String(template) = value else {
                return Err(CatalogError::Shape(name.to_string()));
            };
            messages.insert(key, template);
        }
        self.locales.insert(name.to_string(), messages);
        Ok(())
    }

    /// Render a message. `locale` is a BCP-47-ish code from the transport
    /// ("uk", "en-US"); only the primary subtag matters. Unknown locales
    /// fall back to the default; an unknown key renders as the key itself
    /// and logs a warning.
    pub fn render(&self, locale: Option<&str>, key: &str, args: &[(&str, String)]) -> String {
        let messages = self.messages_for(locale);
        match messages.and_then(|m| m.get(key)) {
            Some(template) => substitute(template, args),
            None => {
                warn!(key, locale, "missing localization key");
                key.to_string()
            },
        }
    }

    /// Render with no substitutions.
    pub fn msg(&self, locale: Option<&str>, key: &str) -> String {
        self.render(locale, key, &[])
    }

    fn messages_for(&self, locale: Option<&str>) -> Option<&HashMap<String, String>> {
        let primary = locale
            .map(|l| l.split(['-', '_']).next().unwrap_or(l))
            .unwrap_or(&self.default_locale);
        self.locales
            .get(primary)
            .or_else(|| self.locales.get(&self.default_locale))
    }
}

/// Replace `{name}` slots in a template. Unknown slots are left as-is;
/// `{{` escapes a literal brace.
fn substitute(template: &str, args: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        if after.starts_with('{') {
            out.push('{');
            rest = &after[1..];
            continue;
        }
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match args.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            None => {
                out.push('{');
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin("uk").unwrap()
    }

    #[test]
    fn builtin_locales_parse() {
        let c = catalog();
        assert!(c.locales.contains_key("uk"));
        assert!(c.locales.contains_key("en"));
    }

    #[test]
    fn substitutes_named_args() {
        let c = catalog();
        let text = c.render(Some("en"), "hello", &[("name", "Ann".to_string())]);
        assert!(text.contains("Ann"), "got: {text}");
    }

    #[test]
    fn unknown_locale_falls_back_to_default() {
        let c = catalog();
        let uk = c.msg(Some("uk"), "ping");
        assert_eq!(c.msg(Some("xx"), "ping"), uk);
        assert_eq!(c.msg(None, "ping"), uk);
    }

    #[test]
    fn region_subtag_is_ignored() {
        let c = catalog();
        assert_eq!(c.msg(Some("en-US"), "ping"), c.msg(Some("en"), "ping"));
    }

    #[test]
    fn unknown_key_renders_the_key() {
        let c = catalog();
        assert_eq!(c.msg(Some("en"), "no-such-key"), "no-such-key");
    }

    #[test]
    fn every_uk_key_exists_in_en() {
        let c = catalog();
        let uk = &c.locales["uk"];
        let en = &c.locales["en"];
        for key in uk.keys() {
            assert!(en.contains_key(key), "key {key} missing from en");
        }
        for key in en.keys() {
            assert!(uk.contains_key(key), "key {key} missing from uk");
        }
    }

    #[test]
    fn substitution_edge_cases() {
        assert_eq!(substitute("a {x} b", &[("x", "1".into())]), "a 1 b");
        assert_eq!(substitute("{missing}", &[]), "{missing}");
        assert_eq!(substitute("{{literal}", &[]), "{literal}");
        assert_eq!(substitute("tail {open", &[]), "tail {open");
    }
}
