// src/common/i18n.rs

use std::{collections::HashMap, sync::LazyLock};

use crate::middleware::i18n::Locale;

pub const DEFAULT_LANG: &str = "fa";

static CATALOGS: &[(&str, &str)] = &[
    ("fa", include_str!("../../locales/fa.json")),
    ("en", include_str!("../../locales/en.json")),
];

static STORE: LazyLock<I18nStore> = LazyLock::new(I18nStore::load_embedded);

/// Message catalogs keyed by language, then by message key.
#[derive(Debug, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    /// The process-wide store built from the catalogs compiled into the binary.
    pub fn global() -> &'static I18nStore {
        &STORE
    }

    fn load_embedded() -> Self {
        let mut store = Self::default();
        for (lang, raw) in CATALOGS {
            match serde_json::from_str::<HashMap<String, String>>(raw) {
                Ok(messages) => {
                    store.catalogs.insert((*lang).to_string(), messages);
                }
                Err(e) => tracing::error!("invalid message catalog '{}': {}", lang, e),
            }
        }
        store
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Looks the key up in `lang`, then in the default language, then gives the key back.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|messages| messages.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Same as `translate`, replacing every `{name}` placeholder with its value.
    pub fn translate_with(&self, lang: &str, key: &str, args: &[(&str, String)]) -> String {
        let mut message = self.translate(lang, key);
        for (name, value) in args {
            message = message.replace(&format!("{{{}}}", name), value);
        }
        message
    }

    pub fn t(&self, locale: &Locale, key: &str) -> String {
        self.translate(&locale.0, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_share_the_same_keys() {
        let store = I18nStore::global();
        let fa = &store.catalogs["fa"];
        let en = &store.catalogs["en"];
        let mut missing: Vec<_> = fa.keys().filter(|k| !en.contains_key(*k)).collect();
        missing.extend(en.keys().filter(|k| !fa.contains_key(*k)));
        assert!(missing.is_empty(), "keys missing in one catalog: {missing:?}");
    }

    #[test]
    fn unknown_language_falls_back_to_persian() {
        let store = I18nStore::global();
        assert_eq!(
            store.translate("de", "error.forbidden"),
            store.translate("fa", "error.forbidden")
        );
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        assert_eq!(I18nStore::global().translate("en", "nope.key"), "nope.key");
    }

    #[test]
    fn placeholders_are_filled() {
        let msg = I18nStore::global().translate_with(
            "en",
            "error.company_has_contacts",
            &[("count", "3".to_string())],
        );
        assert_eq!(msg, "This company still has 3 contacts and cannot be deleted.");
    }
}
