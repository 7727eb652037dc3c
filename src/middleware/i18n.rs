// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

use crate::common::i18n::{I18nStore, DEFAULT_LANG};

// Language of the response messages (Persian unless the client asks otherwise)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let store = I18nStore::global();

        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .into_iter()
                    // "en-US" -> "en"
                    .map(|tag| tag.split('-').next().unwrap_or_default().to_lowercase())
                    .find(|lang| store.supports(lang))
            })
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn locale_for(value: &str) -> Locale {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_str(value).unwrap());
        Locale::from_headers(&headers)
    }

    #[test]
    fn defaults_to_persian() {
        assert_eq!(Locale::from_headers(&HeaderMap::new()).0, "fa");
    }

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(locale_for("en-US,en;q=0.9").0, "en");
        assert_eq!(locale_for("de-DE, en;q=0.5").0, "en");
        assert_eq!(locale_for("fr").0, "fa");
    }
}
