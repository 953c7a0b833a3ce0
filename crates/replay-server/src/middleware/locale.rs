//! Request locale from `Accept-Language`

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use std::convert::Infallible;

/// Locale used when a request carries no usable `Accept-Language`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultLocale(pub String);

/// First language listed in `Accept-Language`, or the configured default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

/// `"en-US,en;q=0.9"` yields `en-US`
pub fn parse_accept_language(header: &str) -> Option<String> {
    let first = header.split(',').next()?;
    let tag = first.split(';').next()?.trim();
    if tag.is_empty() || tag == "*" {
        None
    } else {
        Some(tag.to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
    DefaultLocale: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_accept_language)
            .unwrap_or_else(|| DefaultLocale::from_ref(state).0);

        Ok(Locale(locale))
    }
}
