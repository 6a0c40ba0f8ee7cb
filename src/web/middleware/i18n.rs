use axum::{
    body::Body as AxumBody,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

/// Picks the first Accept-Language entry we have translations for.
pub fn resolve_locale(accept_language: Option<&str>) -> String {
    let available = rust_i18n::available_locales!();

    accept_language
        .into_iter()
        .flat_map(|value| value.split(','))
        .map(|entry| entry.split(';').next().unwrap_or_default().trim())
        .filter(|tag| !tag.is_empty())
        .find_map(|tag| {
            available
                .iter()
                .find(|locale| locale.eq_ignore_ascii_case(tag))
                .or_else(|| {
                    // "zh" or "en-US" fall back to the locale sharing the primary subtag.
                    let primary = tag.split('-').next().unwrap_or(tag);
                    available.iter().find(|locale| {
                        locale
                            .split('-')
                            .next()
                            .is_some_and(|p| p.eq_ignore_ascii_case(primary))
                    })
                })
                .map(|locale| locale.to_string())
        })
        .unwrap_or_else(|| "en".to_string())
}

tokio::task_local! {
    static REQUEST_LOCALE: String;
}

/// Locale of the request being handled, "en" outside of one.
pub fn current_locale() -> String {
    REQUEST_LOCALE
        .try_with(Clone::clone)
        .unwrap_or_else(|_| "en".to_string())
}

/// Scopes the negotiated locale to this request's task, so concurrent
/// requests never see each other's language.
pub async fn i18n_middleware(req: Request<AxumBody>, next: Next) -> Response {
    let locale = resolve_locale(
        req.headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    );

    REQUEST_LOCALE.scope(locale, next.run(req)).await
}
