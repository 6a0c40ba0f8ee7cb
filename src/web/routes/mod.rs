pub mod tag_routes;
pub mod user_routes;
pub mod vm_routes;

use uuid::Uuid;

use crate::web::AppError;
use crate::web::middleware::i18n::current_locale;

/// Treats missing, empty and the literal "None" as absent, the way older
/// clients send unset ids.
pub(crate) fn present(raw: Option<String>) -> Option<String> {
    raw.filter(|v| !v.is_empty() && v != "None")
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::InvalidInput(
            t!("errors.validation", locale = &current_locale(), detail = format!("{field} must be a UUID, got '{raw}'")).to_string(),
        )
    })
}

pub(crate) fn parse_user_id(raw: &str) -> Result<i32, AppError> {
    raw.trim().parse::<i32>().map_err(|_| {
        AppError::InvalidInput(
            t!("errors.validation", locale = &current_locale(), detail = format!("user_id must be an integer, got '{raw}'")).to_string(),
        )
    })
}
