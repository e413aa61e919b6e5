//! Entity services. Each `get_all` runs the same explicit pipeline: validate the
//! window, build the predicate, run the paginated fetch, then map (and for posts,
//! enrich) the rows.

mod categories;
mod posts;
mod users;

pub use categories::CategoryService;
pub use posts::PostService;
pub use users::UserService;

use crate::domain::error::DomainError;

pub(crate) const MAX_DISPLAY_NAME_LENGTH: usize = 100;
pub(crate) const MAX_TITLE_LENGTH: usize = 200;
pub(crate) const MAX_CATEGORY_NAME_LENGTH: usize = 64;

pub(crate) fn validate_required(
    field: &str,
    value: &str,
    max_len: usize,
) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "cannot be empty"));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(DomainError::validation(
            field,
            format!("too long: {len} characters (max: {max_len})"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email", format!("invalid email: '{email}'")));
    }
    Ok(())
}
