pub mod auth;
pub mod budget;
pub mod category;
pub mod expense;
pub mod health;

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::store::StoreError;
use crate::validation::FieldError;

/// Path ids arrive as strings so a malformed id gets our JSON envelope
/// instead of axum's plain-text rejection.
pub(crate) fn parse_id(raw: &str, resource: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {resource} ID format")))
}

/// 404 when the record is missing, 403 when someone else owns it.
pub(crate) fn owned<T>(
    record: Option<T>,
    owner_of: impl FnOnce(&T) -> Uuid,
    user: AuthUser,
    resource: &str,
) -> ApiResult<T> {
    let record = record.ok_or_else(|| ApiError::NotFound(format!("{resource} not found")))?;
    if owner_of(&record) != user.0 {
        return Err(ApiError::Forbidden(format!(
            "Not authorized to access this {}",
            resource.to_lowercase()
        )));
    }
    Ok(record)
}

pub(crate) fn on_duplicate(message: &'static str) -> impl Fn(StoreError) -> ApiError {
    move |err| match err {
        StoreError::Duplicate => ApiError::Duplicate(message.into()),
        other => ApiError::Store(other),
    }
}

/// Field errors for every id in `category_ids` that is not one of the
/// caller's categories. `field` receives the index of the offending id.
pub(crate) async fn unknown_categories(
    state: &AppState,
    user: AuthUser,
    category_ids: &[Uuid],
    field: fn(usize) -> String,
) -> ApiResult<Vec<FieldError>> {
    let mut errors = Vec::new();
    for (index, &category_id) in category_ids.iter().enumerate() {
        let known = state
            .categories
            .find_by_id(category_id)
            .await?
            .is_some_and(|category| category.user_id == user.0);
        if !known {
            errors.push(FieldError::new(field(index), "Category not found"));
        }
    }
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_bad_requests() {
        let err = parse_id("42", "Budget").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid Budget ID format"));
    }

    #[test]
    fn ownership_distinguishes_missing_from_foreign() {
        let me = AuthUser(Uuid::new_v4());
        let someone_else = Uuid::new_v4();

        let missing = owned(None::<Uuid>, |id| *id, me, "Budget").unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(ref m) if m == "Budget not found"));

        let foreign = owned(Some(someone_else), |id| *id, me, "Budget").unwrap_err();
        assert!(
            matches!(foreign, ApiError::Forbidden(ref m) if m == "Not authorized to access this budget")
        );

        assert_eq!(owned(Some(me.0), |id| *id, me, "Budget").unwrap(), me.0);
    }

    #[test]
    fn duplicates_get_the_resource_message() {
        let map = on_duplicate("Budget with this name already exists");
        assert!(matches!(map(StoreError::Duplicate), ApiError::Duplicate(_)));
        assert!(matches!(
            map(StoreError::Unavailable("down".into())),
            ApiError::Store(_)
        ));
    }
}
