//! Tag identity rules: normalization of (name, scope) and the NULL-safe
//! equality used by every uniqueness check and by-identity lookup.

use sea_orm::{ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter};

use crate::db::entities::{tag, vm};
use crate::db::services::error::{ServiceError, ServiceResult};

pub const MAX_FIELD_LEN: usize = 255;

/// A normalized (name, scope) pair. `None` is the single canonical "absent"
/// marker; an empty string never survives normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagIdentity {
    pub name: Option<String>,
    pub scope: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn normalize(name: Option<String>, scope: Option<String>) -> TagIdentity {
    TagIdentity {
        name: non_empty(name),
        scope: non_empty(scope),
    }
}

impl TagIdentity {
    pub fn new(name: Option<&str>, scope: Option<&str>) -> Self {
        normalize(name.map(str::to_owned), scope.map(str::to_owned))
    }

    /// Absent fields compile to `IS NULL`, present ones to plain equality.
    pub fn condition(&self) -> Condition {
        let name = match &self.name {
            Some(name) => tag::Column::Name.eq(name.as_str()),
            None => tag::Column::Name.is_null(),
        };
        Condition::all().add(name).add(scope_condition(self.scope.as_deref()))
    }

    /// Checks the field constraints and returns the (required) name.
    pub fn validate(&self) -> ServiceResult<&str> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| ServiceError::Validation("tag_name is required".to_string()))?;
        check_length("tag_name", name)?;
        if let Some(scope) = &self.scope {
            check_length("scope", scope)?;
        }
        Ok(name)
    }
}

pub fn scope_condition(scope: Option<&str>) -> sea_orm::sea_query::SimpleExpr {
    match scope {
        Some(scope) => tag::Column::Scope.eq(scope),
        None => tag::Column::Scope.is_null(),
    }
}

fn check_length(field: &str, value: &str) -> ServiceResult<()> {
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_vm_name(name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation("vm_name is required".to_string()));
    }
    check_length("vm_name", name)
}

pub async fn find_tag_by_identity<C: ConnectionTrait>(
    conn: &C,
    identity: &TagIdentity,
) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(identity.condition())
        .one(conn)
        .await
}

pub async fn tag_exists<C: ConnectionTrait>(conn: &C, identity: &TagIdentity) -> Result<bool, DbErr> {
    let count = tag::Entity::find()
        .filter(identity.condition())
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn vm_name_exists<C: ConnectionTrait>(conn: &C, name: &str) -> Result<bool, DbErr> {
    let count = vm::Entity::find()
        .filter(vm::Column::Name.eq(name))
        .count(conn)
        .await?;
    Ok(count > 0)
}
