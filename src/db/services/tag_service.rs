use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::entities::{tag, vm_tag};
use crate::db::services::error::{duplicate_on_conflict, ServiceError, ServiceResult};
use crate::db::services::identity::{self, TagIdentity};
use crate::db::services::user_service;
use crate::services::tag_policy::{self, DeletionDecision};

// --- Tag Service Functions ---

/// Equality filters for tag lookups. Set fields are ANDed; an empty filter
/// matches every tag.
#[derive(Debug, Default, Clone)]
pub struct TagFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub scope: Option<String>,
    pub owner_id: Option<i32>,
}

impl TagFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(id) = self.id {
            condition = condition.add(tag::Column::Id.eq(id));
        }
        if let Some(name) = &self.name {
            condition = condition.add(tag::Column::Name.eq(name.as_str()));
        }
        if let Some(scope) = &self.scope {
            // "" selects global tags, the same way it is stored on creation.
            let scope = Some(scope.as_str()).filter(|s| !s.is_empty());
            condition = condition.add(identity::scope_condition(scope));
        }
        if let Some(owner_id) = self.owner_id {
            condition = condition.add(tag::Column::UserId.eq(owner_id));
        }
        condition
    }
}

pub(crate) fn describe(identity: &TagIdentity) -> String {
    match (&identity.name, &identity.scope) {
        (Some(name), Some(scope)) => format!("tag '{name}' in scope '{scope}'"),
        (Some(name), None) => format!("tag '{name}' (global scope)"),
        (None, _) => "unnamed tag".to_string(),
    }
}

/// Pre-checks the identity and inserts a new tag row on `conn`.
pub(crate) async fn insert_tag<C: ConnectionTrait>(
    conn: &C,
    identity: &TagIdentity,
    owner_id: i32,
) -> ServiceResult<tag::Model> {
    identity.validate()?;

    if identity::tag_exists(conn, identity).await? {
        return Err(ServiceError::Duplicate(describe(identity)));
    }

    insert_tag_row(conn, identity, owner_id).await
}

/// Inserts without looking first. The unique index decides, and its violation
/// is reported as `Duplicate`.
pub(crate) async fn insert_tag_row<C: ConnectionTrait>(
    conn: &C,
    identity: &TagIdentity,
    owner_id: i32,
) -> ServiceResult<tag::Model> {
    let name = identity.validate()?.to_owned();

    let new_tag = tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        scope: Set(identity.scope.clone()),
        user_id: Set(owner_id),
    };
    new_tag
        .insert(conn)
        .await
        .map_err(|e| duplicate_on_conflict(e, || describe(identity)))
}

/// Creates a tag owned by `owner_id`. Name and scope are normalized first, so
/// an empty scope collides with an existing global tag of the same name.
pub async fn create_tag(
    db: &DatabaseConnection,
    name: Option<&str>,
    scope: Option<&str>,
    owner_id: i32,
) -> ServiceResult<tag::Model> {
    let identity = TagIdentity::new(name, scope);
    identity.validate()?;

    let txn = db.begin().await?;
    if !user_service::user_exists(&txn, owner_id).await? {
        return Err(ServiceError::NotFound(format!("user {owner_id}")));
    }
    let tag = insert_tag(&txn, &identity, owner_id).await?;
    txn.commit().await?;

    info!(tag_id = %tag.id, name = %tag.name, scope = ?tag.scope, owner_id, "Tag created.");
    Ok(tag)
}

/// Retrieves tags matching `filter`, in storage order.
pub async fn find_tags<C: ConnectionTrait>(conn: &C, filter: &TagFilter) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find().filter(filter.condition()).all(conn).await
}

pub async fn get_tag<C: ConnectionTrait>(conn: &C, tag_id: Uuid) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find_by_id(tag_id).one(conn).await
}

/// Counts the VMs a tag is currently assigned to.
pub async fn count_tag_assignments<C: ConnectionTrait>(conn: &C, tag_id: Uuid) -> Result<u64, DbErr> {
    vm_tag::Entity::find()
        .filter(vm_tag::Column::TagId.eq(tag_id))
        .count(conn)
        .await
}

/// Unconditionally removes a tag row. Callers run the deletion policy first.
pub async fn delete_tag<C: ConnectionTrait>(conn: &C, tag_id: Uuid) -> ServiceResult<()> {
    let result = tag::Entity::delete_by_id(tag_id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!("tag {tag_id}")));
    }
    Ok(())
}

/// Deletes a tag on behalf of `requesting_user_id`, enforcing the in-use guard
/// and the ownership/admin rule inside a single transaction.
pub async fn delete_tag_as(
    db: &DatabaseConnection,
    tag_id: Uuid,
    requesting_user_id: i32,
    admin_user_id: i32,
) -> ServiceResult<()> {
    let txn = db.begin().await?;

    let tag = get_tag(&txn, tag_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tag {tag_id}")))?;
    let assignments = count_tag_assignments(&txn, tag_id).await?;

    match tag_policy::evaluate_tag_deletion(&tag, assignments, requesting_user_id, admin_user_id) {
        DeletionDecision::Allow => {}
        DeletionDecision::TagInUse => {
            warn!(%tag_id, assignments, "Refusing to delete a tag that is still assigned.");
            return Err(ServiceError::TagInUse(tag_id));
        }
        DeletionDecision::Unauthorized => {
            warn!(%tag_id, requesting_user_id, owner_id = tag.user_id, "Tag deletion denied.");
            return Err(ServiceError::Unauthorized {
                tag_id,
                user_id: requesting_user_id,
            });
        }
    }

    delete_tag(&txn, tag_id).await?;
    txn.commit().await?;

    info!(%tag_id, requesting_user_id, "Tag deleted.");
    Ok(())
}
