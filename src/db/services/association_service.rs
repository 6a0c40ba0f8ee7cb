//! Tag ↔ VM assignment: idempotent link/unlink, name-based tag resolution and
//! the get-or-create path used when a VM is created with a tag.

use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::entities::{tag, vm, vm_tag};
use crate::db::services::error::{ServiceError, ServiceResult};
use crate::db::services::identity::{self, TagIdentity};
use crate::db::services::vm_service::{self, VmWithTags};
use crate::db::services::{tag_service, user_service};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAction {
    Assign,
    Unassign,
}

impl FromStr for AssignmentAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assign" => Ok(AssignmentAction::Assign),
            "unassign" => Ok(AssignmentAction::Unassign),
            other => Err(ServiceError::InvalidAction(other.to_string())),
        }
    }
}

/// Inserts (vm_id, tag_id) pairs, skipping pairs that already exist.
/// Returns the number of rows actually added.
pub(crate) async fn link<C, I>(conn: &C, pairs: I) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = (Uuid, Uuid)>,
{
    let rows: Vec<vm_tag::ActiveModel> = pairs
        .into_iter()
        .map(|(vm_id, tag_id)| vm_tag::ActiveModel {
            vm_id: Set(vm_id),
            tag_id: Set(tag_id),
        })
        .collect();
    if rows.is_empty() {
        return Ok(0);
    }

    vm_tag::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([vm_tag::Column::VmId, vm_tag::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
}

/// Resolves a tag by name. `scope` narrows the match with the usual
/// normalization; without it the name must be unambiguous.
pub async fn resolve_tag_by_name<C: ConnectionTrait>(
    conn: &C,
    tag_name: &str,
    scope: Option<&str>,
) -> ServiceResult<tag::Model> {
    if tag_name.is_empty() {
        return Err(ServiceError::Validation("tag_name is required".to_string()));
    }

    let mut query = tag::Entity::find().filter(tag::Column::Name.eq(tag_name));
    if let Some(scope) = scope {
        let scope = Some(scope).filter(|s| !s.is_empty());
        query = query.filter(identity::scope_condition(scope));
    }

    let mut matches = query.limit(2).all(conn).await?;
    match matches.len() {
        0 => Err(ServiceError::NotFound(format!("tag '{tag_name}'"))),
        1 => Ok(matches.remove(0)),
        _ => Err(ServiceError::Validation(format!(
            "several tags are named '{tag_name}', a scope is required"
        ))),
    }
}

fn dedup(vm_ids: &[Uuid]) -> BTreeSet<Uuid> {
    vm_ids.iter().copied().collect()
}

async fn ensure_vms_exist<C: ConnectionTrait>(conn: &C, vm_ids: &BTreeSet<Uuid>) -> ServiceResult<()> {
    if vm_ids.is_empty() {
        return Ok(());
    }
    let known: HashSet<Uuid> = vm::Entity::find()
        .filter(vm::Column::Id.is_in(vm_ids.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|v| v.id)
        .collect();
    let unknown: Vec<String> = vm_ids
        .iter()
        .filter(|id| !known.contains(*id))
        .map(Uuid::to_string)
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!("unknown VM ids: {}", unknown.join(", "))))
    }
}

/// Assigns the named tag to every VM in `vm_ids`. Existing assignments are left
/// as they are, so repeating the call is harmless.
pub async fn assign(
    db: &DatabaseConnection,
    tag_name: &str,
    scope: Option<&str>,
    vm_ids: &[Uuid],
) -> ServiceResult<u64> {
    let vm_ids = dedup(vm_ids);

    let txn = db.begin().await?;
    let tag = resolve_tag_by_name(&txn, tag_name, scope).await?;
    ensure_vms_exist(&txn, &vm_ids).await?;
    let added = link(&txn, vm_ids.iter().map(|vm_id| (*vm_id, tag.id))).await?;
    txn.commit().await?;

    info!(tag_id = %tag.id, requested = vm_ids.len(), added, "Tag assigned.");
    Ok(added)
}

/// Removes the named tag from every VM in `vm_ids`; pairs that do not exist
/// are ignored.
pub async fn unassign(
    db: &DatabaseConnection,
    tag_name: &str,
    scope: Option<&str>,
    vm_ids: &[Uuid],
) -> ServiceResult<u64> {
    let vm_ids = dedup(vm_ids);

    let txn = db.begin().await?;
    let tag = resolve_tag_by_name(&txn, tag_name, scope).await?;
    let removed = if vm_ids.is_empty() {
        0
    } else {
        vm_tag::Entity::delete_many()
            .filter(vm_tag::Column::TagId.eq(tag.id))
            .filter(vm_tag::Column::VmId.is_in(vm_ids.iter().copied()))
            .exec(&txn)
            .await?
            .rows_affected
    };
    txn.commit().await?;

    info!(tag_id = %tag.id, requested = vm_ids.len(), removed, "Tag unassigned.");
    Ok(removed)
}

/// Returns the tag matching (name, scope) whoever owns it, or creates one owned
/// by `owner_id`. The insert runs in a savepoint: if another request created
/// the same tag first, its row is returned instead.
pub async fn resolve_or_create_tag(
    txn: &DatabaseTransaction,
    name: &str,
    scope: Option<&str>,
    owner_id: Option<i32>,
) -> ServiceResult<tag::Model> {
    let identity = TagIdentity::new(Some(name), scope);
    identity.validate()?;

    if let Some(existing) = identity::find_tag_by_identity(txn, &identity).await? {
        debug!(tag_id = %existing.id, "Reusing existing tag.");
        return Ok(existing);
    }

    let owner_id = owner_id.ok_or_else(|| {
        ServiceError::Validation(format!(
            "user_id is required to create {}",
            tag_service::describe(&identity)
        ))
    })?;
    if !user_service::user_exists(txn, owner_id).await? {
        return Err(ServiceError::NotFound(format!("user {owner_id}")));
    }

    insert_tag_or_reread(txn, &identity, owner_id).await
}

/// Inserts `identity` in a savepoint after the caller's lookup missed. If the
/// unique index reports that another transaction created it meanwhile, the
/// savepoint is rolled back and the winner's row is returned.
pub(crate) async fn insert_tag_or_reread(
    txn: &DatabaseTransaction,
    identity: &TagIdentity,
    owner_id: i32,
) -> ServiceResult<tag::Model> {
    let savepoint = txn.begin().await?;
    match tag_service::insert_tag_row(&savepoint, identity, owner_id).await {
        Ok(tag) => {
            savepoint.commit().await?;
            info!(tag_id = %tag.id, owner_id, "Tag created during VM creation.");
            Ok(tag)
        }
        Err(ServiceError::Duplicate(what)) => {
            savepoint.rollback().await?;
            debug!(%what, "Tag was created concurrently, reusing it.");
            identity::find_tag_by_identity(txn, identity)
                .await?
                .ok_or(ServiceError::Duplicate(what))
        }
        Err(e) => Err(e),
    }
}

/// Creates a VM and, when `tag_name` is non-empty, attaches the
/// resolved-or-created tag to it. Everything happens in one transaction.
pub async fn create_vm_with_tag(
    db: &DatabaseConnection,
    name: &str,
    tag_name: Option<&str>,
    scope: Option<&str>,
    owner_id: Option<i32>,
) -> ServiceResult<VmWithTags> {
    let txn = db.begin().await?;

    let vm = vm_service::insert_vm(&txn, name).await?;
    let mut tags = Vec::new();
    if let Some(tag_name) = tag_name.filter(|n| !n.is_empty()) {
        let tag = resolve_or_create_tag(&txn, tag_name, scope, owner_id).await?;
        link(&txn, [(vm.id, tag.id)]).await?;
        tags.push(tag);
    }

    txn.commit().await?;

    info!(vm_id = %vm.id, name = %vm.name, tagged = !tags.is_empty(), "VM created.");
    Ok(VmWithTags { vm, tags })
}
