use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Query, SelectStatement, SimpleExpr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::entities::{tag, vm, vm_tag};
use crate::db::services::association_service;
use crate::db::services::error::{duplicate_on_conflict, ServiceError, ServiceResult};
use crate::db::services::identity;

// --- Vm Service Functions ---

/// Lookup filters for VMs. Empty strings are treated as "not given".
#[derive(Debug, Default, Clone)]
pub struct VmFilter {
    pub tag_name: Option<String>,
    pub scope: Option<String>,
}

/// A VM together with the tags currently assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmWithTags {
    pub vm: vm::Model,
    pub tags: Vec<tag::Model>,
}

/// `SELECT vm_id FROM vm_tags JOIN tags ... WHERE <predicate>`. Each filter gets
/// its own subquery, so two filters may be satisfied by two different tags.
fn vms_having_tag(predicate: SimpleExpr) -> SelectStatement {
    Query::select()
        .column((vm_tag::Entity, vm_tag::Column::VmId))
        .from(vm_tag::Entity)
        .inner_join(
            tag::Entity,
            Expr::col((tag::Entity, tag::Column::Id)).equals((vm_tag::Entity, vm_tag::Column::TagId)),
        )
        .and_where(predicate)
        .to_owned()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Finds VMs having some tag named `tag_name` and some (possibly other) tag
/// scoped `scope`.
pub async fn find_vms<C: ConnectionTrait>(conn: &C, filter: &VmFilter) -> Result<Vec<VmWithTags>, DbErr> {
    let mut query = vm::Entity::find();

    if let Some(tag_name) = present(&filter.tag_name) {
        let predicate = Expr::col((tag::Entity, tag::Column::Name)).eq(tag_name);
        query = query.filter(vm::Column::Id.in_subquery(vms_having_tag(predicate)));
    }
    if let Some(scope) = present(&filter.scope) {
        let predicate = Expr::col((tag::Entity, tag::Column::Scope)).eq(scope);
        query = query.filter(vm::Column::Id.in_subquery(vms_having_tag(predicate)));
    }

    let rows = query.find_with_related(tag::Entity).all(conn).await?;
    debug!(count = rows.len(), ?filter, "Fetched VMs.");
    Ok(rows
        .into_iter()
        .map(|(vm, tags)| VmWithTags { vm, tags })
        .collect())
}

pub async fn get_vm<C: ConnectionTrait>(conn: &C, vm_id: Uuid) -> Result<Option<vm::Model>, DbErr> {
    vm::Entity::find_by_id(vm_id).one(conn).await
}

/// Pre-checks the name and inserts a VM row on `conn`.
pub(crate) async fn insert_vm<C: ConnectionTrait>(conn: &C, name: &str) -> ServiceResult<vm::Model> {
    identity::validate_vm_name(name)?;

    if identity::vm_name_exists(conn, name).await? {
        return Err(ServiceError::Duplicate(format!("VM '{name}'")));
    }

    insert_vm_row(conn, name).await
}

/// Inserts without the pre-check; a taken name surfaces as `Duplicate`.
pub(crate) async fn insert_vm_row<C: ConnectionTrait>(conn: &C, name: &str) -> ServiceResult<vm::Model> {
    let new_vm = vm::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        created_at: Set(Utc::now()),
    };
    new_vm
        .insert(conn)
        .await
        .map_err(|e| duplicate_on_conflict(e, || format!("VM '{name}'")))
}

/// Creates a VM with no tags.
pub async fn create_vm(db: &DatabaseConnection, name: &str) -> ServiceResult<vm::Model> {
    let txn = db.begin().await?;
    let vm = insert_vm(&txn, name).await?;
    txn.commit().await?;

    info!(vm_id = %vm.id, name = %vm.name, "VM created.");
    Ok(vm)
}

/// Deletes a VM and its tag assignments. The tags themselves are kept.
pub async fn delete_vm(db: &DatabaseConnection, vm_id: Uuid) -> ServiceResult<()> {
    let txn = db.begin().await?;

    let unlinked = vm_tag::Entity::delete_many()
        .filter(vm_tag::Column::VmId.eq(vm_id))
        .exec(&txn)
        .await?
        .rows_affected;
    let deleted = vm::Entity::delete_by_id(vm_id).exec(&txn).await?.rows_affected;
    if deleted == 0 {
        return Err(ServiceError::NotFound(format!("VM {vm_id}")));
    }
    txn.commit().await?;

    info!(%vm_id, unlinked, "VM deleted.");
    Ok(())
}

/// Replaces the VM's tag set with exactly `tag_ids`.
pub async fn update_vm_tag_set(db: &DatabaseConnection, vm_id: Uuid, tag_ids: &[Uuid]) -> ServiceResult<()> {
    let wanted: BTreeSet<Uuid> = tag_ids.iter().copied().collect();

    let txn = db.begin().await?;

    if get_vm(&txn, vm_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("VM {vm_id}")));
    }

    if !wanted.is_empty() {
        let known: HashSet<Uuid> = tag::Entity::find()
            .filter(tag::Column::Id.is_in(wanted.iter().copied()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let unknown: Vec<String> = wanted
            .iter()
            .filter(|id| !known.contains(*id))
            .map(Uuid::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceError::Validation(format!(
                "unknown tag ids: {}",
                unknown.join(", ")
            )));
        }
    }

    let mut stale = vm_tag::Entity::delete_many().filter(vm_tag::Column::VmId.eq(vm_id));
    if !wanted.is_empty() {
        stale = stale.filter(vm_tag::Column::TagId.is_not_in(wanted.iter().copied()));
    }
    let removed = stale.exec(&txn).await?.rows_affected;
    let added = association_service::link(&txn, wanted.iter().map(|tag_id| (vm_id, *tag_id))).await?;

    txn.commit().await?;

    info!(%vm_id, added, removed, total = wanted.len(), "VM tag set replaced.");
    Ok(())
}
