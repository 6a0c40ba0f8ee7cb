use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::entities::user;

// --- User Service Functions ---

/// Lists every known user, ordered by id.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
}

pub async fn user_exists<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<bool, DbErr> {
    let count = user::Entity::find()
        .filter(user::Column::Id.eq(user_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Inserts a user or refreshes its display name. Only used to bootstrap users
/// from configuration; request handlers never write users.
pub async fn upsert_user<C: ConnectionTrait>(conn: &C, user_id: i32, user_name: &str) -> Result<(), DbErr> {
    let model = user::ActiveModel {
        id: Set(user_id),
        user_name: Set(user_name.to_owned()),
    };
    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_column(user::Column::UserName)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
