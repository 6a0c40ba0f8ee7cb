use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    // NULL means global scope. (name, COALESCE(scope, '')) is unique, see the migrations.
    pub scope: Option<String>,
    pub user_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::vm_tag::Entity")]
    VmTags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::vm_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VmTags.def()
    }
}

impl Related<super::vm::Entity> for Entity {
    fn to() -> RelationDef {
        super::vm_tag::Relation::Vm.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::vm_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
