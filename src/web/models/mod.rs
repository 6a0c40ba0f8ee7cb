use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::entities::{tag, user};
use crate::db::services::vm_service::VmWithTags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// The envelope every endpoint answers with.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub error_code: i32,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status: ResponseStatus::Success,
            error_code: 0,
            message: message.into(),
            data,
        }
    }
}

impl ApiResponse<Option<()>> {
    pub fn error(error_code: i32, message: impl Into<String>) -> Self {
        ApiResponse {
            status: ResponseStatus::Error,
            error_code,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<String> {
    /// Success with an empty `data` field, for commands that return nothing.
    pub fn done(message: impl Into<String>) -> Self {
        ApiResponse::success(message, String::new())
    }
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub scope: Option<String>,
    pub user_id: i32,
}

impl From<tag::Model> for TagResponse {
    fn from(tag: tag::Model) -> Self {
        TagResponse {
            id: tag.id,
            name: tag.name,
            scope: tag.scope,
            user_id: tag.user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<TagResponse>,
}

impl From<VmWithTags> for VmResponse {
    fn from(VmWithTags { vm, tags }: VmWithTags) -> Self {
        VmResponse {
            id: vm.id,
            name: vm.name,
            created_at: vm.created_at,
            tags: tags.into_iter().map(TagResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: i32,
    pub user_name: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        UserResponse {
            user_id: user.id,
            user_name: user.user_name,
        }
    }
}

// --- Requests ---

/// Raw strings, so that "missing", "empty" and "malformed" can be told apart.
#[derive(Debug, Default, Deserialize)]
pub struct ListTagsQuery {
    pub tag_id: Option<String>,
    pub tag_name: Option<String>,
    pub scope: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub tag_name: Option<String>,
    pub scope: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTagQuery {
    pub tag_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    pub action: Option<String>,
    pub tag_name: Option<String>,
    pub scope: Option<String>,
    #[serde(default)]
    pub vm_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListVmsQuery {
    pub tag_name: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVmRequest {
    pub vm_name: Option<String>,
    #[serde(alias = "tags")]
    pub tag_name: Option<String>,
    pub scope: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVmTagsRequest {
    #[serde(default, alias = "tags")]
    pub tag_ids: Vec<Uuid>,
}
