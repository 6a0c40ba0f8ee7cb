//! Who may delete a tag, and when.

use crate::db::entities::tag;

/// The admin sentinel used when no other id is configured.
pub const DEFAULT_ADMIN_USER_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionDecision {
    Allow,
    TagInUse,
    Unauthorized,
}

/// Evaluated in order: a tag still assigned to any VM is never deleted, then the
/// admin sentinel may delete anything, then only the owner may.
pub fn evaluate_tag_deletion(
    tag: &tag::Model,
    assignment_count: u64,
    requesting_user_id: i32,
    admin_user_id: i32,
) -> DeletionDecision {
    if assignment_count > 0 {
        DeletionDecision::TagInUse
    } else if requesting_user_id == admin_user_id {
        DeletionDecision::Allow
    } else if tag.user_id == requesting_user_id {
        DeletionDecision::Allow
    } else {
        DeletionDecision::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const ADMIN: i32 = DEFAULT_ADMIN_USER_ID;
    const OWNER: i32 = 7;
    const STRANGER: i32 = 8;

    fn owned_tag() -> tag::Model {
        tag::Model {
            id: Uuid::new_v4(),
            name: "env".to_string(),
            scope: Some("prod".to_string()),
            user_id: OWNER,
        }
    }

    #[test]
    fn test_in_use_blocks_everyone() {
        let tag = owned_tag();
        for user in [ADMIN, OWNER, STRANGER] {
            assert_eq!(evaluate_tag_deletion(&tag, 1, user, ADMIN), DeletionDecision::TagInUse);
        }
    }

    #[test]
    fn test_admin_deletes_any_unassigned_tag() {
        assert_eq!(evaluate_tag_deletion(&owned_tag(), 0, ADMIN, ADMIN), DeletionDecision::Allow);
    }

    #[test]
    fn test_owner_deletes_own_unassigned_tag() {
        assert_eq!(evaluate_tag_deletion(&owned_tag(), 0, OWNER, ADMIN), DeletionDecision::Allow);
    }

    #[test]
    fn test_stranger_is_unauthorized() {
        assert_eq!(
            evaluate_tag_deletion(&owned_tag(), 0, STRANGER, ADMIN),
            DeletionDecision::Unauthorized
        );
    }

    #[test]
    fn test_admin_sentinel_is_configurable() {
        // With a different sentinel, user 1 is an ordinary caller.
        assert_eq!(
            evaluate_tag_deletion(&owned_tag(), 0, DEFAULT_ADMIN_USER_ID, 99),
            DeletionDecision::Unauthorized
        );
        assert_eq!(evaluate_tag_deletion(&owned_tag(), 0, 99, 99), DeletionDecision::Allow);
    }
}
