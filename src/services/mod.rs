pub mod tag_policy;
