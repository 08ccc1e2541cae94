pub mod entity_kind;
pub mod entity_point;
pub mod interaction_set;
pub mod moderation_verdict;
pub mod post_record;
pub mod search_hit;
pub mod user_profile;
