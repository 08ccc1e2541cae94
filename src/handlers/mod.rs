pub mod handler_admin_request;
pub mod handler_entity_deleted;
pub mod handler_entity_upserted;
pub mod handler_moderate_text;
pub mod handler_recommendation_request;
