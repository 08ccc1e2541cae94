pub mod admin_request;
pub mod admin_response;
pub mod entity_deleted;
pub mod entity_upserted;
pub mod moderate_text;
pub mod recommendation_request;
pub mod recommendation_response;
pub mod templates;
