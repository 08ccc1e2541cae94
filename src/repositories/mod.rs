pub mod entity_point_qdrant_repository;
pub mod rabbitmq_message_repository;
pub mod record_postgres_repository;
