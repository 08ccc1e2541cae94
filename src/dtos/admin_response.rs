use serde::{Deserialize, Serialize};

use super::templates::rpc_response::RpcResponse;
use crate::domain::services::ingestion::{BackfillReport, IndexStatus};

/// Response payload of the administrative operations
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum AdminResponseData {
    Backfill(BackfillReport),
    Status(IndexStatus),
}

pub type AdminResponseDto = RpcResponse<AdminResponseData>;
