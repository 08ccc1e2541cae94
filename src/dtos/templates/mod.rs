pub mod rpc_response;
