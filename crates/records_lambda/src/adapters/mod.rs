pub mod dynamo_item;
pub mod dynamo_store;
pub mod memory_store;
pub mod record_store;
pub mod retrying;
