pub mod gateway;
pub mod records;
