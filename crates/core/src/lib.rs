pub mod catalog;
pub mod detection;
pub mod notify;
pub mod pipeline;
pub mod shared;
pub mod sources;
pub mod storage;
