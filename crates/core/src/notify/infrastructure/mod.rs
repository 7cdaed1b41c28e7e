pub mod channel_sink;
pub mod log_sink;
