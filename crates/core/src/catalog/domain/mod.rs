pub mod catalog;
pub mod identity;
pub mod matcher;
pub mod resolver;
