//! Command implementations.

pub mod classify;
pub mod compile;
pub mod config;
pub mod fields;

pub use self::classify::execute_classify;
pub use self::compile::execute_compile;
pub use self::config::execute_config;
pub use self::fields::execute_fields;
