pub mod ds;
pub mod logger;
pub mod patcher;
pub mod plugin;
pub mod webpack;
