pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod extract;
pub mod info;
pub mod runtime;
pub mod serve;

pub use app::run;
pub use env::CliArgs;
