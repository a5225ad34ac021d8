pub mod command;
pub mod export;

pub use command::CommandFramework;
pub use export::ExportFramework;
