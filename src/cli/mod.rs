pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod locate;
pub mod output;
pub mod record;
pub mod runtime;

pub use info::cmd_info;
pub use locate::{cmd_locate, LocateArgs};
pub use record::{cmd_record, RecordArgs};
