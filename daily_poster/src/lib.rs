pub mod card;
pub mod config;
pub mod feishu;
pub mod pipeline;
pub mod selector;
pub mod sent_log;

pub use config::Config;
pub use pipeline::{Describer, Messenger, Poster, RunOutcome};
