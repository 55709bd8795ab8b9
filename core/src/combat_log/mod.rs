mod action_group;
mod combat_event;
mod error;
mod parser;
mod reader;

pub use action_group::{ActionGroup, add_action};
pub use combat_event::*;
pub use error::{ParseError, ReaderError};
pub use parser::RecordParser;
pub use reader::{ReadResult, Reader};
