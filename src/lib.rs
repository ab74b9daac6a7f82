pub mod address;
pub mod buffer;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod parse;
pub mod pipe;
pub mod token;
pub mod types;

pub use crate::buffer::Buffer;
pub use crate::encoding::Encoding;
pub use crate::engine::{handle_command, handle_command_with_output, init_state};
pub use crate::error::{Error, Result};
pub use crate::parse::{AddressRange, AddressTerm, Command, Expression, SimpleAddress};
pub use crate::token::{tokenize, Token};
pub use crate::types::{Address, EngineState, File, ModificationFlags, Range, Snapshot};
