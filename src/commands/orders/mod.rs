pub mod convert_quote_command;

pub use convert_quote_command::{ConvertQuoteCommand, ConvertQuoteResult};
