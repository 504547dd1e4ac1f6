pub mod messages;
pub mod openai;

pub use self::messages::{Envelope, ExtractionResult, Message, SummaryResult};
