pub mod conversation;
pub mod generation;
pub mod request;
pub mod response;

pub use conversation::{ContentPart, ConversationTurn, Role};
pub use generation::{GenerationParameters, OutputMode};
pub use request::RelayRequest;
pub use response::ResponsePart;
