pub mod claude;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod schema;
pub mod util;

pub use claude::Claude;
pub use error::AiError;
pub use gemini::{Gemini, InlineMedia};
pub use openai::{ChatAnswer, OpenAi};
pub use schema::StructuredOutput;
pub use util::{extract_json_object, strip_code_blocks, truncate_to_char_boundary};
