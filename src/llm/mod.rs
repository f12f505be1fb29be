mod function;
mod openai;
mod traits;

pub use function::{FnLlm, LlmFn, LlmRequest};
pub use openai::OpenAiAdapter;
pub use traits::*;
