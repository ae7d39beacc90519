//! Model gateway and the summarization machinery built on top of it.

pub mod clean;
pub mod gateway;
pub mod prompts;
pub mod retry;
pub mod summarize;

pub use clean::{clean_report, flatten};
pub use gateway::{DisabledGenerator, GeminiClient};
pub use retry::{
    generate_structured_with_retry, generate_with_retry, NoSleep, RetryPolicy, Sleeper,
    TokioSleeper,
};
pub use summarize::{HierarchicalSummarizer, SummarizeOptions, EMPTY_INPUT_SENTINEL};

pub mod prelude {
    pub use crate::clean::{clean_report, flatten};
    pub use crate::gateway::GeminiClient;
    pub use crate::retry::{NoSleep, RetryPolicy, Sleeper, TokioSleeper};
    pub use crate::summarize::{HierarchicalSummarizer, SummarizeOptions};
}
