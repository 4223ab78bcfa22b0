pub mod feedback;
pub mod llm_provider;

pub use feedback::{
    generator_from_settings, quiz_completion_summary, AnswerContext, DetailLevel,
    ErrorPatternRequest, FallbackFeedback, FeedbackError, FeedbackGenerator, GeneratedQuestion,
    HintRequest, LlmFeedback, NextStepsRequest, ProgressContext, TemplateFeedback,
};
pub use llm_provider::{LLMConfig, LLMError, LLMProvider};
