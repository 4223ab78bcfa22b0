pub mod bank;
pub mod difficulty;
pub mod session;

pub use bank::{
    BankStatistics, GroupStatistics, Question, QuestionBank, QuestionRecord, QuestionSpec,
};
pub use difficulty::{next_tier, DifficultyAdaptor};
pub use session::{
    ConceptPerformance, NextAction, PaceNote, QuizSession, QuizStatistics, ResponseOutcome,
    ResponseRecord,
};
