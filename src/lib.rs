pub mod config;
pub mod logging;
pub mod pipeline;
pub mod services;
pub mod tutor;

pub use tutor::{TutorEngine, TutorError, TutorResult};
