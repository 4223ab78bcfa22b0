//! Learner-facing text: answer feedback, hints, explanations and
//! encouragement. Nothing in the tutoring core depends on this module.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiSettings;
use crate::services::llm_provider::{LLMError, LLMProvider};
use crate::tutor::path::PathNode;
use crate::tutor::quiz::{PaceNote, QuizStatistics, ResponseOutcome};
use crate::tutor::types::{DifficultyTier, TaxonomyTier};

const SYSTEM_PROMPT: &str = "You are an expert, supportive educational tutor.";
const ADVISOR_PROMPT: &str =
    "You are an expert learning advisor creating personalized educational paths.";
const ANALYST_PROMPT: &str = "You are an expert educational psychologist analyzing learning errors.";
const QUESTION_PROMPT: &str =
    "You are an expert educator creating quiz questions. Always return valid JSON.";

const EXCELLENT: [&str; 4] = [
    "Excellent work! You've mastered this concept.",
    "Outstanding! You clearly understand this well.",
    "Perfect! You're progressing rapidly!",
    "Superb! Keep up this excellent work!",
];
const GOOD: [&str; 4] = [
    "Good job! You're on the right track.",
    "Nice! You're making solid progress.",
    "Well done! Keep practicing to master it.",
    "Impressive! You're learning quickly.",
];
const NEEDS_IMPROVEMENT: [&str; 4] = [
    "Let's work on this together.",
    "Don't worry, it gets easier with practice.",
    "This is a challenging concept; keep trying!",
    "You'll get there with more practice.",
];
const ENCOURAGEMENT: [&str; 8] = [
    "Great effort! Keep practicing.",
    "You're making progress! Don't give up.",
    "Nice try! Let's learn from this.",
    "Every mistake is a learning opportunity.",
    "Your persistence will pay off!",
    "You're getting closer to mastery!",
    "Practice makes perfect!",
    "Don't worry, this is challenging for many!",
];
const DEFAULT_HINTS: [&str; 4] = [
    "Read the question carefully and identify what's being asked.",
    "Break the problem into smaller parts.",
    "Check your understanding with an example.",
    "Review the relevant concept material.",
];
const DEFAULT_EXPLANATION: &str = "Let's focus on understanding this concept step by step.";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback capability disabled: {0}")]
    Disabled(&'static str),
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error("unusable generated question: {0}")]
    InvalidQuestion(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerContext {
    pub concept_id: String,
    pub tier: DifficultyTier,
    pub correct: bool,
    pub mastery: f64,
    pub time_spent_secs: u32,
    pub estimated_secs: u32,
    pub pace: PaceNote,
    #[serde(default)]
    pub student_response: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

impl AnswerContext {
    pub fn from_outcome(outcome: &ResponseOutcome, estimated_secs: u32, mastery: f64) -> Self {
        Self {
            concept_id: outcome.record.concept_id.clone(),
            tier: outcome.record.tier,
            correct: outcome.record.correct,
            mastery,
            time_spent_secs: outcome.record.time_spent_secs,
            estimated_secs,
            pace: outcome.pace,
            student_response: None,
            correct_answer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub concept_id: String,
    /// 1 is the subtlest hint.
    pub level: u8,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub attempt: Option<String>,
    #[serde(default = "HintRequest::first_attempt")]
    pub attempt_number: u32,
}

impl HintRequest {
    pub fn new(concept_id: impl Into<String>, level: u8) -> Self {
        Self {
            concept_id: concept_id.into(),
            level,
            question: None,
            attempt: None,
            attempt_number: Self::first_attempt(),
        }
    }

    fn first_attempt() -> u32 {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DetailLevel {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressContext {
    pub mastery: f64,
    pub total_questions: u32,
    pub accuracy: f64,
    #[serde(default)]
    pub streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStepsRequest {
    pub concept_id: String,
    pub mastery: f64,
    #[serde(default)]
    pub weak_concepts: Vec<String>,
    #[serde(default)]
    pub available_concepts: Vec<String>,
    #[serde(default)]
    pub total_questions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPatternRequest {
    pub concept_id: String,
    /// Descriptions of recent mistakes, most relevant first. Only the first
    /// five are used.
    pub errors: Vec<String>,
    pub mastery: f64,
}

/// Multiple-choice question produced by a generator. Field names match the
/// JSON shape requested from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub correct_index: usize,
    pub explanation: String,
}

impl GeneratedQuestion {
    /// Parses a model reply, tolerating a surrounding markdown code fence.
    /// An out-of-range `correct_index` is reset to 0.
    pub fn parse_reply(reply: &str) -> Result<Self, FeedbackError> {
        let mut text = reply.trim();
        if let Some(rest) = text.strip_prefix("```json") {
            text = rest;
        } else if let Some(rest) = text.strip_prefix("```") {
            text = rest;
        }
        if let Some(rest) = text.strip_suffix("```") {
            text = rest;
        }

        let mut question: Self = serde_json::from_str(text.trim())
            .map_err(|e| FeedbackError::InvalidQuestion(e.to_string()))?;
        if question.options.is_empty() {
            return Err(FeedbackError::InvalidQuestion("no options".into()));
        }
        if question.correct_index >= question.options.len() {
            question.correct_index = 0;
        }
        Ok(question)
    }
}

pub trait FeedbackGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn immediate_feedback(&self, ctx: &AnswerContext) -> Result<String, FeedbackError>;

    fn hint(&self, request: &HintRequest) -> Result<String, FeedbackError>;

    fn explanation(&self, concept: &str, detail: DetailLevel) -> Result<String, FeedbackError>;

    fn motivational_message(&self, progress: &ProgressContext) -> Result<String, FeedbackError>;

    fn next_steps(&self, request: &NextStepsRequest) -> Result<String, FeedbackError>;

    fn error_pattern(&self, request: &ErrorPatternRequest) -> Result<String, FeedbackError>;

    fn quiz_question(
        &self,
        concept: &str,
        tier: DifficultyTier,
        taxonomy: TaxonomyTier,
    ) -> Result<GeneratedQuestion, FeedbackError>;
}

/// Fixed phrase tables. Phrase choice is a deterministic function of the
/// input so repeated calls give repeated answers.
#[derive(Debug, Clone, Default)]
pub struct TemplateFeedback {
    hints: HashMap<String, Vec<String>>,
    explanations: HashMap<String, String>,
}

impl TemplateFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hints<I, S>(mut self, concept: impl Into<String>, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints
            .insert(concept.into(), hints.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_explanation(mut self, concept: impl Into<String>, text: impl Into<String>) -> Self {
        self.explanations.insert(concept.into(), text.into());
        self
    }
}

fn pick<'a>(phrases: &[&'a str], seed: usize) -> &'a str {
    phrases[seed % phrases.len()]
}

fn seed_of(text: &str) -> usize {
    text.bytes().map(usize::from).sum()
}

impl FeedbackGenerator for TemplateFeedback {
    fn name(&self) -> &'static str {
        "template"
    }

    fn immediate_feedback(&self, ctx: &AnswerContext) -> Result<String, FeedbackError> {
        let seed = seed_of(&ctx.concept_id) + ctx.time_spent_secs as usize;
        let mut text = if ctx.correct {
            let table: &[&str] = if ctx.tier == DifficultyTier::Hard {
                &EXCELLENT
            } else {
                &GOOD
            };
            pick(table, seed).to_string()
        } else {
            let mut text = String::from("Not quite right, but let's learn from this.");
            if ctx.tier == DifficultyTier::Hard {
                text.push_str(" This is a challenging question!");
            }
            text
        };

        match ctx.pace {
            PaceNote::Slow => {
                let _ = write!(
                    text,
                    "\nYou spent {} min on this - consider a different approach or review the concept.",
                    ctx.time_spent_secs / 60
                );
            }
            PaceNote::Fast => {
                text.push_str("\nThat was fast! Make sure you've understood the concept fully.");
            }
            PaceNote::OnPace => {}
        }

        Ok(text)
    }

    fn hint(&self, request: &HintRequest) -> Result<String, FeedbackError> {
        let level = request.level.max(1);
        let idx = usize::from(level - 1);
        let text = match self.hints.get(&request.concept_id) {
            Some(hints) if !hints.is_empty() => hints[idx.min(hints.len() - 1)].clone(),
            _ => DEFAULT_HINTS[idx.min(DEFAULT_HINTS.len() - 1)].to_string(),
        };
        Ok(format!("Hint {level}: {text}"))
    }

    fn explanation(&self, concept: &str, detail: DetailLevel) -> Result<String, FeedbackError> {
        let base = self
            .explanations
            .get(concept)
            .map(String::as_str)
            .unwrap_or(DEFAULT_EXPLANATION);

        let text = match detail {
            DetailLevel::Basic => base.to_string(),
            DetailLevel::Intermediate => format!(
                "{base}\n\nKey points to remember:\n- First, understand the fundamentals.\n- Then, apply to problems.\n- Finally, explain to others."
            ),
            DetailLevel::Advanced => format!(
                "{base}\n\nAdvanced insights:\n- This concept connects to related areas.\n- Look for real-world applications.\n- Watch for common misconceptions."
            ),
        };
        Ok(text)
    }

    fn motivational_message(&self, progress: &ProgressContext) -> Result<String, FeedbackError> {
        let seed = progress.total_questions as usize + progress.streak as usize;
        let text = if progress.mastery >= 0.8 {
            pick(&EXCELLENT, seed)
        } else if progress.mastery >= 0.5 {
            pick(&GOOD, seed)
        } else if progress.accuracy > 0.0 {
            pick(&ENCOURAGEMENT, seed)
        } else {
            pick(&NEEDS_IMPROVEMENT, seed)
        };
        Ok(text.to_string())
    }

    fn next_steps(&self, request: &NextStepsRequest) -> Result<String, FeedbackError> {
        let concept = &request.concept_id;
        let first = if request.mastery >= 0.85 {
            match request.available_concepts.first() {
                Some(next) => format!("You've mastered {concept}. Move on to {next}."),
                None => format!("You've mastered {concept}. Revisit it later to keep it fresh."),
            }
        } else if request.mastery >= 0.6 {
            format!("Keep practicing {concept} until it feels automatic.")
        } else {
            format!("Review the fundamentals of {concept} before more practice.")
        };
        let second = match request.weak_concepts.as_slice() {
            [] => "Try a few harder questions to stretch yourself.".to_string(),
            weak => format!("Spend time on your weak areas: {}.", weak.join(", ")),
        };
        let seed = request.total_questions as usize + seed_of(concept);

        let mut out = String::from("Your Personalized Learning Path:
");
        let _ = writeln!(out, "1. {first}");
        let _ = writeln!(out, "2. {second}");
        let _ = write!(out, "3. {}", pick(&ENCOURAGEMENT, seed));
        Ok(out)
    }

    fn error_pattern(&self, request: &ErrorPatternRequest) -> Result<String, FeedbackError> {
        let mut out = format!(
            "Error Analysis for {} ({:.0}% mastery):\n",
            request.concept_id,
            request.mastery * 100.0
        );
        if request.errors.is_empty() {
            out.push_str("No recurring errors recorded.");
            return Ok(out);
        }
        for error in request.errors.iter().take(5) {
            let _ = writeln!(out, "- {error}");
        }
        let advice = if request.mastery < 0.4 {
            "Recommended practice: revisit the basics and work through easy questions first."
        } else {
            "Recommended practice: target these mistakes with a few focused questions."
        };
        out.push_str(advice);
        Ok(out)
    }

    fn quiz_question(
        &self,
        concept: &str,
        tier: DifficultyTier,
        taxonomy: TaxonomyTier,
    ) -> Result<GeneratedQuestion, FeedbackError> {
        let stem = match taxonomy {
            TaxonomyTier::Remember | TaxonomyTier::Understand => {
                format!("What is a key aspect of {concept}?")
            }
            TaxonomyTier::Apply | TaxonomyTier::Analyze => {
                format!("Which approach best helps when applying {concept}?")
            }
            TaxonomyTier::Evaluate | TaxonomyTier::Create => {
                format!("How would you judge a solution that uses {concept}?")
            }
        };
        let options: Vec<String> = [
            "Implementation and application",
            "Theoretical foundation",
            "Practical examples",
            "Real-world scenarios",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Ok(GeneratedQuestion {
            question: format!("({}) {stem}", tier.as_str()),
            correct_answer: options[2].clone(),
            correct_index: 2,
            options,
            explanation: format!(
                "Understanding {concept} requires looking at practical examples to see how it applies in real situations."
            ),
        })
    }
}

/// Chat-completion backed feedback.
#[derive(Clone)]
pub struct LlmFeedback {
    provider: LLMProvider,
    settings: AiSettings,
}

impl LlmFeedback {
    pub fn new(provider: LLMProvider, settings: AiSettings) -> Self {
        Self { provider, settings }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    fn ask(&self, prompt: &str, max_tokens: u32, temperature: f64) -> Result<String, FeedbackError> {
        self.ask_as(SYSTEM_PROMPT, prompt, max_tokens, temperature)
    }

    fn ask_as(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, FeedbackError> {
        if self.settings.log_ai_calls {
            tracing::info!(max_tokens, "requesting LLM feedback");
        }
        Ok(self
            .provider
            .complete_with_system(system, prompt, max_tokens, temperature)?)
    }
}

impl FeedbackGenerator for LlmFeedback {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn immediate_feedback(&self, ctx: &AnswerContext) -> Result<String, FeedbackError> {
        if !self.settings.feedback_enabled {
            return Err(FeedbackError::Disabled("feedback"));
        }

        let mut prompt = String::from(
            "Generate personalized feedback for a student.\n\nStudent profile:\n",
        );
        let _ = writeln!(prompt, "- Concept: {}", ctx.concept_id);
        let _ = writeln!(prompt, "- Current mastery: {:.1}%", ctx.mastery * 100.0);
        let _ = writeln!(
            prompt,
            "- Time spent: {} seconds (expected: {} seconds)",
            ctx.time_spent_secs, ctx.estimated_secs
        );
        let _ = writeln!(prompt, "\nQuestion:\n- Difficulty: {}", ctx.tier.as_str());
        if let Some(response) = &ctx.student_response {
            let _ = writeln!(prompt, "- Student's answer: {response}");
        }
        if let Some(answer) = &ctx.correct_answer {
            let _ = writeln!(prompt, "- Correct answer: {answer}");
        }
        let _ = writeln!(
            prompt,
            "- Result: {}",
            if ctx.correct { "CORRECT" } else { "INCORRECT" }
        );
        prompt.push_str(
            "\nBe encouraging, acknowledge effort, and include one specific learning suggestion. \
             Keep it to 2-3 sentences.",
        );

        self.ask(&prompt, 256, 0.8)
    }

    fn hint(&self, request: &HintRequest) -> Result<String, FeedbackError> {
        if !self.settings.hint_generation_enabled {
            return Err(FeedbackError::Disabled("hints"));
        }

        let depth = match request.level {
            0 | 1 => "a very subtle hint that points in the right direction without giving away the answer",
            2 => "a more direct hint that explains what approach to use",
            _ => "a detailed explanation of the solution approach",
        };
        let mut prompt = format!("Concept: {}\n", request.concept_id);
        if let Some(question) = &request.question {
            let _ = writeln!(prompt, "Question: {question}");
        }
        if let Some(attempt) = &request.attempt {
            let _ = writeln!(prompt, "Student's attempt: {attempt}");
        }
        let _ = writeln!(prompt, "Attempt number: {}", request.attempt_number);
        let _ = write!(
            prompt,
            "\nProvide {depth}. Do not give away the complete answer. Keep it to 1-2 sentences."
        );

        let text = self.ask(&prompt, 200, 0.7)?;
        Ok(format!("Hint {}: {text}", request.level.max(1)))
    }

    fn explanation(&self, concept: &str, detail: DetailLevel) -> Result<String, FeedbackError> {
        let prompt = format!(
            "Explain the concept \"{concept}\" to a student at a {} level. \
             Use a short example and keep it under 150 words.",
            detail.as_str()
        );
        self.ask(&prompt, 400, 0.7)
    }

    fn motivational_message(&self, progress: &ProgressContext) -> Result<String, FeedbackError> {
        if !self.settings.personalized_feedback {
            return Err(FeedbackError::Disabled("personalized feedback"));
        }
        let prompt = format!(
            "Write a short motivational message for a student with {:.0}% mastery, \
             {} questions answered, {:.0}% accuracy and a streak of {}. One or two sentences.",
            progress.mastery * 100.0,
            progress.total_questions,
            progress.accuracy * 100.0,
            progress.streak
        );
        self.ask(&prompt, 150, 0.9)
    }

    fn next_steps(&self, request: &NextStepsRequest) -> Result<String, FeedbackError> {
        if !self.settings.personalized_feedback {
            return Err(FeedbackError::Disabled("personalized feedback"));
        }
        let join_or = |items: &[String], none: &str| {
            if items.is_empty() {
                none.to_string()
            } else {
                items.join(", ")
            }
        };

        let mut prompt = String::from(
            "Create a specific learning path recommendation.\n\nCurrent status:\n",
        );
        let _ = writeln!(prompt, "- Current concept: {}", request.concept_id);
        let _ = writeln!(prompt, "- Mastery level: {:.1}%", request.mastery * 100.0);
        let _ = writeln!(prompt, "- Questions completed: {}", request.total_questions);
        let _ = writeln!(
            prompt,
            "- Weak areas: {}",
            join_or(request.weak_concepts.as_slice(), "None identified")
        );
        let _ = writeln!(
            prompt,
            "- Available next concepts: {}",
            join_or(request.available_concepts.as_slice(), "None available")
        );
        prompt.push_str(
            "\nAdvise whether to continue or move forward based on mastery, suggest specific next \
             steps, address weak areas and encourage the student. Format as a numbered list of \
             three steps: the next action with reasoning, the step after that, and a long-term \
             suggestion.",
        );

        self.ask_as(ADVISOR_PROMPT, &prompt, 400, 0.7)
    }

    fn error_pattern(&self, request: &ErrorPatternRequest) -> Result<String, FeedbackError> {
        if !self.settings.feedback_enabled {
            return Err(FeedbackError::Disabled("feedback"));
        }

        let mut prompt = format!(
            "Analyze error patterns and provide insights.\n\nConcept: {}\nStudent's mastery level: {:.1}%\n\nCommon errors made:\n",
            request.concept_id,
            request.mastery * 100.0
        );
        for error in request.errors.iter().take(5) {
            let _ = writeln!(prompt, "- {error}");
        }
        prompt.push_str(
            "\nProvide a root cause analysis, 2-3 specific misconceptions to address, targeted \
             practice recommendations and prevention tips.",
        );

        self.ask_as(ANALYST_PROMPT, &prompt, 500, 0.7)
    }

    fn quiz_question(
        &self,
        concept: &str,
        tier: DifficultyTier,
        taxonomy: TaxonomyTier,
    ) -> Result<GeneratedQuestion, FeedbackError> {
        let prompt = format!(
            "Generate a {tier} quiz question about: {concept}\n\
             Cognitive level: {taxonomy}\n\n\
             Return ONLY valid JSON (no markdown, no extra text):\n\
             {{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \
             \"correct_answer\": \"one of the options\", \"correct_index\": 0, \
             \"explanation\": \"why the answer is correct\"}}\n\n\
             All options must be plausible with exactly one correct; correct_index is the 0-3 \
             position of the correct answer.",
            tier = tier.as_str(),
            taxonomy = taxonomy.as_str(),
        );

        let reply = self.ask_as(QUESTION_PROMPT, &prompt, 800, 0.8)?;
        GeneratedQuestion::parse_reply(&reply)
    }
}

/// Tries the primary generator and answers from templates when it fails.
pub struct FallbackFeedback {
    primary: Box<dyn FeedbackGenerator>,
    fallback: TemplateFeedback,
}

impl FallbackFeedback {
    pub fn new(primary: Box<dyn FeedbackGenerator>, fallback: TemplateFeedback) -> Self {
        Self { primary, fallback }
    }

    fn with_fallback<T, F, G>(&self, what: &'static str, primary: F, fallback: G) -> Result<T, FeedbackError>
    where
        F: FnOnce(&dyn FeedbackGenerator) -> Result<T, FeedbackError>,
        G: FnOnce(&TemplateFeedback) -> Result<T, FeedbackError>,
    {
        match primary(self.primary.as_ref()) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(
                    generator = self.primary.name(),
                    what,
                    error = %e,
                    "feedback generation failed, using templates"
                );
                fallback(&self.fallback)
            }
        }
    }
}

impl FeedbackGenerator for FallbackFeedback {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn immediate_feedback(&self, ctx: &AnswerContext) -> Result<String, FeedbackError> {
        self.with_fallback(
            "immediate feedback",
            |g| g.immediate_feedback(ctx),
            |t| t.immediate_feedback(ctx),
        )
    }

    fn hint(&self, request: &HintRequest) -> Result<String, FeedbackError> {
        self.with_fallback("hint", |g| g.hint(request), |t| t.hint(request))
    }

    fn explanation(&self, concept: &str, detail: DetailLevel) -> Result<String, FeedbackError> {
        self.with_fallback(
            "explanation",
            |g| g.explanation(concept, detail),
            |t| t.explanation(concept, detail),
        )
    }

    fn motivational_message(&self, progress: &ProgressContext) -> Result<String, FeedbackError> {
        self.with_fallback(
            "motivational message",
            |g| g.motivational_message(progress),
            |t| t.motivational_message(progress),
        )
    }

    fn next_steps(&self, request: &NextStepsRequest) -> Result<String, FeedbackError> {
        self.with_fallback("next steps", |g| g.next_steps(request), |t| t.next_steps(request))
    }

    fn error_pattern(&self, request: &ErrorPatternRequest) -> Result<String, FeedbackError> {
        self.with_fallback(
            "error pattern",
            |g| g.error_pattern(request),
            |t| t.error_pattern(request),
        )
    }

    fn quiz_question(
        &self,
        concept: &str,
        tier: DifficultyTier,
        taxonomy: TaxonomyTier,
    ) -> Result<GeneratedQuestion, FeedbackError> {
        self.with_fallback(
            "quiz question",
            |g| g.quiz_question(concept, tier, taxonomy),
            |t| t.quiz_question(concept, tier, taxonomy),
        )
    }
}

/// Builds the generator the settings ask for: LLM with template fallback
/// when a key is configured, plain templates otherwise.
pub fn generator_from_settings(provider: LLMProvider, settings: &AiSettings) -> Box<dyn FeedbackGenerator> {
    if provider.is_available() {
        Box::new(FallbackFeedback::new(
            Box::new(LlmFeedback::new(provider, settings.clone())),
            TemplateFeedback::new(),
        ))
    } else {
        tracing::info!("no LLM key configured, using template feedback");
        Box::new(TemplateFeedback::new())
    }
}

/// Plain-text end-of-quiz summary.
pub fn quiz_completion_summary(
    stats: &QuizStatistics,
    next: Option<&PathNode>,
    weak_concepts: &[String],
    feedback: &dyn FeedbackGenerator,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "QUIZ COMPLETION SUMMARY");
    let _ = writeln!(out, "\nPerformance:");
    let _ = writeln!(out, "  Accuracy: {:.1}%", stats.accuracy * 100.0);
    let _ = writeln!(out, "  Questions: {}", stats.total_questions);
    let _ = writeln!(out, "  Time: {:.0}s average", stats.avg_time_secs);

    let progress = ProgressContext {
        mastery: stats.accuracy,
        total_questions: stats.total_questions as u32,
        accuracy: stats.accuracy,
        streak: stats.current_streak as u32,
    };
    match feedback.motivational_message(&progress) {
        Ok(message) => {
            let _ = writeln!(out, "\nFeedback:\n{message}");
        }
        Err(e) => {
            tracing::warn!(error = %e, "no feedback for quiz summary");
        }
    }

    let _ = writeln!(out, "\nNext steps:");
    if let Some(node) = next {
        let _ = writeln!(out, "  1. Move on to: {}", node.concept_id);
    }
    if !weak_concepts.is_empty() {
        let _ = writeln!(out, "  2. Review weak concepts:");
        for concept in weak_concepts.iter().take(2) {
            let _ = writeln!(out, "     - {concept}");
        }
    }
    out
}
