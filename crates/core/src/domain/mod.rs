pub mod access;
pub mod grading;

mod error;
mod ids;
mod role;
mod score;

pub use access::{AccessError, Action, Actor, Resource, Rule, Scope, Target, authorize, scope};
pub use error::DomainError;
pub use grading::{
    AnswerOutcome, AnswerSheet, GradeReport, GradingEngine, GradingError, PaperAnswer,
    PaperQuestion, SubmittedAnswer, TestPaper,
};
pub use ids::{AnswerId, AttemptId, CourseId, MaterialId, QuestionId, SectionId, TestId, UserId};
pub use role::Role;
pub use score::{PassThreshold, Score};
