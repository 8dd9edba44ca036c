//! Domain models

pub mod card;
pub mod file_context;
pub mod insights;
pub mod job;
pub mod skill_invocation;

pub use card::{
    Appearance, Card, CardEntry, CardKind, EntryType, MediaDuration, SkillErrorKind,
    TransformOutput,
};
pub use file_context::FileContext;
pub use insights::{Face, InsightsDocument, Occurrence, TextTerm, TranscriptLine};
pub use job::{JobDescriptor, JobHandle};
pub use skill_invocation::SkillInvocation;
