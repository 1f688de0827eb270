use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed story: {0}")]
    MalformedStory(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),
    #[error("choice index {index} out of range, {available} choice(s) available")]
    InvalidChoice { index: usize, available: usize },
    #[error("no saved progress for story {0}")]
    NoSavedProgress(String),
    #[error("saved progress for story {story} points at node {node}, which no longer exists")]
    CorruptProgress { story: String, node: String },
    #[error("persistence medium unavailable: {0}")]
    PersistenceUnavailable(anyhow::Error),
    #[error("no story session is active")]
    NoActiveSession,
    #[error("story {0} is not the active session")]
    StoryNotActive(String),
    #[error("story load superseded by a newer initialize")]
    LoadSuperseded,
}
