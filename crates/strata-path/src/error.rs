pub type Result<T> = std::result::Result<T, PathError>;

/// Errors produced when constructing scene paths from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path {text:?} is not absolute")]
    NotAbsolute { text: String },

    #[error("path {text:?} contains an empty component")]
    EmptyComponent { text: String },

    #[error("invalid path component {component:?}")]
    InvalidComponent { component: String },
}
