use crate::storage::NewMovie;
use std::collections::BTreeSet;

/// Что нужно сделать после перехода.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Reply(Prompt),
    /// скачать и проверить постер, затем вернуть `Event::PosterChecked`
    ValidatePoster(String),
    CreateMovie(NewMovie),
    RunSearch(String),
    /// список для удаления, страница с нуля
    ShowDeletePicker { page: usize },
    AskDeleteConfirmation(u64),
    DeleteMovie(u64),
}

/// Ответы пользователю, которые не зависят от данных каталога.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    AskName,
    AskDescription,
    AskPoster,
    CheckingPoster,
    InvalidPoster,
    AskDownloadLink,
    AskChannelLink,
    AskCategories { selected: BTreeSet<String> },
    MissingName,
    AskQuery,
    OwnerOnly,
    Cancelled,
    NothingToCancel,
    DeleteDeclined,
    Expired,
    IdleHint,
}
