/// Входящее событие для машины состояний.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// /addmovie
    StartAdd,
    /// /search или кнопка «Search»
    StartSearch,
    /// /delmovie
    StartDelete,
    /// кнопка «Cancel» или /cancel
    Cancel,
    Text(String),
    /// фото, стикер и прочие сообщения без текста
    NonText,
    Button(FlowButton),
    /// результат проверки постера, приходит после `Effect::ValidatePoster`
    PosterChecked { url: String, valid: bool },
}

/// Кнопки, которые имеют смысл только внутри диалога.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowButton {
    Category(String),
    CategoriesDone,
    Skip,
    Pick(u64),
    /// листание списка на удаление
    Page(usize),
    Confirm(u64),
    Decline,
}
