use crate::storage::NewMovie;
use std::collections::BTreeSet;

/// Состояние диалога одного пользователя.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Idle,
    Adding { step: AddStep, draft: Draft },
    Searching,
    Deleting(DeleteStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStep {
    Name,
    Description,
    Poster,
    DownloadLink,
    ChannelLink,
    Categories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    Selection,
    Confirmation { id: u64 },
}

/// Черновик фильма, который владелец заполняет по шагам.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub download_link: Option<String>,
    pub telegram_link: Option<String>,
    pub categories: BTreeSet<String>,
}

impl Draft {
    /// `None`, если имя так и не было задано.
    pub fn into_new_movie(self) -> Option<NewMovie> {
        let name = self.name.filter(|n| !n.trim().is_empty())?;
        let mut movie = NewMovie::named(name);
        movie.description = self.description;
        movie.poster_url = self.poster_url;
        movie.download_link = self.download_link;
        movie.telegram_link = self.telegram_link;
        movie.categories = self.categories;
        Some(movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_without_name_is_not_a_movie() {
        let draft = Draft { description: Some("plot".into()), ..Draft::default() };
        assert!(draft.into_new_movie().is_none());

        let blank = Draft { name: Some("  ".into()), ..Draft::default() };
        assert!(blank.into_new_movie().is_none());
    }

    #[test]
    fn draft_carries_every_field() {
        let draft = Draft {
            name: Some("Nova".into()),
            description: Some("plot".into()),
            poster_url: Some("https://img/nova.png".into()),
            download_link: Some("https://dl/nova".into()),
            telegram_link: Some("https://t.me/nova".into()),
            categories: ["Action".to_string()].into_iter().collect(),
        };
        let movie = draft.into_new_movie().unwrap();
        assert_eq!(movie.name, "Nova");
        assert_eq!(movie.telegram_link.as_deref(), Some("https://t.me/nova"));
        assert!(movie.visible);
        assert_eq!(movie.categories.len(), 1);
    }
}
