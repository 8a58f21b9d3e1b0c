use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub download_link: Option<String>,
    pub telegram_link: Option<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

/// Фильм до присвоения id. Так же выглядят записи в старом `movies.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovie {
    pub name: String,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub download_link: Option<String>,
    pub telegram_link: Option<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

impl NewMovie {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            poster_url: None,
            download_link: None,
            telegram_link: None,
            categories: BTreeSet::new(),
            visible: true,
        }
    }

    fn into_movie(self, id: u64, name: String) -> Movie {
        Movie {
            id,
            name,
            description: self.description,
            poster_url: self.poster_url,
            download_link: self.download_link,
            telegram_link: self.telegram_link,
            categories: self.categories,
            visible: self.visible,
        }
    }
}

fn visible_by_default() -> bool {
    true
}

/// Итог явного /hide или /show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Changed,
    /// фильм уже в нужном состоянии, ничего не пишем
    Unchanged,
    NotFound,
    Failed,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed store data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("movie name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileState {
    version: u32,
    // следующий свободный id; после удаления id не переиспользуются
    next_id: u64,
    movies: Vec<Movie>,
}

impl Default for FileState {
    fn default() -> Self {
        Self { version: FILE_VERSION, next_id: 1, movies: Vec::new() }
    }
}

impl FileState {
    fn position(&self, id: u64) -> Option<usize> {
        self.movies.iter().position(|m| m.id == id)
    }
}

/// Формат самой первой версии бота: `{"movies": [...]}` без id.
#[derive(Debug, Deserialize)]
struct LegacyDump {
    #[serde(default)]
    movies: Vec<NewMovie>,
}

/// Каталог фильмов поверх JSON-снапшота на диске.
///
/// Все публичные операции сами логируют ошибки хранилища и возвращают
/// `None` / `false` / пустой список: вызывающему коду не нужно знать
/// про `StorageError`.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<RwLock<FileState>>,
    path: PathBuf,
}

impl Catalog {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let exists = fs::try_exists(&path).await.unwrap_or(false);
        let state = if exists {
            let data = fs::read(&path)
                .await
                .map_err(|source| StorageError::Io { path: path.clone(), source })?;
            match serde_json::from_slice::<FileState>(&data) {
                Ok(mut s) => {
                    if s.version == 0 {
                        s.version = FILE_VERSION;
                    }
                    let max_id = s.movies.iter().map(|m| m.id).max().unwrap_or(0);
                    s.next_id = s.next_id.max(max_id + 1);
                    s
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "store file is unreadable, starting with an empty catalog");
                    FileState::default()
                }
            }
        } else {
            FileState::default()
        };
        info!(path = %path.display(), movies = state.movies.len(), "catalog opened");
        Ok(Self { inner: Arc::new(RwLock::new(state)), path })
    }

    pub async fn create(&self, movie: NewMovie) -> Option<u64> {
        let name = movie.name.trim().to_string();
        let result = self
            .apply(|state| {
                if name.is_empty() {
                    return Err(StorageError::EmptyName);
                }
                let id = state.next_id;
                state.next_id += 1;
                state.movies.push(movie.into_movie(id, name.clone()));
                Ok((id, true))
            })
            .await;
        match result {
            Ok(id) => {
                info!(id, name = %name, "movie added");
                Some(id)
            }
            Err(e) => {
                error!(name = %name, error = %e, "failed to add movie");
                None
            }
        }
    }

    pub async fn get(&self, id: u64) -> Option<Movie> {
        let guard = self.inner.read().await;
        guard.movies.iter().find(|m| m.id == id).cloned()
    }

    /// Поиск по подстроке в названии без учёта регистра, только видимые.
    pub async fn search(&self, query: &str) -> Vec<Movie> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let guard = self.inner.read().await;
        guard
            .movies
            .iter()
            .filter(|m| m.visible && m.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub async fn list(&self, include_hidden: bool) -> Vec<Movie> {
        let guard = self.inner.read().await;
        guard
            .movies
            .iter()
            .filter(|m| include_hidden || m.visible)
            .cloned()
            .collect()
    }

    pub async fn list_by_category(&self, category: &str) -> Vec<Movie> {
        let guard = self.inner.read().await;
        guard
            .movies
            .iter()
            .filter(|m| m.visible && m.categories.contains(category))
            .cloned()
            .collect()
    }

    pub async fn toggle_visibility(&self, id: u64) -> bool {
        let result = self
            .apply(|state| match state.position(id) {
                Some(i) => {
                    let movie = &mut state.movies[i];
                    movie.visible = !movie.visible;
                    Ok((Some(movie.visible), true))
                }
                None => Ok((None, false)),
            })
            .await;
        match result {
            Ok(Some(visible)) => {
                info!(id, visible, "movie visibility toggled");
                true
            }
            Ok(None) => false,
            Err(e) => {
                error!(id, error = %e, "failed to toggle movie visibility");
                false
            }
        }
    }

    pub async fn set_visibility(&self, id: u64, visible: bool) -> VisibilityChange {
        let result = self
            .apply(|state| match state.position(id) {
                Some(i) if state.movies[i].visible == visible => Ok((VisibilityChange::Unchanged, false)),
                Some(i) => {
                    state.movies[i].visible = visible;
                    Ok((VisibilityChange::Changed, true))
                }
                None => Ok((VisibilityChange::NotFound, false)),
            })
            .await;
        match result {
            Ok(change) => {
                if change == VisibilityChange::Changed {
                    info!(id, visible, "movie visibility set");
                }
                change
            }
            Err(e) => {
                error!(id, error = %e, "failed to set movie visibility");
                VisibilityChange::Failed
            }
        }
    }

    pub async fn delete(&self, id: u64) -> bool {
        let result = self
            .apply(|state| match state.position(id) {
                Some(i) => {
                    state.movies.remove(i);
                    Ok((true, true))
                }
                None => Ok((false, false)),
            })
            .await;
        match result {
            Ok(true) => {
                info!(id, "movie deleted");
                true
            }
            Ok(false) => {
                warn!(id, "movie not found for deletion");
                false
            }
            Err(e) => {
                error!(id, error = %e, "failed to delete movie");
                false
            }
        }
    }

    /// Перенос каталога из старого `movies.json`. Возвращает число добавленных.
    pub async fn import_legacy(&self, path: &Path) -> usize {
        let dump = match fs::read(path).await {
            Ok(data) => match serde_json::from_slice::<LegacyDump>(&data) {
                Ok(d) => d,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "legacy dump is malformed");
                    return 0;
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no legacy dump to import");
                return 0;
            }
        };
        let mut imported = 0;
        for movie in dump.movies {
            let name = movie.name.clone();
            if self.create(movie).await.is_some() {
                imported += 1;
            } else {
                warn!(name = %name, "legacy movie skipped");
            }
        }
        info!(imported, "legacy import finished");
        imported
    }

    /// Меняет копию состояния и пишет её на диск; в память она попадает
    /// только после успешной записи. Write-лок держится до конца, так что
    /// записи идут строго по очереди.
    async fn apply<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut FileState) -> Result<(T, bool), StorageError>,
    {
        let mut guard = self.inner.write().await;
        let mut next = guard.clone();
        let (out, dirty) = f(&mut next)?;
        if dirty {
            self.flush(&next).await?;
            *guard = next;
        }
        Ok(out)
    }

    async fn flush(&self, state: &FileState) -> Result<(), StorageError> {
        let snapshot = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &snapshot)
            .await
            .map_err(|source| StorageError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StorageError::Io { path: self.path.clone(), source })?;
        Ok(())
    }
}
