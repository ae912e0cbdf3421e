use std::{fmt, path::PathBuf, str::FromStr};

use crate::chrono::{DateTime, Utc};
use crate::error::ModelError;

use super::ids::{LibraryId, UserId};

/// A user-owned collection of content locations sharing one media type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub library_type: LibraryType,
    /// Content locations; each root is walked independently.
    pub paths: Vec<PathBuf>,
    pub owner_id: UserId,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn new(
        name: impl Into<String>,
        library_type: LibraryType,
        paths: Vec<PathBuf>,
        owner_id: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: LibraryId::new(),
            name: name.into(),
            library_type,
            paths,
            owner_id,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: LibraryId) -> Self {
        self.id = id;
        self
    }

    pub fn set_paths(&mut self, paths: Vec<PathBuf>) {
        self.paths = paths;
        self.updated_at = Utc::now();
    }
}

/// The type of content a library contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub enum LibraryType {
    Movies,
    Series,
    Music,
    Photos,
}

impl LibraryType {
    pub fn all() -> &'static [LibraryType] {
        &[
            LibraryType::Movies,
            LibraryType::Series,
            LibraryType::Music,
            LibraryType::Photos,
        ]
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryType::Movies => write!(f, "Movies"),
            LibraryType::Series => write!(f, "TV Shows"),
            LibraryType::Music => write!(f, "Music"),
            LibraryType::Photos => write!(f, "Photos"),
        }
    }
}

impl FromStr for LibraryType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movies" | "movie" => Ok(LibraryType::Movies),
            "series" | "tv" | "tvshows" | "tv shows" | "shows" => {
                Ok(LibraryType::Series)
            }
            "music" => Ok(LibraryType::Music),
            "photos" | "photo" => Ok(LibraryType::Photos),
            other => Err(ModelError::UnknownLibraryType(other.to_string())),
        }
    }
}
