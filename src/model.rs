//! Read-only snapshots of catalog entities, deserialized from the catalog
//! GraphQL API. Nothing here is persisted by this crate; the catalog database
//! is only touched through [`crate::db`].

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer};

/// A catalogued media item with metadata and one or more underlying files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub studio: Option<Studio>,
    pub performers: Vec<Performer>,
    #[serde(default)]
    pub rating100: Option<i64>,
    pub organized: bool,
    #[serde(default)]
    pub code: Option<String>,
    pub tags: Vec<Tag>,
    pub files: Vec<SceneFile>,
    pub movies: Vec<SceneMovie>,
    pub stash_ids: Vec<StashId>,
}

impl Scene {
    pub fn rating(&self) -> Option<i64> {
        self.rating100
    }

    pub fn studio_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// First catalog identifier wins when a scene carries several.
    pub fn stash_id(&self) -> Option<&str> {
        self.stash_ids.first().map(|s| s.stash_id.as_str())
    }

    /// First movie entry wins when a scene belongs to several.
    pub fn movie_name(&self) -> Option<&str> {
        self.movies.first().map(|m| m.movie.name.as_str())
    }

    pub fn movie_date(&self) -> Option<NaiveDate> {
        self.movies.first().and_then(|m| m.movie.date)
    }

    pub fn movie_scene_number(&self) -> Option<i64> {
        self.movies.first().and_then(|m| m.scene_index)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Performer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, deserialize_with = "gender_empty_as_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub rating100: Option<i64>,
    #[serde(default)]
    pub stash_ids: Vec<StashId>,
}

impl Performer {
    pub fn stash_id(&self) -> Option<&str> {
        self.stash_ids.first().map(|s| s.stash_id.as_str())
    }
}

/// The API sends either null or an empty string for an unset gender.
fn gender_empty_as_none<'de, D>(deserializer: D) -> Result<Option<Gender>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::IntoDeserializer;
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => Gender::deserialize(s.into_deserializer()).map(Some),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    TransgenderMale,
    TransgenderFemale,
    Intersex,
    NonBinary,
    Undefined,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A studio, optionally nested under a parent. Parent references are resolved
/// against the flat studio list fetched from the API (see [`crate::studios`]),
/// never by following embedded objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Studio {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_studio: Option<StudioRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudioRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneFile {
    pub id: String,
    pub path: PathBuf,
    pub basename: String,
    pub width: i64,
    pub height: i64,
    pub video_codec: String,
    pub audio_codec: String,
    pub frame_rate: f64,
    /// Duration in seconds as reported by the catalog.
    pub duration: f64,
    /// Bits per second.
    pub bit_rate: i64,
    pub mod_time: String,
    pub created_at: String,
    pub updated_at: String,
    pub parent_folder_id: String,
    #[serde(default)]
    pub fingerprints: Vec<Fingerprint>,
}

impl SceneFile {
    /// Substring after the last `.` in the basename. A basename without a dot
    /// yields the whole basename.
    pub fn extension(&self) -> &str {
        self.basename.rsplit('.').next().unwrap_or(&self.basename)
    }

    /// Bit rate in Mbps, rounded to two decimals.
    pub fn bit_rate_mbps(&self) -> String {
        format!("{:.2}", self.bit_rate as f64 / 1_000_000.0)
    }

    pub fn resolution(&self) -> String {
        format!("{}p", self.height)
    }

    pub fn resolution_name(&self) -> String {
        if self.height > self.width {
            return "VERTICAL".to_string();
        }
        match self.height {
            h if h >= 4320 => "8k".to_string(),
            h if h >= 3384 => "6k".to_string(),
            h if h >= 2880 => "5k".to_string(),
            h if h >= 2160 => "4k".to_string(),
            h if h >= 1440 => "2k".to_string(),
            h if h >= 1080 => "FHD".to_string(),
            h if h >= 720 => "HD".to_string(),
            h if h >= 480 => "SD".to_string(),
            h => format!("{h}p"),
        }
    }

    /// Duration as a time of day, truncated to whole seconds and capped just
    /// under 24h (the catalog reports media duration as H:M:S).
    pub fn duration_time(&self) -> Option<NaiveTime> {
        let secs = (self.duration.max(0.0) as u32).min(86_399);
        NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
    }

    pub fn oshash(&self) -> Option<&str> {
        self.fingerprint(FingerprintKind::Oshash)
    }

    pub fn phash(&self) -> Option<&str> {
        self.fingerprint(FingerprintKind::Phash)
    }

    /// First fingerprint of the given kind wins.
    fn fingerprint(&self, kind: FingerprintKind) -> Option<&str> {
        self.fingerprints
            .iter()
            .find(|f| f.kind == kind)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fingerprint {
    #[serde(rename = "type")]
    pub kind: FingerprintKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintKind {
    Oshash,
    Phash,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneMovie {
    pub movie: Movie,
    #[serde(default)]
    pub scene_index: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Movie {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StashId {
    pub endpoint: String,
    pub stash_id: String,
}
