//! Shared test fixtures: a fully populated scene with one file, the studio
//! list it references, and default template variables.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::TemplateVariables;
use crate::model::{
    Fingerprint, FingerprintKind, Gender, Movie, Performer, Scene, SceneFile, SceneMovie,
    StashId, Studio, StudioRef, Tag,
};
use crate::template::TemplateContext;

pub fn studio(id: &str, name: &str) -> Studio {
    Studio {
        id: id.to_string(),
        name: name.to_string(),
        parent_studio: None,
    }
}

pub fn studio_with_parent(id: &str, name: &str, parent_id: &str) -> Studio {
    Studio {
        id: id.to_string(),
        name: name.to_string(),
        parent_studio: Some(StudioRef {
            id: parent_id.to_string(),
            name: None,
        }),
    }
}

pub fn performer(id: i64, name: &str, gender: Option<Gender>) -> Performer {
    Performer {
        id,
        name: name.to_string(),
        favorite: false,
        gender,
        rating100: None,
        stash_ids: vec![StashId {
            endpoint: "http://localhost:9999/graphql".to_string(),
            stash_id: format!("performer_stash_id_{id}"),
        }],
    }
}

pub fn file() -> SceneFile {
    SceneFile {
        id: "1".to_string(),
        path: PathBuf::from("/media/incoming/file1.mp4"),
        basename: "file1.mp4".to_string(),
        width: 1920,
        height: 1080,
        video_codec: "h264".to_string(),
        audio_codec: "aac".to_string(),
        frame_rate: 30.0,
        duration: 3030.56,
        bit_rate: 6_158_790,
        mod_time: "2022-11-29T23:54:07-07:00".to_string(),
        created_at: "2023-02-22T22:55:02-07:00".to_string(),
        updated_at: "2023-03-07T12:21:01-07:00".to_string(),
        parent_folder_id: "140".to_string(),
        fingerprints: vec![
            Fingerprint {
                kind: FingerprintKind::Oshash,
                value: "file_oshash".to_string(),
            },
            Fingerprint {
                kind: FingerprintKind::Phash,
                value: "file_phash".to_string(),
            },
        ],
    }
}

pub fn scene() -> Scene {
    Scene {
        id: "1".to_string(),
        title: Some("Scene Title".to_string()),
        date: NaiveDate::from_ymd_opt(2023, 1, 15),
        studio: Some(studio("1", "Studio A")),
        performers: vec![
            performer(1, "Trinity St. Clair", Some(Gender::Female)),
            performer(2, "Gia Derza", Some(Gender::Female)),
            performer(3, "J Mac", Some(Gender::Male)),
        ],
        rating100: Some(100),
        organized: false,
        code: Some("ABC-123".to_string()),
        tags: vec![
            Tag {
                id: 1,
                name: "Tag 1".to_string(),
            },
            Tag {
                id: 2,
                name: "Tag 2".to_string(),
            },
            Tag {
                id: 3,
                name: "Tag 3".to_string(),
            },
        ],
        files: vec![file()],
        movies: vec![SceneMovie {
            movie: Movie {
                id: 1,
                name: "Movie A".to_string(),
                date: NaiveDate::from_ymd_opt(2022, 1, 15),
            },
            scene_index: Some(1),
        }],
        stash_ids: vec![StashId {
            endpoint: "http://localhost:9999/graphql".to_string(),
            stash_id: "scene_stash_id".to_string(),
        }],
    }
}

/// The standard fixture: scene plus the studio list it references ("Studio A"
/// nested under "Parent Studio") and default template variables.
pub fn fixture() -> (Scene, Vec<Studio>, TemplateVariables) {
    let studios = vec![
        studio_with_parent("1", "Studio A", "2"),
        studio("2", "Parent Studio"),
    ];
    (scene(), studios, TemplateVariables::default())
}

pub fn ctx<'a>(
    scene: &'a Scene,
    studios: &'a [Studio],
    variables: &'a TemplateVariables,
) -> TemplateContext<'a> {
    TemplateContext {
        scene,
        studios,
        file: &scene.files[0],
        variables,
    }
}
