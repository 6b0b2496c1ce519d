//! GraphQL client for the catalog server. Read-only: the renamer fetches
//! scenes and studios over the API and writes changes through the catalog
//! database directly.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::{Scene, Studio};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request to catalog API failed: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("malformed catalog API response: {0}")]
    Malformed(String),
    #[error("failed to decode catalog API response: {0}")]
    Json(#[from] serde_json::Error),
}

const SCENE_FRAGMENT: &str = "
fragment SceneData on Scene {
  id
  title
  date
  rating100
  organized
  code
  studio {
    id
    name
    parent_studio {
      id
      name
    }
  }
  performers {
    id
    name
    favorite
    gender
    rating100
    stash_ids {
      endpoint
      stash_id
    }
  }
  tags {
    id
    name
  }
  files {
    id
    path
    basename
    width
    height
    video_codec
    audio_codec
    frame_rate
    duration
    bit_rate
    mod_time
    created_at
    updated_at
    parent_folder_id
    fingerprints {
      type
      value
    }
  }
  movies {
    movie {
      id
      name
      date
    }
    scene_index
  }
  stash_ids {
    endpoint
    stash_id
  }
}
";

pub struct CatalogApi {
    url: String,
}

impl CatalogApi {
    /// Create a client and probe the server version. A failed probe is
    /// logged but not fatal; the run will surface a real error on the first
    /// query that matters.
    pub fn connect(url: &str) -> Self {
        let api = Self {
            url: url.to_string(),
        };
        match api.version() {
            Ok(version) => log::info!("Connected to catalog API {version} at {url}"),
            Err(err) => log::warn!("Could not query catalog API version at {url}: {err}"),
        }
        api
    }

    pub fn version(&self) -> Result<String, ApiError> {
        let data = self.request("query Version { version { version } }", serde_json::json!({}))?;
        data["version"]["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Malformed("missing version field".to_string()))
    }

    pub fn all_studios(&self) -> Result<Vec<Studio>, ApiError> {
        let query = "
            query AllStudios {
              findStudios(filter: { per_page: -1 }) {
                studios {
                  id
                  name
                  parent_studio {
                    id
                    name
                  }
                }
              }
            }
        ";
        let data = self.request(query, serde_json::json!({}))?;
        decode_list(&data["findStudios"]["studios"], "studio")
    }

    /// All scenes in the catalog. Scenes that fail to decode are logged and
    /// skipped rather than aborting the whole run.
    pub fn all_scenes(&self) -> Result<Vec<Scene>, ApiError> {
        let query = format!(
            "
            query AllScenes {{
              findScenes(filter: {{ per_page: -1 }}) {{
                scenes {{
                  ...SceneData
                }}
              }}
            }}
            {SCENE_FRAGMENT}
            "
        );
        let data = self.request(&query, serde_json::json!({}))?;
        decode_list(&data["findScenes"]["scenes"], "scene")
    }

    pub fn scene_by_id(&self, id: &str) -> Result<Option<Scene>, ApiError> {
        let query = format!(
            "
            query FindScene($id: ID!) {{
              findScene(id: $id) {{
                ...SceneData
              }}
            }}
            {SCENE_FRAGMENT}
            "
        );
        let data = self.request(&query, serde_json::json!({ "id": id }))?;
        let scene = &data["findScene"];
        if scene.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(scene.clone())?))
    }

    fn request(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut response = ureq::post(&self.url)
            .send_json(&body)
            .map_err(Box::new)?;
        let reply: serde_json::Value = response.body_mut().read_json().map_err(Box::new)?;

        if let Some(errors) = reply.get("errors").filter(|e| !e.is_null()) {
            return Err(ApiError::Malformed(format!("GraphQL errors: {errors}")));
        }
        reply
            .get("data")
            .cloned()
            .ok_or_else(|| ApiError::Malformed("response has no data field".to_string()))
    }
}

/// Decode a JSON array element by element, logging and skipping entries that
/// don't fit the model.
fn decode_list<T: DeserializeOwned>(
    value: &serde_json::Value,
    kind: &str,
) -> Result<Vec<T>, ApiError> {
    let Some(items) = value.as_array() else {
        return Err(ApiError::Malformed(format!("expected a list of {kind}s")));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value(item.clone()) {
            Ok(decoded) => out.push(decoded),
            Err(err) => {
                let id = item.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                log::warn!("Skipping {kind} (id={id}) with unreadable data: {err}");
            }
        }
    }
    Ok(out)
}
