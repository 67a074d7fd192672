//! REST client for the Layer Studio backend.
//!
//! Wraps the `/api/v1` layer, layer-asset, media library and scene
//! endpoints using [`reqwest`]. Every response is a
//! `{ "success": bool, "data": ..., "error": ... }` envelope; a non-2xx
//! status or `success: false` is an error.

use crate::config::RemoteConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studio_core::id::RecordId;
use studio_core::model::*;
use studio_editor::store::LoadedLayer;

/// HTTP client for one Layer Studio backend.
#[derive(Debug, Clone)]
pub struct StudioApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Layer Studio API error ({status}): {body}")]
    Status {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// 2xx response with `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// `success: true` but no `data` field.
    #[error("response carried no data")]
    MissingData,

    /// `data` did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// A layer as the backend returns it. Nested assets omit `layer_number`;
/// it is filled in from the owning layer.
#[derive(Debug, Deserialize)]
struct WireLayer {
    #[serde(flatten)]
    layer: Layer,
    #[serde(default)]
    assets: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct NewLayer {
    layer_number: LayerKind,
    name: &'static str,
    layer_type: &'static str,
    is_visible: bool,
    opacity: f32,
    is_locked: bool,
}

impl NewLayer {
    fn standard(kind: LayerKind) -> Self {
        Self {
            layer_number: kind,
            name: kind.display_name(),
            layer_type: kind.slug(),
            is_visible: true,
            opacity: 1.0,
            is_locked: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ScopedBody<T> {
    episode_id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene_id: Option<RecordId>,
    #[serde(flatten)]
    body: T,
}

impl<T> ScopedBody<T> {
    fn new(scope: CompositionScope, body: T) -> Self {
        Self {
            episode_id: scope.episode_id,
            scene_id: scope.scene_id,
            body,
        }
    }
}

#[derive(Debug, Serialize)]
struct BulkLayers {
    layers: Vec<NewLayer>,
}

impl StudioApi {
    /// Create a client with its own connection pool.
    pub fn new(config: &RemoteConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- layers ----

    /// `GET /api/v1/layers?include_assets=true`, scoped to an episode and
    /// optionally a scene.
    pub async fn list_layers(&self, scope: CompositionScope) -> Result<Vec<LoadedLayer>, ApiError> {
        let mut query = vec![("episode_id", scope.episode_id.to_string())];
        if let Some(scene) = scope.scene_id {
            query.push(("scene_id", scene.to_string()));
        }
        query.push(("include_assets", "true".to_string()));

        let response = self
            .client
            .get(self.url("layers"))
            .query(&query)
            .send()
            .await?;

        let wire: Vec<WireLayer> = Self::parse_data(response).await?;
        wire.into_iter()
            .map(|WireLayer { layer, assets }| {
                let assets = assets
                    .into_iter()
                    .map(|a| decode_asset(a, layer.layer_number))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LoadedLayer { layer, assets })
            })
            .collect()
    }

    /// `POST /api/v1/layers` for a single standard layer.
    pub async fn create_layer(&self, scope: CompositionScope, kind: LayerKind) -> Result<Layer, ApiError> {
        let response = self
            .client
            .post(self.url("layers"))
            .json(&ScopedBody::new(scope, NewLayer::standard(kind)))
            .send()
            .await?;

        Self::parse_data(response).await
    }

    /// `POST /api/v1/layers/bulk-create` with default properties.
    pub async fn bulk_create_layers(
        &self,
        scope: CompositionScope,
        kinds: &[LayerKind],
    ) -> Result<Vec<Layer>, ApiError> {
        let body = BulkLayers {
            layers: kinds.iter().map(|&k| NewLayer::standard(k)).collect(),
        };
        let response = self
            .client
            .post(self.url("layers/bulk-create"))
            .json(&ScopedBody::new(scope, body))
            .send()
            .await?;

        Self::parse_data(response).await
    }

    /// `PUT /api/v1/layers/:id`
    pub async fn update_layer(&self, id: RecordId, patch: &LayerPatch) -> Result<Layer, ApiError> {
        let response = self
            .client
            .put(self.url(&format!("layers/{id}")))
            .json(patch)
            .send()
            .await?;

        Self::parse_data(response).await
    }

    // ---- layer assets ----

    /// `POST /api/v1/layers/:id/assets`. The asset's local id is not sent;
    /// the returned record carries the server id.
    pub async fn create_layer_asset(
        &self,
        layer_id: RecordId,
        asset: &PositionedAsset,
    ) -> Result<PositionedAsset, ApiError> {
        let mut body = serde_json::to_value(asset)?;
        if let Value::Object(map) = &mut body {
            map.remove("id");
            map.remove("layer_number");
        }

        let response = self
            .client
            .post(self.url(&format!("layers/{layer_id}/assets")))
            .json(&body)
            .send()
            .await?;

        let created: Value = Self::parse_data(response).await?;
        decode_asset(created, asset.layer_number)
    }

    /// `PUT /api/v1/layers/assets/:id`
    pub async fn update_layer_asset(&self, id: RecordId, patch: &AssetPatch) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!("layers/assets/{id}")))
            .json(patch)
            .send()
            .await?;

        Self::check_success(response).await
    }

    /// `DELETE /api/v1/layers/assets/:id`
    pub async fn delete_layer_asset(&self, id: RecordId) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("layers/assets/{id}")))
            .send()
            .await?;

        Self::check_success(response).await
    }

    // ---- media library ----

    /// `GET /api/v1/episodes/:id/assets`
    pub async fn list_media(&self, episode_id: RecordId) -> Result<Vec<MediaAsset>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("episodes/{episode_id}/assets")))
            .send()
            .await?;

        Self::parse_data(response).await
    }

    /// Layers and media library for one composition, fetched concurrently.
    pub async fn fetch_composition(
        &self,
        scope: CompositionScope,
    ) -> Result<(Vec<LoadedLayer>, Vec<MediaAsset>), ApiError> {
        tokio::try_join!(self.list_layers(scope), self.list_media(scope.episode_id))
    }

    // ---- scenes ----

    /// `GET /api/v1/scenes?episode_id=`, ordered by scene number.
    pub async fn list_scenes(&self, episode_id: RecordId) -> Result<Vec<Scene>, ApiError> {
        let response = self
            .client
            .get(self.url("scenes"))
            .query(&[("episode_id", episode_id.to_string())])
            .send()
            .await?;

        let mut scenes: Vec<Scene> = Self::parse_data(response).await?;
        scenes.sort_by_key(|s| s.scene_number);
        Ok(scenes)
    }

    /// `POST /api/v1/scenes`
    pub async fn create_scene(&self, scene: &NewScene) -> Result<Scene, ApiError> {
        let response = self
            .client
            .post(self.url("scenes"))
            .json(scene)
            .send()
            .await?;

        Self::parse_data(response).await
    }

    /// `PATCH /api/v1/scenes/:id`
    pub async fn update_scene(&self, id: RecordId, patch: &ScenePatch) -> Result<Scene, ApiError> {
        let response = self
            .client
            .patch(self.url(&format!("scenes/{id}")))
            .json(patch)
            .send()
            .await?;

        Self::parse_data(response).await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`] with the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ApiError> {
        let response = Self::ensure_success(response).await?;
        let envelope = response.json::<Envelope<T>>().await?;
        if !envelope.success {
            return Err(ApiError::Rejected(
                envelope
                    .error
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        Ok(envelope)
    }

    /// Unwrap `data` from a successful envelope.
    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        Self::parse_envelope::<T>(response)
            .await?
            .data
            .ok_or(ApiError::MissingData)
    }

    /// Check the envelope reports success, discarding any data.
    async fn check_success(response: reqwest::Response) -> Result<(), ApiError> {
        Self::parse_envelope::<Value>(response).await?;
        Ok(())
    }
}

/// Decode a layer-asset record, filling `layer_number` from its layer when
/// the backend leaves it out.
fn decode_asset(mut value: Value, layer: LayerKind) -> Result<PositionedAsset, ApiError> {
    if let Value::Object(map) = &mut value
        && map.get("layer_number").is_none_or(Value::is_null)
    {
        map.insert("layer_number".to_string(), Value::from(layer.number()));
    }
    Ok(serde_json::from_value(value)?)
}
