//! Face-attribute analysis collaborator.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use report_flow::{PhotoAnalysis, SkinStatus};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::FaceApiConfig;

#[derive(Debug, Error)]
pub enum FaceAnalysisError {
    #[error("no face detected")]
    NoFaceDetected,

    #[error("face analysis failed: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait FaceAnalyzer: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<PhotoAnalysis, FaceAnalysisError>;
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

#[derive(Debug, Deserialize)]
struct DetectedFace {
    #[serde(default)]
    attributes: FaceAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct FaceAttributes {
    #[serde(default)]
    age: Option<AgeValue>,
    #[serde(default)]
    skinstatus: Option<SkinStatus>,
}

#[derive(Debug, Deserialize)]
struct AgeValue {
    value: u32,
}

fn into_analysis(response: DetectResponse) -> Result<PhotoAnalysis, FaceAnalysisError> {
    let face = response
        .faces
        .into_iter()
        .next()
        .ok_or(FaceAnalysisError::NoFaceDetected)?;
    Ok(PhotoAnalysis {
        age_estimate: face.attributes.age.map(|age| age.value),
        skin: face.attributes.skinstatus.unwrap_or_default(),
    })
}

/// HTTP client for a Face++-style detect endpoint.
pub struct FaceApiClient {
    http: reqwest::Client,
    config: FaceApiConfig,
}

impl FaceApiClient {
    pub fn new(config: FaceApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }
}

#[async_trait]
impl FaceAnalyzer for FaceApiClient {
    async fn analyze(&self, image: &[u8]) -> Result<PhotoAnalysis, FaceAnalysisError> {
        let encoded = BASE64.encode(image);
        let params = [
            ("api_key", self.config.api_key.as_str()),
            ("api_secret", self.config.api_secret.as_str()),
            ("image_base64", encoded.as_str()),
            ("return_attributes", "age,skinstatus"),
        ];

        let response = self
            .http
            .post(&self.config.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| FaceAnalysisError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FaceAnalysisError::Upstream(format!(
                "detect endpoint returned {status}"
            )));
        }

        let detect: DetectResponse = response
            .json()
            .await
            .map_err(|e| FaceAnalysisError::Upstream(format!("invalid detect response: {e}")))?;
        debug!(faces = detect.faces.len(), "face detection response");
        into_analysis(detect)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_first_face_attributes() {
        let response: DetectResponse = serde_json::from_value(json!({
            "faces": [{
                "attributes": {
                    "age": { "value": 38 },
                    "skinstatus": { "health": 71.5, "dark_circle": 42.0, "acne": 8.0 }
                }
            }]
        }))
        .unwrap();

        let analysis = into_analysis(response).unwrap();
        assert_eq!(analysis.age_estimate, Some(38));
        assert_eq!(analysis.skin.health, Some(71.5));
        assert_eq!(analysis.skin.dark_circle, 42.0);
        assert_eq!(analysis.skin.acne, 8.0);
        // Indicators missing from the response default to zero.
        assert_eq!(analysis.skin.eye_pouch, 0.0);
    }

    #[test]
    fn empty_face_list_is_no_face_detected() {
        let response: DetectResponse = serde_json::from_value(json!({ "faces": [] })).unwrap();
        assert!(matches!(
            into_analysis(response),
            Err(FaceAnalysisError::NoFaceDetected)
        ));
    }
}
