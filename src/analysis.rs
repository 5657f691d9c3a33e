//! The analysis pipeline: one vision call, then a concurrent fan-out of
//! structure-diagram calls whose failures stay local to their material.

use futures::future::join_all;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::gateway::{GatewayClient, GatewayError};
use crate::material::{AnalysisResult, Material};

#[derive(Debug, Clone)]
pub struct Analyzer {
    gateway: GatewayClient,
    api_key: Option<String>,
    structure_images: bool,
}

impl Analyzer {
    pub fn new(settings: &Settings) -> std::result::Result<Self, GatewayError> {
        Ok(Self {
            gateway: GatewayClient::new(settings)?,
            api_key: settings.api_key.clone(),
            structure_images: settings.structure_images,
        })
    }

    pub async fn analyze(&self, image_data_url: &str) -> Result<AnalysisResult> {
        if image_data_url.trim().is_empty() {
            return Err(AppError::MissingImage);
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AppError::NotConfigured("AI_GATEWAY_API_KEY"))?;

        let content = self.gateway.analyze_packaging(api_key, image_data_url).await?;
        let mut result = AnalysisResult::parse(&content)?;

        let images = if self.structure_images {
            join_all(
                result
                    .materials
                    .iter()
                    .map(|m| self.structure_image(api_key, m)),
            )
            .await
        } else {
            vec![None; result.materials.len()]
        };

        // Positional merge; `join_all` preserves input order.
        for (material, image) in result.materials.iter_mut().zip(images) {
            material.chemical_structure_image = image;
        }

        let generated = result
            .materials
            .iter()
            .filter(|m| m.chemical_structure_image.is_some())
            .count();
        tracing::info!(
            "analysis complete, generated {}/{} structure images",
            generated,
            result.materials.len()
        );

        Ok(result)
    }

    /// Never fails: any problem is logged and becomes `None`.
    async fn structure_image(&self, api_key: &str, material: &Material) -> Option<String> {
        let Some(formula) = material.formula() else {
            tracing::debug!(material = %material.kind, "no formula, skipping structure image");
            return None;
        };

        tracing::info!(material = %material.kind, formula, "generating structure image");
        match self.gateway.generate_structure(api_key, formula).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                tracing::warn!(material = %material.kind, "no image URL returned");
                None
            }
            Err(err) => {
                tracing::warn!(
                    material = %material.kind,
                    error = %err,
                    "structure image generation failed"
                );
                None
            }
        }
    }
}
