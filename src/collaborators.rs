//! External collaborator seams and the end-to-end outpainting flow
//!
//! Describing an image and synthesising the expanded picture are delegated to
//! remote AI services. Only their interfaces live here; concrete clients are
//! supplied by the embedding service.

use crate::{
    download::HttpSource,
    error::{OutpaintError, Result},
    processor::PreparationProcessor,
    types::{PreparedImages, Resolution, Upload},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Instruction sent alongside the image to the vision model
pub const DESCRIPTION_PROMPT: &str = "What's in the image, do not use full sentences, just describe the objects, ignore any watermarks or text on the image.";

/// Produces a short textual description of an image
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    /// Describe the image at `image_path` following `instruction`
    async fn describe(&self, image_path: &Path, instruction: &str) -> Result<String>;
}

/// Inputs for an image-edit (outpainting) request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub expanded: PathBuf,
    pub mask: PathBuf,
    pub prompt: String,
    /// Number of images to generate
    pub count: u32,
    /// `WIDTHxHEIGHT` string matching the canvas
    pub size: String,
}

impl EditRequest {
    /// Single-image request sized to the prepared canvas
    #[must_use]
    pub fn from_prepared(prepared: &PreparedImages, prompt: String) -> Self {
        Self {
            expanded: prepared.expanded_path.clone(),
            mask: prepared.mask_path.clone(),
            prompt,
            count: 1,
            size: prepared.resolution.size_spec(),
        }
    }
}

/// Generates expanded images from a canvas, mask and prompt
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Returns URLs of the generated images
    async fn synthesize(&self, request: &EditRequest) -> Result<Vec<String>>;
}

/// Everything produced by one outpainting request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpaintOutcome {
    pub prepared: PreparedImages,
    pub description: String,
    pub urls: Vec<String>,
}

impl OutpaintOutcome {
    /// First generated image URL
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

/// Prepare → describe → synthesize
pub struct OutpaintPipeline<S, D, E> {
    processor: PreparationProcessor<S>,
    describer: D,
    editor: E,
}

impl<S, D, E> OutpaintPipeline<S, D, E>
where
    S: HttpSource,
    D: ImageDescriber,
    E: ImageEditor,
{
    pub fn new(processor: PreparationProcessor<S>, describer: D, editor: E) -> Self {
        Self {
            processor,
            describer,
            editor,
        }
    }

    /// Run the full outpainting flow for one request
    ///
    /// The description is generated from the original source image, not the
    /// padded canvas.
    ///
    /// # Errors
    /// - any preparation error
    /// - collaborator failures, propagated unchanged
    /// - `Internal` when the editor returns no images
    pub async fn run(
        &self,
        upload: Option<Upload>,
        url: Option<&str>,
        resolution: Resolution,
    ) -> Result<OutpaintOutcome> {
        let prepared = self.processor.prepare(upload, url, resolution).await?;

        let description = self
            .describer
            .describe(&prepared.source_path, DESCRIPTION_PROMPT)
            .await?;
        tracing::debug!(description = %description, "Generated image description");

        let request = EditRequest::from_prepared(&prepared, description.clone());
        let urls = self.editor.synthesize(&request).await?;
        if urls.is_empty() {
            return Err(OutpaintError::internal(
                "Image editor returned no generated images",
            ));
        }

        Ok(OutpaintOutcome {
            prepared,
            description,
            urls,
        })
    }
}
