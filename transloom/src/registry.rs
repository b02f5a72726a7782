//! Picks the codec for an upload of unknown format.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    clients::{DocumentCodec, HtmlCodec, PoCodec, SrtCodec, TranslationClient, VttCodec, XclocCodec},
    codec::{Codec, Detection},
    error::Error,
    types::UploadPayload,
};

/// A codec's verdict on one payload.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMatch {
    pub format_id: String,
    #[serde(flatten)]
    pub detection: Detection,
}

/// Registered codecs, keyed by format id.
#[derive(Default)]
pub struct FormatRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in codec.
    pub fn with_defaults() -> Result<Self, Error> {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(PoCodec))?;
        registry.register(Box::new(XclocCodec))?;
        registry.register(Box::new(SrtCodec))?;
        registry.register(Box::new(VttCodec))?;
        registry.register(Box::new(HtmlCodec))?;
        registry.register(Box::new(DocumentCodec))?;
        Ok(registry)
    }

    pub fn register(&mut self, codec: Box<dyn Codec>) -> Result<(), Error> {
        if self.codec(codec.format_id()).is_some() {
            return Err(Error::DuplicateFormat(codec.format_id().to_string()));
        }
        self.codecs.push(codec);
        Ok(())
    }

    pub fn codec(&self, format_id: &str) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|c| c.format_id() == format_id)
            .map(|c| &**c)
    }

    pub fn format_ids(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|c| c.format_id()).collect()
    }

    /// An unloaded client for `format_id`.
    pub fn new_client(&self, format_id: &str) -> Result<Box<dyn TranslationClient>, Error> {
        self.codec(format_id)
            .map(|c| c.new_client())
            .ok_or_else(|| Error::UnknownFormat(format_id.to_string()))
    }

    /// Runs every codec's detection in parallel. Returns the codecs that
    /// scored above zero, best first; ties keep registration order.
    pub fn detect_all(&self, payload: &UploadPayload) -> Vec<DetectionMatch> {
        let mut matches: Vec<DetectionMatch> = self
            .codecs
            .par_iter()
            .map(|codec| DetectionMatch {
                format_id: codec.format_id().to_string(),
                detection: codec.detect(payload),
            })
            .filter(|m| m.detection.score > 0.0)
            .collect();
        matches.sort_by(|a, b| b.detection.score.total_cmp(&a.detection.score));
        for m in &matches {
            tracing::debug!(
                format = %m.format_id,
                score = m.detection.score,
                reason = %m.detection.reason,
                "format detection"
            );
        }
        matches
    }

    /// A fresh client for the best match, or `None` if nothing reaches
    /// `min_confidence`.
    pub fn resolve(
        &self,
        payload: &UploadPayload,
        min_confidence: f32,
    ) -> Option<Box<dyn TranslationClient>> {
        let best = self.detect_all(payload).into_iter().next()?;
        if best.detection.score < min_confidence {
            tracing::debug!(
                format = %best.format_id,
                score = best.detection.score,
                min_confidence,
                "best detection below threshold"
            );
            return None;
        }
        self.new_client(&best.format_id).ok()
    }
}
