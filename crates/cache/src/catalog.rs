//! Voice catalog persisted as a JSON file.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vox_protocol::{FeedbackComment, Stage};

use crate::bounded::{BoundedCache, CacheUsage};
use crate::CacheError;

/// Catalog capacity in serialized bytes.
pub const DEFAULT_CAPACITY: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceKind {
    Base,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: VoiceKind,
    pub upload_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<Stage>,
    #[serde(default, rename = "isAIVoice")]
    pub is_ai_voice: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<FeedbackComment>,
}

impl Voice {
    /// New voice with a fresh id, uploaded now.
    pub fn new(title: impl Into<String>, kind: VoiceKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            audio_url: None,
            kind,
            upload_date: Utc::now(),
            project_id: None,
            stage_id: None,
            is_ai_voice: false,
            feedback: Vec::new(),
        }
    }
}

fn json_weight(voice: &Voice) -> usize {
    serde_json::to_vec(voice).map_or(0, |v| v.len())
}

/// Voices known locally, bounded by their serialized size.
#[derive(Debug)]
pub struct VoiceCatalog {
    voices: BoundedCache<String, Voice>,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            voices: BoundedCache::new(capacity, json_weight),
        }
    }

    /// Adds or replaces a voice; returns the voices evicted to make room.
    pub fn add(&mut self, voice: Voice) -> Result<Vec<Voice>, CacheError> {
        let evicted = self.voices.set(voice.id.clone(), voice)?;
        if !evicted.is_empty() {
            warn!(count = evicted.len(), "voice catalog full, evicted oldest voices");
        }
        Ok(evicted.into_iter().map(|(_, v)| v).collect())
    }

    pub fn get(&self, id: &str) -> Option<&Voice> {
        self.voices.get(&id.to_string())
    }

    pub fn remove(&mut self, id: &str) -> Option<Voice> {
        self.voices.evict(&id.to_string())
    }

    /// All voices, oldest first.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Uploaded (non-AI) voices of a project.
    pub fn for_project(&self, project: &str) -> Vec<&Voice> {
        self.voices()
            .filter(|v| v.project_id.as_deref() == Some(project) && !v.is_ai_voice)
            .collect()
    }

    pub fn ai_voices_for_stage(&self, project: &str, stage: Stage) -> Vec<&Voice> {
        self.voices()
            .filter(|v| {
                v.is_ai_voice && v.project_id.as_deref() == Some(project) && v.stage_id == Some(stage)
            })
            .collect()
    }

    pub fn base_voices(&self) -> Vec<&Voice> {
        self.voices().filter(|v| v.kind == VoiceKind::Base).collect()
    }

    /// Keeps the `keep` most recently uploaded voices; returns how many were dropped.
    pub fn prune_to(&mut self, keep: usize) -> usize {
        let mut by_date: Vec<(DateTime<Utc>, String)> = self
            .voices()
            .map(|v| (v.upload_date, v.id.clone()))
            .collect();
        by_date.sort_by(|a, b| b.0.cmp(&a.0));

        let stale: Vec<String> = by_date.into_iter().skip(keep).map(|(_, id)| id).collect();
        for id in &stale {
            self.voices.evict(id);
        }
        if !stale.is_empty() {
            debug!(dropped = stale.len(), kept = self.len(), "pruned voice catalog");
        }
        stale.len()
    }

    pub fn usage(&self) -> CacheUsage {
        self.voices.usage()
    }

    /// Loads a catalog saved by [`save`](Self::save). A missing file yields
    /// an empty catalog.
    pub fn load(path: &Path, capacity: usize) -> Result<Self, CacheError> {
        let mut catalog = Self::with_capacity(capacity);
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(catalog),
            Err(e) => return Err(e.into()),
        };
        let voices: Vec<Voice> = serde_json::from_slice(&data)?;
        for voice in voices {
            catalog.add(voice)?;
        }
        debug!(path = %path.display(), voices = catalog.len(), "loaded voice catalog");
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let voices: Vec<&Voice> = self.voices().collect();
        std::fs::write(path, serde_json::to_vec_pretty(&voices)?)?;
        Ok(())
    }
}
