use crate::workflow::config::ServiceConfig;
use anyhow::Context;
use chrono::Utc;
use crowdsafe_core::analysis::{AnalysisResult, ScenarioAnalyzer};
use crowdsafe_core::dashboard::DashboardSummary;
use crowdsafe_core::prelude::{
    AnalysisError, Analyzer, StorageError, StoreError, ValidationError, VideoReference,
};
use crowdsafe_core::store::{AnalysisRecord, AnalysisStore, Cursor, JsonLinesStore, MemoryStore};
use crowdsafe_core::telemetry::{LogManager, MetricsRecorder};
use crowdsafe_core::upload::{object_name, FsObjectStore, ObjectInfo, ObjectStore, UploadCandidate};
use log::error;
use std::sync::Arc;

/// Failures of a service operation, each terminal for that request.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to upload video")]
    Upload(#[source] StorageError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("Failed to load dashboard data")]
    Read(#[source] StoreError),
}

/// Wires the analyzer, the bucket and the analysis table together.
#[derive(Clone)]
pub struct AnalysisRunner {
    config: ServiceConfig,
    analyzer: Arc<dyn Analyzer>,
    store: Arc<dyn AnalysisStore>,
    objects: Arc<dyn ObjectStore>,
    metrics: Arc<MetricsRecorder>,
    logger: Arc<LogManager>,
}

impl AnalysisRunner {
    pub fn new(
        config: ServiceConfig,
        analyzer: Arc<dyn Analyzer>,
        store: Arc<dyn AnalysisStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            analyzer,
            store,
            objects,
            metrics: Arc::new(MetricsRecorder::new()),
            logger: Arc::new(LogManager::new("runner")),
        }
    }

    /// Builds the runner described by `config`.
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let analyzer: Arc<dyn Analyzer> = match config.seed {
            Some(seed) => Arc::new(ScenarioAnalyzer::seeded(seed)),
            None => Arc::new(ScenarioAnalyzer::new()),
        };
        let store: Arc<dyn AnalysisStore> = match &config.store_path {
            Some(path) => Arc::new(
                JsonLinesStore::open(path)
                    .with_context(|| format!("opening analysis store {}", path.display()))?,
            ),
            None => Arc::new(MemoryStore::new()),
        };
        let objects = Arc::new(
            FsObjectStore::open(&config.storage_root, &config.bucket)
                .with_context(|| format!("opening bucket {}", config.bucket))?,
        );
        Ok(Self::new(config, analyzer, store, objects))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn AnalysisStore> {
        &self.store
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Generates a result for `video` and persists it; an insert failure
    /// fails the whole call.
    pub fn analyze(&self, video: &VideoReference) -> Result<AnalysisResult, ServiceError> {
        self.logger.record(&format!(
            "Analyzing video: path={:?} url={:?}",
            video.video_path, video.video_url
        ));
        let result = self.analyzer.analyze(video);
        let record = AnalysisRecord::new(&result, video);

        match self.store.insert(record) {
            Ok(saved) => {
                self.metrics.record_analysis();
                self.logger.record(&format!(
                    "saved analysis {} ({})",
                    saved.id, saved.crowd_level
                ));
                Ok(result)
            }
            Err(err) => {
                self.metrics.record_error();
                error!("Error saving analysis: {}", err);
                Err(AnalysisError::Persist(err).into())
            }
        }
    }

    /// Validates and stores an uploaded video, returning its bucket key.
    pub fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: &[u8],
    ) -> Result<ObjectInfo, ServiceError> {
        if let Err(err) = self.config.upload_policy().validate(candidate) {
            self.metrics.record_rejected();
            return Err(err.into());
        }
        let key = object_name(&candidate.name, Utc::now().timestamp_millis());
        match self.objects.put(&key, bytes) {
            Ok(info) => {
                self.metrics.record_upload();
                Ok(info)
            }
            Err(err) => {
                self.metrics.record_error();
                error!("Upload error: {}", err);
                Err(ServiceError::Upload(err))
            }
        }
    }

    /// Upload followed by analysis of the stored path.
    pub fn upload_and_analyze(
        &self,
        candidate: &UploadCandidate,
        bytes: &[u8],
    ) -> Result<AnalysisResult, ServiceError> {
        let info = self.upload(candidate, bytes)?;
        self.analyze(&VideoReference::from_path(info.key))
    }

    pub fn page(
        &self,
        before: Option<&Cursor>,
        limit: Option<usize>,
    ) -> Result<Vec<AnalysisRecord>, ServiceError> {
        let limit = self.config.clamp_limit(limit);
        self.store.page(before, limit).map_err(ServiceError::Read)
    }

    pub fn dashboard(&self, window: Option<usize>) -> Result<DashboardSummary, ServiceError> {
        let rows = self
            .store
            .recent(self.config.clamp_limit(window))
            .map_err(ServiceError::Read)?;
        Ok(DashboardSummary::from_rows(&rows))
    }
}
