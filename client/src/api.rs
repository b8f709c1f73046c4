use crate::events::{FeedEvent, SseDecoder};
use crate::progress::Progress;
use crowdsafe_core::analysis::AnalysisResult;
use crowdsafe_core::dashboard::{DashboardFeed, DashboardSummary};
use crowdsafe_core::prelude::{ValidationError, VideoReference};
use crowdsafe_core::store::{AnalysisRecord, Cursor};
use crowdsafe_core::upload::{guess_content_type, validate_url, UploadCandidate, UploadPolicy};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const ANALYZE_FALLBACK: &str = "Failed to analyze video";

/// Client-side failures, one bucket per user-facing notice.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to upload video")]
    Upload(String),
    #[error("{0}")]
    Analysis(String),
    #[error("Failed to load dashboard data")]
    Load(String),
    #[error("an analysis is already in progress")]
    Busy,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct UploadedObject {
    key: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisPage {
    pub rows: Vec<AnalysisRecord>,
    pub next_cursor: Option<Cursor>,
}

/// Releases the busy flag when an analysis finishes either way.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CrowdSafeClient {
    endpoint: String,
    http: reqwest::Client,
    policy: UploadPolicy,
    busy: AtomicBool,
    requests: AtomicUsize,
}

impl CrowdSafeClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_policy(endpoint, UploadPolicy::default())
    }

    pub fn with_policy(endpoint: impl Into<String>, policy: UploadPolicy) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            policy,
            busy: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of HTTP requests issued so far.
    pub fn requests_sent(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, ClientError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn sent(&self) {
        self.requests.fetch_add(1, Ordering::AcqRel);
    }

    /// Checks type and size of a local file without reading its contents.
    pub fn check_file(&self, path: &Path) -> Result<UploadCandidate, ClientError> {
        let metadata = fs::metadata(path).map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let candidate = UploadCandidate {
            content_type: guess_content_type(&name).to_string(),
            name,
            size: metadata.len(),
        };
        self.policy.validate(&candidate)?;
        Ok(candidate)
    }

    /// Validates, uploads and analyzes a local video file.
    pub async fn analyze_file<F>(
        &self,
        path: &Path,
        mut on_progress: F,
    ) -> Result<AnalysisResult, ClientError>
    where
        F: FnMut(Progress),
    {
        let candidate = self.check_file(path)?;
        let _guard = self.begin()?;
        on_progress(Progress::new(10));

        let bytes = fs::read(path).map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        on_progress(Progress::new(20));
        let key = self.upload(&candidate, bytes).await?;
        on_progress(Progress::new(40));

        let result = self.invoke(&VideoReference::from_path(key)).await;
        on_progress(Progress::new(80));
        let result = result?;
        on_progress(Progress::new(100));
        Ok(result)
    }

    /// Analyzes a remote video link.
    pub async fn analyze_url<F>(
        &self,
        url: &str,
        mut on_progress: F,
    ) -> Result<AnalysisResult, ClientError>
    where
        F: FnMut(Progress),
    {
        let url = validate_url(url)?;
        let _guard = self.begin()?;
        on_progress(Progress::new(10));
        on_progress(Progress::new(30));

        let result = self.invoke(&VideoReference::from_url(url)).await;
        on_progress(Progress::new(80));
        let result = result?;
        on_progress(Progress::new(100));
        Ok(result)
    }

    async fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        self.sent();
        let response = self
            .http
            .post(self.url("/storage/v1/upload"))
            .header("x-file-name", &candidate.name)
            .header(reqwest::header::CONTENT_TYPE, &candidate.content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| ClientError::Upload(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            log::error!("Upload error: {}: {}", status, text);
            return Err(ClientError::Upload(format!("{}: {}", status, text)));
        }
        let object: UploadedObject = response
            .json()
            .await
            .map_err(|err| ClientError::Upload(err.to_string()))?;
        Ok(object.key)
    }

    async fn invoke(&self, video: &VideoReference) -> Result<AnalysisResult, ClientError> {
        self.sent();
        let response = self
            .http
            .post(self.url("/functions/v1/analyze-video"))
            .json(video)
            .send()
            .await
            .map_err(|err| {
                log::error!("Analysis error: {}", err);
                ClientError::Analysis(ANALYZE_FALLBACK.into())
            })?;

        if response.status().is_success() {
            return response
                .json::<AnalysisResult>()
                .await
                .map_err(|_| ClientError::Analysis(ANALYZE_FALLBACK.into()));
        }
        let text = response.text().await.unwrap_or_default();
        Err(ClientError::Analysis(remote_message(&text)))
    }

    /// One newest-first page of the analysis table.
    pub async fn page(
        &self,
        before: Option<&Cursor>,
        limit: usize,
    ) -> Result<AnalysisPage, ClientError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = before {
            query.push(("before", cursor.to_string()));
        }
        self.sent();
        let response = self
            .http
            .get(self.url("/analyses"))
            .query(&query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ClientError::Load(err.to_string()))?;
        response
            .json()
            .await
            .map_err(|err| ClientError::Load(err.to_string()))
    }

    pub async fn dashboard(&self, window: usize) -> Result<DashboardSummary, ClientError> {
        self.sent();
        let response = self
            .http
            .get(self.url("/dashboard"))
            .query(&[("window", window)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ClientError::Load(err.to_string()))?;
        response
            .json()
            .await
            .map_err(|err| ClientError::Load(err.to_string()))
    }

    /// Opens the insert stream. Rows inserted after this returns are
    /// delivered on it.
    pub async fn subscribe(&self) -> Result<InsertStream, ClientError> {
        self.sent();
        let response = self
            .http
            .get(self.url("/analyses/stream"))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ClientError::Load(err.to_string()))?;
        Ok(InsertStream {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        })
    }

    /// Keeps a dashboard window of `window` rows current until the service
    /// closes the stream or `on_update` returns `false`.
    ///
    /// `on_update` sees the window after every load and every insert; the
    /// inserted row is passed along for inserts. The stream is opened before
    /// the window is read so no insert falls between the two.
    pub async fn follow_dashboard<F>(
        &self,
        window: usize,
        mut on_update: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&DashboardFeed, Option<&AnalysisRecord>) -> bool,
    {
        let mut feed = DashboardFeed::new(window);
        loop {
            let mut stream = self.subscribe().await?;
            let page = self.page(None, window).await?;
            feed.replace(page.rows);
            if !on_update(&feed, None) {
                return Ok(());
            }

            loop {
                match stream.next().await? {
                    Some(FeedEvent::Insert(record)) => {
                        let record = *record;
                        feed.apply(record.clone());
                        if !on_update(&feed, Some(&record)) {
                            return Ok(());
                        }
                    }
                    Some(FeedEvent::Resync { skipped }) => {
                        log::warn!("missed {} notifications, reloading", skipped);
                        break;
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Open `text/event-stream` response of inserted rows.
pub struct InsertStream {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<FeedEvent>,
}

impl InsertStream {
    /// Next event, or `None` once the service closed the stream.
    pub async fn next(&mut self) -> Result<Option<FeedEvent>, ClientError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let chunk = self
                .response
                .chunk()
                .await
                .map_err(|err| ClientError::Load(err.to_string()))?;
            match chunk {
                Some(chunk) => self.pending.extend(self.decoder.push(&chunk)),
                None => return Ok(None),
            }
        }
    }
}

fn remote_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.error)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| ANALYZE_FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowdsafe_core::analysis::Scenario;
    use futures::stream;
    use std::convert::Infallible;
    use std::fs::File;
    use std::io::Write;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::broadcast;
    use warp::sse::Event;
    use warp::Filter;

    const UNREACHABLE: &str = "http://127.0.0.1:1";

    #[tokio::test]
    async fn non_video_file_is_rejected_before_network() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        File::create(&path).unwrap().write_all(b"hello").unwrap();

        let client = CrowdSafeClient::new(UNREACHABLE);
        let err = client.analyze_file(&path, |_| {}).await.unwrap_err();

        assert!(matches!(err, ClientError::Invalid(ValidationError::NotVideo { .. })));
        assert_eq!(err.to_string(), "Please upload a valid video file");
        assert_eq!(client.requests_sent(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_before_network() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stadium.mp4");
        let file = File::create(&path).unwrap();
        file.set_len(100 * 1024 * 1024 + 1).unwrap();

        let client = CrowdSafeClient::new(UNREACHABLE);
        let mut progress = Vec::new();
        let err = client
            .analyze_file(&path, |step| progress.push(step))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Invalid(ValidationError::TooLarge { .. })));
        assert!(progress.is_empty());
        assert_eq!(client.requests_sent(), 0);
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn empty_url_is_rejected_before_network() {
        let client = CrowdSafeClient::new(UNREACHABLE);
        let err = client.analyze_url("  ", |_| {}).await.unwrap_err();
        assert!(matches!(err, ClientError::Invalid(ValidationError::MissingUrl)));
        assert_eq!(client.requests_sent(), 0);
    }

    #[tokio::test]
    async fn unreachable_upload_reports_upload_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.mp4");
        File::create(&path).unwrap().write_all(b"frames").unwrap();

        let client = CrowdSafeClient::new(UNREACHABLE);
        let err = client.analyze_file(&path, |_| {}).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to upload video");
        assert_eq!(client.requests_sent(), 1);
        assert!(!client.is_busy());
    }

    #[test]
    fn busy_flag_blocks_second_request() {
        let client = CrowdSafeClient::new(UNREACHABLE);
        let guard = client.begin().unwrap();
        assert!(matches!(client.begin(), Err(ClientError::Busy)));
        drop(guard);
        assert!(client.begin().is_ok());
    }

    #[test]
    fn remote_error_message_is_surfaced() {
        assert_eq!(
            remote_message(r#"{"error":"Failed to save analysis"}"#),
            "Failed to save analysis"
        );
        assert_eq!(remote_message("<html>bad gateway</html>"), ANALYZE_FALLBACK);
        assert_eq!(remote_message(r#"{"error":""}"#), ANALYZE_FALLBACK);
    }

    fn record(scenario: usize) -> AnalysisRecord {
        AnalysisRecord::new(
            &Scenario::get(scenario).unwrap().to_result(),
            &VideoReference::from_path(format!("public/{}-gate.mp4", scenario)),
        )
    }

    /// Serves a single page holding `listed`; answering it inserts `late`, so
    /// the row only reaches streams that were open before the page was read.
    fn insert_while_listing(listed: AnalysisRecord, late: AnalysisRecord) -> SocketAddr {
        let (sender, _) = broadcast::channel::<AnalysisRecord>(16);
        let page_sender = sender.clone();
        let page = warp::path!("analyses")
            .and(warp::get())
            .map(move || {
                let _ = page_sender.send(late.clone());
                warp::reply::json(&serde_json::json!({
                    "rows": [listed.clone()],
                    "next_cursor": null,
                }))
            });
        let inserts = warp::path!("analyses" / "stream")
            .and(warp::get())
            .map(move || {
                let events = stream::unfold(sender.subscribe(), |mut receiver| async move {
                    let record = receiver.recv().await.ok()?;
                    let event = Event::default().event("INSERT").json_data(&record).ok()?;
                    Some((Ok::<_, Infallible>(event), receiver))
                });
                warp::sse::reply(events)
            });

        let (addr, server) = warp::serve(inserts.or(page)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn insert_during_first_page_read_reaches_the_window() {
        let listed = record(0);
        let late = record(2);
        let addr = insert_while_listing(listed.clone(), late.clone());
        let client = CrowdSafeClient::new(format!("http://{}", addr));

        let mut windows = Vec::new();
        let followed = tokio::time::timeout(
            Duration::from_secs(5),
            client.follow_dashboard(10, |feed, inserted| {
                let ids: Vec<_> = feed.rows().iter().map(|row| row.id).collect();
                windows.push(ids);
                inserted.is_none()
            }),
        )
        .await;

        assert!(matches!(followed, Ok(Ok(()))), "insert never arrived");
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0], vec![listed.id]);
        assert!(windows[1].contains(&late.id));
        assert!(windows[1].contains(&listed.id));
    }
}
