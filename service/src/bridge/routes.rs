use crate::bridge::model::{AnalysisPage, DashboardQuery, ErrorBody, PageQuery};
use crate::workflow::runner::{AnalysisRunner, ServiceError};
use crowdsafe_core::prelude::VideoReference;
use crowdsafe_core::store::AnalysisRecord;
use crowdsafe_core::upload::UploadCandidate;
use futures::{stream, Stream};
use log::{info, warn};
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};
use warp::http::{HeaderValue, StatusCode};
use warp::reply::{self, Response};
use warp::sse::Event;
use warp::{Filter, Rejection, Reply};

/// Headers accepted from browser clients on every route.
const ALLOWED_HEADERS: [&str; 5] = [
    "authorization",
    "x-client-info",
    "apikey",
    "content-type",
    "x-file-name",
];

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    reply::with_status(reply::json(&ErrorBody::new(message)), status).into_response()
}

fn service_error(err: &ServiceError) -> Response {
    let status = match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Upload(_) | ServiceError::Analysis(_) | ServiceError::Read(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, err.to_string())
}

#[derive(Debug)]
struct NonUtf8FileName;

impl warp::reject::Reject for NonUtf8FileName {}

/// `x-file-name` as UTF-8; header values may carry non-ASCII bytes.
fn file_name_header() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::value("x-file-name").and_then(|value: HeaderValue| async move {
        String::from_utf8(value.as_bytes().to_vec())
            .map_err(|_| warp::reject::custom(NonUtf8FileName))
    })
}

fn upload_reply(
    name: String,
    content_type: Option<String>,
    body: bytes::Bytes,
    runner: AnalysisRunner,
) -> Response {
    let candidate = UploadCandidate {
        name,
        content_type: content_type.unwrap_or_default(),
        size: body.len() as u64,
    };
    match runner.upload(&candidate, &body) {
        Ok(info) => reply::with_status(reply::json(&info), StatusCode::CREATED).into_response(),
        Err(err) => service_error(&err),
    }
}

fn with_runner(
    runner: AnalysisRunner,
) -> impl Filter<Extract = (AnalysisRunner,), Error = Infallible> + Clone {
    warp::any().map(move || runner.clone())
}

/// Every HTTP route of the service, with CORS and JSON error bodies.
pub fn routes(
    runner: AnalysisRunner,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let max_upload = runner.config().max_upload_bytes;

    let analyze = warp::path!("functions" / "v1" / "analyze-video")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_runner(runner.clone()))
        .map(|video: VideoReference, runner: AnalysisRunner| {
            match runner.analyze(&video) {
                Ok(result) => reply::json(&result).into_response(),
                Err(err) => service_error(&err),
            }
        });

    let upload = warp::path!("storage" / "v1" / "upload")
        .and(warp::post())
        .and(file_name_header())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::body::content_length_limit(max_upload))
        .and(warp::body::bytes())
        .and(with_runner(runner.clone()))
        .map(upload_reply);

    let page = warp::path!("analyses")
        .and(warp::get())
        .and(warp::query::<PageQuery>())
        .and(with_runner(runner.clone()))
        .map(|query: PageQuery, runner: AnalysisRunner| {
            let limit = runner.config().clamp_limit(query.limit);
            match runner.page(query.before.as_ref(), Some(limit)) {
                Ok(rows) => reply::json(&AnalysisPage::new(rows, limit)).into_response(),
                Err(err) => service_error(&err),
            }
        });

    let stream = warp::path!("analyses" / "stream")
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: AnalysisRunner| {
            let events = insert_events(runner.store().subscribe());
            warp::sse::reply(warp::sse::keep_alive().stream(events))
        });

    let dashboard = warp::path!("dashboard")
        .and(warp::get())
        .and(warp::query::<DashboardQuery>())
        .and(with_runner(runner.clone()))
        .map(|query: DashboardQuery, runner: AnalysisRunner| {
            match runner.dashboard(query.window) {
                Ok(summary) => reply::json(&summary).into_response(),
                Err(err) => service_error(&err),
            }
        });

    let metrics = warp::path!("metrics")
        .and(warp::get())
        .and(with_runner(runner))
        .map(|runner: AnalysisRunner| reply::json(&runner.metrics().snapshot()));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(ALLOWED_HEADERS)
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    analyze
        .or(upload)
        .or(stream)
        .or(page)
        .or(dashboard)
        .or(metrics)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("crowdsafe::http"))
}

/// Server-sent events for each inserted row; a `RESYNC` event tells the
/// client to reload after it fell behind.
fn insert_events(
    receiver: broadcast::Receiver<AnalysisRecord>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(record) => match Event::default().event("INSERT").json_data(&record) {
                    Ok(event) => return Some((Ok(event), receiver)),
                    Err(err) => warn!("dropping unencodable row {}: {}", record.id, err),
                },
                Err(RecvError::Lagged(skipped)) => {
                    let event = Event::default().event("RESYNC").data(skipped.to_string());
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let response = if rejection.is_not_found() {
        json_error(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        json_error(StatusCode::BAD_REQUEST, format!("invalid request body: {}", err))
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        json_error(StatusCode::PAYLOAD_TOO_LARGE, "File size must be less than the upload limit")
    } else if let Some(err) = rejection.find::<warp::reject::MissingHeader>() {
        json_error(StatusCode::BAD_REQUEST, err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidHeader>() {
        json_error(StatusCode::BAD_REQUEST, err.to_string())
    } else if rejection.find::<NonUtf8FileName>().is_some() {
        json_error(StatusCode::BAD_REQUEST, "invalid file name: not UTF-8")
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        json_error(StatusCode::BAD_REQUEST, "invalid query")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        info!("unhandled rejection: {:?}", rejection);
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Unknown error")
    };
    Ok(response)
}
