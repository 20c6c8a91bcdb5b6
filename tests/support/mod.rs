//! Scripted research API used by the integration tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use research_data_downloader::fetcher::{
    ApiConnector, ApiResponse, Endpoint, FetcherResult, ResearchApi,
};

type Responder = dyn Fn(Endpoint, &Value) -> FetcherResult<ApiResponse> + Send + Sync;

/// API answering every request through a closure and recording what it saw
pub struct FakeApi {
    responder: Box<Responder>,
    requests: Mutex<Vec<(Endpoint, Value)>>,
}

impl FakeApi {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(Endpoint, &Value) -> FetcherResult<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(Endpoint, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ResearchApi for FakeApi {
    async fn post(&self, endpoint: Endpoint, body: &Value) -> FetcherResult<ApiResponse> {
        self.requests.lock().unwrap().push((endpoint, body.clone()));
        (self.responder)(endpoint, body)
    }
}

/// Connector handing out the same [`FakeApi`] on every connect
pub struct FakeConnector {
    api: Arc<FakeApi>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(api: Arc<FakeApi>) -> Arc<Self> {
        Arc::new(Self {
            api,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiConnector for FakeConnector {
    async fn connect(&self) -> FetcherResult<Arc<dyn ResearchApi>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let api: Arc<dyn ResearchApi> = self.api.clone();
        Ok(api)
    }
}

/// Final video page
pub fn video_page(videos: Value) -> ApiResponse {
    ApiResponse::ok(json!({"videos": videos, "has_more": false}))
}

/// Video page followed by another one at `cursor`
pub fn video_page_more(videos: Value, search_id: &str, cursor: i64) -> ApiResponse {
    ApiResponse::ok(json!({
        "videos": videos,
        "has_more": true,
        "search_id": search_id,
        "cursor": cursor,
    }))
}

/// Video with the given id and username
pub fn video(id: i64, username: &str) -> Value {
    json!({"id": id, "username": username, "region_code": "GB", "view_count": id * 10})
}
