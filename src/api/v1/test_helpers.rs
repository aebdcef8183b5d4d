//! Router fixtures for handler tests.

use axum::{
    Router,
    body::Body,
    http::{Method, Request},
};
use http_body_util::BodyExt;
use serde_json::Value;

use super::USER_HEADER;
use crate::actions::ActionContext;
use crate::actions::test_support::{StubProvider, test_context};
use crate::api::{AppState, routes};
use crate::db::SqliteDatabase;
use crate::jobs::JobReceiver;

pub(crate) struct TestApp {
    pub app: Router,
    pub ctx: ActionContext<SqliteDatabase, StubProvider>,
    pub jobs: JobReceiver,
    _covers_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn db(&self) -> &SqliteDatabase {
        self.ctx.db()
    }
}

/// Router over an in-memory database and the given provider.
pub(crate) async fn test_app(provider: StubProvider) -> TestApp {
    let tc = test_context(provider).await;
    let app = routes::create_router(AppState::new(tc.ctx.clone()), false);
    TestApp {
        app,
        ctx: tc.ctx,
        jobs: tc.jobs,
        _covers_dir: tc.covers_dir,
    }
}

/// Helper to parse JSON response body
pub(crate) async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub(crate) fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = user {
        builder = builder.header(USER_HEADER, id);
    }
    builder.body(Body::empty()).unwrap()
}

pub(crate) fn send_json(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = user {
        builder = builder.header(USER_HEADER, id);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub(crate) fn delete(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(id) = user {
        builder = builder.header(USER_HEADER, id);
    }
    builder.body(Body::empty()).unwrap()
}
