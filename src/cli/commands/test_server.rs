use crate::actions::test_support::{StubProvider, TestContext, create_user, test_context};
use crate::api::{AppState, routes};
use crate::cli::api_client::ApiClient;
use tokio::net::TcpListener;

/// A running API server over an in-memory database.
pub(crate) struct TestServer {
    pub url: String,
    pub user_id: String,
    pub ctx: TestContext,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Client acting as the server's test user.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(Some(self.url.clone()), Some(self.user_id.clone()))
    }
}

/// Spawn a test HTTP server with one registered user
pub(crate) async fn spawn_test_server(provider: StubProvider) -> TestServer {
    let ctx = test_context(provider).await;
    let user = create_user(ctx.ctx.db(), "reader@example.com", None).await;

    let app = routes::create_router(AppState::new(ctx.ctx.clone()), false);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{}", addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        url,
        user_id: user.id,
        ctx,
        _handle: handle,
    }
}
