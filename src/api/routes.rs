//! API route configuration.

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use super::handlers::{self, HealthResponse};
use super::state::AppState;
use super::v1::{self, *};
use crate::books::BookProvider;
use crate::db::Database;
use crate::subscription::{PlanLimits, SubscriptionSummary};

/// Build routes with generic database and provider types.
///
/// Registers handlers that are generic over `Database` and `BookProvider`,
/// applying the turbofish automatically.
macro_rules! routes {
    ($D:ty, $P:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$D, $P>));
        )*
        router
    }};
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookbound API",
        version = "0.3.0",
        description = "Personal reading library with provider-backed book ingestion",
        license(name = "GPL-2.0")
    ),
    paths(
        handlers::health,
        v1::create_user,
        v1::get_current_user,
        v1::set_plan,
        v1::update_settings,
        v1::search_books,
        v1::get_book,
        v1::list_library,
        v1::add_book,
        v1::update_book_status,
        v1::remove_book,
        v1::list_activities,
        v1::get_dashboard,
        v1::list_searches,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            MessageResponse,
            UserResponse,
            CreateUserRequest,
            SetPlanRequest,
            UpdateSettingsRequest,
            SubscriptionSummary,
            PlanLimits,
            CodeResponse,
            NamedResponse,
            CoverResponse,
            BookResponse,
            BookDetailsResponse,
            BookLinks,
            SearchBookResponse,
            SearchResponse,
            LibraryEntryResponse,
            PaginatedLibrary,
            AddBookRequest,
            UpdateStatusRequest,
            StatusUpdatedResponse,
            ActivityResponse,
            PaginatedActivities,
            DashboardStatsResponse,
            NamedCountResponse,
            DashboardResponse,
            PreviousSearchResponse,
        )
    ),
    tags(
        (name = "system", description = "System health endpoints"),
        (name = "users", description = "User registration, plan and settings"),
        (name = "books", description = "Provider search and book details"),
        (name = "library", description = "The acting user's library"),
        (name = "activities", description = "Activity feed"),
        (name = "dashboard", description = "Library overview"),
        (name = "searches", description = "Search history")
    )
)]
pub struct ApiDoc;

/// Create the API router, optionally serving Scalar docs at `/docs`.
pub fn create_router<D: Database, P: BookProvider>(
    state: AppState<D, P>,
    enable_docs: bool,
) -> Router {
    let system_routes = Router::new().route("/health", get(handlers::health));

    let user_routes = routes!(D, P => {
        post "/api/v1/users" => v1::create_user,
        get "/api/v1/user" => v1::get_current_user,
        put "/api/v1/user/plan" => v1::set_plan,
        patch "/api/v1/user/settings" => v1::update_settings,
    });

    let book_routes = routes!(D, P => {
        get "/api/v1/books/search" => v1::search_books,
        get "/api/v1/books/{identifier}" => v1::get_book,
    });

    let library_routes = routes!(D, P => {
        get "/api/v1/user/books" => v1::list_library,
        post "/api/v1/user/books" => v1::add_book,
        patch "/api/v1/user/books/{identifier}" => v1::update_book_status,
        delete "/api/v1/user/books/{identifier}" => v1::remove_book,
    });

    let feed_routes = routes!(D, P => {
        get "/api/v1/activities" => v1::list_activities,
        get "/api/v1/dashboard" => v1::get_dashboard,
        get "/api/v1/searches" => v1::list_searches,
    });

    let router = system_routes
        .merge(user_routes)
        .merge(book_routes)
        .merge(library_routes)
        .merge(feed_routes);

    let router = if enable_docs {
        router.merge(Scalar::with_url("/docs", ApiDoc::openapi()))
    } else {
        router
    };

    router.with_state(state)
}
