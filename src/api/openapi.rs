#![allow(clippy::needless_for_each)]

#[allow(unused_imports)]
use super::{
    error::ErrorBody,
    handlers::{
        github::{__path_login, __path_verify},
        health::{Health, __path_health},
        services::{__path_logs, __path_services, __path_stats},
        user::__path_user,
    },
};
use crate::session::UserRecord;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health, login, verify, user, services, logs, stats),
    components(
        schemas(Health, UserRecord, ErrorBody)
    ),
    tags(
        (name = "auth", description = "GitHub login and team membership gate"),
        (name = "session", description = "Current session"),
        (name = "debug", description = "Read-only proxies to the debug service"),
        (name = "health", description = "Liveness"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        for path in [
            "/health",
            "/v1/github/login",
            "/v1/auth/verify",
            "/v1/user",
            "/v1/services",
            "/v1/service/logs",
            "/v1/service/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
