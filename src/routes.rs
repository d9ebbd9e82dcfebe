use iron::method::Method;
use iron::prelude::Chain;
use logger::Logger;
use router::Router;

use crate::handlers::*;
use crate::repository::PostRepository;

/// Methods answered with `405` on routes that do not support them.
const METHODS: [Method; 5] = [
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Delete,
    Method::Patch,
];

pub fn router(handlers: Handlers) -> Router {
    let mut router = Router::new();

    router.get("/api/posts", handlers.posts, "posts");
    router.post("/api/posts", handlers.create_post, "create_post");
    finish_route(&mut router, "/api/posts", "posts", &[Method::Get, Method::Post]);

    router.get("/api/posts/search", handlers.search, "search");
    finish_route(&mut router, "/api/posts/search", "search", &[Method::Get]);

    router.get("/api/posts/:id", handlers.post, "post");
    router.put("/api/posts/:id", handlers.update_post, "update_post");
    router.delete("/api/posts/:id", handlers.delete_post, "delete_post");
    finish_route(
        &mut router,
        "/api/posts/:id",
        "post",
        &[Method::Get, Method::Put, Method::Delete],
    );

    router
}

/// Registers the preflight handler and the `405` fallbacks for `glob`.
fn finish_route(router: &mut Router, glob: &str, name: &str, allowed: &[Method]) {
    router.route(
        Method::Options,
        glob,
        PreflightHandler::new(allowed),
        format!("{}_preflight", name),
    );
    for method in METHODS.iter().filter(|method| !allowed.contains(method)) {
        let route_id = format!("{}_{}_not_allowed", name, method);
        router.route(method.clone(), glob, MethodNotAllowedHandler, route_id);
    }
}

/// The full request pipeline around `repository`.
pub fn chain(repository: PostRepository) -> Chain {
    let (logger_before, logger_after) = Logger::new(None);

    let mut chain = Chain::new(router(Handlers::new(repository)));
    chain.link_before(logger_before); // Should be first!
    chain.link_after(NotFoundAfterMiddleware);
    chain.link_after(JsonAfterMiddleware);
    chain.link_after(CorsAfterMiddleware);
    chain.link_after(logger_after); // Should be last!
    chain
}
