use std::io::Read;
use std::sync::{Arc, RwLock};

use iron::headers::{
    AccessControlAllowHeaders, AccessControlAllowMethods, AccessControlAllowOrigin,
    AccessControlRequestHeaders, Allow, ContentType,
};
use iron::method::Method;
use iron::mime::{Mime, SubLevel, TopLevel};
use iron::prelude::*;
use iron::status::{self, Status};
use iron::{AfterMiddleware, Handler};
use log::{debug, info, warn};
use router::{NoRoute, Router, TrailingSlash};
use serde::Serialize;
use serde_json::{json, Value};
use urlencoded::UrlEncodedQuery;

use crate::error::RepositoryError;
use crate::repository::PostRepository;

pub type SharedRepository = Arc<RwLock<PostRepository>>;

/// Match a `Result` into its inner value or
/// return `500 Internal Server Error`,
/// or some other provided status using the second variant of this macro.
macro_rules! try_handler {
    ( $e:expr ) => {
        match $e {
            Ok(x) => x,
            Err(e) => return Ok(error_response(status::InternalServerError, &e.to_string())),
        }
    };
    ( $e:expr, $status:expr ) => {
        match $e {
            Ok(x) => x,
            Err(e) => return Ok(error_response($status, &e.to_string())),
        }
    };
}

/// Lock the repository for reading or writing.
/// Every mutation either fully applies or fails before touching the
/// collection, so a poisoned lock still guards consistent data.
macro_rules! read_lock {
    ( $e:expr ) => {
        $e.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    };
}

macro_rules! write_lock {
    ( $e:expr ) => {
        $e.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    };
}

/// Get the post id from the URI.
/// A missing or non-numeric id matches no resource, so return `404 Not Found`.
/// If we could not obtain the parameter list, return `500 Internal Server Error`.
macro_rules! get_post_id {
    ( $r:expr ) => {
        match $r.extensions.get::<Router>() {
            Some(router) => match router.find("id").and_then(|id| id.parse::<u64>().ok()) {
                Some(id) => id,
                None => return Ok(error_response(status::NotFound, "Not Found")),
            },
            None => return Ok(Response::with(status::InternalServerError)),
        }
    };
}

/// Read the request body as JSON.
/// Return `415 Unsupported Media Type` unless the request declares JSON,
/// and `400 Bad Request` if the body does not parse.
macro_rules! json_body {
    ( $r:expr ) => {{
        if !is_json($r) {
            warn!("rejected {} {}: wrong content type", $r.method, $r.url);
            return Ok(error_response(
                status::UnsupportedMediaType,
                "Missing or wrong content type",
            ));
        }
        let mut body = String::new();
        try_handler!($r.body.read_to_string(&mut body), status::BadRequest);
        match serde_json::from_str::<Value>(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("rejected {} {}: {}", $r.method, $r.url, e);
                return Ok(error_response(status::BadRequest, "Malformed JSON body"));
            }
        }
    }};
}

fn is_json(req: &Request) -> bool {
    matches!(
        req.headers.get::<ContentType>(),
        Some(&ContentType(Mime(TopLevel::Application, SubLevel::Json, _)))
    )
}

/// First value of a query parameter, if non-empty.
fn query_param(req: &mut Request, name: &str) -> Option<String> {
    req.get_ref::<UrlEncodedQuery>()
        .ok()
        .and_then(|query| query.get(name))
        .and_then(|values| values.first())
        .filter(|value| !value.is_empty())
        .cloned()
}

pub fn error_response(status: Status, message: &str) -> Response {
    Response::with((status, json!({ "error": message }).to_string()))
}

fn repository_error(err: RepositoryError) -> Response {
    let code = match err {
        RepositoryError::Validation | RepositoryError::InvalidParameter(_) => status::BadRequest,
        RepositoryError::NotFound(_) => status::NotFound,
    };
    warn!("{}", err);
    error_response(code, &err.to_string())
}

fn json_response<T: Serialize>(status: Status, value: &T) -> IronResult<Response> {
    let payload = try_handler!(serde_json::to_string(value));
    Ok(Response::with((status, payload)))
}

pub struct Handlers {
    pub posts: PostsHandler,
    pub create_post: CreatePostHandler,
    pub post: PostHandler,
    pub update_post: UpdatePostHandler,
    pub delete_post: DeletePostHandler,
    pub search: SearchHandler,
}

impl Handlers {
    pub fn new(repository: PostRepository) -> Handlers {
        let repository = Arc::new(RwLock::new(repository));
        Handlers {
            posts: PostsHandler::new(repository.clone()),
            create_post: CreatePostHandler::new(repository.clone()),
            post: PostHandler::new(repository.clone()),
            update_post: UpdatePostHandler::new(repository.clone()),
            delete_post: DeletePostHandler::new(repository.clone()),
            search: SearchHandler::new(repository),
        }
    }
}

/// `GET /api/posts?sort=&direction=`
pub struct PostsHandler {
    repository: SharedRepository,
}

impl PostsHandler {
    fn new(repository: SharedRepository) -> PostsHandler {
        PostsHandler { repository }
    }
}

impl Handler for PostsHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let sort = query_param(req, "sort");
        let direction = query_param(req, "direction");
        debug!("listing posts sort={:?} direction={:?}", sort, direction);

        let listed = read_lock!(self.repository).list(sort.as_deref(), direction.as_deref());
        match listed {
            Ok(posts) => json_response(status::Ok, &posts),
            Err(err) => Ok(repository_error(err)),
        }
    }
}

/// `POST /api/posts`
pub struct CreatePostHandler {
    repository: SharedRepository,
}

impl CreatePostHandler {
    fn new(repository: SharedRepository) -> CreatePostHandler {
        CreatePostHandler { repository }
    }
}

impl Handler for CreatePostHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let payload = json_body!(req);

        let created = write_lock!(self.repository).create(&payload);
        match created {
            Ok(post) => {
                info!("created post {}", post.id);
                json_response(status::Created, &post)
            }
            Err(err) => Ok(repository_error(err)),
        }
    }
}

/// `GET /api/posts/:id`
pub struct PostHandler {
    repository: SharedRepository,
}

impl PostHandler {
    fn new(repository: SharedRepository) -> PostHandler {
        PostHandler { repository }
    }
}

impl Handler for PostHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let id = get_post_id!(req);

        let found = read_lock!(self.repository).get(id).cloned();
        match found {
            Some(post) => json_response(status::Ok, &post),
            None => Ok(repository_error(RepositoryError::NotFound(id))),
        }
    }
}

/// `PUT /api/posts/:id`
pub struct UpdatePostHandler {
    repository: SharedRepository,
}

impl UpdatePostHandler {
    fn new(repository: SharedRepository) -> UpdatePostHandler {
        UpdatePostHandler { repository }
    }
}

impl Handler for UpdatePostHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let id = get_post_id!(req);
        let payload = json_body!(req);

        let updated = write_lock!(self.repository).update(id, &payload);
        match updated {
            Ok(post) => {
                info!("updated post {}", post.id);
                json_response(status::Ok, &post)
            }
            Err(err) => Ok(repository_error(err)),
        }
    }
}

/// `DELETE /api/posts/:id`
pub struct DeletePostHandler {
    repository: SharedRepository,
}

impl DeletePostHandler {
    fn new(repository: SharedRepository) -> DeletePostHandler {
        DeletePostHandler { repository }
    }
}

impl Handler for DeletePostHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let id = get_post_id!(req);

        let deleted = write_lock!(self.repository).delete(id);
        match deleted {
            Ok(post) => {
                info!("deleted post {}", post.id);
                let message = format!("Post with id {} has been deleted successfully.", post.id);
                json_response(status::Ok, &json!({ "message": message }))
            }
            Err(err) => Ok(repository_error(err)),
        }
    }
}

/// `GET /api/posts/search?title=&content=`
pub struct SearchHandler {
    repository: SharedRepository,
}

impl SearchHandler {
    fn new(repository: SharedRepository) -> SearchHandler {
        SearchHandler { repository }
    }
}

impl Handler for SearchHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        let title = query_param(req, "title");
        let content = query_param(req, "content");
        debug!("searching posts title={:?} content={:?}", title, content);

        let results = read_lock!(self.repository).search(title.as_deref(), content.as_deref());
        json_response(status::Ok, &results)
    }
}

/// True when the route carries an `:id` segment that is not a post id.
/// Such paths match no resource, whatever the method.
fn malformed_id(req: &Request) -> bool {
    req.extensions
        .get::<Router>()
        .and_then(|params| params.find("id"))
        .map_or(false, |id| id.parse::<u64>().is_err())
}

/// Registered for the methods a known route does not support.
#[derive(Clone, Copy)]
pub struct MethodNotAllowedHandler;

impl Handler for MethodNotAllowedHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        if malformed_id(req) {
            return Ok(error_response(status::NotFound, "Not Found"));
        }
        warn!("method not allowed: {} {}", req.method, req.url);
        Ok(error_response(status::MethodNotAllowed, "Method Not Allowed"))
    }
}

/// Answers CORS preflight (`OPTIONS`) requests with the methods the route
/// really serves. Requested headers are echoed back, `Content-Type` otherwise.
#[derive(Clone)]
pub struct PreflightHandler {
    methods: Vec<Method>,
}

impl PreflightHandler {
    pub fn new(methods: &[Method]) -> PreflightHandler {
        PreflightHandler {
            methods: methods.to_vec(),
        }
    }
}

impl Handler for PreflightHandler {
    fn handle(&self, req: &mut Request) -> IronResult<Response> {
        if malformed_id(req) {
            return Ok(error_response(status::NotFound, "Not Found"));
        }

        let mut res = Response::with(status::Ok);
        res.headers.set(Allow(self.methods.clone()));
        res.headers.set(AccessControlAllowMethods(self.methods.clone()));
        match req.headers.get::<AccessControlRequestHeaders>() {
            Some(requested) => res
                .headers
                .set(AccessControlAllowHeaders(requested.0.clone())),
            None => res.headers.set_raw(
                "Access-Control-Allow-Headers",
                vec![b"Content-Type".to_vec()],
            ),
        }
        Ok(res)
    }
}

/// Turns the router's "no route" and trailing-slash redirect errors into a
/// JSON 404.
pub struct NotFoundAfterMiddleware;

impl AfterMiddleware for NotFoundAfterMiddleware {
    fn catch(&self, req: &mut Request, err: IronError) -> IronResult<Response> {
        if err.error.is::<NoRoute>() || err.error.is::<TrailingSlash>() {
            debug!("no route for {} {}", req.method, req.url);
            Ok(error_response(status::NotFound, "Not Found"))
        } else {
            Err(err)
        }
    }
}

pub struct JsonAfterMiddleware;

impl AfterMiddleware for JsonAfterMiddleware {
    fn after(&self, _: &mut Request, mut res: Response) -> IronResult<Response> {
        res.headers.set(ContentType::json());
        Ok(res)
    }
}

pub struct CorsAfterMiddleware;

impl AfterMiddleware for CorsAfterMiddleware {
    fn after(&self, _: &mut Request, mut res: Response) -> IronResult<Response> {
        res.headers.set(AccessControlAllowOrigin::Any);
        Ok(res)
    }
}
