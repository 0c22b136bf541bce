//! End-to-end dispatch through `App::handle`, without a socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body::Body as _;
use http_body_util::{BodyExt, Full};
use serde_json::{Value, json};
use spry::http::header;
use spry::middleware::{ServeStatic, parse_json};
use spry::{App, Context, Flow, HandlerError, StatusCode};

type Trace = Arc<Mutex<Vec<String>>>;

fn get(uri: &str) -> http::Request<Full<Bytes>> {
    http::Request::get(uri).body(Full::default()).unwrap()
}

fn post_json(uri: &str, body: &'static str) -> http::Request<Full<Bytes>> {
    http::Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

async fn send(app: &App, req: http::Request<Full<Bytes>>) -> (http::response::Parts, Bytes) {
    let (parts, body) = app.handle(req).await.into_parts();
    (parts, body.collect().await.unwrap().to_bytes())
}

fn json_of(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

/// A handler that records `name` and continues.
fn step(trace: &Trace, name: &'static str) -> impl Fn(Context) -> std::future::Ready<Flow> + Send + Sync + 'static {
    let trace = Arc::clone(trace);
    move |cx: Context| {
        trace.lock().unwrap().push(name.to_owned());
        std::future::ready(cx.next())
    }
}

async fn get_user(cx: Context) -> Flow {
    let id = cx.req.param("id").unwrap_or_default().to_owned();
    cx.json(&json!({ "id": id }))
}

#[tokio::test]
async fn route_params_reach_the_handler() {
    let app = App::new().get("/users/:id", get_user);

    let (parts, body) = send(&app, get("/users/42")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(parts.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(body, r#"{"id":"42"}"#);
}

#[tokio::test]
async fn unmatched_route_is_404() {
    let app = App::new().post("/users/:id", get_user);

    let (parts, body) = send(&app, get("/users/42")).await;
    assert_eq!(parts.status, StatusCode::NOT_FOUND);
    assert_eq!(json_of(&body), json!({ "error": "Cannot find GET /users/42" }));

    let (parts, body) = send(&App::new(), get("/users/42?x=1")).await;
    assert_eq!(parts.status, StatusCode::NOT_FOUND);
    assert_eq!(json_of(&body)["error"], "Cannot find GET /users/42?x=1");
}

#[tokio::test]
async fn failing_middleware_skips_the_route() {
    let trace = Trace::default();
    let seen: Arc<Mutex<Option<StatusCode>>> = Arc::default();

    let route_trace = Arc::clone(&trace);
    let boundary_seen = Arc::clone(&seen);
    let app = App::new()
        .middleware(step(&trace, "m1"))
        .middleware(|cx: Context| async move { cx.fail(HandlerError::unauthorized("Unauthorized")) })
        .middleware(step(&trace, "m3"))
        .get("/anything", move |cx: Context| {
            route_trace.lock().unwrap().push("route".to_owned());
            async move { cx.next() }
        })
        .error_boundary(move |err, _req, res| {
            *boundary_seen.lock().unwrap() = err.status();
            res.status(StatusCode::UNAUTHORIZED);
            let _ = res.json(&json!({ "error": err.message() }));
        });

    let (parts, body) = send(&app, get("/anything")).await;
    assert_eq!(*trace.lock().unwrap(), ["m1"]);
    assert_eq!(*seen.lock().unwrap(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(parts.status, StatusCode::UNAUTHORIZED);
    assert_eq!(parts.headers[header::CONNECTION], "close");
    assert_eq!(json_of(&body), json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn middlewares_run_in_order_before_the_route() {
    let trace = Trace::default();
    let route_trace = Arc::clone(&trace);
    let app = App::new()
        .middleware(step(&trace, "a"))
        .middleware(step(&trace, "b"))
        .middleware(step(&trace, "c"))
        .get("/", move |cx: Context| {
            route_trace.lock().unwrap().push("route".to_owned());
            async move { cx.json(&"done") }
        });

    let (parts, _) = send(&app, get("/")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(*trace.lock().unwrap(), ["a", "b", "c", "route"]);

    // A second request runs the whole chain again, once per middleware.
    send(&app, get("/")).await;
    assert_eq!(trace.lock().unwrap().len(), 8);
}

#[tokio::test]
async fn middlewares_run_even_without_a_matching_route() {
    let trace = Trace::default();
    let app = App::new().middleware(step(&trace, "m"));

    let (parts, _) = send(&app, get("/missing")).await;
    assert_eq!(parts.status, StatusCode::NOT_FOUND);
    assert_eq!(*trace.lock().unwrap(), ["m"]);
}

#[tokio::test]
async fn long_middleware_chain_completes() {
    let trace = Trace::default();
    let app = (0..10_000).fold(App::new(), |app, _| app.middleware(step(&trace, "m")));
    let app = app.get("/", |cx: Context| async move { cx.json(&true) });

    let (parts, body) = send(&app, get("/")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, "true");
    assert_eq!(trace.lock().unwrap().len(), 10_000);
}

#[tokio::test]
async fn ending_middleware_stops_the_chain() {
    let trace = Trace::default();
    let route_trace = Arc::clone(&trace);
    let app = App::new()
        .middleware(|mut cx: Context| async move {
            cx.res.status(StatusCode::ACCEPTED);
            cx.end()
        })
        .get("/", move |cx: Context| {
            route_trace.lock().unwrap().push("route".to_owned());
            async move { cx.next() }
        });

    let (parts, body) = send(&app, get("/")).await;
    assert_eq!(parts.status, StatusCode::ACCEPTED);
    assert!(body.is_empty());
    assert!(trace.lock().unwrap().is_empty());
}

#[tokio::test]
async fn first_registered_route_wins_over_more_specific() {
    let app = App::new()
        .get("/users/:id", |cx: Context| async move { cx.json(&"param") })
        .get("/users/me", |cx: Context| async move { cx.json(&"literal") });

    let (_, body) = send(&app, get("/users/me")).await;
    assert_eq!(body, r#""param""#);
}

#[tokio::test]
async fn methods_match_case_insensitively() {
    let app = App::new().route("PUT", "/user", |cx: Context| async move { cx.json(&"updated") });

    let req = http::Request::put("/user").body(Full::default()).unwrap();
    let (parts, body) = send(&app, req).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, r#""updated""#);
}

#[tokio::test]
async fn query_string_does_not_affect_routing_and_last_value_wins() {
    let app = App::new().get("/search", |cx: Context| async move {
        let q = cx.req.query_param("q").unwrap_or_default().to_owned();
        cx.json(&json!({ "q": q }))
    });

    let (parts, body) = send(&app, get("/search?q=cats&q=dogs")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "q": "dogs" }));
}

#[derive(Clone)]
struct UserId(u32);

#[tokio::test]
async fn locals_carry_values_from_middleware_to_route() {
    let app = App::new()
        .middleware(|mut cx: Context| async move {
            cx.req.locals_mut().insert(UserId(7));
            cx.next()
        })
        .get("/me", |cx: Context| async move {
            let id = cx.req.locals().get::<UserId>().map(|u| u.0);
            cx.json(&json!({ "user": id }))
        });

    let (_, body) = send(&app, get("/me")).await;
    assert_eq!(json_of(&body), json!({ "user": 7 }));
}

#[tokio::test]
async fn handler_error_without_status_is_a_generic_500() {
    let app = App::new().get("/boom", |cx: Context| async move {
        cx.fail(std::io::Error::other("database unreachable"))
    });

    let (parts, body) = send(&app, get("/boom")).await;
    assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parts.headers[header::CONNECTION], "close");
    assert_eq!(
        json_of(&body),
        json!({ "error": "Sorry, something unexpected happened from our side." })
    );
}

#[tokio::test]
async fn handler_error_with_status_maps_to_that_status() {
    let app = App::new().get("/videos/:id", |cx: Context| async move {
        cx.fail(HandlerError::not_found("Video not found"))
    });

    let (parts, body) = send(&app, get("/videos/9")).await;
    assert_eq!(parts.status, StatusCode::NOT_FOUND);
    assert_eq!(json_of(&body), json!({ "error": "Video not found" }));
}

#[tokio::test]
async fn forbidden_error_maps_to_403() {
    let app = App::new().delete("/videos/:id", |cx: Context| async move {
        cx.fail(HandlerError::forbidden("Not your video"))
    });

    let req = http::Request::delete("/videos/3").body(Full::default()).unwrap();
    let (parts, body) = send(&app, req).await;
    assert_eq!(parts.status, StatusCode::FORBIDDEN);
    assert_eq!(parts.headers[header::CONNECTION], "close");
    assert_eq!(json_of(&body), json!({ "error": "Not your video" }));
}

#[tokio::test]
async fn later_error_boundary_replaces_earlier() {
    let app = App::new()
        .get("/", |cx: Context| async move { cx.fail(HandlerError::bad_request("nope")) })
        .error_boundary(|_, _, res| {
            res.status(StatusCode::IM_A_TEAPOT);
        })
        .error_boundary(|_, _, res| {
            res.status(StatusCode::CONFLICT);
        });

    let (parts, _) = send(&app, get("/")).await;
    assert_eq!(parts.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn parse_json_sets_the_body() {
    let app = App::new()
        .middleware(parse_json)
        .post("/login", |cx: Context| async move {
            let name = cx.req.body().and_then(|b| b["username"].as_str()).unwrap_or("?").to_owned();
            cx.json(&json!({ "hello": name }))
        });

    let (parts, body) = send(&app, post_json("/login", r#"{"username":"ada"}"#)).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "hello": "ada" }));
}

#[tokio::test]
async fn parse_json_rejects_malformed_bodies() {
    let app = App::new()
        .middleware(parse_json)
        .post("/login", |cx: Context| async move { cx.json(&"unreachable") });

    let (parts, body) = send(&app, post_json("/login", "{not json")).await;
    assert_eq!(parts.status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&body), json!({ "error": "invalid JSON body" }));
}

#[tokio::test]
async fn parse_json_ignores_other_content_types() {
    let app = App::new()
        .middleware(parse_json)
        .post("/upload", |mut cx: Context| async move {
            let parsed = cx.req.body().is_some();
            let raw = match cx.req.bytes().await {
                Ok(raw) => raw,
                Err(e) => return cx.fail(e),
            };
            cx.json(&json!({ "parsed": parsed, "len": raw.len() }))
        });

    let req = http::Request::post("/upload")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Full::new(Bytes::from_static(b"\x00\x01\x02")))
        .unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(json_of(&body), json!({ "parsed": false, "len": 3 }));
}

#[tokio::test]
async fn send_file_of_empty_file_completes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    std::fs::write(&path, b"").unwrap();

    let app = App::new().get("/download", move |cx: Context| {
        let path = path.clone();
        async move { cx.send_file(path, "application/octet-stream").await }
    });

    let (parts, body) = send(&app, get("/download")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(parts.headers[header::CONTENT_TYPE], "application/octet-stream");
    assert!(body.is_empty());
}

#[tokio::test]
async fn send_file_of_missing_file_reaches_the_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.mp4");

    let app = App::new().get("/video", move |cx: Context| {
        let path = path.clone();
        async move { cx.send_file(path, "video/mp4").await }
    });

    let (parts, _) = send(&app, get("/video")).await;
    assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
}

// Opening a directory succeeds on Linux; the first read fails with EISDIR.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn read_fault_mid_stream_ends_the_body_without_the_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_owned();
    let boundary_hit = Arc::new(AtomicBool::new(false));

    let hit = Arc::clone(&boundary_hit);
    let app = App::new()
        .get("/file", move |cx: Context| {
            let path = path.clone();
            async move { cx.send_file(path, "text/plain").await }
        })
        .error_boundary(move |_, _, res| {
            hit.store(true, Ordering::SeqCst);
            res.status(StatusCode::IM_A_TEAPOT);
        });

    let res = app.handle(get("/file")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");

    let mut body = res.into_body();
    assert!(!body.is_end_stream());
    let err = body.frame().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::IsADirectory);
    assert!(body.is_end_stream());
    assert!(body.frame().await.is_none());
    assert!(!boundary_hit.load(Ordering::SeqCst));
}

#[tokio::test]
async fn serve_static_answers_known_files_and_passes_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("scripts")).unwrap();
    std::fs::write(dir.path().join("scripts/app.js"), "console.log(1)").unwrap();

    let app = App::new()
        .middleware(ServeStatic::new(dir.path()).unwrap())
        .get("/api/videos", |cx: Context| async move { cx.json(&Vec::<u8>::new()) });

    let (parts, body) = send(&app, get("/scripts/app.js")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(parts.headers[header::CONTENT_TYPE], "application/javascript");
    assert_eq!(body, "console.log(1)");

    let (parts, body) = send(&app, get("/api/videos")).await;
    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn empty_registration_changes_nothing() {
    let app = App::new().get("/users/:id", get_user);
    let (before_parts, before_body) = send(&app, get("/users/1")).await;

    let app = (0..0).fold(app, |app, _: i32| app.middleware(parse_json));
    let (after_parts, after_body) = send(&app, get("/users/1")).await;

    assert_eq!(before_parts.status, after_parts.status);
    assert_eq!(before_body, after_body);
}
