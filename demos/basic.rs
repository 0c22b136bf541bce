//! A small spry app: static files, an index page, JSON bodies, cookie auth.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8060/api/videos                      # 401
//!   curl -X POST http://localhost:8060/api/login \
//!        -H 'content-type: application/json' \
//!        -d '{"username":"ada","password":"secret"}' -i       # sets a token cookie
//!   curl http://localhost:8060/api/videos -H 'cookie: token=demo-token'
//!   curl http://localhost:8060/api/videos/7?format=mp4 -H 'cookie: token=demo-token'
//!   curl -X DELETE http://localhost:8060/api/videos/8 -H 'cookie: token=demo-token'   # 403
//!   curl http://localhost:8060/profile                          # ./public/index.html

use std::path::Path;

use serde_json::json;
use spry::http::Method;
use spry::http::header::{self, HeaderValue};
use spry::middleware::{ServeStatic, parse_json};
use spry::{App, Context, Flow, HandlerError, StatusCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PORT: u16 = 8060;
const TOKEN: &str = "demo-token";

#[derive(Clone)]
struct UserId(u32);

#[tokio::main]
async fn main() -> Result<(), spry::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut app = App::new();
    if Path::new("./public").is_dir() {
        app = app.middleware(ServeStatic::new("./public")?).middleware(serve_index);
    }

    app.middleware(parse_json)
        .middleware(authenticate)
        .post("/api/login", log_in)
        .get("/api/videos", list_videos)
        .get("/api/videos/:id", get_video)
        .delete("/api/videos/:id", delete_video)
        .listen(PORT, |addr| info!(%addr, "server has started"))
        .await
}

// Client-side pages all load the same document.
async fn serve_index(cx: Context) -> Flow {
    const PAGES: &[&str] = &["/", "/login", "/profile"];

    if *cx.req.method() == Method::GET && PAGES.iter().any(|page| *page == cx.req.path()) {
        return cx.send_file("./public/index.html", "text/html").await;
    }
    cx.next()
}

// Only the video API needs a session cookie.
async fn authenticate(mut cx: Context) -> Flow {
    let protected = cx.req.path().starts_with("/api/videos");
    if !protected {
        return cx.next();
    }

    let token = cx.req.header("cookie").and_then(|cookie| {
        cookie
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == "token")
            .map(|(_, value)| value.to_owned())
    });

    match token {
        Some(token) if token == TOKEN => {
            cx.req.locals_mut().insert(UserId(1));
            cx.next()
        }
        _ => cx.fail(HandlerError::unauthorized("Unauthorized")),
    }
}

async fn delete_video(cx: Context) -> Flow {
    let owner = if cx.req.param("id") == Some("7") { 1 } else { 2 };
    let is_owner = cx.req.locals().get::<UserId>().is_some_and(|user| user.0 == owner);
    if !is_owner {
        return cx.fail(HandlerError::forbidden("You can only delete your own videos"));
    }
    cx.json(&json!({ "deleted": true }))
}

async fn log_in(mut cx: Context) -> Flow {
    let Some(username) = cx.req.body().and_then(|b| b["username"].as_str()).map(str::to_owned) else {
        return cx.fail(HandlerError::bad_request("username is required"));
    };

    cx.res.header(header::SET_COOKIE, HeaderValue::from_static("token=demo-token; Path=/"));
    cx.json(&json!({ "message": "Logged in successfully!", "username": username }))
}

async fn list_videos(cx: Context) -> Flow {
    let user = cx.req.locals().get::<UserId>().map_or(0, |u| u.0);
    cx.json(&json!([{ "id": 7, "owner": user, "name": "intro.mp4" }]))
}

async fn get_video(mut cx: Context) -> Flow {
    let id = cx.req.param("id").unwrap_or_default().to_owned();
    let format = cx.req.query_param("format").unwrap_or("mp4").to_owned();
    if id != "7" {
        return cx.fail(HandlerError::not_found("Video not found!"));
    }
    cx.res.status(StatusCode::OK);
    cx.json(&json!({ "id": id, "format": format }))
}
