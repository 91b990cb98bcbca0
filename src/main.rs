//! Demo server for the switchback engine.
//!
//! Registers a handful of routes exercising parameters, catch-alls,
//! groups, body binding, cookies and handler-internal fan-out, then serves
//! them with the bundled HTTP server until Ctrl+C.

use std::path::PathBuf;

use clap::Parser;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use switchback::middleware::{AccessLog, Recovery, RequestId};
use switchback::{load_config, App, Context, Cookie, EngineConfig, Server, Shutdown};

#[derive(Parser)]
#[command(name = "switchback")]
#[command(about = "Demo server for the switchback routing engine", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    switchback::observability::logging::init(&config.observability.log_level);
    tracing::info!(
        bind_address = %config.server.bind_address,
        "switchback demo starting"
    );

    let access_log = config.observability.access_log;
    let mut app = App::with_config(config);
    app.use_middleware(RequestId);
    if access_log {
        app.use_middleware(AccessLog);
    }
    app.use_middleware(Recovery);

    app.get("/", home);
    app.get("/greet", greet);
    app.get("/search", search);
    app.get("/users/:id", show_user);
    app.post("/users", create_user);
    app.post("/subscribe", subscribe);
    app.get("/files/*path", echo_path);
    app.get("/fanout", fanout);
    {
        let mut api = app.group("/api/v1");
        api.use_middleware(require_api_key);
        api.get("/status", api_status);
    }

    let server = Server::bind(app).await?;
    let shutdown = Shutdown::new();
    let signal_rx = shutdown.subscribe();
    tokio::spawn(async move { shutdown.trigger_on_ctrl_c().await });
    server.serve(signal_rx).await?;
    Ok(())
}

fn home(ctx: &mut Context) {
    ctx.send_html(
        StatusCode::OK,
        "<h1>switchback</h1><p>Try /users/42, /search?q=widgets&page=2, \
         /files/docs/intro.md or POST /users.</p>",
    );
}

fn greet(ctx: &mut Context) {
    match ctx.cookie("visitor") {
        Some(name) => ctx.send_string(StatusCode::OK, &format!("welcome back, {name}")),
        None => {
            ctx.set_cookie(&Cookie::new("visitor", "anon").path("/").max_age(86_400).http_only());
            ctx.send_string(StatusCode::OK, "first visit, cookie set");
        }
    }
}

fn search(ctx: &mut Context) {
    let q = ctx.query_or("q", "").to_string();
    let page = ctx.query_as::<u32>("page").unwrap_or(1);
    ctx.send_json(StatusCode::OK, &json!({ "q": q, "page": page }));
}

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
}

fn show_user(ctx: &mut Context) {
    match ctx.param_as::<u64>("id") {
        Ok(id) => ctx.send_json(
            StatusCode::OK,
            &User {
                id,
                name: format!("user-{id}"),
            },
        ),
        Err(err) => ctx.bad_request(&err.to_string()),
    }
}

#[derive(Deserialize, Serialize)]
struct NewUser {
    name: String,
    email: String,
}

fn create_user(ctx: &mut Context) {
    match ctx.bind_json::<NewUser>() {
        Ok(user) => ctx.send_json(StatusCode::CREATED, &user),
        Err(err) => ctx.bad_request(&err.to_string()),
    }
}

#[derive(Deserialize)]
struct SubscribeForm {
    email: String,
}

fn subscribe(ctx: &mut Context) {
    match ctx.bind_form::<SubscribeForm>() {
        Ok(form) => ctx.send_success(&json!({ "subscribed": form.email })),
        Err(err) => ctx.bad_request(&err.to_string()),
    }
}

fn echo_path(ctx: &mut Context) {
    let rest = ctx.param("path").unwrap_or("");
    ctx.send_json(StatusCode::OK, &json!({ "path": rest }));
}

/// Fans work out across threads that share the same context, then answers
/// once everything joined.
fn fanout(ctx: &mut Context) {
    let shared: &Context = ctx;
    std::thread::scope(|scope| {
        for part in ["alpha", "beta", "gamma"] {
            scope.spawn(move || {
                shared.store().set(part, true);
            });
        }
    });
    ctx.send_json(StatusCode::OK, &json!({ "parts_done": ctx.store().len() }));
}

fn require_api_key(ctx: &mut Context) {
    let authorized = matches!(ctx.header("x-api-key"), Some("local-dev-key"));
    if authorized {
        ctx.next();
    } else {
        ctx.unauthorized("missing or invalid api key");
    }
}

fn api_status(ctx: &mut Context) {
    ctx.send_json(StatusCode::OK, &json!({ "status": "ok" }));
}
