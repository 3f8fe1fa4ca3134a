//! Agent-facing HTTP surface.
//!
//! Three routes: `GET /` serves the bootstrap page, `GET /cmd` hands the
//! agent its next command, `POST /result` takes the outcome back. Every
//! route registers/touches the session keyed by the request's hostname.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, State, rejection::FormRejection},
    http::HeaderMap,
    response::Html,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::router::CommandRouter;

/// Form body of `POST /result`. Both fields tolerate absence: agents are
/// not trusted to send well-formed data.
#[derive(Debug, Default, Deserialize)]
struct ResultForm {
    #[serde(default)]
    status: String,
    response: Option<String>,
}

/// Build the agent-facing router over the shared command router.
#[must_use]
pub fn app(router: Arc<CommandRouter>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/cmd", get(cmd))
        .route("/result", post(result))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(router)
}

async fn index(State(router): State<Arc<CommandRouter>>, headers: HeaderMap) -> Html<&'static str> {
    if let Some(host) = agent_host(&headers) {
        router.on_agent_contact(&host).await;
    }
    Html(AGENT_PAGE)
}

async fn cmd(State(router): State<Arc<CommandRouter>>, headers: HeaderMap) -> String {
    let Some(host) = agent_host(&headers) else {
        return webtask_core::NOOP_SENTINEL.to_string();
    };
    router.on_agent_contact(&host).await;
    router.next_command(&host).await
}

async fn result(
    State(router): State<Arc<CommandRouter>>,
    headers: HeaderMap,
    form: Result<Form<ResultForm>, FormRejection>,
) {
    let Some(host) = agent_host(&headers) else {
        return;
    };
    router.on_agent_contact(&host).await;

    // A body the form parser rejects is treated as all-absent fields.
    let ResultForm { status, response } = form.map(|Form(f)| f).unwrap_or_default();
    router.accept_result(&host, &status, response).await;
}

/// Hostname the agent connects through, with any port stripped.
fn agent_host(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(axum::http::header::HOST)?.to_str().ok()?;
    let host = strip_port(raw);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Drop a trailing `:port`, handling the bracketed IPv6 form.
fn strip_port(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix('[') {
        rest.split_once(']').map_or(raw, |(addr, _)| addr)
    } else {
        raw.split_once(':').map_or(raw, |(host, _)| host)
    }
}

/// Bootstrap page served to agents. Polls `/cmd` once a second, evaluates
/// whatever comes back, and posts the outcome (or an idle liveness probe)
/// to `/result`.
const AGENT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>webtask</title></head>
<body>
<script>
    async function post(fields) {
        await fetch('/result', {
            method: 'POST',
            headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
            body: new URLSearchParams(fields),
        });
    }

    async function poll() {
        const script = await (await fetch('/cmd')).text();
        if (script === 'void(0)') {
            await post({ status: '200', response: 'ALIVE' });
            return;
        }
        try {
            const value = eval(script);
            const fields = { status: '200' };
            if (value !== undefined) {
                fields.response = String(value);
            }
            await post(fields);
        } catch (err) {
            await post({ status: '500', response: String(err) });
        }
    }

    setInterval(() => poll().catch(() => {}), 1000);
</script>
</body>
</html>
"#;
