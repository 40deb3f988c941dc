#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use spotback::{
    backup::{BackupContext, BackupOptions, BackupTree},
    spotify::{
        Credentials, SpotifyApi,
        pager::{PagerContext, RetryPolicy},
    },
};

/// A stored object received through PUT.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, (Vec<Value>, Option<&'static str>)>,
    objects: HashMap<String, Value>,
    statuses: HashMap<String, u16>,
    scripted: HashMap<String, VecDeque<(u16, Option<&'static str>)>>,
    hits: Vec<String>,
    stored: Vec<StoredObject>,
}

/// In-process stand-in for the Spotify Web API and an object store.
///
/// Collections are served with offset paging and absolute `next` links.
#[derive(Clone)]
pub struct MockServer {
    inner: Arc<Mutex<Inner>>,
    pub base: String,
}

impl MockServer {
    pub async fn spawn() -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockServer {
            inner,
            base: format!("http://{addr}"),
        }
    }

    /// Serves `items` as a paged collection at `path`.
    pub fn collection(&self, path: &str, items: Vec<Value>) {
        self.lock()
            .collections
            .insert(path.to_string(), (items, None));
    }

    /// Like [`MockServer::collection`], with the paging object under `key`.
    pub fn nested_collection(&self, path: &str, key: &'static str, items: Vec<Value>) {
        self.lock()
            .collections
            .insert(path.to_string(), (items, Some(key)));
    }

    pub fn object(&self, path: &str, body: Value) {
        self.lock().objects.insert(path.to_string(), body);
    }

    /// Answers every request to `path` with `status`.
    pub fn status(&self, path: &str, status: u16) {
        self.lock().statuses.insert(path.to_string(), status);
    }

    /// Answers the next request to `path` with `status` before serving it
    /// normally. Can be called repeatedly to queue several failures.
    pub fn fail_once(&self, path: &str, status: u16, retry_after: Option<&'static str>) {
        self.lock()
            .scripted
            .entry(path.to_string())
            .or_default()
            .push_back((status, retry_after));
    }

    /// Paths and queries of all requests, in arrival order.
    pub fn hits(&self) -> Vec<String> {
        self.lock().hits.clone()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        self.lock()
            .hits
            .iter()
            .filter(|h| h.split('?').next() == Some(path))
            .count()
    }

    pub fn stored(&self) -> Vec<StoredObject> {
        self.lock().stored.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

async fn handle(
    State(inner): State<Arc<Mutex<Inner>>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut inner = inner.lock().unwrap();
    let path = uri.path().to_string();
    inner.hits.push(uri.to_string());

    let scripted = inner.scripted.get_mut(&path).and_then(|q| q.pop_front());
    if let Some((status, retry_after)) = scripted {
        let status = StatusCode::from_u16(status).unwrap();
        return match retry_after {
            Some(wait) => (status, [(header::RETRY_AFTER, wait)]).into_response(),
            None => status.into_response(),
        };
    }
    if let Some(status) = inner.statuses.get(&path) {
        return StatusCode::from_u16(*status).unwrap().into_response();
    }

    if method == Method::PUT {
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let object = StoredObject {
            path,
            authorization: text(header::AUTHORIZATION),
            content_type: text(header::CONTENT_TYPE),
            body: body.to_vec(),
        };
        inner.stored.push(object);
        return StatusCode::OK.into_response();
    }

    if let Some(object) = inner.objects.get(&path) {
        return axum::Json(object.clone()).into_response();
    }

    let Some((items, envelope)) = inner.collections.get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("127.0.0.1");
    let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);

    let mut extra: Vec<String> = query
        .iter()
        .filter(|(k, _)| k.as_str() != "offset" && k.as_str() != "limit")
        .map(|(k, v)| format!("&{k}={v}"))
        .collect();
    extra.sort();

    let next = (offset + limit < items.len()).then(|| {
        format!(
            "http://{host}{path}?offset={}&limit={limit}{}",
            offset + limit,
            extra.concat()
        )
    });
    let paging = json!({
        "href": format!("http://{host}{uri}"),
        "items": items.iter().skip(offset).take(limit).cloned().collect::<Vec<_>>(),
        "limit": limit,
        "next": next,
        "offset": offset,
        "total": items.len(),
    });

    let body = match envelope {
        Some(key) => {
            let mut wrapped = Map::new();
            wrapped.insert(key.to_string(), paging);
            Value::Object(wrapped)
        }
        None => paging,
    };
    axum::Json(body).into_response()
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        rate_limit_fallback: Duration::ZERO,
        max_rate_limit_wait: Duration::from_secs(120),
    }
}

pub fn pager_context() -> PagerContext {
    PagerContext::new(fast_policy(), CancellationToken::new())
}

pub fn api(server: &MockServer) -> SpotifyApi {
    SpotifyApi::new(
        server.base.clone(),
        Credentials::Static("test-token".to_string()),
    )
}

pub fn backup_context(server: &MockServer, root: &Path) -> BackupContext {
    BackupContext {
        api: api(server),
        tree: BackupTree::new(root),
        pager: pager_context(),
        options: BackupOptions::default(),
        user_id: "me".to_string(),
    }
}

pub fn track(id: &str, name: &str, artists: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "artists": artists.iter().map(|a| json!({ "name": a })).collect::<Vec<_>>(),
        "duration_ms": 215000,
        "explicit": false,
        "popularity": 42,
        "external_urls": { "spotify": format!("https://open.spotify.com/track/{id}") },
        "album": {
            "id": format!("al-{id}"),
            "name": format!("Album of {name}"),
            "album_type": "album",
            "total_tracks": 10,
            "release_date": "2001-03-12",
            "external_urls": { "spotify": format!("https://open.spotify.com/album/al-{id}") }
        }
    })
}

pub fn saved_track(id: &str, name: &str, artists: &[&str]) -> Value {
    json!({ "added_at": "2024-01-02T03:04:05Z", "track": track(id, name, artists) })
}

pub fn saved_album(id: &str, name: &str) -> Value {
    json!({
        "added_at": "2023-05-06T07:08:09Z",
        "album": {
            "id": id,
            "name": name,
            "total_tracks": 9,
            "artists": [{ "name": "Someone" }],
            "release_date": "1999",
            "label": "Label",
            "album_type": "album",
            "popularity": 17,
            "external_urls": { "spotify": format!("https://open.spotify.com/album/{id}") }
        }
    })
}

pub fn artist(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "artist",
        "followers": { "href": null, "total": 1234 },
        "popularity": 55,
        "external_urls": { "spotify": format!("https://open.spotify.com/artist/{id}") }
    })
}

pub fn playlist(id: &str, name: &str, owner: &str, total: usize) -> Value {
    json!({
        "id": id,
        "uri": format!("spotify:playlist:{id}"),
        "name": name,
        "description": "",
        "owner": { "id": owner, "display_name": owner },
        "tracks": { "total": total },
        "external_urls": { "spotify": format!("https://open.spotify.com/playlist/{id}") }
    })
}

pub fn saved_episode(id: &str, name: &str) -> Value {
    json!({
        "added_at": "2022-02-02T00:00:00Z",
        "episode": {
            "id": id,
            "name": name,
            "description": "An episode",
            "release_date": "2022-01-31",
            "duration_ms": 3600000,
            "explicit": true,
            "external_urls": { "spotify": format!("https://open.spotify.com/episode/{id}") },
            "show": {
                "id": "show-1",
                "name": "A Show",
                "publisher": "Publisher",
                "media_type": "audio",
                "external_urls": { "spotify": "https://open.spotify.com/show/show-1" }
            }
        }
    })
}

pub fn saved_show(id: &str, name: &str) -> Value {
    json!({
        "added_at": "2021-01-01T00:00:00Z",
        "show": {
            "id": id,
            "name": name,
            "publisher": "Publisher",
            "description": "A show",
            "total_episodes": 120,
            "media_type": "audio",
            "explicit": false,
            "external_urls": { "spotify": format!("https://open.spotify.com/show/{id}") }
        }
    })
}

/// Reads a CSV file into its header and data rows.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}
