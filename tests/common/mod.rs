#![allow(dead_code)]
//! In-process fixture server standing in for the alert feed and the daily
//! rainfall tables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{Days, NaiveDate};
use drywatch::Config;

pub const STATION: &str = "40191";

/// Canned upstream data plus request counters.
#[derive(Default)]
pub struct Upstream {
    pub feed: Mutex<Option<String>>,
    /// Shift_JIS encoded tables keyed by `YYYYMMDD`.
    pub tables: Mutex<HashMap<String, Vec<u8>>>,
    pub feed_hits: AtomicUsize,
    pub table_hits: AtomicUsize,
}

impl Upstream {
    pub fn set_feed(&self, xml: impl Into<String>) {
        *self.feed.lock().unwrap() = Some(xml.into());
    }

    /// Publish a table for `date` whose station row reports `precipitation`
    /// in column 9. `None` publishes a table without the station.
    pub fn set_day(&self, date: NaiveDate, precipitation: Option<&str>) {
        // ---
        let mut text = String::from(
            "観測所番号,都道府県,地点,国際地点番号,現在時刻(年),現在時刻(月),現在時刻(日),現在時刻(時),現在時刻(分),今日の最大値(mm)\n",
        );
        text.push_str("40201,福岡県,福岡,47807,2025,3,26,24,0,55.0\n");
        if let Some(value) = precipitation {
            text.push_str(&format!("{STATION},福岡県,八幡,,2025,3,26,24,0,{value}\n"));
        }

        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(&text);
        self.tables
            .lock()
            .unwrap()
            .insert(date.format("%Y%m%d").to_string(), bytes.into_owned());
    }

    pub fn remove_day(&self, date: NaiveDate) {
        self.tables
            .lock()
            .unwrap()
            .remove(&date.format("%Y%m%d").to_string());
    }
}

async fn feed_handler(State(up): State<Arc<Upstream>>) -> impl IntoResponse {
    up.feed_hits.fetch_add(1, Ordering::SeqCst);
    match up.feed.lock().unwrap().clone() {
        Some(xml) => (StatusCode::OK, xml).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn table_handler(
    Path(file): Path<String>,
    State(up): State<Arc<Upstream>>,
) -> impl IntoResponse {
    up.table_hits.fetch_add(1, Ordering::SeqCst);
    let ymd = file
        .strip_prefix("pre")
        .and_then(|f| f.strip_suffix(".csv"))
        .unwrap_or_default()
        .to_string();

    match up.tables.lock().unwrap().get(&ymd).cloned() {
        Some(bytes) => (StatusCode::OK, bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the fixture server on an ephemeral port.
pub async fn start_upstream(up: Arc<Upstream>) -> SocketAddr {
    // ---
    let app = Router::new()
        .route("/feed.xml", get(feed_handler))
        .route("/rain/{file}", get(table_handler))
        .with_state(up);

    serve(app).await
}

/// Serve `app` on `127.0.0.1:0` in the background and return its address.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Config pointing at the fixture server, writing to unique temp files.
pub fn test_config(addr: SocketAddr, name: &str) -> Config {
    // ---
    Config {
        feed_url: format!("http://{addr}/feed.xml"),
        rainfall_url_template: format!("http://{addr}/rain/pre{{ymd}}.csv"),
        snapshot_path: temp_out(name, "json"),
        history_path: temp_out(name, "csv"),
        ..Config::default()
    }
}

/// Unique output path inside the system temp dir, removed if it exists.
pub fn temp_out(name: &str, ext: &str) -> PathBuf {
    let mut path = env::temp_dir();
    path.push(format!("drywatch_{}_{}.{}", name, std::process::id(), ext));
    fs::remove_file(&path).ok();
    path
}

pub fn day_before(date: NaiveDate, offset: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(offset)).unwrap()
}

/// Atom feed with one entry per `(title, [(area, kind)])`, each report
/// escaped into the entry's content the way the upstream feed embeds it.
pub fn feed(entries: &[(&str, Vec<(&str, &str)>)]) -> String {
    // ---
    let body: String = entries
        .iter()
        .map(|(title, items)| {
            let items: String = items
                .iter()
                .map(|(area, kind)| {
                    format!(
                        "<Item><Kind><Name>{kind}</Name></Kind><Area><Name>{area}</Name></Area></Item>"
                    )
                })
                .collect();
            let report = format!(
                "<Report xmlns=\"http://xml.kishou.go.jp/jmaxml1/\"><Body><Warning>{items}</Warning></Body></Report>"
            );
            let escaped = report.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
            format!("<entry><title>{title}</title><content type=\"text\">{escaped}</content></entry>")
        })
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>extra</title>{body}</feed>"
    )
}
