#![cfg(test)]

use std::{
    io::Write,
    net::SocketAddr,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    http::{self, StatusCode},
    Router,
};
use postview_api::{
    Branch, Error as ApiError, GroupingMode, PostId, PostsResponse, RawPost, RawTime,
    POSTS_RETRIEVED_MESSAGE,
};
use postview_client::{
    ClientConfig, Error as ClientError, HttpPostSource, PostSource, Store, TreeCoordinator,
};
use postview_mock_server::MockServer;
use tower::ServiceExt;

use crate::*;

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                let _ = tracing_subscriber::fmt::try_init();
            }
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn run<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed initializing tokio runtime")
        .block_on(f)
}

fn posts_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("creating posts file");
    file.write_all(contents).expect("writing posts file");
    file
}

fn test_config(host: String) -> ClientConfig {
    ClientConfig {
        host,
        max_retries: 0,
        timezone: Some(chrono_tz::UTC),
        ..ClientConfig::default()
    }
}

async fn call(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = http::Request::builder()
        .method(http::Method::GET)
        .uri(uri)
        .body(axum::body::Body::empty())
        .expect("building request");
    let resp = app.oneshot(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    (status, body.to_vec())
}

/// Fetches posts by running the router in-process
struct RouterSource(Mutex<Router>);

#[async_trait]
impl PostSource for RouterSource {
    async fn fetch_posts(&self) -> anyhow::Result<Vec<RawPost>> {
        let app = self.0.lock().expect("router lock poisoned").clone();
        let (status, body) = call(app, "/api/posts").await;
        if status != StatusCode::OK {
            anyhow::bail!("server answered {status}: {}", ApiError::parse(&body)?);
        }
        Ok(serde_json::from_slice::<PostsResponse>(&body)?.data)
    }
}

fn gen_raw_posts(v: &[(i16, i32, u8, u8)]) -> Vec<RawPost> {
    v.iter()
        .map(|(id, time, author, location)| RawPost {
            id: PostId(i64::from(*id)),
            location: format!("Location {}", location % 4),
            time: match author % 2 {
                0 => RawTime::Integer(i64::from(*time)),
                _ => RawTime::Text(time.to_string()),
            },
            author: format!("Author {}", author % 3),
            text: format!("Post {id} at {time}"),
        })
        .collect()
}

do_tokio_test!(
    fuzz_served_posts_match_mock,
    Vec<(i16, i32, u8, u8)>,
    |v: Vec<(i16, i32, u8, u8)>| async move {
        let raw = gen_raw_posts(&v);
        let file = posts_file(&serde_json::to_vec(&raw).expect("serializing posts"));
        let mock = MockServer::with_posts(raw);
        let config = test_config(String::new());
        let mut app_coord = TreeCoordinator::new(
            Arc::new(Store::new()),
            RouterSource(Mutex::new(app(file.path().to_path_buf()))),
            &config,
        );
        let mut mock_coord = TreeCoordinator::new(Arc::new(Store::new()), &mock, &config);
        app_coord.load_posts().await.expect("loading posts from app");
        mock_coord.load_posts().await.expect("loading posts from mock");
        for mode in GroupingMode::ALL {
            app_coord.set_grouping_mode(mode).expect("grouping app posts");
            mock_coord.set_grouping_mode(mode).expect("grouping mock posts");
            assert_eq!(
                *app_coord.store().get_state(),
                *mock_coord.store().get_state(),
                "app and mock disagree when grouping by {mode}"
            );
        }
    }
);

#[test]
fn posts_endpoint_answers_messages_and_data() {
    run(async {
        let file = posts_file(
            br#"[{"id": 1, "location": "Sydney", "time": "1552571173", "author": "Happy Developer", "text": "Lorem ipsum"}]"#,
        );
        let (status, body) = call(app(file.path().to_path_buf()), "/api/posts").await;
        assert_eq!(status, StatusCode::OK);
        let resp: PostsResponse = serde_json::from_slice(&body).expect("parsing posts response");
        assert_eq!(resp.messages, vec![String::from(POSTS_RETRIEVED_MESSAGE)]);
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].time, RawTime::Text(String::from("1552571173")));
    })
}

#[test]
fn unknown_route_is_not_found() {
    run(async {
        let file = posts_file(b"[]");
        let (status, body) = call(app(file.path().to_path_buf()), "/api/postz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::parse(&body).expect("parsing error body"),
            ApiError::NotFound(String::from("/api/postz"))
        );
    })
}

#[test]
fn invalid_posts_file_is_internal_error() {
    run(async {
        let file = posts_file(b"{\"data\": 12}");
        let (status, body) = call(app(file.path().to_path_buf()), "/api/posts").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        match ApiError::parse(&body).expect("parsing error body") {
            ApiError::Unknown(msg) => assert!(msg.contains("parsing posts file"), "{msg}"),
            err => panic!("unexpected error {err:?}"),
        }
    })
}

async fn serve(file: &tempfile::NamedTempFile) -> ClientConfig {
    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(app(file.path().to_path_buf()).into_make_service());
    let config = test_config(format!("http://{}", server.local_addr()));
    tokio::spawn(server);
    config
}

#[test]
fn http_source_loads_served_posts() {
    run(async {
        let file = posts_file(
            br#"[
                {"id": 1, "location": "San Francisco", "time": "1552657573", "author": "Happy User", "text": "Proin eget tortor risus."},
                {"id": 2, "location": "Sydney", "time": 1552571173, "author": "Happy Developer", "text": "Pellentesque in ipsum id orci porta dapibus."},
                {"id": 3, "location": "San Francisco", "time": 1552312000, "author": "Happy User", "text": "Nulla porttitor accumsan tincidunt."}
            ]"#,
        );
        let config = serve(&file).await;
        let source = HttpPostSource::new(&config).expect("building http source");
        let mut c = TreeCoordinator::new(Arc::new(Store::new()), source, &config);
        c.load_posts().await.expect("loading posts");
        c.set_grouping_mode(GroupingMode::Location).expect("grouping posts");
        assert_eq!(
            *c.store().get_state().tree,
            vec![
                Branch::new("San Francisco", vec![PostId(1), PostId(3)]),
                Branch::new("Sydney", vec![PostId(2)]),
            ]
        );
    })
}

#[test]
fn http_source_reports_server_errors() {
    run(async {
        let file = posts_file(b"not json");
        let config = serve(&file).await;
        let source = HttpPostSource::new(&config).expect("building http source");
        let mut c = TreeCoordinator::new(Arc::new(Store::new()), source, &config);
        let err = c.load_posts().await.unwrap_err();
        assert!(matches!(err, ClientError::FetchFailure(_)));
        assert!(err.to_string().contains("500"), "{err}");
        assert!(c.store().get_state().posts.is_empty());
    })
}

#[test]
fn http_source_reports_unreachable_server() {
    run(async {
        // bind then drop a listener to get a port nobody listens on
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("finding a free port");
        let config = test_config(format!("http://{addr}"));
        let source = HttpPostSource::new(&config).expect("building http source");
        let mut c = TreeCoordinator::new(Arc::new(Store::new()), source, &config);
        assert!(matches!(
            c.load_posts().await,
            Err(ClientError::FetchFailure(_))
        ));
    })
}
