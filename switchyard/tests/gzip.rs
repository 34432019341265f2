#![cfg(feature = "gzip")]

use switchyard::{
    Manager,
    web::{AppConfig, Application, Gzip, decompress},
};

mod common;
use common::{Hello, get, get_gzip};

#[tokio::test]
async fn test_gzip_when_client_accepts_it() {
    let app = Application::new(AppConfig::new());
    app.add_child(&Manager::new(Hello)).unwrap();
    let gzip = Manager::new(Gzip::new());
    gzip.register(app.manager()).unwrap();

    let response = app.handle(get_gzip("/")).await;

    assert_eq!(response.headers.get("Content-Encoding"), Some("gzip"));
    assert_eq!(decompress(response.body()).unwrap(), b"Hello World!");
    assert!(response.done);

    gzip.unregister();
    let response = app.handle(get_gzip("/")).await;
    assert!(!response.headers.contains("Content-Encoding"));
    assert_eq!(response.body(), b"Hello World!");
}

#[tokio::test]
async fn test_no_gzip_without_accept_encoding() {
    let app = Application::new(AppConfig::new());
    app.add_child(&Manager::new(Hello)).unwrap();
    app.add_child(&Manager::new(Gzip::new())).unwrap();

    let response = app.handle(get("/")).await;

    assert!(!response.headers.contains("Content-Encoding"));
    assert_eq!(response.body(), b"Hello World!");
}

#[tokio::test]
async fn test_gzip_negotiation_can_be_disabled() {
    let app = Application::new(AppConfig::new().gzip(false));
    app.add_child(&Manager::new(Hello)).unwrap();
    app.add_child(&Manager::new(Gzip::new())).unwrap();

    let response = app.handle(get_gzip("/")).await;

    assert!(!response.gzip);
    assert_eq!(response.body(), b"Hello World!");
}

#[tokio::test]
async fn test_error_pages_are_compressed_too() {
    let app = Application::new(AppConfig::new());
    app.add_child(&Manager::new(Gzip::new().level(9))).unwrap();

    let response = app.handle(get_gzip("/missing")).await;

    assert_eq!(response.status().code(), 404);
    let page = decompress(response.body()).unwrap();
    assert!(String::from_utf8(page).unwrap().contains("404 Not Found"));
}
