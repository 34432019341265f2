use std::sync::{Arc, Mutex};
use switchyard::{
    BoxError, Manager,
    web::{AppConfig, Application, Filter, Gateway, Response, ResponseFilter},
};

mod common;
use common::{Hello, Paths, get};

#[tokio::test]
async fn test_gateway_mounts_nested_application() {
    let nested = Application::new(AppConfig::new());
    nested.add_child(&Manager::new(Hello)).unwrap();

    let outer = Application::new(AppConfig::new());
    outer.add_child(&Manager::new(Paths)).unwrap();
    outer
        .add_child(&Manager::new(Gateway::new(nested)))
        .unwrap();

    // The gateway is a request filter, so it answers before `Paths`.
    let response = outer.handle(get("/")).await;
    assert_eq!(response.body_text(), "Hello World!");
    assert_eq!(response.headers.get("Content-Length"), Some("12"));
}

#[tokio::test]
async fn test_gateway_on_other_channel_is_bypassed() {
    let nested = Application::new(AppConfig::new());
    nested.add_child(&Manager::new(Hello)).unwrap();

    let outer = Application::new(AppConfig::new().channel("web"));
    let paths = Manager::with_channel(Paths, "web");
    outer.add_child(&paths).unwrap();
    outer
        .add_child(&Manager::new(Gateway::new(nested).on_channel("legacy")))
        .unwrap();

    let response = outer.handle(get("/")).await;
    assert_eq!(response.body_text(), "index");
}

struct Stamp {
    seen: Arc<Mutex<Vec<String>>>,
}

impl ResponseFilter for Stamp {
    fn process(&self, response: &Response) -> Result<Vec<u8>, BoxError> {
        self.seen
            .lock()
            .unwrap()
            .push(response.request().path.clone());
        Ok(format!("[{}]", response.body_text()).into_bytes())
    }
}

#[tokio::test]
async fn test_filter_rewrites_body_and_clears_stash() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Application::new(AppConfig::new());
    app.add_child(&Manager::new(Hello)).unwrap();
    let filter = Manager::new(Filter::new(Stamp {
        seen: Arc::clone(&seen),
    }));
    app.add_child(&filter).unwrap();

    let response = app.handle(get("/stamped")).await;

    assert_eq!(response.body_text(), "[Hello World!]");
    assert_eq!(*seen.lock().unwrap(), vec!["/stamped".to_string()]);
    let component = filter.component::<Filter<Stamp>>().unwrap();
    assert!(component.in_flight().is_none());
}

struct Refuse;

impl ResponseFilter for Refuse {
    fn process(&self, _response: &Response) -> Result<Vec<u8>, BoxError> {
        Err("refused".into())
    }
}

#[tokio::test]
async fn test_failing_filter_keeps_body_and_clears_stash() {
    let app = Application::new(AppConfig::new());
    app.add_child(&Manager::new(Hello)).unwrap();
    let filter = Manager::new(Filter::new(Refuse));
    app.add_child(&filter).unwrap();

    let response = app.handle(get("/")).await;

    assert_eq!(response.body_text(), "Hello World!");
    assert!(response.done);
    let component = filter.component::<Filter<Refuse>>().unwrap();
    assert!(component.in_flight().is_none());
}
