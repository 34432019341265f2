#![cfg(feature = "macros")]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use switchyard::{
    Component, Event, HandlerTable, Manager, handlers,
    web::{AppConfig, Application, HttpError, Request},
};

mod common;
use common::get;

#[derive(Default)]
struct Root {
    hits: AtomicUsize,
}

#[handlers]
impl Root {
    #[handler("request", priority = 1.0)]
    async fn index(&self, event: &mut Event) -> Option<String> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let request = event.arg::<Arc<Request>>(0)?;
        (request.path == "/").then(|| "Hello World!".to_string())
    }

    #[handler("request")]
    fn fallback(&self) -> HttpError {
        HttpError::new(410)
    }

    #[handler]
    fn ping(&self) -> &'static str {
        "pong"
    }

    fn unrelated(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Component for Root {
    fn handlers() -> HandlerTable<Self> {
        Self::handler_table()
    }
}

struct Guard;

#[handlers]
impl Guard {
    #[handler("request", filter, channel = "*")]
    fn block_admin(&self, event: &mut Event) -> Option<HttpError> {
        let request = event.arg::<Arc<Request>>(0)?;
        request
            .path
            .starts_with("/admin")
            .then(|| HttpError::new(403))
    }
}

impl Component for Guard {
    fn handlers() -> HandlerTable<Self> {
        Self::handler_table()
    }
}

#[test]
fn test_generated_table() {
    let table = Root::handler_table();
    let bindings: Vec<_> = table.iter().map(|m| m.binding().to_string()).collect();
    assert_eq!(bindings, vec!["index", "fallback", "ping"]);

    let index = table.iter().next().unwrap();
    assert_eq!(index.priority(), 1.0);
    assert_eq!(index.events().collect::<Vec<_>>(), vec!["request"]);

    let ping = table.iter().nth(2).unwrap();
    assert_eq!(ping.events().collect::<Vec<_>>(), vec!["ping"]);
}

#[tokio::test]
async fn test_macro_handlers_drive_pipeline() {
    let app = Application::new(AppConfig::new());
    let root = Manager::new(Root::default());
    app.add_child(&root).unwrap();
    app.add_child(&Manager::new(Guard)).unwrap();

    let ok = app.handle(get("/")).await;
    assert_eq!(ok.body_text(), "Hello World!");

    let gone = app.handle(get("/old")).await;
    assert_eq!(gone.status().code(), 410);

    let forbidden = app.handle(get("/admin/panel")).await;
    assert_eq!(forbidden.status().code(), 403);

    let component = root.component::<Root>().unwrap();
    assert_eq!(component.unrelated(), 2);
}

#[tokio::test]
async fn test_sync_handler_without_event_argument() {
    let root = Manager::new(Root::default());
    let dispatched = root.send(Event::new("ping"), "*", true).await.unwrap();
    assert_eq!(
        dispatched.value().and_then(|v| v.downcast_ref::<String>()),
        Some(&"pong".to_string())
    );
}
