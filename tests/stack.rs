use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use strata::{
    BoxedHandler, Endpoint, Error, Handler, Next, Recorder, Request, Response, ResponseWriter,
    Stack, StatusCode, handler_fn,
};

fn get(path: &str) -> Request {
    Request::from(http::Request::get(path).body("").unwrap())
}

fn serve(stack: &Stack, path: &str) -> Recorder {
    let mut recorder = Recorder::new();
    stack.serve(&mut recorder, &mut get(path));
    recorder
}

/// Writes its tag, then continues or stops.
struct Tag {
    text: &'static str,
    proceed: bool,
}

impl Handler for Tag {
    fn serve(&self, rw: &mut Response<'_>, req: &mut Request, next: Next<'_>) {
        rw.write_all(self.text.as_bytes()).unwrap();
        if self.proceed {
            next.run(rw, req);
        }
    }
}

#[test]
fn chain_order_is_configuration_order() {
    let mut stack = Stack::new();
    for text in ["a", "b", "c", "d"] {
        stack.push(Tag { text, proceed: true });
    }
    assert_eq!(serve(&stack, "/").body(), b"abcd");
}

#[test]
fn second_handler_short_circuits_the_third() {
    let mut stack = Stack::new();
    stack
        .push(Tag { text: "1", proceed: true })
        .push(Tag { text: "2", proceed: false })
        .push(Tag { text: "3", proceed: true });

    let recorder = serve(&stack, "/");
    assert_eq!(recorder.body(), b"12");
    assert_eq!(recorder.status(), Some(StatusCode::OK));
}

#[test]
fn empty_stack_writes_nothing() {
    let recorder = serve(&Stack::new(), "/");
    assert_eq!(recorder.status(), None);
    assert!(recorder.body().is_empty());
}

#[test]
fn rebuild_does_not_touch_a_captured_chain() {
    let mut stack = Stack::new();
    stack.push(Tag { text: "1", proceed: true });
    let captured = stack.chain();

    stack.push(Tag { text: "2", proceed: true });

    let mut recorder = Recorder::new();
    captured.invoke(&mut Response::new(&mut recorder), &mut get("/"));
    assert_eq!(recorder.body(), b"1");
    assert_eq!(captured.len(), 1);
    assert_eq!(stack.chain().len(), 2);
}

#[test]
fn nil_handler_is_a_configuration_error() {
    let mut stack = Stack::new();
    stack.push(Tag { text: "x", proceed: true });

    let optional: Option<BoxedHandler> = None;
    assert!(matches!(stack.try_push(optional), Err(Error::NilHandler)));
    assert_eq!(stack.handlers().len(), 1);
    assert_eq!(serve(&stack, "/").body(), b"x");
}

#[test]
fn handlers_track_every_successful_push() {
    let mut stack = Stack::new();
    stack.push(Tag { text: "a", proceed: true });
    let _ = stack.try_push(None);
    stack.push_fn(|_, _, _| {});
    stack.push_endpoint_fn(|_, _| {});

    let names: Vec<_> = stack.handlers().iter().map(|h| h.name()).collect();
    assert_eq!(names.len(), 3);
    assert!(names[0].ends_with("Tag"));
}

#[test]
fn endpoint_can_sit_mid_chain() {
    struct Stamp;

    impl Endpoint for Stamp {
        fn serve(&self, rw: &mut Response<'_>, _req: &mut Request) {
            rw.headers_mut().insert("x-stamp", "yes".parse().unwrap());
        }
    }

    let mut stack = Stack::new();
    stack
        .push_endpoint(Stamp)
        .push(Tag { text: "after", proceed: true });

    let recorder = serve(&stack, "/");
    assert_eq!(recorder.headers()["x-stamp"], "yes");
    assert_eq!(recorder.body(), b"after");
}

#[test]
fn middleware_can_pass_context_downstream() {
    #[derive(Clone)]
    struct User(&'static str);

    let mut stack = Stack::new();
    stack
        .push_fn(|rw, req, next| {
            req.extensions_mut().insert(User("ada"));
            next.run(rw, req);
        })
        .push_endpoint_fn(|rw, req| {
            let user = req.extensions().get::<User>().map_or("anonymous", |u| u.0);
            write!(rw, "hi {user}").unwrap();
        });

    assert_eq!(serve(&stack, "/").body(), b"hi ada");
}

#[test]
fn middleware_sees_downstream_status_after_next() {
    let seen = Arc::new(Mutex::new(None));
    let observer = Arc::clone(&seen);

    let mut stack = Stack::new();
    stack
        .push_fn(move |rw, req, next| {
            next.run(rw, req);
            *observer.lock().unwrap() = Some((rw.status(), rw.size()));
        })
        .push_fn(|rw, _, _| {
            rw.write_header(StatusCode::NOT_FOUND);
            rw.write_all(b"missing").unwrap();
        });

    serve(&stack, "/");
    assert_eq!(*seen.lock().unwrap(), Some((Some(StatusCode::NOT_FOUND), 7)));
}

#[test]
fn concurrent_requests_share_one_stack() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let mut stack = Stack::new();
    stack
        .push(handler_fn(move |rw, req, next| {
            counter.fetch_add(1, Ordering::SeqCst);
            next.run(rw, req);
        }))
        .push_endpoint_fn(|rw, req| write!(rw, "{}", req.path()).unwrap());

    thread::scope(|scope| {
        for i in 0..8 {
            let stack = &stack;
            scope.spawn(move || {
                let path = format!("/{i}");
                assert_eq!(serve(stack, &path).body(), path.as_bytes());
            });
        }
    });

    assert_eq!(hits.load(Ordering::SeqCst), 8);
}
