//! The classic stack plus one application handler.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example classic
//!
//! Try:
//!   curl -i http://localhost:8080/hello
//!   curl -i http://localhost:8080/panic
//!   PORT=3000 cargo run --example classic

use std::io::Write;

use strata::{ResponseWriter, Server, Stack, StatusCode, header};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut stack = Stack::classic();

    // A request-id for everything behind this point.
    stack.push_fn(|rw, req, next| {
        let id = req.header("x-request-id").unwrap_or("-").to_owned();
        rw.headers_mut().insert(
            header::HeaderName::from_static("x-request-id"),
            header::HeaderValue::from_str(&id).unwrap_or(header::HeaderValue::from_static("-")),
        );
        next.run(rw, req);
    });

    stack.push_endpoint_fn(|rw, req| match req.path() {
        "/panic" => panic!("asked to panic"),
        path => {
            rw.headers_mut()
                .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));
            rw.write_header(StatusCode::OK);
            if let Err(e) = write!(rw, "hello from {path}") {
                tracing::warn!("failed to write response: {e}");
            }
        }
    });

    Server::from_env()
        .serve(stack)
        .await
        .expect("server error");
}
