#![allow(dead_code)]

use cascade_router::{App, Request, Response};

pub async fn call_ok(app: &App, request: Request) -> Response {
    app.call(request)
        .await
        .unwrap_or_else(|e| panic!("dispatch failed: {e}"))
}

pub fn body_of(response: &Response) -> String {
    response.body_string().unwrap_or_default()
}
