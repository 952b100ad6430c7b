//! Request rewriting applied before routing.
//!
//! HTML forms can only submit `GET` and `POST`, so a `POST` may ask to be
//! handled as another method with a `__method__` query parameter. When the
//! server sits behind a proxy, the `Host` header can also be forced to a
//! configured value.

use axum::http::{header, HeaderValue, Method, Request};

pub const METHOD_PARAM: &str = "__method__";

/// Form action submitting to `url` as `method`
pub fn override_method(url: &str, method: &Method) -> String {
    format!("{url}?{METHOD_PARAM}={method}")
}

fn overridden_method(query: &str) -> Option<Method> {
    let (_, value) = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == METHOD_PARAM)?;
    match value.to_ascii_uppercase().as_str() {
        "HEAD" => Some(Method::HEAD),
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

pub fn rewrite_request<B>(mut req: Request<B>, host: Option<&HeaderValue>) -> Request<B> {
    if req.method() == Method::POST {
        if let Some(method) = req.uri().query().and_then(overridden_method) {
            tracing::debug!(uri=%req.uri(), %method, "overriding request method");
            *req.method_mut() = method;
        }
    }
    if let Some(host) = host {
        req.headers_mut().insert(header::HOST, host.clone());
    }
    req
}
