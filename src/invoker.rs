//! Fallback invocation across equivalent routes and payload shapes.
//!
//! The upstream exposes the same operation under several routes, and some
//! write endpoints accept only one of several body shapes depending on the
//! account. A [`Route`] is an ordered list of [`Attempt`]s against one
//! resource; the [`MultiPathInvoker`] walks routes in order.
//!
//! Advancement rules:
//! - a single-attempt route gives way to the next route only on `404`;
//! - within a multi-attempt route, `400`, `404` and `405` move on to the next
//!   attempt;
//! - a route whose attempts were all rejected gives way to the next route only
//!   if every rejection was a `404`, otherwise the operation is exhausted;
//! - any other status and every transport error is returned as is.
//!
//! Running out of routes yields [`Kind::Exhausted`](crate::error::Kind), never
//! the last `404`.

use std::future::Future;

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::Result;
use crate::error::Error;
use crate::transport::{Requester, display_path};

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Ordered attempts against one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    attempts: Vec<Attempt>,
}

impl Route {
    #[must_use]
    pub fn single<P: Into<String>>(method: Method, path: P) -> Self {
        Self {
            attempts: vec![Attempt {
                method,
                path: path.into(),
                body: None,
            }],
        }
    }

    #[must_use]
    pub fn with_body<P: Into<String>>(method: Method, path: P, body: Value) -> Self {
        Self {
            attempts: vec![Attempt {
                method,
                path: path.into(),
                body: Some(body),
            }],
        }
    }

    /// One attempt per body, in order, all against `path`.
    #[must_use]
    pub fn variants<P, I>(method: Method, path: P, bodies: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = Value>,
    {
        let path = path.into();
        Self {
            attempts: bodies
                .into_iter()
                .map(|body| Attempt {
                    method: method.clone(),
                    path: path.clone(),
                    body: Some(body),
                })
                .collect(),
        }
    }

    /// Appends the attempts of `next` to this route.
    #[must_use]
    pub fn then(mut self, next: Route) -> Self {
        self.attempts.extend(next.attempts);
        self
    }

    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }
}

enum Outcome {
    Done(Value),
    NextRoute,
}

#[expect(clippy::module_name_repetitions, reason = "`MultiPath` alone does not name what the type does")]
pub struct MultiPathInvoker<'req, R: ?Sized> {
    requester: &'req R,
}

impl<'req, R: Requester + ?Sized> MultiPathInvoker<'req, R> {
    #[must_use]
    pub fn new(requester: &'req R) -> Self {
        Self { requester }
    }

    /// Runs `routes` in order and returns the JSON body of the first success.
    pub async fn invoke(&self, operation: &str, routes: Vec<Route>) -> Result<Value> {
        let mut total_attempts = 0;
        for route in routes {
            total_attempts += route.attempts.len();
            match self.run_route(operation, route).await? {
                Outcome::Done(value) => return Ok(value),
                Outcome::NextRoute => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(operation, "route not found, falling back");
                }
            }
        }
        Err(Error::exhausted(operation, total_attempts))
    }

    async fn run_route(&self, operation: &str, route: Route) -> Result<Outcome> {
        let single = route.attempts.len() == 1;
        let attempts = route.attempts.len();
        let mut all_not_found = true;

        for Attempt { method, path, body } in route.attempts {
            let response = self.requester.request(method.clone(), &path, body).await?;
            if response.is_success() {
                return response.into_json(&method, display_path(&path)).map(Outcome::Done);
            }

            let status = response.status;
            let rejected = if single {
                status == StatusCode::NOT_FOUND
            } else {
                is_shape_rejection(status)
            };
            if !rejected {
                return Err(response.to_error(&method, display_path(&path)));
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(operation, %method, path = display_path(&path), %status, "attempt rejected");

            all_not_found &= status == StatusCode::NOT_FOUND;
        }

        if all_not_found {
            Ok(Outcome::NextRoute)
        } else {
            Err(Error::exhausted(operation, attempts))
        }
    }
}

/// Runs `call` for each path in order, moving on only when it fails with `404`.
pub async fn first_found<T, F, Fut>(operation: &str, paths: &[String], mut call: F) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for path in paths {
        match call(path.clone()).await {
            Err(e) if e.status_code() == Some(StatusCode::NOT_FOUND) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(operation, path = display_path(path), "path not found, falling back");
            }
            other => return other,
        }
    }
    Err(Error::exhausted(operation, paths.len()))
}

fn is_shape_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED
    )
}
