//! Asynchronous widget content resolution.
//!
//! `AssetResolver` keeps a cache of completed assets and a map of in-flight
//! fetches, so each name is fetched at most once at a time and every widget
//! asking for it awaits the same future. Completion writes into mounted
//! containers through weak references; a container the host already dropped
//! is simply skipped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use futures_util::future::{self, FutureExt, LocalBoxFuture, Shared};
use smol_str::SmolStr;

use crate::error::RenderError;
use crate::widget::Container;

/// A resolved asset. `release` frees whatever the handle holds when the
/// resolver is torn down.
pub trait AssetHandle: Clone + 'static {
    fn release(&self) {}
}

pub type Fetch<H> = LocalBoxFuture<'static, Result<H, RenderError>>;

struct Inner<H: AssetHandle> {
    cache: HashMap<SmolStr, H>,
    in_flight: HashMap<SmolStr, Shared<Fetch<H>>>,
    /// Bumped by `destroy`; completions from an older generation are dropped.
    generation: u64,
}

pub struct AssetResolver<H: AssetHandle> {
    inner: Rc<RefCell<Inner<H>>>,
}

impl<H: AssetHandle> Clone for AssetResolver<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: AssetHandle> Default for AssetResolver<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: AssetHandle> AssetResolver<H> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                cache: HashMap::new(),
                in_flight: HashMap::new(),
                generation: 0,
            })),
        }
    }

    pub fn cached(&self, name: &str) -> Option<H> {
        self.inner.borrow().cache.get(name).cloned()
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.inner.borrow().in_flight.contains_key(name)
    }

    pub fn cache_len(&self) -> usize {
        self.inner.borrow().cache.len()
    }

    /// Resolve `name`: the cached handle if there is one, the pending
    /// future if a fetch is already running, otherwise a new fetch from
    /// `fetch`. `fetch` is only called in the last case.
    pub fn resolve<F>(&self, name: impl Into<SmolStr>, fetch: F) -> Fetch<H>
    where
        F: FnOnce() -> Fetch<H>,
    {
        let name = name.into();
        let mut inner = self.inner.borrow_mut();

        if let Some(handle) = inner.cache.get(&name) {
            tracing::trace!(target: "weaver::live_preview::resolver", %name, "cache hit");
            return future::ready(Ok(handle.clone())).boxed_local();
        }
        if let Some(pending) = inner.in_flight.get(&name) {
            tracing::trace!(
                target: "weaver::live_preview::resolver",
                %name,
                "joining in-flight fetch"
            );
            return pending.clone().boxed_local();
        }

        tracing::debug!(target: "weaver::live_preview::resolver", %name, "starting fetch");
        let weak: Weak<RefCell<Inner<H>>> = Rc::downgrade(&self.inner);
        let generation = inner.generation;
        let key = name.clone();
        let fetch = fetch();
        let shared = async move {
            let result = fetch.await;
            complete(&weak, generation, &key, &result);
            result
        }
        .boxed_local()
        .shared();

        inner.in_flight.insert(name, shared.clone());
        shared.boxed_local()
    }

    /// Resolve `name` and write the rendered result into `container`.
    ///
    /// The returned future does the work; the caller hands it to the host's
    /// spawner. On failure the container is relabelled `error_class` and
    /// shows the message next to `source`.
    pub fn attach<F, R>(
        &self,
        name: impl Into<SmolStr>,
        container: &Container,
        fetch: F,
        render: R,
        error_class: &'static str,
        source: String,
    ) -> LocalBoxFuture<'static, ()>
    where
        F: FnOnce() -> Fetch<H>,
        R: FnOnce(&H) -> String + 'static,
    {
        let name = name.into();
        let target = container.downgrade();
        let resolving = self.resolve(name.clone(), fetch);
        async move {
            let written = match resolving.await {
                Ok(handle) => target.fill(render(&handle)),
                Err(err) => {
                    tracing::warn!(
                        target: "weaver::live_preview::resolver",
                        %name,
                        error = %err,
                        "widget render failed"
                    );
                    target.fail(error_class, &err.to_string(), &source)
                }
            };
            if !written {
                tracing::trace!(
                    target: "weaver::live_preview::resolver",
                    %name,
                    "container dropped before completion"
                );
            }
        }
        .boxed_local()
    }

    /// Release every cached handle and forget in-flight work. Fetches still
    /// running complete into nothing.
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.generation += 1;
        let released = inner.cache.len();
        for (_, handle) in inner.cache.drain() {
            handle.release();
        }
        inner.in_flight.clear();
        tracing::debug!(target: "weaver::live_preview::resolver", released, "resolver destroyed");
    }
}

fn complete<H: AssetHandle>(
    weak: &Weak<RefCell<Inner<H>>>,
    generation: u64,
    key: &SmolStr,
    result: &Result<H, RenderError>,
) {
    let Some(inner) = weak.upgrade() else {
        if let Ok(handle) = result {
            handle.release();
        }
        return;
    };
    let mut inner = inner.borrow_mut();
    if inner.generation != generation {
        if let Ok(handle) = result {
            handle.release();
        }
        return;
    }
    inner.in_flight.remove(key);
    if let Ok(handle) = result {
        inner.cache.insert(key.clone(), handle.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures_channel::oneshot;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Svg(Rc<str>, Rc<Cell<usize>>);

    impl AssetHandle for Svg {
        fn release(&self) {
            self.1.set(self.1.get() + 1);
        }
    }

    #[tokio::test]
    async fn test_single_fetch_per_name() {
        let resolver: AssetResolver<Svg> = AssetResolver::new();
        let releases = Rc::new(Cell::new(0));
        let fetches = Rc::new(Cell::new(0));
        let (tx, rx) = oneshot::channel::<&'static str>();

        let first = {
            let fetches = fetches.clone();
            let releases = releases.clone();
            resolver.resolve("a", move || {
                fetches.set(fetches.get() + 1);
                async move {
                    let body = rx.await.map_err(|_| RenderError::Diagram("cancelled".into()))?;
                    Ok::<_, RenderError>(Svg(body.into(), releases))
                }
                .boxed_local()
            })
        };
        let second = resolver.resolve("a", || {
            panic!("second fetch must not start");
        });
        assert!(resolver.is_in_flight("a"));

        tx.send("<svg/>").unwrap();
        let (a, b) = futures_util::join!(first, second);
        assert_eq!(a.unwrap().0.as_ref(), "<svg/>");
        assert_eq!(b.unwrap().0.as_ref(), "<svg/>");
        assert_eq!(fetches.get(), 1);
        assert!(!resolver.is_in_flight("a"));
        assert!(resolver.cached("a").is_some());

        resolver.destroy();
        assert_eq!(releases.get(), 1);
        assert_eq!(resolver.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_attach_fills_and_fails() {
        let resolver: AssetResolver<Svg> = AssetResolver::new();
        let releases = Rc::new(Cell::new(0));

        let ok = Container::pending("md-diagram");
        let r = releases.clone();
        resolver
            .attach(
                "ok",
                &ok,
                move || future::ready(Ok(Svg("<svg>ok</svg>".into(), r))).boxed_local(),
                |svg| svg.0.to_string(),
                "md-diagram-error",
                "graph".into(),
            )
            .await;
        assert_eq!(ok.html(), "<svg>ok</svg>");
        assert!(!ok.is_pending());

        let bad = Container::pending("md-diagram");
        resolver
            .attach(
                "bad",
                &bad,
                || future::ready(Err(RenderError::Diagram("syntax".into()))).boxed_local(),
                |svg: &Svg| svg.0.to_string(),
                "md-diagram-error",
                "graph <".into(),
            )
            .await;
        assert_eq!(bad.class(), "md-diagram-error");
        assert!(bad.html().contains("graph &lt;"));
        assert!(resolver.cached("bad").is_none());
    }

    #[tokio::test]
    async fn test_completion_after_destroy_is_dropped() {
        let resolver: AssetResolver<Svg> = AssetResolver::new();
        let releases = Rc::new(Cell::new(0));
        let (tx, rx) = oneshot::channel::<()>();
        let r = releases.clone();
        let pending = resolver.resolve("late", move || {
            async move {
                let _ = rx.await;
                Ok::<_, RenderError>(Svg("<svg/>".into(), r))
            }
            .boxed_local()
        });

        resolver.destroy();
        tx.send(()).unwrap();
        assert!(pending.await.is_ok());
        assert_eq!(resolver.cache_len(), 0);
        assert_eq!(releases.get(), 1);
    }
}
