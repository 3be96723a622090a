//! Host collaborator traits.
//!
//! These traits abstract over what the engine needs from the embedding
//! editor:
//! - Spawning local futures for asynchronous widget rendering
//! - Applying a checkbox toggle to the document
//! - Looking up link preview data (favicons)
//!
//! Implementations are provided by the consuming application.

use futures_util::future::LocalBoxFuture;
use smol_str::SmolStr;
use url::Url;

/// Runs futures on the host's single-threaded executor.
pub trait Spawn {
    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>);
}

impl<F> Spawn for F
where
    F: Fn(LocalBoxFuture<'static, ()>),
{
    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>) {
        self(future)
    }
}

/// Receives checkbox toggles from task widgets.
///
/// `offset` is the byte offset of the task marker's `[`; `checked` is the
/// state after the toggle.
pub trait TaskToggle {
    fn toggle(&self, offset: usize, checked: bool);
}

/// Unit type implementation - toggles are ignored.
impl TaskToggle for () {
    fn toggle(&self, _offset: usize, _checked: bool) {}
}

/// Provides preview data for link widgets.
pub trait LinkPreview {
    /// Favicon URL for a link target, or `None` to render without one.
    fn favicon_url(&self, url: &Url) -> Option<SmolStr>;
}

/// Unit type implementation - no favicons.
impl LinkPreview for () {
    fn favicon_url(&self, _url: &Url) -> Option<SmolStr> {
        None
    }
}

impl<T: TaskToggle> TaskToggle for &T {
    fn toggle(&self, offset: usize, checked: bool) {
        (*self).toggle(offset, checked)
    }
}

impl<T: LinkPreview> LinkPreview for &T {
    fn favicon_url(&self, url: &Url) -> Option<SmolStr> {
        (*self).favicon_url(url)
    }
}

/// Favicons from a fixed service URL template, with `{host}` replaced by
/// the link's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconTemplate(pub SmolStr);

impl LinkPreview for FaviconTemplate {
    fn favicon_url(&self, url: &Url) -> Option<SmolStr> {
        let host = url.host_str()?;
        Some(self.0.replace("{host}", host).into())
    }
}
