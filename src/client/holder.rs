//! Per-call URL template slot.
//!
//! # Design Decisions
//! - Backed by a Tokio task-local, so the value follows the logical call
//!   across `.await` points and worker threads
//! - Outside a scope the slot does not exist: `get()` is `None` and `set()`
//!   is a no-op
//! - Spawned tasks do not inherit the slot; wrap them in
//!   [`UrlTemplateHolder::propagate`] when a captured call hops tasks
//! - An empty template reads back as `None`

use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static URL_TEMPLATE: RefCell<Option<String>>;
}

/// Accessors for the current call's URL template.
pub struct UrlTemplateHolder;

impl UrlTemplateHolder {
    /// Store `template` in the current scope.
    pub fn set(template: &str) {
        let _ = URL_TEMPLATE.try_with(|slot| {
            *slot.borrow_mut() = Some(template.to_string());
        });
    }

    /// Template stored in the current scope, if any.
    pub fn get() -> Option<String> {
        URL_TEMPLATE
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
            .filter(|template| !template.is_empty())
    }

    /// Empty the current scope's slot.
    pub fn clear() {
        let _ = URL_TEMPLATE.try_with(|slot| slot.borrow_mut().take());
    }

    /// Run `fut` with a fresh, empty slot.
    pub async fn scope<F: Future>(fut: F) -> F::Output {
        URL_TEMPLATE.scope(RefCell::new(None), fut).await
    }

    /// Run `fut` with a copy of the current slot.
    ///
    /// Use when a captured call continues on a spawned task.
    pub async fn propagate<F: Future>(fut: F) -> F::Output {
        let current = Self::get();
        URL_TEMPLATE.scope(RefCell::new(current), fut).await
    }
}
