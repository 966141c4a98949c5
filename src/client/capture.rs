//! URL template capture around client entry points.
//!
//! Entry points that take a URL template as their first argument run their
//! call through [`capture_url_template`]. The metrics interceptor deeper in
//! the pipeline only sees the expanded URI; the template reaches it through
//! [`UrlTemplateHolder`].

use std::future::Future;

use crate::client::holder::UrlTemplateHolder;

/// Run `call` with `template` in the holder, clearing it afterwards.
///
/// The output of `call` is returned untouched. The slot is scoped to this
/// call, so it is gone on panic or cancellation as well.
pub async fn capture_url_template<F: Future>(template: &str, call: F) -> F::Output {
    UrlTemplateHolder::scope(async move {
        UrlTemplateHolder::set(template);
        let output = call.await;
        UrlTemplateHolder::clear();
        output
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_populates_only_during_call() {
        assert_eq!(UrlTemplateHolder::get(), None);

        let seen = capture_url_template("/users/{id}", async { UrlTemplateHolder::get() }).await;
        assert_eq!(seen.as_deref(), Some("/users/{id}"));

        assert_eq!(UrlTemplateHolder::get(), None);
    }

    #[tokio::test]
    async fn test_transparent_for_errors() {
        let result: Result<u32, &str> =
            capture_url_template("/x", async { Err("downstream failed") }).await;
        assert_eq!(result, Err("downstream failed"));
    }

    #[tokio::test]
    async fn test_nested_capture_restores_outer() {
        capture_url_template("/outer", async {
            let inner = capture_url_template("/inner", async { UrlTemplateHolder::get() }).await;
            assert_eq!(inner.as_deref(), Some("/inner"));
            assert_eq!(UrlTemplateHolder::get().as_deref(), Some("/outer"));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_captures_do_not_leak() {
        let mut handles = Vec::new();
        for i in 0..32 {
            handles.push(tokio::spawn(async move {
                let template = format!("/tenant/{}/{{id}}", i);
                let seen = capture_url_template(&template, async {
                    tokio::task::yield_now().await;
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    UrlTemplateHolder::get()
                })
                .await;
                (template, seen)
            }));
        }

        for handle in handles {
            let (template, seen) = handle.await.unwrap();
            assert_eq!(seen.as_deref(), Some(template.as_str()));
        }
    }
}
