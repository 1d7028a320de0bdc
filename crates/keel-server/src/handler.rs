use async_trait::async_trait;
use futures_util::future::BoxFuture;
use keel_core::Failure;

use crate::context::RequestContext;

/// An application request handler
///
/// A handler either writes its full response through the context and returns
/// `Ok(())`, or returns a [`Failure`] and lets the adapter respond. The
/// context convenience operations return `Result<(), Failure>` so the final
/// statement of a handler can be `ctx.redirect("/")` or `ctx.render(...)`.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one request
    ///
    /// # Errors
    ///
    /// Returns a failure for the adapter to classify and route
    async fn call(&self, ctx: &mut RequestContext) -> Result<(), Failure>;
}

/// [`Handler`] built from a closure returning a boxed future
pub struct HandlerFn<F>(F);

/// Wrap a closure as a [`Handler`]
///
/// ```ignore
/// let handler = handler_fn(|ctx| Box::pin(async move { ctx.redirect("/") }));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), Failure>> + Send + Sync,
{
    HandlerFn(f)
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), Failure>> + Send + Sync,
{
    async fn call(&self, ctx: &mut RequestContext) -> Result<(), Failure> {
        (self.0)(ctx).await
    }
}
