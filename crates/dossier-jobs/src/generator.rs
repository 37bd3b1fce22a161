use std::future::Future;

use async_trait::async_trait;
use dossier_common::error::Result;
use serde_json::Value;

/// The external operation that actually produces a document.
///
/// Failures should be reported as `DossierError::Generation` so the message
/// reaches the job or row record untouched.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, input: Value) -> Result<Value>;
}

pub struct FnGenerator<F> {
    f: F,
}

/// Wraps an async closure as a [`Generator`].
pub fn generator_fn<F, Fut>(f: F) -> FnGenerator<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    FnGenerator { f }
}

#[async_trait]
impl<F, Fut> Generator for FnGenerator<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn generate(&self, input: Value) -> Result<Value> {
        (self.f)(input).await
    }
}
