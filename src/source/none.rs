use async_trait::async_trait;

use super::{RetrievalError, RetrievalSource};
use crate::document::Document;

/// A source without a knowledge base. Always returns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSource;

#[async_trait]
impl RetrievalSource for NoSource {
    fn name(&self) -> &'static str {
        "none"
    }

    fn required_env_vars(&self) -> &'static [&'static str] {
        &[]
    }

    async fn try_retrieve(
        &self,
        _question: &str,
        _num_results: usize,
    ) -> Result<Vec<Document>, RetrievalError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_empty() {
        let docs = NoSource.try_retrieve("What is RAG?", 5).await.unwrap();
        assert!(docs.is_empty());
        assert!(NoSource.required_env_vars().is_empty());
    }
}
