//! Provider adapter abstraction and the fallback chain built on top of it.
//!
//! Every upstream API sits behind [`ProviderAdapter`]: `fetch` returns
//! `Some(record)` on success and `None` for any fault (timeout, non-2xx,
//! unparseable body, nothing to look up). `None` is absence, not an error;
//! chains simply move on to the next adapter.

use async_trait::async_trait;

/// A component wrapping exactly one upstream data API.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    type Query: Send + Sync;
    type Record: Send;

    /// Provenance label reported in layer metadata.
    fn name(&self) -> &str;

    /// Fetch a record. Implementations must never panic and own their timeout.
    async fn fetch(&self, query: &Self::Query) -> Option<Self::Record>;
}

/// A total provider: always produces a record, typically from local estimates.
pub trait Estimator: Send + Sync {
    type Query;
    type Record;

    fn name(&self) -> &str;

    fn estimate(&self, query: &Self::Query) -> Self::Record;
}

/// Record plus the name of the adapter that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<R> {
    pub record: R,
    pub provider: String,
}

/// Ordered adapters tried in sequence, terminated by an [`Estimator`].
///
/// The terminal estimator is required at construction, so `resolve` always
/// yields a record.
pub struct FallbackChain<Q, R>
where
    Q: Send + Sync + 'static,
    R: Send + 'static,
{
    adapters: Vec<Box<dyn ProviderAdapter<Query = Q, Record = R>>>,
    terminal: Box<dyn Estimator<Query = Q, Record = R>>,
}

impl<Q, R> FallbackChain<Q, R>
where
    Q: Send + Sync + 'static,
    R: Send + 'static,
{
    pub fn new(terminal: impl Estimator<Query = Q, Record = R> + 'static) -> Self {
        Self {
            adapters: Vec::new(),
            terminal: Box::new(terminal),
        }
    }

    /// Append an adapter; it is tried after every adapter added before it.
    pub fn with_adapter(
        mut self,
        adapter: impl ProviderAdapter<Query = Q, Record = R> + 'static,
    ) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// Adapter names in trial order, terminal last.
    pub fn provider_names(&self) -> Vec<&str> {
        self.adapters
            .iter()
            .map(|a| a.name())
            .chain(std::iter::once(self.terminal.name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len() + 1
    }

    /// Never true; a chain always holds its terminal estimator.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Try each adapter in order and return the first record.
    pub async fn resolve(&self, query: &Q) -> Resolved<R> {
        for adapter in &self.adapters {
            if let Some(record) = adapter.fetch(query).await {
                tracing::debug!("Fallback chain satisfied by {}", adapter.name());
                return Resolved {
                    record,
                    provider: adapter.name().to_string(),
                };
            }
            tracing::info!("{} returned nothing, trying next provider", adapter.name());
        }

        tracing::info!("All providers exhausted, using {}", self.terminal.name());
        Resolved {
            record: self.terminal.estimate(query),
            provider: self.terminal.name().to_string(),
        }
    }
}
