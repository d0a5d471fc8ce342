//! Memoized provider resolution.
//!
//! Every provider is a pure function of its inputs, so results are cached by
//! an input fingerprint. Invalidating a label bumps its generation; a result
//! computed under an older generation is returned to its caller but never
//! stored.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use crate::builder::provider::{assemble, ProviderRequest, ToolchainProvider};
use crate::core::errors::{AnalysisError, AnalysisFailure};
use crate::core::label::Label;
use crate::util::hash::Fingerprint;

/// Input-identity key of a provider request.
pub fn request_fingerprint(request: &ProviderRequest<'_>) -> Result<String, serde_json::Error> {
    let mut fp = Fingerprint::new();
    fp.update_serialized(request.target)?
        .update_serialized(request.deps)?
        .update_serialized(request.toolchain)?
        .update_serialized(request.config)?;
    Ok(fp.finish())
}

#[derive(Debug)]
struct Entry {
    label: Label,
    provider: Arc<ToolchainProvider>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    generations: HashMap<Label, u64>,
}

impl Inner {
    fn generation(&self, label: &Label) -> u64 {
        self.generations.get(label).copied().unwrap_or(0)
    }
}

/// Thread-safe provider cache.
#[derive(Debug, Default)]
pub struct ProviderCache {
    inner: RwLock<Inner>,
}

impl ProviderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached provider for `request`, assembling it on a miss.
    ///
    /// Failures are not cached.
    pub fn get_or_assemble(
        &self,
        request: &ProviderRequest<'_>,
    ) -> Result<Arc<ToolchainProvider>, AnalysisFailure> {
        let label = &request.target.label;
        let key = request_fingerprint(request).map_err(|e| {
            AnalysisFailure::single(
                label.clone(),
                AnalysisError::fatal(
                    &request.toolchain.identifier,
                    "fingerprint",
                    format!("cannot fingerprint inputs: {}", e),
                ),
            )
        })?;

        let generation = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = inner.entries.get(&key) {
                tracing::trace!("provider cache hit for {}", label);
                return Ok(Arc::clone(&entry.provider));
            }
            inner.generation(label)
        };

        let provider = Arc::new(assemble(request)?);

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.generation(label) == generation {
            inner.entries.insert(
                key,
                Entry {
                    label: label.clone(),
                    provider: Arc::clone(&provider),
                },
            );
        } else {
            tracing::debug!("{} was invalidated during resolution; not caching", label);
        }
        Ok(provider)
    }

    /// Drop every cached provider for `label` and discard in-flight results.
    pub fn invalidate(&self, label: &Label) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner.generations.entry(label.clone()).or_insert(0) += 1;
        inner.entries.retain(|_, entry| &entry.label != label);
    }

    pub fn contains(&self, request: &ProviderRequest<'_>) -> bool {
        match request_fingerprint(request) {
            Ok(key) => self
                .inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .contains_key(&key),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve independent requests in parallel, in input order.
pub fn resolve_many(
    cache: &ProviderCache,
    requests: &[ProviderRequest<'_>],
) -> Vec<Result<Arc<ToolchainProvider>, AnalysisFailure>> {
    requests
        .par_iter()
        .map(|request| cache.get_or_assemble(request))
        .collect()
}
