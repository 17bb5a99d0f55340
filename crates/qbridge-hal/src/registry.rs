//! Backend registry for the backends an account can reach.
//!
//! The [`BackendRegistry`] keeps discovery order, resolves aliased and
//! deprecated names, and answers filtered queries.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{HalError, HalResult};

/// Criteria for selecting backends. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct BackendFilter {
    /// Exact backend name (aliases are resolved first).
    pub name: Option<String>,
    /// Minimum number of qubits.
    pub min_num_qubits: Option<u32>,
    /// Only simulators (`true`) or only devices (`false`).
    pub simulator: Option<bool>,
    /// Only backends whose availability matches.
    pub operational: Option<bool>,
}

impl BackendFilter {
    /// Match a single backend name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Require at least `n` qubits.
    pub fn with_min_qubits(mut self, n: u32) -> Self {
        self.min_num_qubits = Some(n);
        self
    }

    /// Restrict to simulators or devices.
    pub fn with_simulator(mut self, simulator: bool) -> Self {
        self.simulator = Some(simulator);
        self
    }

    /// Restrict by operational state.
    pub fn with_operational(mut self, operational: bool) -> Self {
        self.operational = Some(operational);
        self
    }
}

/// Central registry of backend handles.
#[derive(Default)]
pub struct BackendRegistry {
    /// Handles in discovery order.
    backends: Vec<Arc<dyn Backend>>,
    /// Name → position in `backends`.
    index: FxHashMap<String, usize>,
    /// Alternative name → canonical name.
    aliases: FxHashMap<String, String>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. The first registration of a name wins.
    pub fn register(&mut self, backend: Arc<dyn Backend>) -> bool {
        let name = backend.name().to_string();
        if self.index.contains_key(&name) {
            debug!("Backend {} already registered, keeping the first one", name);
            return false;
        }
        debug!("Registering backend: {}", name);
        self.index.insert(name, self.backends.len());
        self.backends.push(backend);
        true
    }

    /// Register an alternative name for a backend.
    pub fn add_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Resolve an alias to its canonical name.
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// Look up a backend by name or alias.
    pub fn get(&self, name: &str) -> HalResult<Arc<dyn Backend>> {
        let canonical = self.resolve_name(name);
        self.index
            .get(canonical)
            .map(|&i| Arc::clone(&self.backends[i]))
            .ok_or_else(|| HalError::BackendNotFound(name.to_string()))
    }

    /// Check if a backend is registered under this name or alias.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(self.resolve_name(name))
    }

    /// All registered backends in discovery order.
    pub fn list(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    /// Names of all registered backends.
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backends matching the filter.
    ///
    /// The operational criterion needs an availability query per candidate;
    /// a failed query counts as not operational.
    pub async fn select(&self, filter: &BackendFilter) -> Vec<Arc<dyn Backend>> {
        let wanted_name = filter.name.as_deref().map(|n| self.resolve_name(n));
        let candidates = self.backends.iter().filter(|b| {
            wanted_name.is_none_or(|n| b.name() == n)
                && filter.min_num_qubits.is_none_or(|n| b.num_qubits() >= n)
                && filter.simulator.is_none_or(|s| b.is_simulator() == s)
        });

        let mut selected = Vec::new();
        for backend in candidates {
            if let Some(wanted) = filter.operational {
                let operational = backend
                    .availability()
                    .await
                    .is_ok_and(|a| a.is_available);
                if operational != wanted {
                    continue;
                }
            }
            selected.push(Arc::clone(backend));
        }
        selected
    }

    /// The single backend matching the filter.
    pub async fn select_one(&self, filter: &BackendFilter) -> HalResult<Arc<dyn Backend>> {
        let mut matches = self.select(filter).await;
        let described = filter.name.clone().unwrap_or_else(|| format!("{filter:?}"));
        match matches.len() {
            0 => Err(HalError::BackendNotFound(described)),
            1 => Ok(matches.remove(0)),
            _ => Err(HalError::AmbiguousBackend(described)),
        }
    }
}
