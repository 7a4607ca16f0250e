//! Class-level cache of compiled templates.
//!
//! Keyed by the SHA-256 of the markup after `[[ ]]` substitution, so two
//! instances with different host attributes never share a tree they should
//! not. Callers get an `Rc` and render from [`CompiledTemplate::instantiate`],
//! which keeps per-instance directive state separate.
//!
//! Placeholder values vary per host, so the number of distinct keys is
//! unbounded. The cache holds at most `capacity` entries and evicts the least
//! recently used one; an evicted template stays alive for instances already
//! holding its `Rc`.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::rc::Rc;

use crate::compile::{compile_resolved, CompiledTemplate};
use crate::error::Result;

/// Entries kept per component class unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 32;

/// Least recently used first
#[derive(Debug)]
pub struct TemplateCache {
    entries: IndexMap<String, Rc<CompiledTemplate>>,
    capacity: usize,
    hits: usize,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
            hits: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, markup: &str) -> Option<Rc<CompiledTemplate>> {
        self.entries.get(&Self::compute_hash(markup)).cloned()
    }

    pub fn get_or_compile(&mut self, markup: &str) -> Result<Rc<CompiledTemplate>> {
        let hash = Self::compute_hash(markup);
        if let Some(entry) = self.entries.shift_remove(&hash) {
            self.hits += 1;
            tracing::trace!("Template cache hit {}", &hash[..12]);
            self.entries.insert(hash, Rc::clone(&entry));
            return Ok(entry);
        }

        let compiled = Rc::new(compile_resolved(markup)?);
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                tracing::trace!("Template cache evicted {}", &evicted[..12]);
            }
        }
        self.entries.insert(hash, Rc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
