use std::collections::BTreeSet;

use async_trait::async_trait;
use common::error::UniverseError;
use common::models::Ticker;
use tracing::{info, warn};

use crate::traits::UniverseSource;

/// Hand-curated symbols. Always contributes, never fails.
pub struct SeedSource {
    name: String,
    seeds: BTreeSet<Ticker>,
}

impl SeedSource {
    pub fn new(name: impl Into<String>, seeds: impl IntoIterator<Item = Ticker>) -> Self {
        Self {
            name: name.into(),
            seeds: seeds.into_iter().collect(),
        }
    }
}

#[async_trait]
impl UniverseSource for SeedSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn try_fetch_symbols(&self) -> Result<BTreeSet<Ticker>, UniverseError> {
        Ok(self.seeds.clone())
    }
}

/// Union of a prioritized list of sources. A failing source contributes
/// nothing; the build itself never fails and may return an empty set.
#[derive(Default)]
pub struct UniverseBuilder {
    sources: Vec<Box<dyn UniverseSource>>,
}

impl UniverseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl UniverseSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Adds a source that may have failed to initialize. A failure is logged
    /// and the source left out, so the rest of the universe still builds.
    pub fn with_source_or_skip<S, E>(self, name: &str, source: Result<S, E>) -> Self
    where
        S: UniverseSource + 'static,
        E: std::fmt::Display,
    {
        match source {
            Ok(source) => self.with_source(source),
            Err(e) => {
                warn!("Universe source {} could not be set up: {}", name, e);
                self
            }
        }
    }

    pub async fn build(&self) -> BTreeSet<Ticker> {
        let mut universe = BTreeSet::new();

        for source in &self.sources {
            let name = source.name();
            match source.try_fetch_symbols().await {
                Ok(symbols) => {
                    let before = universe.len();
                    let found = symbols.len();
                    universe.extend(symbols);
                    info!(
                        "Universe source {}: {} symbols ({} new)",
                        name,
                        found,
                        universe.len() - before
                    );
                }
                Err(e) => warn!("Universe source {} skipped: {}", name, e),
            }
        }

        info!("Universe: {} unique symbols", universe.len());
        universe
    }
}
