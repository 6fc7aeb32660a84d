//! Nested installs for dependencies the interpreter reports missing.
//!
//! A dependency is installed by a brand-new orchestrator that fetches the
//! dependency's own script and runs it unattended with no answers. The parent
//! blocks until that install terminates. The chain of slugs being resolved
//! travels with each nested orchestrator so cycles fail fast.

use tracing::{info, warn};

use crate::core::types::InstallOutcome;
use crate::error::InstallError;
use crate::install::{InstallEnv, InstallRequest, run_nested};

/// Slugs currently being installed, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyChain {
    slugs: Vec<String>,
    depth: u32,
}

impl DependencyChain {
    pub fn root(slug: Option<&str>) -> Self {
        Self {
            slugs: slug.map(str::to_string).into_iter().collect(),
            depth: 0,
        }
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    /// Nesting level: 0 for the requested install.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Record the root's slug once it is known from the script itself.
    pub fn name_root(&mut self, slug: Option<&str>) {
        if self.depth == 0
            && self.slugs.is_empty()
            && let Some(slug) = slug
        {
            self.slugs.push(slug.to_string());
        }
    }

    /// Chain for a nested install of `slug`, rejecting cycles and chains
    /// deeper than `limit`.
    pub fn extend(&self, slug: &str, limit: u32) -> Result<Self, InstallError> {
        let mut slugs = self.slugs.clone();
        let cycle = slugs.iter().any(|existing| existing == slug);
        slugs.push(slug.to_string());
        if cycle {
            return Err(InstallError::DependencyCycle { chain: slugs });
        }
        let depth = self.depth + 1;
        if depth > limit {
            return Err(InstallError::DependencyDepth {
                limit,
                chain: slugs,
            });
        }
        Ok(Self { slugs, depth })
    }
}

/// Install `slug` with a nested orchestrator and wait for it to terminate.
pub fn resolve_dependency(
    env: &InstallEnv,
    chain: &DependencyChain,
    slug: &str,
) -> Result<(), InstallError> {
    let nested = chain.extend(slug, env.config.max_dependency_depth)?;
    info!(slug, depth = nested.depth(), "installing missing dependency");

    match run_nested(env.clone(), InstallRequest::remote(slug, None), nested) {
        InstallOutcome::Succeeded => {
            info!(slug, "dependency installed");
            Ok(())
        }
        InstallOutcome::Failed(message) => {
            warn!(slug, error = %message, "dependency install failed");
            Err(InstallError::Dependency {
                slug: slug.to_string(),
                message,
            })
        }
    }
}
