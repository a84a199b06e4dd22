//! Candidate path construction and probing.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{ResolveError, ResolveResult};

const NODE_MODULES: &str = "node_modules";

/// Where one build target's binary lives inside an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLocation {
    /// Package scope including the `@`, empty when unscoped.
    pub scope: String,
    /// Package name.
    pub package: String,
    /// Target directory inside the package, `/`-separated, empty for the
    /// package root.
    pub target_dir: String,
    /// Binary file name.
    pub binary: String,
}

impl InstallLocation {
    /// Path segments between `node_modules` and the binary.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        [self.scope.as_str(), self.package.as_str()]
            .into_iter()
            .chain(self.target_dir.split('/'))
            .filter(|s| !s.is_empty() && *s != ".")
            .collect()
    }

    /// The binary's path if the package were installed below `root`.
    #[must_use]
    pub fn under(&self, root: &Path) -> PathBuf {
        let mut path = root.join(NODE_MODULES);
        for segment in self.segments() {
            path.push(segment);
        }
        path.push(&self.binary);
        path
    }
}

/// Every path the loader in `loader_dir` probes, in probe order.
///
/// The first candidate is the binary next to the loader. Then, for every
/// ancestor of `loader_dir` (itself included) from deepest to the root, the
/// binary inside that ancestor's `node_modules`. Ancestors at or below a
/// `node_modules` directory contribute nothing.
#[must_use]
pub fn candidate_paths(loader_dir: &Path, location: &InstallLocation) -> Vec<PathBuf> {
    let mut candidates = vec![loader_dir.join(&location.binary)];
    candidates.extend(
        loader_dir
            .ancestors()
            .filter(|ancestor| {
                !ancestor
                    .components()
                    .any(|c| c.as_os_str() == OsStr::new(NODE_MODULES))
            })
            .map(|ancestor| location.under(ancestor)),
    );
    candidates
}

/// Read the first candidate that exists.
///
/// # Errors
///
/// Returns [`ResolveError::MissingAsset`] listing every probed path when
/// no candidate can be read.
pub fn locate_binary(
    loader_dir: &Path,
    location: &InstallLocation,
) -> ResolveResult<(PathBuf, Vec<u8>)> {
    let candidates = candidate_paths(loader_dir, location);
    for candidate in &candidates {
        match std::fs::read(candidate) {
            Ok(bytes) => {
                debug!(path = %candidate.display(), len = bytes.len(), "binary located");
                return Ok((candidate.clone(), bytes));
            },
            Err(e) => trace!(path = %candidate.display(), error = %e, "candidate missed"),
        }
    }
    Err(ResolveError::MissingAsset {
        binary: location.binary.clone(),
        tried: candidates,
    })
}
