// Block/stream reconciler - picks the authoritative source for each path per frame
use crate::domain::panel::PathDescriptor;
use crate::domain::sample::{DecodedBlock, ItemsByPath};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    /// Historical blocks cover this path; streamed data is ignored for it
    Blocks,
    /// No block coverage yet; the streamed window is used
    Streamed,
    /// Neither source has anything for this path
    Empty,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Source per path, indexed like the descriptors passed in
    pub sources: Vec<PathSource>,
    /// Streamed windows of the paths still relying on them
    pub streamed_dependency: Arc<ItemsByPath>,
}

#[derive(Debug)]
pub struct BlockStreamReconciler {
    no_streamed_dependency: Arc<ItemsByPath>,
}

impl Default for BlockStreamReconciler {
    fn default() -> Self {
        Self {
            no_streamed_dependency: Arc::new(ItemsByPath::new()),
        }
    }
}

impl BlockStreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value handed out whenever no path depends on streamed data.
    /// Always the same `Arc`, so repeated empty states compare identical.
    pub fn no_streamed_dependency(&self) -> &Arc<ItemsByPath> {
        &self.no_streamed_dependency
    }

    pub fn reconcile(
        &self,
        paths: &[PathDescriptor],
        streamed: &ItemsByPath,
        blocks: &[Arc<DecodedBlock>],
    ) -> Reconciliation {
        let mut dependency = ItemsByPath::new();

        let sources = paths
            .iter()
            .map(|path| {
                // A block entry counts as coverage even when it decoded to zero samples
                if blocks.iter().any(|block| block.contains_key(&path.query)) {
                    return PathSource::Blocks;
                }
                match streamed.get(&path.query) {
                    Some(items) => {
                        dependency.insert(path.query.clone(), Arc::clone(items));
                        PathSource::Streamed
                    }
                    None => PathSource::Empty,
                }
            })
            .collect();

        let streamed_dependency = if dependency.is_empty() {
            Arc::clone(&self.no_streamed_dependency)
        } else {
            Arc::new(dependency)
        };

        Reconciliation {
            sources,
            streamed_dependency,
        }
    }
}
