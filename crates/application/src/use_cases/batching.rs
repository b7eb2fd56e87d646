//! Helpers shared by the tree drop handlers.

use arbor_domain::{OrderUpdate, TreeNode, UpdateResourceInput};

use crate::ports::{BackendError, ResourceBackend};

/// Sends `inputs` in chunks of at most `chunk_size`.
///
/// Returns the number of backend calls made; an empty input makes none.
pub(crate) async fn batch_update_chunked<B: ResourceBackend>(
    backend: &B,
    aggregate_id: &str,
    inputs: Vec<UpdateResourceInput>,
    chunk_size: usize,
) -> Result<usize, BackendError> {
    let mut calls = 0;
    let mut inputs = inputs.into_iter().peekable();
    while inputs.peek().is_some() {
        let chunk: Vec<_> = inputs.by_ref().take(chunk_size.max(1)).collect();
        backend.batch_update_resources(aggregate_id, chunk).await?;
        calls += 1;
    }
    Ok(calls)
}

/// Order updates for `siblings`, tagged with each node's kind.
///
/// Updates for ids that are not among `siblings` are dropped.
pub(crate) fn order_inputs(
    siblings: &[TreeNode],
    updates: &[OrderUpdate],
) -> Vec<UpdateResourceInput> {
    updates
        .iter()
        .filter_map(|update| {
            siblings
                .iter()
                .find(|node| node.id == update.id)
                .map(|node| UpdateResourceInput::reorder(&update.id, node.kind, update.order))
        })
        .collect()
}
