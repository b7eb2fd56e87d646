//! Handle parameter row drop use case

use arbor_domain::edge::{DropSite, ListShape, classify};
use arbor_domain::lists::{EndpointParams, ParamShape, ParamsPatch};
use arbor_domain::{
    DropClass, DropInstruction, DropOperation, DropRejection, ParamRowRef, Placement,
    UpdateResourceInput,
};
use tracing::{debug, info, warn};

use crate::error::{DropError, DropResult};
use crate::ports::ResourceBackend;

/// What a parameter row was dropped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamDropTarget {
    /// Another row.
    Row(ParamRowRef),
    /// A list as a whole, typically an empty one.
    List {
        /// Endpoint owning the list.
        endpoint_id: String,
        /// Which list.
        shape: ParamShape,
    },
}

/// A completed parameter row drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDrop {
    /// Dragged row.
    pub source: ParamRowRef,
    /// Row or list under the pointer.
    pub target: ParamDropTarget,
    /// Sensor instruction.
    pub instruction: DropInstruction,
}

/// Moves parameter rows within and between the lists of one endpoint.
#[derive(Clone)]
pub struct HandleParamDrop<B> {
    backend: B,
}

impl<B: ResourceBackend> HandleParamDrop<B> {
    /// Creates a new `HandleParamDrop` use case.
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Executes the use case and returns the patch sent to the backend.
    ///
    /// # Errors
    /// Returns `ValidationBlocked` for drops onto another endpoint,
    /// `NotFound` for unknown rows and backend errors from the update.
    pub async fn execute(
        &self,
        aggregate_id: &str,
        params: &mut EndpointParams,
        drop: ParamDrop,
    ) -> DropResult<ParamsPatch> {
        if drop.instruction.blocked {
            return Err(DropRejection::InstructionBlocked.into());
        }
        let operation = drop
            .instruction
            .operation
            .ok_or(DropRejection::MissingOperation)?;

        let (endpoint_id, to, placement) = match &drop.target {
            ParamDropTarget::Row(target) => {
                if target.row_id == drop.source.row_id {
                    return Ok(ParamsPatch::default());
                }
                if operation == DropOperation::Combine {
                    debug!(row = %drop.source.row_id, "Rows cannot be nested");
                    return Ok(ParamsPatch::default());
                }
                (&target.endpoint_id, target.shape, operation.placement(&target.row_id))
            }
            ParamDropTarget::List { endpoint_id, shape } => {
                (endpoint_id, *shape, Placement::Append)
            }
        };
        if endpoint_id != &drop.source.endpoint_id {
            return Err(DropRejection::ForeignOwner(drop.source.row_id).into());
        }

        let from = params
            .shape_of(&drop.source.row_id)
            .ok_or_else(|| DropError::NotFound(drop.source.row_id.clone()))?;
        let site = |shape| DropSite {
            aggregate_id: endpoint_id,
            parent_id: endpoint_id,
            shape: ListShape::Param(shape),
        };
        let patch = match classify(&site(from), &site(to), operation) {
            DropClass::WithinList => params.reorder_within(from, &drop.source.row_id, &placement)?,
            _ => params.move_across(from, &drop.source.row_id, to, &placement)?,
        };
        if patch.is_empty() {
            return Ok(patch);
        }

        self.backend
            .update_resource(
                aggregate_id,
                UpdateResourceInput::params(endpoint_id, patch.clone()),
            )
            .await?;
        if patch.adds_rows() {
            self.sync_row_ids(aggregate_id, endpoint_id, params).await;
        }
        info!(
            endpoint = %endpoint_id,
            row = %drop.source.row_id,
            from = ?from,
            to = ?to,
            "Parameter row moved"
        );
        Ok(patch)
    }

    /// Replaces the local lists with the stored ones so that rows created by
    /// the update carry their backend ids. A failed read keeps the local lists.
    async fn sync_row_ids(
        &self,
        aggregate_id: &str,
        endpoint_id: &str,
        params: &mut EndpointParams,
    ) {
        match self
            .backend
            .describe_endpoint_params(aggregate_id, endpoint_id)
            .await
        {
            Ok(mut stored) => {
                stored.sort();
                *params = stored;
            }
            Err(err) => {
                warn!(endpoint = %endpoint_id, error = %err, "Failed to read back parameter ids");
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::MockBackend;
    use arbor_domain::OrderUpdate;
    use arbor_domain::lists::ParamRow;
    use pretty_assertions::assert_eq;

    fn params() -> EndpointParams {
        EndpointParams {
            query: vec![
                ParamRow::new("q1", "page", "1", 1),
                ParamRow::new("q2", "limit", "20", 2),
                ParamRow::new("q3", "sort", "asc", 3),
            ],
            path: vec![ParamRow::new("p1", "userId", "42", 1)],
            headers: vec![],
        }
    }

    fn row(shape: ParamShape, id: &str) -> ParamRowRef {
        ParamRowRef {
            endpoint_id: "e1".into(),
            shape,
            row_id: id.into(),
        }
    }

    fn drop_on_row(
        source: ParamRowRef,
        target: ParamRowRef,
        operation: DropOperation,
    ) -> ParamDrop {
        ParamDrop {
            source,
            target: ParamDropTarget::Row(target),
            instruction: DropInstruction::new(operation),
        }
    }

    #[tokio::test]
    async fn test_reorder_within_query_updates_backend() {
        let backend = MockBackend::default();
        let mut params = params();

        let patch = HandleParamDrop::new(backend.clone())
            .execute(
                "p1",
                &mut params,
                drop_on_row(
                    row(ParamShape::Query, "q3"),
                    row(ParamShape::Query, "q1"),
                    DropOperation::ReorderBefore,
                ),
            )
            .await
            .unwrap();

        assert_eq!(
            patch.query.to_update,
            vec![
                OrderUpdate::new("q3", 1),
                OrderUpdate::new("q1", 2),
                OrderUpdate::new("q2", 3),
            ]
        );
        assert_eq!(backend.calls(), vec!["update"]);
        let log = backend.log.lock().expect("Lock poisoned");
        assert_eq!(log.updated[0].1.id, "e1");
        assert_eq!(log.updated[0].1.params.as_ref(), Some(&patch));
    }

    #[tokio::test]
    async fn test_move_query_row_into_path_list() {
        let backend = MockBackend::default();
        let mut params = params();

        let patch = HandleParamDrop::new(backend)
            .execute(
                "p1",
                &mut params,
                drop_on_row(
                    row(ParamShape::Query, "q1"),
                    row(ParamShape::Path, "p1"),
                    DropOperation::ReorderAfter,
                ),
            )
            .await
            .unwrap();

        assert_eq!(patch.query.to_remove, vec!["q1".to_string()]);
        assert_eq!(patch.path.to_add.len(), 1);
        assert_eq!(patch.path.to_add[0].order, 2);
        assert_eq!(params.query.len(), 2);
        assert_eq!(params.path.len(), 2);
    }

    #[tokio::test]
    async fn test_moved_row_takes_backend_id_before_moving_again() {
        let backend = MockBackend::default();
        let handler = HandleParamDrop::new(backend.clone());
        let mut params = params();
        let mut stored = params.clone();
        let moved = stored.query.remove(0);
        stored.query[0].order = 1;
        stored.query[1].order = 2;
        stored.path.push(ParamRow {
            id: "srv-7".into(),
            order: 2,
            ..moved
        });
        backend.set_params("e1", stored);

        handler
            .execute(
                "p1",
                &mut params,
                drop_on_row(
                    row(ParamShape::Query, "q1"),
                    row(ParamShape::Path, "p1"),
                    DropOperation::ReorderAfter,
                ),
            )
            .await
            .unwrap();
        assert_eq!(backend.calls(), vec!["update", "params"]);
        let path_ids: Vec<&str> = params.path.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(path_ids, vec!["p1", "srv-7"]);

        let patch = handler
            .execute(
                "p1",
                &mut params,
                drop_on_row(
                    row(ParamShape::Path, "srv-7"),
                    row(ParamShape::Query, "q2"),
                    DropOperation::ReorderBefore,
                ),
            )
            .await
            .unwrap();
        assert_eq!(patch.path.to_remove, vec!["srv-7".to_string()]);
    }

    #[tokio::test]
    async fn test_drop_on_empty_list_appends() {
        let mut params = params();
        let drop = ParamDrop {
            source: row(ParamShape::Path, "p1"),
            target: ParamDropTarget::List {
                endpoint_id: "e1".into(),
                shape: ParamShape::Header,
            },
            instruction: DropInstruction::new(DropOperation::Combine),
        };

        let patch = HandleParamDrop::new(MockBackend::default())
            .execute("p1", &mut params, drop)
            .await
            .unwrap();

        assert_eq!(patch.headers.to_add[0].order, 1);
        assert!(params.path.is_empty());
    }

    #[tokio::test]
    async fn test_combine_on_row_and_self_drop_do_nothing() {
        let backend = MockBackend::default();
        let handler = HandleParamDrop::new(backend.clone());
        let mut params = params();

        let nested = drop_on_row(
            row(ParamShape::Query, "q1"),
            row(ParamShape::Query, "q2"),
            DropOperation::Combine,
        );
        assert!(handler.execute("p1", &mut params, nested).await.unwrap().is_empty());

        let onto_self = drop_on_row(
            row(ParamShape::Query, "q1"),
            row(ParamShape::Query, "q1"),
            DropOperation::ReorderAfter,
        );
        assert!(handler.execute("p1", &mut params, onto_self).await.unwrap().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_other_endpoint_is_blocked() {
        let mut params = params();
        let mut target = row(ParamShape::Query, "q2");
        target.endpoint_id = "e2".into();

        let err = HandleParamDrop::new(MockBackend::default())
            .execute(
                "p1",
                &mut params,
                drop_on_row(
                    row(ParamShape::Query, "q1"),
                    target,
                    DropOperation::ReorderBefore,
                ),
            )
            .await
            .unwrap_err();
        assert!(err.is_blocked());
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let mut params = params();
        let err = HandleParamDrop::new(MockBackend::failing_on("update"))
            .execute(
                "p1",
                &mut params,
                drop_on_row(
                    row(ParamShape::Query, "q2"),
                    row(ParamShape::Query, "q1"),
                    DropOperation::ReorderBefore,
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DropError::BackendRejection(_)));
    }
}
