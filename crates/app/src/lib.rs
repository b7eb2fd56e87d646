//! Arbor - drag-and-drop tree reconciliation for API workspaces
//!
//! Wires the drop engine to the in-memory backends and the file-backed
//! UI state, seeds it from a workspace fixture and replays drop scripts.

pub mod error;
pub mod fixture;
pub mod render;
pub mod script;

use std::path::Path;

use arbor_application::{DropEngine, DropError, DropReport};
use arbor_domain::{DropEvent, EngineSettings};
use arbor_infrastructure::{
    FileActivityBarRepository, FileTreeItemStateRepository, InMemoryEnvironmentBackend,
    InMemoryResourceBackend, TokioFileSystem,
};
use tracing::{info, warn};

pub use error::{AppError, AppResult};
pub use fixture::WorkspaceFixture;

use crate::render::{render_environments, render_tree};
use crate::script::resolve_event;

/// The engine type used by the binary.
pub type Engine = DropEngine<
    InMemoryResourceBackend,
    InMemoryEnvironmentBackend,
    FileTreeItemStateRepository<TokioFileSystem>,
    FileActivityBarRepository<TokioFileSystem>,
>;

/// Result of one replayed drop event.
#[derive(Debug)]
pub struct ReplayStep {
    /// Position in the script, starting at 0.
    pub index: usize,
    /// What the engine did, or why the drop failed.
    pub outcome: Result<DropReport, AppError>,
}

/// A seeded engine together with the backends behind it.
pub struct Session {
    engine: Engine,
    backend: InMemoryResourceBackend,
    environment_backend: InMemoryEnvironmentBackend,
}

impl Session {
    /// Seeds fresh backends from `fixture` and initializes the engine with
    /// UI state persisted under `workspace`.
    ///
    /// # Errors
    /// Returns the first seeding or initialization failure.
    pub async fn open(
        fixture: WorkspaceFixture,
        workspace: &Path,
        settings: EngineSettings,
    ) -> AppResult<Self> {
        let backend = InMemoryResourceBackend::new();
        let endpoints = fixture.seed(&backend).await?;
        let environment_backend = InMemoryEnvironmentBackend::new(fixture.environments.clone());

        let mut engine = DropEngine::new(
            backend.clone(),
            environment_backend.clone(),
            FileTreeItemStateRepository::new(TokioFileSystem::new(), workspace),
            FileActivityBarRepository::new(TokioFileSystem::new(), workspace),
            settings,
        );
        engine
            .init(fixture.aggregate_trees(), fixture.activity_bar.clone())
            .await?;
        engine.set_tables(fixture.tables);
        for endpoint in endpoints {
            engine.open_endpoint(endpoint.id, endpoint.aggregate_id, endpoint.params);
        }
        info!(workspace = %workspace.display(), "Session opened");

        Ok(Self {
            engine,
            backend,
            environment_backend,
        })
    }

    /// The drop engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the drop engine.
    pub const fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The resource backend shared with the engine.
    #[must_use]
    pub const fn backend(&self) -> &InMemoryResourceBackend {
        &self.backend
    }

    /// The environment backend shared with the engine.
    #[must_use]
    pub const fn environment_backend(&self) -> &InMemoryEnvironmentBackend {
        &self.environment_backend
    }

    /// Resolves `@path` references in `event` and handles it.
    ///
    /// # Errors
    /// Returns `UnresolvedPath` or the engine's [`DropError`].
    pub async fn drop_event(&mut self, event: DropEvent) -> AppResult<DropReport> {
        let event = resolve_event(self.engine.trees(), event)?;
        Ok(self.engine.handle(event).await?)
    }

    /// Handles every event in order. A failed drop does not stop the replay.
    pub async fn replay(&mut self, events: Vec<DropEvent>) -> Vec<ReplayStep> {
        let mut steps = Vec::with_capacity(events.len());
        for (index, event) in events.into_iter().enumerate() {
            let outcome = self.drop_event(event).await;
            if let Err(err) = &outcome {
                if !matches!(err, AppError::Engine(DropError::ValidationBlocked(_))) {
                    warn!(step = index, error = %err, "Drop failed");
                }
            }
            steps.push(ReplayStep { index, outcome });
        }
        steps
    }

    /// Every aggregate followed by the environment lists.
    #[must_use]
    pub fn render(&self) -> String {
        let state = self.engine.tree_state().table();
        let mut out: String = self
            .engine
            .trees()
            .collections_trees()
            .iter()
            .map(|tree| render_tree(tree, state))
            .collect();
        out.push_str(&render_environments(self.engine.environments()));
        out
    }

    /// Uninstalls the drop monitors and clears local state.
    pub fn close(mut self) {
        self.engine.teardown();
    }
}
