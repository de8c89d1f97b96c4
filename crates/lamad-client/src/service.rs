//! Learning path service
//!
//! Ties the collaborators together:
//! - Reads go through synchronizer bindings keyed `path-<owner>-<id>` and
//!   `paths-<owner>`, and re-derive step statuses on every load
//! - Writes go straight to the document store, then invalidate those keys
//! - Step transitions are validated by the progression state machine before
//!   anything is written

use std::sync::Arc;

use chrono::Utc;
use lamad_path::{progression, LearningPath, PathStatus, ProgressionError};
use lamad_sync::{BindOptions, Binding, DataSynchronizer, LamadError, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::generation::{parse_outline_or_fallback, TextGenerator};
use crate::identity::{Identity, IdentityProvider};
use crate::store::{to_fields, DocumentStore, Query, SortDirection};

/// Default collection for learning path documents.
pub const PATHS_COLLECTION: &str = "learningPaths";

pub fn path_cache_key(owner_id: &str, path_id: &str) -> String {
    format!("path-{}-{}", owner_id, path_id)
}

pub fn paths_cache_key(owner_id: &str) -> String {
    format!("paths-{}", owner_id)
}

/// Map a progression rejection onto the client taxonomy.
pub fn rejection(err: ProgressionError) -> LamadError {
    match err {
        ProgressionError::StepNotFound(_) => LamadError::NotFound(err.to_string()),
        _ => LamadError::Conflict(err.to_string()),
    }
}

fn outline_prompt(topic: &str) -> String {
    format!(
        "Create a sequential learning path for \"{}\". Respond with a JSON object \
         {{\"name\", \"description\", \"steps\": [{{\"title\", \"description\", \
         \"resources\": [{{\"type\", \"title\", \"url\", \"durationMinutes\", \"difficulty\"}}]}}]}}.",
        topic
    )
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Collection holding path documents
    pub collection: String,
    /// Maximum paths returned by a listing
    pub list_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            collection: PATHS_COLLECTION.to_string(),
            list_limit: 50,
        }
    }
}

async fn fetch_path(store: &dyn DocumentStore, collection: &str, path_id: &str) -> Result<LearningPath> {
    let doc = store
        .get_document(collection, path_id)
        .await?
        .ok_or_else(|| LamadError::NotFound(format!("learning path {}", path_id)))?;
    Ok(doc.decode::<LearningPath>()?.refreshed())
}

fn ensure_owner(path: LearningPath, identity: &Identity) -> Result<LearningPath> {
    if path.owner_id != identity.subject_id {
        return Err(LamadError::Forbidden(format!(
            "learning path {} belongs to another user",
            path.id
        )));
    }
    Ok(path)
}

/// Learning path operations on behalf of an authenticated caller.
pub struct PathService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn TextGenerator>,
    sync: DataSynchronizer,
    config: ServiceConfig,
}

impl PathService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn TextGenerator>,
        sync: DataSynchronizer,
    ) -> Self {
        Self {
            identity,
            store,
            generator,
            sync,
            config: ServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn synchronizer(&self) -> &DataSynchronizer {
        &self.sync
    }

    /// Resolve a token to an identity or fail with `NotAuthenticated`.
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        self.identity
            .verify(token)
            .await
            .ok_or_else(|| LamadError::NotAuthenticated("invalid or missing token".into()))
    }

    /// Generate a new path for `topic` and store it.
    ///
    /// Unparseable generator output falls back to a default outline; a
    /// generator that fails outright surfaces as `Unknown`.
    pub async fn generate_path(&self, token: &str, topic: &str) -> Result<LearningPath> {
        let identity = self.authenticate(token).await?;
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LamadError::Validation("topic is required".into()));
        }

        let raw = self.generator.generate(&outline_prompt(topic)).await?;
        let (outline, used_fallback) = parse_outline_or_fallback(&raw, topic);

        let name = outline.name.clone();
        let description = outline.description.clone();
        let mut path = LearningPath::new(&identity.subject_id, name, outline.into_steps()).with_topic(topic);
        path.description = description;

        self.store
            .set_document(&self.config.collection, &path.id, to_fields(&path)?)
            .await?;
        self.sync.cache().delete(&paths_cache_key(&identity.subject_id));

        info!(
            path_id = %path.id,
            owner = %identity.subject_id,
            steps = path.steps.len(),
            used_fallback,
            "learning path generated"
        );
        Ok(path)
    }

    /// Load one of the caller's paths, bypassing the cache.
    pub async fn get_path(&self, token: &str, path_id: &str) -> Result<LearningPath> {
        let identity = self.authenticate(token).await?;
        self.owned_path(&identity, path_id).await
    }

    /// Bind one of the caller's paths. The loader re-derives statuses and
    /// enforces ownership on every cycle.
    pub async fn bind_path(
        &self,
        token: &str,
        path_id: &str,
        options: BindOptions,
    ) -> Result<Binding<LearningPath>> {
        let identity = self.authenticate(token).await?;
        let options = match options.cache_key {
            Some(_) => options,
            None => options.with_cache_key(path_cache_key(&identity.subject_id, path_id)),
        };

        let store = Arc::clone(&self.store);
        let collection = self.config.collection.clone();
        let path_id = path_id.to_string();

        Ok(self.sync.bind(
            move || {
                let store = Arc::clone(&store);
                let collection = collection.clone();
                let path_id = path_id.clone();
                let identity = identity.clone();
                async move {
                    let path = fetch_path(store.as_ref(), &collection, &path_id).await?;
                    ensure_owner(path, &identity)
                }
            },
            options,
        ))
    }

    /// Bind the caller's path listing, newest first.
    pub async fn bind_paths(&self, token: &str, options: BindOptions) -> Result<Binding<Vec<LearningPath>>> {
        let identity = self.authenticate(token).await?;
        let options = match options.cache_key {
            Some(_) => options,
            None => options.with_cache_key(paths_cache_key(&identity.subject_id)),
        };

        let store = Arc::clone(&self.store);
        let collection = self.config.collection.clone();
        let query = Query::new()
            .where_eq("ownerId", identity.subject_id.clone())
            .order_by("createdAt", SortDirection::Descending)
            .limit(self.config.list_limit);

        Ok(self.sync.bind(
            move || {
                let store = Arc::clone(&store);
                let collection = collection.clone();
                let query = query.clone();
                async move {
                    let docs = store.query(&collection, &query).await?;
                    docs.iter()
                        .map(|doc| Ok(doc.decode::<LearningPath>()?.refreshed()))
                        .collect::<Result<Vec<_>>>()
                }
            },
            options,
        ))
    }

    /// Complete a step and persist the new statuses and progress.
    ///
    /// Locked, already-completed and unknown steps are rejected before
    /// anything is written. Completing the last step completes the path.
    pub async fn complete_step(&self, token: &str, path_id: &str, step_id: &str) -> Result<LearningPath> {
        let identity = self.authenticate(token).await?;
        let mut path = self.owned_path(&identity, path_id).await?;
        if path.status == PathStatus::Paused {
            return Err(LamadError::Conflict(format!("learning path {} is paused", path_id)));
        }

        let completion = progression::complete_step(&path.steps, step_id).map_err(rejection)?;
        path.steps = completion.steps;
        path.progress = completion.progress;
        if completion.path_complete {
            path.status = PathStatus::Completed;
        }

        self.write_progress(&identity, &mut path).await?;
        info!(
            path_id = %path.id,
            step_id,
            progress = path.progress,
            complete = completion.path_complete,
            "step completed"
        );
        Ok(path)
    }

    /// Mark an available step as in progress.
    pub async fn start_step(&self, token: &str, path_id: &str, step_id: &str) -> Result<LearningPath> {
        let identity = self.authenticate(token).await?;
        let mut path = self.owned_path(&identity, path_id).await?;

        path.steps = progression::start_step(&path.steps, step_id).map_err(rejection)?;
        self.write_progress(&identity, &mut path).await?;
        debug!(path_id = %path.id, step_id, "step started");
        Ok(path)
    }

    /// Pause or resume a path. Completed paths cannot change; repeating the
    /// current state is a conflict.
    pub async fn set_paused(&self, token: &str, path_id: &str, paused: bool) -> Result<LearningPath> {
        let identity = self.authenticate(token).await?;
        let mut path = self.owned_path(&identity, path_id).await?;

        path.status = match (path.status, paused) {
            (PathStatus::Completed, _) => {
                return Err(LamadError::Conflict(format!("learning path {} is completed", path_id)))
            }
            (PathStatus::Paused, true) => {
                return Err(LamadError::Conflict(format!("learning path {} is already paused", path_id)))
            }
            (PathStatus::Active, false) => {
                return Err(LamadError::Conflict(format!("learning path {} is not paused", path_id)))
            }
            (_, true) => PathStatus::Paused,
            (_, false) => PathStatus::Active,
        };

        self.write_progress(&identity, &mut path).await?;
        info!(path_id = %path.id, status = ?path.status, "path status changed");
        Ok(path)
    }

    pub async fn delete_path(&self, token: &str, path_id: &str) -> Result<()> {
        let identity = self.authenticate(token).await?;
        self.owned_path(&identity, path_id).await?;

        self.store.delete_document(&self.config.collection, path_id).await?;
        self.invalidate(&identity, path_id);
        info!(path_id, owner = %identity.subject_id, "learning path deleted");
        Ok(())
    }

    async fn owned_path(&self, identity: &Identity, path_id: &str) -> Result<LearningPath> {
        let path = fetch_path(self.store.as_ref(), &self.config.collection, path_id).await?;
        ensure_owner(path, identity)
    }

    async fn write_progress(&self, identity: &Identity, path: &mut LearningPath) -> Result<()> {
        path.updated_at = Utc::now();
        let partial = to_fields(&json!({
            "steps": path.steps,
            "progress": path.progress,
            "status": path.status,
            "updatedAt": path.updated_at,
        }))?;

        self.store
            .update_document(&self.config.collection, &path.id, partial)
            .await?;
        self.invalidate(identity, &path.id);
        Ok(())
    }

    fn invalidate(&self, identity: &Identity, path_id: &str) {
        let cache = self.sync.cache();
        cache.delete(&path_cache_key(&identity.subject_id, path_id));
        cache.delete(&paths_cache_key(&identity.subject_id));
    }
}
