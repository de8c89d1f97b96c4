//! Lamad demo client
//!
//! Generates a learning path for a topic against local collaborators, binds
//! it through the synchronizer and walks the learner through every step.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use jsonwebtoken::{encode, EncodingKey, Header};
use tracing::{info, warn};

use lamad_client::{
    logging, Args, Claims, IdentityProvider, InMemoryDocumentStore, JwtIdentityProvider,
    MockGenerator, PathService, StaticIdentityProvider,
};
use lamad_sync::{BindOptions, DataSynchronizer, FetchCache, SyncState};

const DEMO_TOKEN: &str = "demo-token";

fn canned_outline(topic: &str) -> String {
    format!(
        r#"Here is a path for {topic}:
{{
  "name": "{topic} from scratch",
  "description": "Three steps from zero to a working project.",
  "steps": [
    {{"title": "Read the overview", "resources": [{{"type": "article", "url": "https://example.org/overview", "durationMinutes": 20}}]}},
    {{"title": "Follow a guided course", "resources": [{{"type": "course", "url": "https://example.org/course", "durationMinutes": 240, "difficulty": "intermediate"}}]}},
    {{"title": "Ship a small project", "resources": [{{"type": "exercise", "url": "https://example.org/project", "durationMinutes": 300, "difficulty": "advanced"}}]}}
  ]
}}
Good luck!"#
    )
}

/// Build the identity provider and a token it will accept for `user`.
fn identity_provider(args: &Args) -> Result<(Arc<dyn IdentityProvider>, String)> {
    match &args.jwt_secret {
        Some(secret) => {
            let now = Utc::now().timestamp().max(0) as u64;
            let claims = Claims {
                sub: args.user.clone(),
                exp: now + 3600,
                iat: now,
            };
            let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
                .context("failed to sign demo token")?;
            info!("Using JWT identity provider");
            Ok((Arc::new(JwtIdentityProvider::new(secret.as_bytes())), token))
        }
        None => {
            warn!("LAMAD_JWT_SECRET not set, using static token table");
            let provider = StaticIdentityProvider::new().with_token(DEMO_TOKEN, args.user.clone());
            Ok((Arc::new(provider), DEMO_TOKEN.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init_tracing(&args.log_level, args.log_json).context("failed to initialise tracing")?;
    args.validate().context("invalid configuration")?;

    info!(
        topic = %args.topic,
        user = %args.user,
        load_timeout_ms = args.load_timeout_ms,
        "Starting lamad"
    );

    let (identity, token) = identity_provider(&args)?;
    let store = Arc::new(InMemoryDocumentStore::new());
    let generator = Arc::new(MockGenerator::new(canned_outline(&args.topic)));
    let sync = DataSynchronizer::new(Arc::new(FetchCache::new())).with_config(args.sync_config());
    let service = PathService::new(identity, store, generator, sync);

    let path = service.generate_path(&token, &args.topic).await?;

    let binding = service.bind_path(&token, &path.id, BindOptions::new()).await?;
    let mut rx = binding.subscribe();
    let state = rx
        .wait_for(|state| !matches!(state, SyncState::Idle | SyncState::Loading { .. }))
        .await
        .context("binding dropped before first load")?
        .clone();
    if let SyncState::Failure { error, .. } = state {
        return Err(error).context("failed to load learning path");
    }

    for step in &path.steps {
        service.start_step(&token, &path.id, &step.id).await?;
        let updated = service.complete_step(&token, &path.id, &step.id).await?;
        info!(step = %step.title, progress = updated.progress, "Step done");
    }

    let current = match binding.refetch().await {
        Some(path) => path,
        None => {
            return Err(binding
                .error()
                .map(anyhow::Error::from)
                .unwrap_or_else(|| anyhow::anyhow!("path binding disabled")))
        }
    };
    info!(
        path = %current.name,
        progress = current.progress,
        status = ?current.status,
        completed = current.completed_count(),
        total = current.steps.len(),
        "Learning path finished"
    );

    let stats = service.synchronizer().cache().stats();
    info!(hits = stats.hits, misses = stats.misses, writes = stats.writes, deletes = stats.deletes, "Cache stats");

    Ok(())
}
