use std::sync::Arc;

use memeshare_shared::EntityRef;
use memeshare_sync::{
    CommentRepository, ReactionCache, ReactionConfig, ReactionEngine, ReactionRepository,
};

use crate::repository::{HttpComments, HttpReactions};
use crate::storage::LocalStorage;

/// Backends shared by every widget on the page, provided as context.
#[derive(Clone)]
pub struct Services {
    pub comments: Arc<dyn CommentRepository>,
    pub reactions: Arc<dyn ReactionRepository>,
    pub cache: ReactionCache,
    pub reaction_config: ReactionConfig,
}

impl Services {
    pub fn browser(reaction_config: ReactionConfig) -> Self {
        Self {
            comments: Arc::new(HttpComments),
            reactions: Arc::new(HttpReactions),
            cache: ReactionCache::new(Arc::new(LocalStorage), reaction_config.cache_prefix.clone()),
            reaction_config,
        }
    }

    pub fn reaction_engine(&self, entity: EntityRef) -> ReactionEngine {
        ReactionEngine::new(
            entity,
            self.reactions.clone(),
            self.cache.clone(),
            &self.reaction_config,
        )
    }
}
