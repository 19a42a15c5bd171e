//! Subscription lifecycle: create, query, patch, toggle and delete.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::error::WatchError;
use crate::domain::subscription::{NewSubscription, Subscription, SubscriptionPatch};
use crate::engine::repository::Repository;

#[derive(Clone)]
pub struct SubscriptionService {
    repo: Repository,
}

impl SubscriptionService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create an enabled subscription with a fresh id, applying defaults.
    pub fn create(&self, request: NewSubscription) -> Result<Subscription, WatchError> {
        let sub = request.into_subscription(Uuid::new_v4().to_string(), Utc::now())?;
        self.repo.save_subscription(&sub)?;
        tracing::info!(
            subscription_id = %sub.id,
            user_id = %sub.user_id,
            symbol = %sub.symbol,
            "subscription created"
        );
        Ok(sub)
    }

    pub fn get(&self, id: &str) -> Result<Subscription, WatchError> {
        self.repo
            .get_subscription(id)?
            .ok_or_else(|| WatchError::SubscriptionNotFound { id: id.to_string() })
    }

    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<Subscription>, WatchError> {
        self.repo.subscriptions_by_user(user_id)
    }

    pub fn update(&self, id: &str, patch: &SubscriptionPatch) -> Result<Subscription, WatchError> {
        let mut sub = self.get(id)?;
        patch.apply(&mut sub, Utc::now())?;
        self.repo.save_subscription(&sub)?;
        Ok(sub)
    }

    pub fn toggle(&self, id: &str) -> Result<Subscription, WatchError> {
        let mut sub = self.get(id)?;
        sub.enabled = !sub.enabled;
        sub.updated_at = Utc::now();
        self.repo.save_subscription(&sub)?;
        tracing::info!(subscription_id = %id, enabled = sub.enabled, "subscription toggled");
        Ok(sub)
    }

    pub fn delete(&self, id: &str) -> Result<(), WatchError> {
        let sub = self.get(id)?;
        self.repo.delete_subscription(&sub)?;
        tracing::info!(subscription_id = %id, "subscription deleted");
        Ok(())
    }
}
