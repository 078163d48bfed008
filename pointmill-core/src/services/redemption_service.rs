// File: src/services/redemption_service.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use pointmill_common::models::catalog::RewardCatalog;
use pointmill_common::models::redemption::{DurationTier, RedemptionContact, RedemptionRequest};
use pointmill_common::traits::repository_traits::RedemptionRepository;
use crate::Error;

/// Creates redemption requests and reads their lifecycle back. Points are
/// debited exactly once, when the request is created; moving a request
/// through the rest of its lifecycle belongs to the fulfillment side.
pub struct RedemptionService {
    redemption_repo: Arc<dyn RedemptionRepository + Send + Sync>,
    catalog: RewardCatalog,
    remote_timeout: Duration,
}

impl RedemptionService {
    pub fn new(
        redemption_repo: Arc<dyn RedemptionRepository + Send + Sync>,
        catalog: RewardCatalog,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            redemption_repo,
            catalog,
            remote_timeout,
        }
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    pub async fn create(
        &self,
        account_id: Uuid,
        reward_id: &str,
        tier: DurationTier,
        contact: &RedemptionContact,
    ) -> Result<RedemptionRequest, Error> {
        let option = self
            .catalog
            .find(reward_id, tier)
            .ok_or_else(|| Error::UnknownReward(format!("{} ({})", reward_id, tier)))?;

        debug!(
            "creating redemption of '{}' ({}) for {}",
            option.reward_name, tier, account_id
        );

        let request = timeout(
            self.remote_timeout,
            self.redemption_repo.create(account_id, option, contact),
        )
        .await??;

        info!(
            "redemption {} created: {} points debited from {}",
            request.redemption_id, request.points_cost, account_id
        );
        Ok(request)
    }

    pub async fn get(&self, redemption_id: Uuid) -> Result<Option<RedemptionRequest>, Error> {
        Ok(timeout(self.remote_timeout, self.redemption_repo.get(redemption_id)).await??)
    }

    pub async fn list_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<RedemptionRequest>, Error> {
        Ok(timeout(
            self.remote_timeout,
            self.redemption_repo.list_for_account(account_id),
        )
        .await??)
    }
}
