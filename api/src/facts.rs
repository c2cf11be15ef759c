//! Fresh reads of the facts the stage evaluation runs over.
//!
//! Stage and entitlement decisions are never computed from cached counters;
//! every evaluation re-reads the rows it depends on.

use sqlx::PgPool;
use uuid::Uuid;

use mm_core::moderation::AutoModeration;
use mm_core::onboarding::StageInput;
use mm_core::plans::PlanTier;
use mm_core::profiles::{AdminStatus, OnboardingStage, ProfileCounts};
use mm_core::subscriptions::SubscriptionStatus;

use crate::error::AppError;

/// Everything a status/submission evaluation needs, read just-in-time.
#[derive(Debug)]
pub struct ProfileFacts {
    pub profile_id: Option<Uuid>,
    pub stored_stage: Option<OnboardingStage>,
    pub plan: Option<PlanTier>,
    pub input: StageInput,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    is_active: bool,
    identity_verified: bool,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    onboarding_stage: String,
    admin_status: String,
    auto_moderation: String,
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    plan: String,
    status: String,
}

pub async fn load_profile_facts(pool: &PgPool, user_id: Uuid) -> Result<ProfileFacts, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT is_active, identity_verified FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Database)?
    .ok_or_else(|| AppError::NotFound {
        resource: format!("User {user_id}"),
    })?;

    let profile = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, onboarding_stage, admin_status, auto_moderation \
         FROM profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Database)?;

    // canceled subscriptions are ignored entirely — the user is back to
    // plan selection; past_due must surface as needs_payment.
    let subscription = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT plan, status FROM subscriptions \
         WHERE user_id = $1 AND status IN ('trialing', 'active', 'past_due') \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Database)?;

    let counts = match &profile {
        Some(profile) => load_counts(pool, profile.id).await?,
        None => ProfileCounts::default(),
    };

    let (profile_id, stored_stage, admin_status, auto_moderation) = match &profile {
        Some(row) => (
            Some(row.id),
            Some(row.onboarding_stage.parse::<OnboardingStage>()?),
            row.admin_status.parse::<AdminStatus>()?,
            row.auto_moderation.parse::<AutoModeration>()?,
        ),
        None => (None, None, AdminStatus::Draft, AutoModeration::Draft),
    };

    let (plan, subscription_status) = match &subscription {
        Some(row) => (
            Some(row.plan.parse::<PlanTier>()?),
            Some(row.status.parse::<SubscriptionStatus>()?),
        ),
        None => (None, None),
    };

    Ok(ProfileFacts {
        profile_id,
        stored_stage,
        plan,
        input: StageInput {
            profile_exists: profile.is_some(),
            account_active: user.is_active,
            identity_verified: user.identity_verified,
            subscription: subscription_status,
            admin_status,
            auto_moderation,
            counts,
        },
    })
}

async fn load_counts(pool: &PgPool, profile_id: Uuid) -> Result<ProfileCounts, AppError> {
    let row: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
        "SELECT \
           (SELECT COUNT(*) FROM media_assets \
              WHERE profile_id = $1 AND status = 'approved' \
                AND kind IN ('profile', 'gallery')), \
           (SELECT COUNT(*) FROM profile_languages WHERE profile_id = $1), \
           (SELECT COUNT(*) FROM profile_services WHERE profile_id = $1), \
           (SELECT COUNT(*) FROM profile_setups WHERE profile_id = $1), \
           (SELECT COUNT(*) FROM profile_rates \
              WHERE profile_id = $1 AND context = 'incall' AND is_active = TRUE), \
           (SELECT COUNT(*) FROM profile_rates \
              WHERE profile_id = $1 AND context = 'outcall' AND is_active = TRUE)",
    )
    .bind(profile_id)
    .fetch_one(pool)
    .await
    .map_err(AppError::Database)?;

    Ok(ProfileCounts {
        approved_photos: row.0,
        languages: row.1,
        services: row.2,
        setups: row.3,
        incall_rates: row.4,
        outcall_rates: row.5,
    })
}

/// Persist the freshly computed stage as a cache. The derivation stays
/// authoritative; a failed write here only leaves a stale cache behind.
pub async fn persist_stage(pool: &PgPool, profile_id: Uuid, stage: OnboardingStage) {
    let result = sqlx::query(
        "UPDATE profiles SET onboarding_stage = $2, updated_at = NOW() \
         WHERE id = $1 AND onboarding_stage <> $2",
    )
    .bind(profile_id)
    .bind(stage.as_str())
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(profile_id = %profile_id, error = %err, "failed to persist stage cache");
    }
}
