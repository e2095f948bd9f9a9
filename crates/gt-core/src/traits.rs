//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{City, Country, GeoPoint, Region, Subregion, Tip, User};

/// Spatial lookup contract for the administrative geography.
#[async_trait]
pub trait GeoIndex: Send + Sync {
    /// All cities within `radius_km` of `point`, each paired with its
    /// distance in kilometres, ascending by (distance, city id). An empty
    /// result is a normal outcome, never an error.
    async fn query_radius(&self, point: GeoPoint, radius_km: f64)
        -> anyhow::Result<Vec<(City, f64)>>;

    async fn city(&self, id: Uuid) -> anyhow::Result<Option<City>>;
    async fn subregion(&self, id: Uuid) -> anyhow::Result<Option<Subregion>>;
    async fn region(&self, id: Uuid) -> anyhow::Result<Option<Region>>;
    async fn country(&self, id: Uuid) -> anyhow::Result<Option<Country>>;

    async fn list_cities(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<City>>;
}

/// Data persistence contract for tips and their geographic tag sets.
#[async_trait]
pub trait TipStore: Send + Sync {
    async fn create_tip(&self, tip: &Tip) -> anyhow::Result<()>;
    async fn get_tip(&self, id: Uuid) -> anyhow::Result<Option<Tip>>;

    /// Rewrites title, text, and all four tag sets atomically. Ownership
    /// checks are the caller's responsibility.
    async fn update_tip(&self, tip: &Tip) -> anyhow::Result<()>;
    async fn delete_tip(&self, id: Uuid) -> anyhow::Result<()>;

    async fn list_tips(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Tip>>;

    /// Tips whose four tag sets are all simultaneously empty.
    async fn list_global_tips(&self) -> anyhow::Result<Vec<Tip>>;

    /// Tips tagged with any of the supplied area ids, at any tier.
    /// May return one tip matched through several tiers more than once;
    /// the selector deduplicates and computes the match flags itself.
    async fn find_by_tag_membership(
        &self,
        city_ids: &[Uuid],
        subregion_ids: &[Uuid],
        region_ids: &[Uuid],
        country_ids: &[Uuid],
    ) -> anyhow::Result<Vec<Tip>>;

    /// Score mutation belongs to the external scoring process (and the
    /// seeder); request handlers never call this.
    async fn set_score(&self, id: Uuid, score: f64) -> anyhow::Result<()>;
}

/// User persistence contract.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User, password_hash: &str) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Returns the user together with the stored password hash.
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<(User, String)>>;
    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn store_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<()>;
}

/// Credential logic contract. Pure computation; persistence stays in
/// [`UserStore`].
pub trait AuthProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;
    fn verify_password(&self, password: &str, hash: &str) -> bool;
    /// Generates an opaque session token for the named user.
    fn generate_token(&self, username: &str) -> String;
}
