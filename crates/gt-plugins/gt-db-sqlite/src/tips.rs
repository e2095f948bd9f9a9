//! SQLite-backed [`TipStore`].
//!
//! Tips live in one table; each tag tier gets its own join table. Every
//! mutation that touches a tip and its tag rows runs inside a single
//! transaction so a failed write never leaves a tip with half its tags.

use std::collections::BTreeSet;

use async_trait::async_trait;
use gt_core::models::Tip;
use gt_core::traits::TipStore;
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row, Sqlite, Transaction};
use uuid::Uuid;

use crate::{blob_to_uuid, uuid_to_blob};

pub struct SqliteTipStore {
    pool: SqlitePool,
}

impl SqliteTipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn tag_ids(&self, sql: &str, tip_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let rows = sqlx::query(sql)
            .bind(uuid_to_blob(tip_id))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| blob_to_uuid(row.get::<Vec<u8>, _>("area_id").as_slice()))
            .collect())
    }

    /// Builds a full [`Tip`] from a tips row plus its four tag tables.
    async fn hydrate(&self, row: &SqliteRow) -> anyhow::Result<Tip> {
        let id = blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice());
        Ok(Tip {
            id,
            owner_id: blob_to_uuid(row.get::<Vec<u8>, _>("owner_id").as_slice()),
            title: row.get("title"),
            text: row.get("text"),
            score: row.get("score"),
            cities: self
                .tag_ids(
                    "SELECT city_id AS area_id FROM tip_cities WHERE tip_id = ? ORDER BY city_id",
                    id,
                )
                .await?,
            subregions: self
                .tag_ids(
                    "SELECT subregion_id AS area_id FROM tip_subregions WHERE tip_id = ? ORDER BY subregion_id",
                    id,
                )
                .await?,
            regions: self
                .tag_ids(
                    "SELECT region_id AS area_id FROM tip_regions WHERE tip_id = ? ORDER BY region_id",
                    id,
                )
                .await?,
            countries: self
                .tag_ids(
                    "SELECT country_id AS area_id FROM tip_countries WHERE tip_id = ? ORDER BY country_id",
                    id,
                )
                .await?,
            created_at: row.get("created_at"),
        })
    }
}

async fn write_tags(tx: &mut Transaction<'_, Sqlite>, tip: &Tip) -> anyhow::Result<()> {
    for city_id in &tip.cities {
        sqlx::query("INSERT OR IGNORE INTO tip_cities (tip_id, city_id) VALUES (?, ?)")
            .bind(uuid_to_blob(tip.id))
            .bind(uuid_to_blob(*city_id))
            .execute(&mut **tx)
            .await?;
    }
    for subregion_id in &tip.subregions {
        sqlx::query("INSERT OR IGNORE INTO tip_subregions (tip_id, subregion_id) VALUES (?, ?)")
            .bind(uuid_to_blob(tip.id))
            .bind(uuid_to_blob(*subregion_id))
            .execute(&mut **tx)
            .await?;
    }
    for region_id in &tip.regions {
        sqlx::query("INSERT OR IGNORE INTO tip_regions (tip_id, region_id) VALUES (?, ?)")
            .bind(uuid_to_blob(tip.id))
            .bind(uuid_to_blob(*region_id))
            .execute(&mut **tx)
            .await?;
    }
    for country_id in &tip.countries {
        sqlx::query("INSERT OR IGNORE INTO tip_countries (tip_id, country_id) VALUES (?, ?)")
            .bind(uuid_to_blob(tip.id))
            .bind(uuid_to_blob(*country_id))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn delete_tags(tx: &mut Transaction<'_, Sqlite>, tip_id: Uuid) -> anyhow::Result<()> {
    for sql in [
        "DELETE FROM tip_cities WHERE tip_id = ?",
        "DELETE FROM tip_subregions WHERE tip_id = ?",
        "DELETE FROM tip_regions WHERE tip_id = ?",
        "DELETE FROM tip_countries WHERE tip_id = ?",
    ] {
        sqlx::query(sql)
            .bind(uuid_to_blob(tip_id))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl TipStore for SqliteTipStore {
    async fn create_tip(&self, tip: &Tip) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tips (id, owner_id, title, text, score, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(tip.id))
        .bind(uuid_to_blob(tip.owner_id))
        .bind(&tip.title)
        .bind(&tip.text)
        .bind(tip.score)
        .bind(tip.created_at)
        .execute(&mut *tx)
        .await?;

        write_tags(&mut tx, tip).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_tip(&self, id: Uuid) -> anyhow::Result<Option<Tip>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, text, score, created_at FROM tips WHERE id = ?",
        )
        .bind(uuid_to_blob(id))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn update_tip(&self, tip: &Tip) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE tips SET title = ?, text = ? WHERE id = ?")
            .bind(&tip.title)
            .bind(&tip.text)
            .bind(uuid_to_blob(tip.id))
            .execute(&mut *tx)
            .await?;

        // Tag sets are replaced wholesale; partial diffs are not worth
        // the bookkeeping at this volume.
        delete_tags(&mut tx, tip.id).await?;
        write_tags(&mut tx, tip).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_tip(&self, id: Uuid) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        delete_tags(&mut tx, id).await?;
        sqlx::query("DELETE FROM tips WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_tips(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Tip>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, title, text, score, created_at
             FROM tips ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut tips = Vec::with_capacity(rows.len());
        for row in &rows {
            tips.push(self.hydrate(row).await?);
        }
        Ok(tips)
    }

    async fn list_global_tips(&self) -> anyhow::Result<Vec<Tip>> {
        // Conjunctive globality: no row in any of the four join tables.
        let rows = sqlx::query(
            "SELECT id, owner_id, title, text, score, created_at FROM tips t
             WHERE NOT EXISTS (SELECT 1 FROM tip_cities     WHERE tip_id = t.id)
               AND NOT EXISTS (SELECT 1 FROM tip_subregions WHERE tip_id = t.id)
               AND NOT EXISTS (SELECT 1 FROM tip_regions    WHERE tip_id = t.id)
               AND NOT EXISTS (SELECT 1 FROM tip_countries  WHERE tip_id = t.id)
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Tip {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                owner_id: blob_to_uuid(row.get::<Vec<u8>, _>("owner_id").as_slice()),
                title: row.get("title"),
                text: row.get("text"),
                score: row.get("score"),
                cities: vec![],
                subregions: vec![],
                regions: vec![],
                countries: vec![],
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn find_by_tag_membership(
        &self,
        city_ids: &[Uuid],
        subregion_ids: &[Uuid],
        region_ids: &[Uuid],
        country_ids: &[Uuid],
    ) -> anyhow::Result<Vec<Tip>> {
        // Area id sets are small (a handful of cities, at most one id per
        // upper tier), so one lookup per id keeps the SQL static.
        let lookups: [(&str, &[Uuid]); 4] = [
            ("SELECT tip_id FROM tip_cities WHERE city_id = ?", city_ids),
            (
                "SELECT tip_id FROM tip_subregions WHERE subregion_id = ?",
                subregion_ids,
            ),
            (
                "SELECT tip_id FROM tip_regions WHERE region_id = ?",
                region_ids,
            ),
            (
                "SELECT tip_id FROM tip_countries WHERE country_id = ?",
                country_ids,
            ),
        ];

        // BTreeSet for a deterministic load order.
        let mut tip_ids = BTreeSet::new();
        for (sql, ids) in lookups {
            for area_id in ids {
                let rows = sqlx::query(sql)
                    .bind(uuid_to_blob(*area_id))
                    .fetch_all(&self.pool)
                    .await?;
                for row in rows {
                    tip_ids.insert(blob_to_uuid(row.get::<Vec<u8>, _>("tip_id").as_slice()));
                }
            }
        }

        let mut tips = Vec::with_capacity(tip_ids.len());
        for id in tip_ids {
            if let Some(tip) = self.get_tip(id).await? {
                tips.push(tip);
            }
        }
        Ok(tips)
    }

    async fn set_score(&self, id: Uuid, score: f64) -> anyhow::Result<()> {
        sqlx::query("UPDATE tips SET score = ? WHERE id = ?")
            .bind(score)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use chrono::Utc;
    use gt_core::models::User;
    use gt_core::traits::UserStore;

    async fn owner(pool: &SqlitePool) -> Uuid {
        let users = crate::SqliteUserStore::new(pool.clone());
        let user = User {
            id: Uuid::now_v7(),
            username: format!("owner-{}", Uuid::now_v7()),
            email: "owner@test.invalid".into(),
            created_at: Utc::now(),
        };
        users.create_user(&user, "hash").await.unwrap();
        user.id
    }

    fn tip(owner_id: Uuid, title: &str) -> Tip {
        Tip {
            id: Uuid::now_v7(),
            owner_id,
            title: title.to_string(),
            text: format!("{} text", title),
            score: 0.0,
            cities: vec![],
            subregions: vec![],
            regions: vec![],
            countries: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrips_tags() {
        let pool = test_pool().await;
        let store = SqliteTipStore::new(pool.clone());
        let owner_id = owner(&pool).await;

        let mut t = tip(owner_id, "tagged");
        t.cities = vec![Uuid::now_v7(), Uuid::now_v7()];
        t.regions = vec![Uuid::now_v7()];
        store.create_tip(&t).await.unwrap();

        let loaded = store.get_tip(t.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "tagged");
        assert_eq!(loaded.owner_id, owner_id);

        let mut expected_cities = t.cities.clone();
        expected_cities.sort();
        assert_eq!(loaded.cities, expected_cities);
        assert_eq!(loaded.regions, t.regions);
        assert!(loaded.subregions.is_empty());
        assert!(loaded.countries.is_empty());
    }

    #[tokio::test]
    async fn update_rewrites_tag_sets() {
        let pool = test_pool().await;
        let store = SqliteTipStore::new(pool.clone());
        let owner_id = owner(&pool).await;

        let mut t = tip(owner_id, "before");
        t.cities = vec![Uuid::now_v7()];
        store.create_tip(&t).await.unwrap();

        t.title = "after".into();
        t.cities = vec![];
        t.countries = vec![Uuid::now_v7()];
        store.update_tip(&t).await.unwrap();

        let loaded = store.get_tip(t.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "after");
        assert!(loaded.cities.is_empty());
        assert_eq!(loaded.countries, t.countries);
    }

    #[tokio::test]
    async fn global_query_is_conjunctive() {
        let pool = test_pool().await;
        let store = SqliteTipStore::new(pool.clone());
        let owner_id = owner(&pool).await;

        let global = tip(owner_id, "global");
        let mut country_only = tip(owner_id, "country only");
        country_only.countries = vec![Uuid::now_v7()];

        store.create_tip(&global).await.unwrap();
        store.create_tip(&country_only).await.unwrap();

        let globals = store.list_global_tips().await.unwrap();
        let ids: Vec<Uuid> = globals.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![global.id]);
    }

    #[tokio::test]
    async fn tag_membership_unions_across_tiers() {
        let pool = test_pool().await;
        let store = SqliteTipStore::new(pool.clone());
        let owner_id = owner(&pool).await;

        let city_id = Uuid::now_v7();
        let region_id = Uuid::now_v7();

        let mut both = tip(owner_id, "city and region");
        both.cities = vec![city_id];
        both.regions = vec![region_id];
        let mut city_only = tip(owner_id, "city only");
        city_only.cities = vec![city_id];
        let mut unrelated = tip(owner_id, "unrelated");
        unrelated.cities = vec![Uuid::now_v7()];

        for t in [&both, &city_only, &unrelated] {
            store.create_tip(t).await.unwrap();
        }

        let found = store
            .find_by_tag_membership(&[city_id], &[], &[region_id], &[])
            .await
            .unwrap();

        // One entry per tip, even for the tip matched through two tiers.
        let mut ids: Vec<Uuid> = found.iter().map(|t| t.id).collect();
        ids.sort();
        let mut expected = vec![both.id, city_only.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn delete_removes_tip_and_tags() {
        let pool = test_pool().await;
        let store = SqliteTipStore::new(pool.clone());
        let owner_id = owner(&pool).await;

        let city_id = Uuid::now_v7();
        let mut t = tip(owner_id, "doomed");
        t.cities = vec![city_id];
        store.create_tip(&t).await.unwrap();

        store.delete_tip(t.id).await.unwrap();
        assert!(store.get_tip(t.id).await.unwrap().is_none());
        assert!(store
            .find_by_tag_membership(&[city_id], &[], &[], &[])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn set_score_only_touches_the_score() {
        let pool = test_pool().await;
        let store = SqliteTipStore::new(pool.clone());
        let owner_id = owner(&pool).await;

        let t = tip(owner_id, "scored");
        store.create_tip(&t).await.unwrap();
        store.set_score(t.id, 7.5).await.unwrap();

        let loaded = store.get_tip(t.id).await.unwrap().unwrap();
        assert_eq!(loaded.score, 7.5);
        assert_eq!(loaded.title, "scored");
    }
}
