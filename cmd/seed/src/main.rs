//! Seeds a demo geography and a handful of tips so the ranked listing
//! has something to show right after startup. Development only; running
//! it against an already-seeded database is a no-op.

use chrono::Utc;
use gt_auth_simple::SimpleAuthProvider;
use gt_core::models::{City, Country, GeoPoint, Region, Subregion, Tip, User};
use gt_core::traits::{AuthProvider, TipStore, UserStore};
use gt_db_sqlite::{SqliteGeoIndex, SqliteTipStore, SqliteUserStore};
use uuid::Uuid;

fn env_or(name: &str, fallback: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| fallback.to_string())
}

fn tip(owner_id: Uuid, title: &str, text: &str) -> Tip {
    Tip {
        id: Uuid::now_v7(),
        owner_id,
        title: title.to_string(),
        text: text.to_string(),
        score: 0.0,
        cities: vec![],
        subregions: vec![],
        regions: vec![],
        countries: vec![],
        created_at: Utc::now(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let database_url = env_or("DATABASE_URL", "sqlite:green_tips.db?mode=rwc");
    let pool = gt_db_sqlite::connect(&database_url).await?;

    let users = SqliteUserStore::new(pool.clone());
    if users.find_by_username("demo").await?.is_some() {
        log::info!("database already seeded; nothing to do");
        return Ok(());
    }

    let geo = SqliteGeoIndex::new(pool.clone());
    let tips = SqliteTipStore::new(pool);

    // Geography: one country, one region, one subregion, three cities.
    // Fredville and Portside sit ~5 km apart; Highmoor is outside the
    // default 10 km radius so it only matches through its region.
    let freedonia = Country {
        id: Uuid::now_v7(),
        name: "Freedonia".into(),
    };
    geo.insert_country(&freedonia).await?;

    let province = Region {
        id: Uuid::now_v7(),
        name: "Northern Province".into(),
        country_id: freedonia.id,
    };
    geo.insert_region(&province).await?;

    let district = Subregion {
        id: Uuid::now_v7(),
        name: "Capital District".into(),
        region_id: province.id,
    };
    geo.insert_subregion(&district).await?;

    let fredville = City {
        id: Uuid::now_v7(),
        name: "Fredville".into(),
        location: GeoPoint {
            latitude: 45.0,
            longitude: 7.0,
        },
        subregion_id: Some(district.id),
        region_id: Some(province.id),
        country_id: Some(freedonia.id),
    };
    let portside = City {
        id: Uuid::now_v7(),
        name: "Portside".into(),
        location: GeoPoint {
            latitude: 45.045,
            longitude: 7.0,
        },
        subregion_id: None,
        region_id: Some(province.id),
        country_id: Some(freedonia.id),
    };
    let highmoor = City {
        id: Uuid::now_v7(),
        name: "Highmoor".into(),
        location: GeoPoint {
            latitude: 45.35,
            longitude: 7.4,
        },
        subregion_id: None,
        region_id: Some(province.id),
        country_id: Some(freedonia.id),
    };
    for city in [&fredville, &portside, &highmoor] {
        geo.insert_city(city).await?;
    }

    // The demo account owning the sample tips (password: "greentips").
    let auth = SimpleAuthProvider::new(&env_or("SESSION_SALT", "green-tips-dev-salt"));
    let demo = User {
        id: Uuid::now_v7(),
        username: "demo".into(),
        email: "demo@greentips.invalid".into(),
        created_at: Utc::now(),
    };
    users
        .create_user(&demo, &auth.hash_password("greentips")?)
        .await?;

    // Tips across every tier, some with votes already counted so the
    // ranked listing shows more than tier ordering.
    let mut market = tip(
        demo.id,
        "Refill station at the market",
        "Bring your own bottles on Saturdays, stall 12.",
    );
    market.cities.push(fredville.id);

    let mut bikes = tip(
        demo.id,
        "Portside bike co-op",
        "Free repairs on Sunday mornings by the harbour.",
    );
    bikes.cities.push(portside.id);

    let mut repair = tip(
        demo.id,
        "District repair café",
        "Electronics and clothing, first Friday of the month.",
    );
    repair.subregions.push(district.id);

    let mut compost = tip(
        demo.id,
        "Province composting scheme",
        "Every commune hands out free compost bins on request.",
    );
    compost.regions.push(province.id);

    let mut rail = tip(
        demo.id,
        "Freedonia rail pass",
        "Unlimited regional trains, cheaper than two return trips.",
    );
    rail.countries.push(freedonia.id);

    let bottle = tip(
        demo.id,
        "Carry a reusable bottle",
        "Works everywhere, saves money everywhere.",
    );

    let samples = [&market, &bikes, &repair, &compost, &rail, &bottle];
    for sample in samples {
        tips.create_tip(sample).await?;
    }
    tips.set_score(market.id, 2.0).await?;
    tips.set_score(compost.id, 1.0).await?;
    tips.set_score(rail.id, 3.0).await?;
    tips.set_score(bottle.id, 5.0).await?;

    log::info!(
        "seeded 1 country, 1 region, 1 subregion, 3 cities, {} tips; demo login demo/greentips",
        samples.len()
    );
    Ok(())
}
