use anyhow::anyhow;
use bb8_postgres::bb8::{Pool, PooledConnection};
use bb8_postgres::tokio_postgres::{NoTls, Row};
use bb8_postgres::PostgresConnectionManager;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::warn;

use crate::models::dish::GenericDish;
use crate::models::restaurant::{CachedRestaurant, TopDish};
use crate::models::usage::{ApiProvider, DailyApiUsage, UsageSummary};

pub const RETRY_LIMIT: usize = 5;

const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS daily_api_usage (\
        date TEXT PRIMARY KEY,\
        google_calls INTEGER NOT NULL DEFAULT 0,\
        yelp_calls INTEGER NOT NULL DEFAULT 0,\
        llm_calls INTEGER NOT NULL DEFAULT 0\
    );\
    CREATE TABLE IF NOT EXISTS restaurant_cache (\
        place_id TEXT PRIMARY KEY,\
        name TEXT NOT NULL DEFAULT '',\
        address TEXT NOT NULL DEFAULT '',\
        geo_lat DOUBLE PRECISION NOT NULL DEFAULT 0,\
        geo_lng DOUBLE PRECISION NOT NULL DEFAULT 0,\
        top_dishes_json TEXT NOT NULL DEFAULT '[]',\
        reviews_json TEXT NOT NULL DEFAULT '[]',\
        image_url TEXT NOT NULL DEFAULT '',\
        last_updated TEXT NOT NULL\
    );\
    CREATE TABLE IF NOT EXISTS generic_dish (\
        cuisine TEXT NOT NULL,\
        dish_name TEXT NOT NULL,\
        pref_lang_code TEXT NOT NULL,\
        orig_lang TEXT NOT NULL DEFAULT '',\
        eng_lang TEXT NOT NULL DEFAULT '',\
        pref_lang TEXT NOT NULL DEFAULT '',\
        ingredients TEXT NOT NULL DEFAULT '',\
        taste TEXT NOT NULL DEFAULT '',\
        eat_method TEXT NOT NULL DEFAULT '',\
        sauces TEXT NOT NULL DEFAULT '',\
        avg_price TEXT NOT NULL DEFAULT '',\
        image_url TEXT NOT NULL DEFAULT '',\
        PRIMARY KEY (cuisine, dish_name, pref_lang_code)\
    );";

pub struct PostgresConnectionRepo {
    postgres_connection: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresConnectionRepo {
    pub fn new(postgres_connection: Pool<PostgresConnectionManager<NoTls>>) -> Self {
        Self {
            postgres_connection,
        }
    }

    async fn get_postgres_connection(
        &self,
    ) -> anyhow::Result<PooledConnection<PostgresConnectionManager<NoTls>>> {
        for _ in 0..RETRY_LIMIT {
            match self.postgres_connection.get().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    warn!("Failed to retrieve postgres connection due to: {}, retrying in 3s", e);
                    tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;
                    continue;
                }
            }
        }

        return Err(anyhow!("Failed to retrieve a valid connection from postgres pool, BAILING"));
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        conn.batch_execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn get_or_create_daily_usage(&self) -> anyhow::Result<DailyApiUsage> {
        let conn = self.get_postgres_connection().await?;
        let date = today_key();
        let stmt = format!(
            "SELECT date, google_calls, yelp_calls, llm_calls FROM daily_api_usage where date = '{}' limit 1;",
            date
        );

        let rows = conn.query(&stmt, &[]).await?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(parse_row_into_daily_usage(row));
        }

        let stmt = format!(
            "INSERT INTO daily_api_usage (date) VALUES ('{}') ON CONFLICT (date) DO NOTHING;",
            date
        );
        conn.execute(&stmt, &[]).await?;

        Ok(DailyApiUsage::empty(date))
    }

    /// Reports whether today's counter is still below the provider cap. Does
    /// not reserve anything: record_call is a separate statement, so two
    /// concurrent requests at the boundary can both pass. Soft bound.
    pub async fn can_call(&self, provider: ApiProvider) -> anyhow::Result<bool> {
        let usage = self.get_or_create_daily_usage().await?;
        Ok(usage.is_below_limit(provider))
    }

    pub async fn record_call(&self, provider: ApiProvider) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        let column = provider.usage_column();
        let stmt = format!(
            "INSERT INTO daily_api_usage (date, {}) VALUES ('{}', 1) \
             ON CONFLICT (date) DO UPDATE SET {} = daily_api_usage.{} + 1;",
            column,
            today_key(),
            column,
            column
        );
        conn.execute(&stmt, &[]).await?;
        Ok(())
    }

    pub async fn usage_summary(&self) -> anyhow::Result<UsageSummary> {
        let usage = self.get_or_create_daily_usage().await?;
        Ok(UsageSummary::from_usage(&usage))
    }

    pub async fn retrieve_cached_restaurant(
        &self,
        place_id: &String,
    ) -> anyhow::Result<Option<CachedRestaurant>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!(
            "SELECT * FROM restaurant_cache where place_id = '{}' limit 1;",
            quoted(place_id)
        );

        let res = conn.query(&stmt, &[]).await;
        match res {
            Ok(rows) => {
                if let Some(row) = rows.into_iter().next() {
                    return Ok(Some(parse_row_into_cached_restaurant(row)));
                }
            }
            Err(e) => {
                warn!("Ran into an issue retrieving cached restaurant with id: {}, due to: {}", place_id, e);
            }
        }
        Ok(None)
    }

    pub async fn search_cached_restaurants(
        &self,
        restaurant_name: &String,
    ) -> anyhow::Result<Vec<CachedRestaurant>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!(
            "SELECT * FROM restaurant_cache WHERE name ILIKE '%{}%' limit 5;",
            quoted(restaurant_name)
        );

        let res = conn.query(&stmt, &[]).await;

        let mut restaurants = Vec::new();
        match res {
            Ok(rows) => {
                for row in rows {
                    restaurants.push(parse_row_into_cached_restaurant(row));
                }
            }
            Err(e) => {
                warn!("Ran into an error searching the restaurant cache due to: {}", e);
            }
        }

        Ok(restaurants)
    }

    pub async fn upsert_restaurant_cache(&self, entry: &CachedRestaurant) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        let top_dishes_json = serde_json::to_string(&entry.top_dishes)?;
        let reviews_json = serde_json::to_string(&entry.reviews)?;
        let stmt = format!(
            "INSERT INTO restaurant_cache \
             (place_id, name, address, geo_lat, geo_lng, top_dishes_json, reviews_json, image_url, last_updated) \
             VALUES ('{}', '{}', '{}', {}, {}, '{}', '{}', '{}', '{}') \
             ON CONFLICT (place_id) DO UPDATE SET \
             top_dishes_json = EXCLUDED.top_dishes_json, \
             reviews_json = EXCLUDED.reviews_json, \
             last_updated = EXCLUDED.last_updated;",
            quoted(&entry.place_id),
            quoted(&entry.name),
            quoted(&entry.address),
            entry.lat,
            entry.lng,
            quoted(&top_dishes_json),
            quoted(&reviews_json),
            quoted(&entry.image_url),
            format_timestamp(entry.last_updated)
        );

        let res = conn.execute(&stmt, &[]).await;
        match res {
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to cache restaurant: {}, due to: {}", entry.place_id, e);
            }
        }
        Ok(())
    }

    pub async fn retrieve_generic_dishes(
        &self,
        cuisine: &String,
        pref_lang_code: &String,
    ) -> anyhow::Result<Vec<GenericDish>> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!(
            "SELECT * FROM generic_dish where cuisine = '{}' and pref_lang_code = '{}';",
            quoted(cuisine),
            quoted(pref_lang_code)
        );

        let res = conn.query(&stmt, &[]).await;

        let mut dishes = Vec::new();
        match res {
            Ok(rows) => {
                for row in rows {
                    dishes.push(parse_row_into_generic_dish(row));
                }
            }
            Err(e) => {
                warn!("Ran into an error retrieving dishes for cuisine: {}, due to: {}", cuisine, e);
            }
        }

        Ok(dishes)
    }

    pub async fn count_generic_dishes(
        &self,
        cuisine: &String,
        pref_lang_code: &String,
    ) -> anyhow::Result<i64> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!(
            "SELECT COUNT(*) FROM generic_dish where cuisine = '{}' and pref_lang_code = '{}';",
            quoted(cuisine),
            quoted(pref_lang_code)
        );

        let rows = conn.query(&stmt, &[]).await?;
        let count = rows
            .into_iter()
            .next()
            .map(|row| row.get::<usize, i64>(0))
            .unwrap_or(0);
        Ok(count)
    }

    pub async fn upsert_generic_dish(&self, dish: &GenericDish) -> anyhow::Result<()> {
        let conn = self.get_postgres_connection().await?;
        let stmt = format!(
            "INSERT INTO generic_dish \
             (cuisine, dish_name, pref_lang_code, orig_lang, eng_lang, pref_lang, ingredients, taste, eat_method, sauces, avg_price, image_url) \
             VALUES ('{}', '{}', '{}', '{}', '{}', '{}', '{}', '{}', '{}', '{}', '{}', '{}') \
             ON CONFLICT (cuisine, dish_name, pref_lang_code) DO UPDATE SET \
             orig_lang = EXCLUDED.orig_lang, \
             eng_lang = EXCLUDED.eng_lang, \
             pref_lang = EXCLUDED.pref_lang, \
             ingredients = EXCLUDED.ingredients, \
             taste = EXCLUDED.taste, \
             eat_method = EXCLUDED.eat_method, \
             sauces = EXCLUDED.sauces, \
             avg_price = EXCLUDED.avg_price, \
             image_url = EXCLUDED.image_url;",
            quoted(&dish.cuisine),
            quoted(&dish.dish_name),
            quoted(&dish.pref_lang_code),
            quoted(&dish.orig_lang),
            quoted(&dish.eng_lang),
            quoted(&dish.pref_lang),
            quoted(&dish.ingredients),
            quoted(&dish.taste),
            quoted(&dish.eat_method),
            quoted(&dish.sauces),
            quoted(&dish.avg_price),
            quoted(&dish.image_url)
        );

        let res = conn.execute(&stmt, &[]).await;
        match res {
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to upsert dish: {} for cuisine: {}, due to: {}", dish.dish_name, dish.cuisine, e);
            }
        }
        Ok(())
    }
}

// Dish names and review JSON routinely carry apostrophes; double them for
// the SQL literal.
fn quoted(value: &str) -> String {
    value.replace('\'', "''")
}

pub fn today_key() -> String {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc().format(format).unwrap()
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    timestamp.format(format).unwrap()
}

fn parse_timestamp(raw: &str) -> OffsetDateTime {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    match PrimitiveDateTime::parse(raw, format) {
        Ok(parsed) => parsed.assume_utc(),
        // An unreadable timestamp reads as maximally stale.
        Err(_) => OffsetDateTime::UNIX_EPOCH,
    }
}

fn parse_row_into_daily_usage(row: Row) -> DailyApiUsage {
    DailyApiUsage {
        date: row.get("date"),
        google_calls: row.get::<&str, i32>("google_calls"),
        yelp_calls: row.get::<&str, i32>("yelp_calls"),
        llm_calls: row.get::<&str, i32>("llm_calls"),
    }
}

fn parse_row_into_cached_restaurant(row: Row) -> CachedRestaurant {
    let top_dishes: Vec<TopDish> =
        serde_json::from_str(row.get::<&str, &str>("top_dishes_json")).unwrap_or_default();
    let reviews: Vec<String> =
        serde_json::from_str(row.get::<&str, &str>("reviews_json")).unwrap_or_default();
    CachedRestaurant {
        place_id: row.get("place_id"),
        name: row.get("name"),
        address: row.get("address"),
        lat: row.get::<&str, f64>("geo_lat"),
        lng: row.get::<&str, f64>("geo_lng"),
        top_dishes,
        reviews,
        image_url: row.get("image_url"),
        last_updated: parse_timestamp(row.get::<&str, &str>("last_updated")),
    }
}

fn parse_row_into_generic_dish(row: Row) -> GenericDish {
    GenericDish {
        cuisine: row.get("cuisine"),
        dish_name: row.get("dish_name"),
        pref_lang_code: row.get("pref_lang_code"),
        orig_lang: row.get("orig_lang"),
        eng_lang: row.get("eng_lang"),
        pref_lang: row.get("pref_lang"),
        ingredients: row.get("ingredients"),
        taste: row.get("taste"),
        eat_method: row.get("eat_method"),
        sauces: row.get("sauces"),
        avg_price: row.get("avg_price"),
        image_url: row.get("image_url"),
    }
}
