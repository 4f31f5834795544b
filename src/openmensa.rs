//! Thin client for the OpenMensa v2 API.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::dates::canonical;
use crate::providers::build_http_client;

pub const DEFAULT_BASE_URL: &str = "https://openmensa.org/api/v2";

/// One meal offered by a canteen, with the student price in euros.
#[derive(Debug, Clone, PartialEq)]
pub struct Meal {
    pub category: String,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
struct CanteenInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CanteenDay {
    date: String,
    closed: bool,
}

#[derive(Debug, Deserialize)]
struct MealEntry {
    category: String,
    name: String,
    #[serde(default)]
    prices: MealPrices,
}

#[derive(Debug, Deserialize, Default)]
struct MealPrices {
    students: Option<f64>,
}

pub struct OpenMensaClient {
    client: Client,
    base_url: String,
}

impl OpenMensaClient {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = build_http_client(Duration::from_secs(30))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Display name of a canteen.
    pub async fn canteen_name(&self, canteen_id: u32) -> anyhow::Result<String> {
        let url = format!("{}/canteens/{}", self.base_url, canteen_id);
        let info: CanteenInfo = self.get_json(&url).await?;
        Ok(info.name)
    }

    /// Whether the canteen is closed on `date`. Dates the API does not list
    /// count as closed.
    pub async fn is_closed(&self, canteen_id: u32, date: NaiveDate) -> anyhow::Result<bool> {
        let url = format!("{}/canteens/{}/days", self.base_url, canteen_id);
        let days: Vec<CanteenDay> = self.get_json(&url).await?;
        let wanted = canonical(date);
        Ok(days
            .iter()
            .find(|day| day.date == wanted)
            .map(|day| day.closed)
            .unwrap_or(true))
    }

    /// Meals served on `date`, minus excluded categories.
    pub async fn meals(
        &self,
        canteen_id: u32,
        date: NaiveDate,
        excluded_categories: &[String],
    ) -> anyhow::Result<Vec<Meal>> {
        let url = format!(
            "{}/canteens/{}/days/{}/meals",
            self.base_url,
            canteen_id,
            canonical(date)
        );
        let entries: Vec<MealEntry> = self.get_json(&url).await?;
        Ok(filter_meals(entries, excluded_categories))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        debug!(url = %url, "OpenMensa request");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            anyhow::bail!("OpenMensa API error ({}): {}", status, text);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Drop meals whose category contains any excluded token (substring match,
/// so "Salattheke I" is excluded by "Salattheke").
fn filter_meals(entries: Vec<MealEntry>, excluded_categories: &[String]) -> Vec<Meal> {
    entries
        .into_iter()
        .filter(|entry| {
            !excluded_categories
                .iter()
                .any(|excluded| entry.category.contains(excluded.as_str()))
        })
        .map(|entry| Meal {
            category: entry.category,
            name: entry.name,
            price: entry.prices.students.unwrap_or_default(),
        })
        .collect()
}
