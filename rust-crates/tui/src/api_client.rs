//! Client for the Seery backend REST API (market data, AI suggestions, config).

use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use prediction_staking::{
    orchestrator::PredictionDraft,
    types::Direction,
};
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};

pub const DEFAULT_API_URL: &str = "http://localhost:3016";

#[derive(Clone)]
pub struct SeeryApi {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub prediction_staking_address: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

impl BackendConfig {
    pub fn staking_address(&self) -> Option<&str> {
        self.contract_address
            .as_deref()
            .or(self.prediction_staking_address.as_deref())
            .filter(|address| !address.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewsSource {
    pub title: String,
    pub url: String,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub change24h: f64,
    #[serde(default)]
    pub suggestion: Option<Direction>,
    #[serde(default)]
    pub suggestion_percent: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub news_sources: Vec<NewsSource>,
    #[serde(default)]
    pub prediction_id: Option<u64>,
}

impl MarketAsset {
    /// The draft recorded when staking on this asset without a prediction id.
    pub fn draft(&self) -> Option<PredictionDraft> {
        Some(PredictionDraft {
            crypto_id: self.id.clone(),
            current_price: self.price,
            direction: self.suggestion?,
            percent_change: self.suggestion_percent?,
        })
    }

    pub fn apply(&mut self, suggestion: &Suggestion) {
        if let Some(direction) = suggestion.direction {
            self.suggestion = Some(direction);
        }
        if let Some(percent) = suggestion.percent_change {
            self.suggestion_percent = Some(percent);
        }
        if suggestion.reasoning.is_some() {
            self.reasoning = suggestion.reasoning.clone();
        }
        if suggestion.prediction_id.is_some() {
            self.prediction_id = suggestion.prediction_id;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub percent_change: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub news_sources: Vec<NewsSource>,
    #[serde(default)]
    pub prediction_id: Option<u64>,
}

#[derive(Deserialize)]
struct MarketDto {
    #[serde(default)]
    cryptos: Vec<MarketAsset>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestRequest<'a> {
    crypto_id: &'a str,
    symbol: &'a str,
}

impl SeeryApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for backend")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health", "health").await
    }

    pub async fn config(&self) -> Result<BackendConfig> {
        self.get_json("/api/config", "config").await
    }

    pub async fn market(&self) -> Result<Vec<MarketAsset>> {
        let dto: MarketDto = self.get_json("/api/market-prediction", "market").await?;
        Ok(dto.cryptos)
    }

    pub async fn suggest(&self, crypto_id: &str, symbol: &str) -> Result<Suggestion> {
        let url = format!("{}/api/staking/predict", self.base_url);
        let res = self
            .http
            .post(url)
            .json(&SuggestRequest { crypto_id, symbol })
            .send()
            .await
            .wrap_err("backend request failed")?;
        Self::decode(res, "suggestion").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("backend request failed")?;
        Self::decode(res, what).await
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response, what: &str) -> Result<T> {
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read backend response body")?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!(
                "backend responded with {status} when fetching {what}: {body}"
            ));
        }
        serde_json::from_slice(&bytes).wrap_err_with(|| format!("invalid backend {what} payload"))
    }
}
