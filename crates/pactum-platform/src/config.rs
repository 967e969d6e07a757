use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub store_dir: String,
    pub http_addr: String,
    pub assist_url: Option<String>,
    pub assist_model: String,
    pub assist_api_key: Option<String>,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let store_dir =
            std::env::var("CONTRACT_STORE_DIR").unwrap_or_else(|_| "./contracts".to_string());
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());
        let assist_url = std::env::var("ASSIST_URL").ok();
        let assist_model =
            std::env::var("ASSIST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let assist_api_key = std::env::var("ASSIST_API_KEY").ok();

        Ok(Self {
            database_url,
            store_dir,
            http_addr,
            assist_url,
            assist_model,
            assist_api_key,
        })
    }
}
