use anyhow::Result;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::str::FromStr;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<MySqlPool> {
    let options = MySqlConnectOptions::from_str(&config.store.url)?;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.store.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}
