//! `partitions` command
//!
//! One-shot partition discovery for the configured event type.

use crate::client::{HttpStreamClient, StreamClient};
use crate::config::Config;
use crate::model::EventType;
use anyhow::Result;

pub async fn run_partitions(config: Config) -> Result<()> {
    let event_type = EventType::new(&config.broker.event_type);
    let mut client = HttpStreamClient::new(config.broker.base_url.as_str())?;
    if let Some(token) = &config.broker.auth_token {
        client = client.with_auth_token(token.clone());
    }

    let partitions = client.discover_partitions(&event_type).await?;
    println!("{:<12} {:<20} {:<20}", "PARTITION", "OLDEST", "NEWEST");
    for partition in partitions {
        println!(
            "{:<12} {:<20} {:<20}",
            partition.id, partition.oldest_available, partition.newest_available
        );
    }
    Ok(())
}
