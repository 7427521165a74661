//! Simple example of using request-boost.

use request_boost::{boosted_requests, BoostConfig, HttpBatch, Slot};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let urls: Vec<String> = (1..=10)
        .map(|i| format!("https://jsonplaceholder.typicode.com/todos/{}", i))
        .collect();
    let headers = urls
        .iter()
        .map(|_| vec![("accept".to_string(), "application/json".to_string())])
        .collect();

    let config = BoostConfig::builder()
        .worker_count(4)
        .max_tries(3)
        .timeout(Duration::from_secs(5))
        .parse_json(true)
        .build();

    println!("Sending {} requests...", urls.len());
    let output = boosted_requests(HttpBatch::new(urls).headers(headers), config).await?;

    for (i, slot) in output.iter().enumerate() {
        match slot {
            Slot::Done { payload, attempts } => {
                println!("#{} after {} attempt(s): {:?}", i, attempts, payload.as_json());
            }
            other => println!("#{} failed: {:?}", i, other),
        }
    }
    println!("Stats: {:?}", output.stats());

    Ok(())
}
