use reqwest::blocking::Client;

use crate::config::ApiConfig;

pub fn build_http_client(config: &ApiConfig) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
}
