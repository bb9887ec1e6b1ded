use std::env;

/// DynamoDB connection settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbConfig {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1").
    pub region: String,
    /// Prepended to every resolved table name.
    pub table_prefix: Option<String>,
}

impl DynamoDbConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AWS_ENDPOINT_URL` - Custom endpoint, e.g. `http://localhost:8000`
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `PANACHE_TABLE_PREFIX` - Table name prefix (default: none)
    pub fn from_env() -> Self {
        Self {
            endpoint_url: non_empty_var("AWS_ENDPOINT_URL"),
            region: non_empty_var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            table_prefix: non_empty_var("PANACHE_TABLE_PREFIX"),
        }
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({url})"),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Creates a DynamoDB client with the given configuration.
#[cfg(feature = "dynamodb")]
pub async fn create_client(config: &DynamoDbConfig) -> aws_sdk_dynamodb::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;
    aws_sdk_dynamodb::Client::new(&sdk_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        let local = DynamoDbConfig {
            endpoint_url: Some("http://localhost:8000".to_string()),
            region: "us-east-1".to_string(),
            table_prefix: None,
        };
        assert_eq!(local.target_display(), "Local DynamoDB (http://localhost:8000)");

        let aws = DynamoDbConfig {
            endpoint_url: None,
            region: "eu-west-1".to_string(),
            table_prefix: Some("dev-".to_string()),
        };
        assert_eq!(aws.target_display(), "AWS DynamoDB (region: eu-west-1)");
    }
}
