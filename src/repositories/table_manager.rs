use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::models::{Contact, Garage, Payment, Record, RepositoryError, RepositoryResult, User, Zone};

/// Manages DynamoDB table creation for the record collections
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl TableManager {
    /// Create a new table manager
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }

    /// Names of every collection table under a prefix
    pub fn table_names(table_prefix: &str) -> Vec<String> {
        [
            Garage::COLLECTION,
            Zone::COLLECTION,
            Payment::COLLECTION,
            User::COLLECTION,
            Contact::COLLECTION,
        ]
        .iter()
        .map(|collection| format!("{}-{}", table_prefix, collection))
        .collect()
    }

    /// Create a collection table keyed by `id`, unless it already exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_record_table(&self, table_name: &str) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        info!("Creating table");

        let attribute_definition = AttributeDefinition::builder()
            .attribute_name("id")
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build attribute definition: {}", e),
            })?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name("id")
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| RepositoryError::AwsSdk {
                message: format!("Failed to build key schema: {}", e),
            })?;

        self.client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(attribute_definition)
            .key_schema(key_schema)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| self.map_dynamodb_error(e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Table {} created successfully", table_name);

        Ok(())
    }

    /// Create every collection table under the prefix
    #[instrument(skip(self))]
    pub async fn create_all_tables(&self, table_prefix: &str) -> RepositoryResult<()> {
        info!("Creating all tables");

        for table_name in Self::table_names(table_prefix) {
            self.create_record_table(&table_name).await?;
        }

        info!("All tables ready");
        Ok(())
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e
                    .as_service_error()
                    .is_some_and(|service_error| service_error.is_resource_not_found_exception())
                {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                } else {
                    error!("Error checking table existence: {}", e);
                    Err(RepositoryError::ConnectionFailed)
                }
            }
        }
    }

    /// Wait for a table to become active
    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let mut attempts = 0;

        loop {
            match self.client.describe_table().table_name(table_name).send().await {
                Ok(response) => match response.table.and_then(|t| t.table_status) {
                    Some(TableStatus::Active) => {
                        info!("Table {} is now active", table_name);
                        return Ok(());
                    }
                    Some(status) => {
                        info!("Table {} status: {:?}, waiting...", table_name, status);
                    }
                    None => {
                        warn!("Table {} status unknown, waiting...", table_name);
                    }
                },
                Err(e) => {
                    error!("Error checking table status: {}", e);
                    return Err(self.map_dynamodb_error(e.into()));
                }
            }

            attempts += 1;
            if attempts >= self.max_attempts {
                error!("Timeout waiting for table {} to become active", table_name);
                return Err(RepositoryError::Timeout);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);
        RepositoryError::AwsSdk {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_cover_every_collection() {
        let names = TableManager::table_names("garagehub");
        assert_eq!(
            names,
            vec![
                "garagehub-garages",
                "garagehub-zones",
                "garagehub-payments",
                "garagehub-users",
                "garagehub-contacts",
            ]
        );
    }
}
