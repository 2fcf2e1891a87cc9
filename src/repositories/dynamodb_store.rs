use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};

use super::attribute::{from_item, to_item, Item};
use super::{sort_newest_first, RecordFilter, RecordStore};
use crate::models::{Record, RepositoryError, RepositoryResult};

/// DynamoDB implementation of the RecordStore trait: one table per collection, hash key `id`
pub struct DynamoDbRecordStore<T: Record> {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> DynamoDbRecordStore<T> {
    /// Create a store for `T` in the table `{table_prefix}-{collection}`
    pub fn new(client: Arc<DynamoDbClient>, table_prefix: &str, region: String) -> Self {
        Self {
            client,
            table_name: table_name_for::<T>(table_prefix),
            region,
            _record: PhantomData,
        }
    }

    /// Get the table name (for testing)
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create a DynamoDB client span with AWS and database attributes
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    /// Scan the whole table, following pagination, applying an optional equality filter
    async fn scan(&self, filter: &RecordFilter) -> RepositoryResult<Vec<T>> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut scan_builder = self
                .client
                .scan()
                .table_name(&self.table_name)
                .select(Select::AllAttributes)
                .set_exclusive_start_key(start_key.take());

            if let Some((field, value)) = &filter.field_equals {
                scan_builder = scan_builder
                    .filter_expression("#f = :v")
                    .expression_attribute_names("#f", field)
                    .expression_attribute_values(":v", AttributeValue::S(value.clone()));
            }

            let response = async {
                let result = scan_builder.send().await;
                if let Ok(output) = &result {
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                result.map_err(|e| self.map_dynamodb_error(e.into()))
            }
            .instrument(self.create_dynamodb_span("Scan"))
            .await?;

            for item in response.items.unwrap_or_default() {
                match from_item::<T>(item) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!("Failed to parse {} item: {}", T::ENTITY, e);
                        continue;
                    }
                }
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(records)
    }

    /// Reject the record if another record already holds one of its unique keys.
    /// Scan based, so two concurrent writers can still race.
    async fn check_unique(&self, record: &T) -> RepositoryResult<()> {
        for (field, value) in record.unique_keys() {
            let holders = self.scan(&RecordFilter::field(field, value.clone())).await?;
            if holders.iter().any(|other| other.id() != record.id()) {
                return Err(RepositoryError::ConstraintViolation {
                    message: format!("{} with {} '{}' already exists", T::ENTITY, field, value),
                });
            }
        }
        Ok(())
    }

    /// Write an item under a condition; a failed condition becomes `on_conflict`
    async fn put(
        &self,
        item: HashMap<String, AttributeValue>,
        condition: &str,
        on_conflict: RepositoryError,
    ) -> RepositoryResult<()> {
        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression(condition)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| match DynamoDbError::from(e) {
                    DynamoDbError::ConditionalCheckFailedException(_) => on_conflict,
                    other => self.map_dynamodb_error(other),
                })
        }
        .instrument(self.create_dynamodb_span("PutItem"))
        .await
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);

        match error {
            DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            },
            other => RepositoryError::AwsSdk {
                message: other.to_string(),
            },
        }
    }
}

/// Table name for a collection under a prefix
pub fn table_name_for<T: Record>(table_prefix: &str) -> String {
    format!("{}-{}", table_prefix, T::COLLECTION)
}

#[async_trait]
impl<T: Record> RecordStore<T> for DynamoDbRecordStore<T> {
    #[instrument(skip(self, record), fields(table = %self.table_name, id = %record.id()))]
    async fn create(&self, record: T) -> RepositoryResult<T> {
        info!("Creating new {}", T::ENTITY);

        self.check_unique(&record).await?;
        let item = to_item(&record)?;
        self.put(
            item,
            "attribute_not_exists(id)",
            RepositoryError::ConstraintViolation {
                message: format!("{} with id '{}' already exists", T::ENTITY, record.id()),
            },
        )
        .await?;

        info!("{} created successfully", T::ENTITY);
        Ok(record)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<T>> {
        let response = async {
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .send()
                .await;

            if let Ok(output) = &result {
                if let Some(request_id) = output.request_id() {
                    tracing::Span::current().record("aws.request_id", request_id);
                }
            }
            result.map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(self.create_dynamodb_span("GetItem"))
        .await?;

        match response.item {
            Some(item) => Ok(Some(from_item(item)?)),
            None => {
                info!("{} not found", T::ENTITY);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self, filter: RecordFilter) -> RepositoryResult<Vec<T>> {
        let mut records = self.scan(&filter).await?;
        sort_newest_first(&mut records);

        info!("Found {} {} records", records.len(), T::ENTITY);
        Ok(records)
    }

    #[instrument(skip(self, record), fields(table = %self.table_name, id = %record.id()))]
    async fn update(&self, record: T) -> RepositoryResult<T> {
        info!("Updating {}", T::ENTITY);

        self.check_unique(&record).await?;
        let item = to_item(&record)?;
        self.put(item, "attribute_exists(id)", RepositoryError::NotFound)
            .await?;

        info!("{} updated successfully", T::ENTITY);
        Ok(record)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn delete(&self, id: &str) -> RepositoryResult<bool> {
        let response = async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .return_values(aws_sdk_dynamodb::types::ReturnValue::AllOld)
                .send()
                .await
                .map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(self.create_dynamodb_span("DeleteItem"))
        .await?;

        let existed = response.attributes.is_some_and(|old| !old.is_empty());
        info!(existed, "{} delete processed", T::ENTITY);
        Ok(existed)
    }
}
