// Repositories module - data access layer

pub mod attribute;
pub mod dynamodb_store;
pub mod memory_store;
pub mod record_store;
pub mod table_manager;


pub use dynamodb_store::{table_name_for, DynamoDbRecordStore};
pub use memory_store::InMemoryRecordStore;
pub use record_store::{sort_newest_first, MeteredRecordStore, RecordFilter, RecordStore};
pub use table_manager::TableManager;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;

use crate::models::{Contact, Garage, Payment, Record, User, Zone};
use crate::observability::Metrics;

/// One record store per collection
#[derive(Clone)]
pub struct RecordStores {
    pub garages: Arc<dyn RecordStore<Garage>>,
    pub zones: Arc<dyn RecordStore<Zone>>,
    pub payments: Arc<dyn RecordStore<Payment>>,
    pub users: Arc<dyn RecordStore<User>>,
    pub contacts: Arc<dyn RecordStore<Contact>>,
}

impl RecordStores {
    pub fn in_memory() -> Self {
        Self {
            garages: Arc::new(InMemoryRecordStore::new()),
            zones: Arc::new(InMemoryRecordStore::new()),
            payments: Arc::new(InMemoryRecordStore::new()),
            users: Arc::new(InMemoryRecordStore::new()),
            contacts: Arc::new(InMemoryRecordStore::new()),
        }
    }

    pub fn dynamodb(client: Arc<DynamoDbClient>, table_prefix: &str, region: &str) -> Self {
        fn store<T: Record>(
            client: &Arc<DynamoDbClient>,
            table_prefix: &str,
            region: &str,
        ) -> Arc<dyn RecordStore<T>> {
            Arc::new(DynamoDbRecordStore::<T>::new(
                client.clone(),
                table_prefix,
                region.to_string(),
            ))
        }

        Self {
            garages: store(&client, table_prefix, region),
            zones: store(&client, table_prefix, region),
            payments: store(&client, table_prefix, region),
            users: store(&client, table_prefix, region),
            contacts: store(&client, table_prefix, region),
        }
    }

    /// Wrap every store so its operations are counted and timed
    pub fn metered(self, metrics: &Arc<Metrics>) -> Self {
        fn wrap<T: Record>(
            store: Arc<dyn RecordStore<T>>,
            metrics: &Arc<Metrics>,
        ) -> Arc<dyn RecordStore<T>> {
            Arc::new(MeteredRecordStore::new(store, metrics.clone()))
        }

        Self {
            garages: wrap(self.garages, metrics),
            zones: wrap(self.zones, metrics),
            payments: wrap(self.payments, metrics),
            users: wrap(self.users, metrics),
            contacts: wrap(self.contacts, metrics),
        }
    }
}
