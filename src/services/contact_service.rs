use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    validate_mobile_number, validate_optional_text, Contact, ContactRequest, Record,
    RepositoryError, ServiceError, ServiceResult, Validate, MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{RecordFilter, RecordStore};
use crate::services::non_blank;

pub struct ContactService {
    store: Arc<dyn RecordStore<Contact>>,
    tracing: BusinessTracingMiddleware,
}

impl ContactService {
    pub fn new(store: Arc<dyn RecordStore<Contact>>, tracing: BusinessTracingMiddleware) -> Self {
        Self { store, tracing }
    }

    #[instrument(skip(self))]
    pub async fn list_contacts(&self) -> ServiceResult<Vec<Contact>> {
        Ok(self.store.find_all(RecordFilter::all()).await?)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_contact(&self, id: &str) -> ServiceResult<Contact> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Contact::ENTITY, id))
    }

    #[instrument(skip(self, request))]
    pub async fn create_contact(&self, request: ContactRequest) -> ServiceResult<Contact> {
        self.tracing
            .trace_entity_operation(Contact::ENTITY, "create", async {
                request.validate()?;

                let contact = Contact::new(
                    non_blank(request.name).unwrap_or_default(),
                    non_blank(request.mobile_number).unwrap_or_default(),
                    non_blank(request.message).unwrap_or_default(),
                    non_blank(request.program),
                );
                let contact = self.store.create(contact).await?;
                crate::info_with_trace!(contact_id = %contact.id, "Contact entry created");
                Ok(contact)
            })
            .await
    }

    /// Merge the supplied fields into an existing entry
    #[instrument(skip(self, request), fields(id = %id))]
    pub async fn update_contact(&self, id: &str, request: ContactRequest) -> ServiceResult<Contact> {
        self.tracing
            .trace_entity_operation(Contact::ENTITY, "update", async {
                validate_optional_text("name", &request.name, MAX_NAME_LENGTH)?;
                validate_optional_text("message", &request.message, MAX_MESSAGE_LENGTH)?;
                if let Some(number) = request.mobile_number.as_deref().filter(|n| !n.trim().is_empty()) {
                    validate_mobile_number(number)?;
                }

                let mut contact = self.get_contact(id).await?;
                if let Some(name) = non_blank(request.name) {
                    contact.name = name;
                }
                if let Some(number) = non_blank(request.mobile_number) {
                    contact.mobile_number = number;
                }
                if let Some(message) = non_blank(request.message) {
                    contact.message = message;
                }
                if let Some(program) = non_blank(request.program) {
                    contact.program = Some(program);
                }

                self.store.update(contact).await.map_err(|e| match e {
                    RepositoryError::NotFound => ServiceError::not_found(Contact::ENTITY, id),
                    other => other.into(),
                })
            })
            .await
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_contact(&self, id: &str) -> ServiceResult<()> {
        self.tracing
            .trace_entity_operation(Contact::ENTITY, "delete", async {
                if !self.store.delete(id).await? {
                    return Err(ServiceError::not_found(Contact::ENTITY, id));
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Metrics;
    use crate::repositories::InMemoryRecordStore;

    fn service() -> ContactService {
        ContactService::new(
            Arc::new(InMemoryRecordStore::<Contact>::new()),
            BusinessTracingMiddleware::new(Arc::new(Metrics::new().unwrap())),
        )
    }

    fn request() -> ContactRequest {
        ContactRequest {
            name: Some(" Ana ".into()),
            mobile_number: Some("+1 555-0100".into()),
            message: Some("Do you service hybrids?".into()),
            program: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_mobile_number() {
        let service = service();
        let mut incomplete = request();
        incomplete.mobile_number = None;

        let result = service.create_contact(incomplete).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let service = service();
        let contact = service.create_contact(request()).await.unwrap();
        assert_eq!(contact.name, "Ana");
        assert_eq!(contact.program, None);

        let updated = service
            .update_contact(
                &contact.id,
                ContactRequest {
                    program: Some("Fleet".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.program.as_deref(), Some("Fleet"));
        assert_eq!(updated.message, "Do you service hybrids?");

        service.delete_contact(&contact.id).await.unwrap();
        assert!(matches!(
            service.delete_contact(&contact.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }
}
