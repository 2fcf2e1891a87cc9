use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    validate_email, validate_optional_text, BlobRef, Payment, PaymentFields, Record,
    RepositoryError, ServiceError, ServiceResult, Upload, MAX_NAME_LENGTH,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{RecordFilter, RecordStore};
use crate::services::UploadStager;
use crate::storage::{BlobJanitor, BlobStore};

/// Payments submitted for garage services, each with a QR code screenshot
pub struct PaymentService {
    store: Arc<dyn RecordStore<Payment>>,
    blobs: Arc<dyn BlobStore>,
    janitor: BlobJanitor,
    tracing: BusinessTracingMiddleware,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn RecordStore<Payment>>,
        blobs: Arc<dyn BlobStore>,
        janitor: BlobJanitor,
        tracing: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            store,
            blobs,
            janitor,
            tracing,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self) -> ServiceResult<Vec<Payment>> {
        Ok(self.store.find_all(RecordFilter::all()).await?)
    }

    /// Payments made with one email address; none at all is reported as not found
    #[instrument(skip(self), fields(email = %email))]
    pub async fn list_payments_by_email(&self, email: &str) -> ServiceResult<Vec<Payment>> {
        let payments = self
            .store
            .find_all(RecordFilter::field("email", email.trim()))
            .await?;

        if payments.is_empty() {
            return Err(ServiceError::NoResults {
                message: "No payments found for this email".to_string(),
            });
        }
        Ok(payments)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_payment(&self, id: &str) -> ServiceResult<Payment> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Payment::ENTITY, id))
    }

    /// Record a new pending payment. The QR image is stored first and
    /// removed again when the text fields turn out to be incomplete.
    #[instrument(skip(self, fields, qr_code_image))]
    pub async fn create_payment(
        &self,
        fields: PaymentFields,
        qr_code_image: Option<Upload>,
    ) -> ServiceResult<Payment> {
        self.tracing
            .trace_entity_operation(Payment::ENTITY, "create", async {
                let qr_code_image = qr_code_image.ok_or_else(|| {
                    ServiceError::validation("All fields including QR code image are required")
                })?;
                check_fields(&fields)?;

                let mut stager = UploadStager::new(self.blobs.clone(), self.tracing.metrics().clone());
                let stored = match stager.store(&qr_code_image).await {
                    Ok(blob) => blob,
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        return Err(e);
                    }
                };

                let payment = match Payment::from_fields(fields, stored) {
                    Ok(payment) => payment,
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        return Err(e.into());
                    }
                };

                match self.store.create(payment).await {
                    Ok(payment) => {
                        crate::info_with_trace!(payment_id = %payment.id, "Payment created");
                        Ok(payment)
                    }
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        Err(e.into())
                    }
                }
            })
            .await
    }

    /// Merge supplied fields, including status; a new QR image replaces the old one
    #[instrument(skip(self, fields, qr_code_image), fields(id = %id))]
    pub async fn update_payment(
        &self,
        id: &str,
        fields: PaymentFields,
        qr_code_image: Option<Upload>,
    ) -> ServiceResult<Payment> {
        self.tracing
            .trace_entity_operation(Payment::ENTITY, "update", async {
                check_fields(&fields)?;
                let mut payment = self.get_payment(id).await?;

                let mut stager = UploadStager::new(self.blobs.clone(), self.tracing.metrics().clone());
                let mut replaced: Option<BlobRef> = None;
                if let Some(upload) = &qr_code_image {
                    match stager.store(upload).await {
                        Ok(blob) => {
                            replaced = Some(std::mem::replace(&mut payment.qr_code_image, blob))
                        }
                        Err(e) => {
                            stager.rollback(&self.janitor);
                            return Err(e);
                        }
                    }
                }

                payment.apply(fields);

                let payment = match self.store.update(payment).await {
                    Ok(payment) => payment,
                    Err(e) => {
                        stager.rollback(&self.janitor);
                        return Err(match e {
                            RepositoryError::NotFound => {
                                ServiceError::not_found(Payment::ENTITY, id)
                            }
                            other => other.into(),
                        });
                    }
                };

                if let Some(old) = replaced {
                    self.janitor.schedule(vec![old], "qr code replaced");
                }
                crate::info_with_trace!(payment_id = %payment.id, status = %payment.status, "Payment updated");
                Ok(payment)
            })
            .await
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_payment(&self, id: &str) -> ServiceResult<()> {
        self.tracing
            .trace_entity_operation(Payment::ENTITY, "delete", async {
                let payment = self.get_payment(id).await?;
                if !self.store.delete(id).await? {
                    return Err(ServiceError::not_found(Payment::ENTITY, id));
                }
                self.janitor
                    .schedule(vec![payment.qr_code_image], "payment delete");
                crate::info_with_trace!(payment_id = %id, "Payment deleted");
                Ok(())
            })
            .await
    }

    pub fn url_for(&self, blob: &BlobRef) -> String {
        self.blobs.url_for(blob)
    }
}

/// Length and format checks on whatever text fields were supplied
fn check_fields(fields: &PaymentFields) -> ServiceResult<()> {
    for (field, value) in [
        ("name", &fields.name),
        ("carModel", &fields.car_model),
        ("garage", &fields.garage),
        ("garageId", &fields.garage_id),
        ("service", &fields.service),
        ("transactionId", &fields.transaction_id),
        ("status", &fields.status),
    ] {
        validate_optional_text(field, value, MAX_NAME_LENGTH)?;
    }
    if let Some(email) = fields.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    Ok(())
}
