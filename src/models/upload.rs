use bytes::Bytes;

/// A file received in a multipart request, not yet written to the blob store
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    /// Form field the file arrived under (`GarageMainImage`, `ServiceImages`, ...)
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Files attached to a garage create/update request
#[derive(Debug, Clone, Default)]
pub struct GarageUploads {
    pub main_image: Option<Upload>,
    pub gallery: Vec<Upload>,
    /// Correlated by position with the parsed service descriptor list
    pub service_images: Vec<Upload>,
}

impl GarageUploads {
    pub fn is_empty(&self) -> bool {
        self.main_image.is_none() && self.gallery.is_empty() && self.service_images.is_empty()
    }
}
