use crate::error::NeoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    AlreadyExists,
}

/// Blob backend. Writes have create-or-overwrite semantics.
pub trait BlobStore {
    fn ensure_container(&self, container: &str) -> Result<ContainerStatus, NeoError>;

    fn put_blob(
        &self,
        container: &str,
        name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), NeoError>;
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn ensure_container(&self, container: &str) -> Result<ContainerStatus, NeoError> {
        (**self).ensure_container(container)
    }

    fn put_blob(
        &self,
        container: &str,
        name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), NeoError> {
        (**self).put_blob(container, name, content, content_type)
    }
}
