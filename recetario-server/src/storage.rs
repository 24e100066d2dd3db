use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{ensure, Result};
use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};

/// The object-storage bucket behind recipe photos. One flat namespace;
/// uploads reject name collisions, public URLs are derived from the name.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, name: &str, content: Vec<u8>, content_type: &str) -> Result<()>;
    async fn remove(&self, name: &str) -> Result<()>;
    fn public_url(&self, name: &str) -> String;
}

#[derive(Clone)]
pub struct GcsStore {
    gcs_client: Client,
    bucket: String,
}

impl GcsStore {
    pub async fn connect(bucket: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::default().with_auth().await?;
        let gcs_client = Client::new(config);
        Ok(Self {
            gcs_client,
            bucket: bucket.into(),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload(&self, name: &str, content: Vec<u8>, content_type: &str) -> Result<()> {
        let mut media = Media::new(name.to_string());
        media.content_type = content_type.to_string().into();
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            // Matching generation zero means "only if it does not exist yet"
            if_generation_match: Some(0),
            ..Default::default()
        };
        self.gcs_client
            .upload_object(&request, content, &UploadType::Simple(media))
            .await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.gcs_client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket.clone(),
                object: name.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("https://storage.googleapis.com/{}/{}", self.bucket, name)
    }
}

/// In-memory store used by the test suite in place of the real bucket.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    removed: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn removed_names(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    /// Drop an object out of band, as if the bucket were cleaned manually.
    pub fn remove_sync(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, name: &str, content: Vec<u8>, _content_type: &str) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        ensure!(!objects.contains_key(name), "object {} already exists", name);
        objects.insert(name.to_string(), content);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.removed.lock().unwrap().push(name.to_string());
        let existed = self.objects.lock().unwrap().remove(name).is_some();
        ensure!(existed, "object {} does not exist", name);
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("https://storage.test/recetario/{}", name)
    }
}
