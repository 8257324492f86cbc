//! S3 storage backend.
//!
//! Works against AWS proper or any S3-compatible service via a custom
//! endpoint (path-style addressing is enabled automatically in that case).
//! Listing handles result pagination transparently so callers always see
//! the complete key set.

use crate::config::S3Settings;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::StorageBackend;

/// Remote object storage backed by an S3 bucket
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    /// Build a client from settings.
    ///
    /// Explicit credentials take precedence over the SDK's default provider
    /// chain; an empty bucket is rejected here, before any transfer starts.
    pub async fn connect(settings: &S3Settings) -> Result<Self> {
        if settings.bucket.is_empty() {
            return Err(Error::configuration("S3 bucket must not be empty"));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()));

        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) =
            (&settings.access_key, &settings.secret_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "chronovault-env",
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if settings.endpoint.is_some() {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<()> {
        debug!("Uploading {} as {}", local_path.display(), remote_key);

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| Error::storage("upload", remote_key, e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(remote_key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::storage("upload", remote_key, e))?;

        Ok(())
    }

    async fn download(&self, remote_key: &str, local_path: &Path) -> Result<()> {
        debug!("Downloading {} to {}", remote_key, local_path.display());

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(remote_key)
            .send()
            .await
            .map_err(|e| Error::storage("download", remote_key, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::storage("download", remote_key, e))?
            .into_bytes();

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local_path, data)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| Error::storage("list", prefix, e))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        debug!("Listed {} keys under prefix '{}'", keys.len(), prefix);
        Ok(keys)
    }
}
