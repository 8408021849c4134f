//! AWS S3 object store

use crate::{encode_copy_source, ObjectStore, StoreResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::types::MetadataDirective;
use aws_sdk_s3::Client as AwsS3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use filerouter_core::config::StoreConfig;
use filerouter_core::{ObjectLocation, StoreError};
use std::collections::HashMap;
use std::time::SystemTime;
use tracing::debug;

/// Object store backed by AWS S3 or an S3-compatible service.
#[derive(Clone)]
pub struct S3Store {
    client: AwsS3Client,
}

impl S3Store {
    /// Builds a client from the store configuration and the ambient AWS
    /// credential chain.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let region_provider = match &config.region {
            Some(region) => RegionProviderChain::first_try(Region::new(region.clone())),
            None => RegionProviderChain::default_provider(),
        };

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        // MinIO and LocalStack need a custom endpoint and path-style addressing
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: AwsS3Client::from_conf(builder.build()),
        })
    }

    /// Wraps an existing SDK client.
    pub fn from_client(client: AwsS3Client) -> Self {
        Self { client }
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("404") || message.contains("NotFound") || message.contains("NoSuchKey")
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head(&self, bucket: &str, key: &str) -> StoreResult<DateTime<Utc>> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if is_not_found(&message) {
                    StoreError::not_found(bucket, key)
                } else {
                    StoreError::Head {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        reason: message,
                    }
                }
            })?;

        response
            .last_modified()
            .and_then(|dt| SystemTime::try_from(*dt).ok())
            .map(DateTime::<Utc>::from)
            .ok_or_else(|| StoreError::Head {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "response carries no last-modified time".to_string(),
            })
    }

    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let get_failed = |reason: String| StoreError::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if is_not_found(&message) {
                    StoreError::not_found(bucket, key)
                } else {
                    get_failed(message)
                }
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| get_failed(e.to_string()))?;

        Ok(body.into_bytes())
    }

    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        metadata: &HashMap<String, String>,
    ) -> StoreResult<()> {
        let mut request = self
            .client
            .copy_object()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .copy_source(encode_copy_source(source))
            .metadata_directive(MetadataDirective::Replace);

        for (k, v) in metadata {
            request = request.metadata(k, v);
        }

        request.send().await.map_err(|e| StoreError::Copy {
            from: source.uri(),
            to: destination.uri(),
            reason: e.to_string(),
        })?;

        debug!(%source, %destination, "Copied object");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Delete {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        debug!(bucket, key, "Deleted object");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found("service error: NoSuchKey"));
        assert!(is_not_found("unhandled error (404)"));
        assert!(!is_not_found("AccessDenied"));
    }

    #[tokio::test]
    async fn test_connect_with_endpoint() {
        let config = StoreConfig {
            region: Some("us-east-1".to_string()),
            endpoint: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            ..Default::default()
        };
        let store = S3Store::connect(&config).await.unwrap();
        assert_eq!(store.name(), "s3");
    }
}
