//! S3 오브젝트 스토어.
//!
//! AWS Signature Version 4로 서명한 HEAD/GET/PUT 요청을 사용합니다.
//! 엔드포인트를 지정하면 path-style(`<endpoint>/<bucket>/<key>`)로,
//! 지정하지 않으면 virtual-hosted style(`<bucket>.s3.<region>.amazonaws.com`)로 요청합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use super::ObjectStore;
use crate::{DataError, Result};

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// S3 접속 설정.
#[derive(Debug)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: SecretString,
    /// S3 호환 엔드포인트 (예: MinIO). 없으면 AWS 기본 엔드포인트.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

/// S3 오브젝트 스토어.
pub struct S3ObjectStore {
    client: Client,
    config: S3Config,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self { client, config })
    }

    /// 요청 호스트와 경로 (서명용 canonical URI 포함).
    fn host_and_path(&self, key: &str) -> Result<(String, String, String)> {
        let encoded_key = uri_encode_path(key.trim_start_matches('/'));
        match &self.config.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                let (scheme, host) = endpoint
                    .split_once("://")
                    .ok_or_else(|| DataError::ConfigError(format!("잘못된 엔드포인트: {}", endpoint)))?;
                let path = format!("/{}/{}", uri_encode_path(&self.config.bucket), encoded_key);
                Ok((format!("{}://{}", scheme, host), host.to_string(), path))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region);
                let path = format!("/{}", encoded_key);
                Ok((format!("https://{}", host), host, path))
            }
        }
    }

    async fn send(&self, method: Method, key: &str, body: Vec<u8>, content_type: Option<&str>) -> Result<reqwest::Response> {
        let (base, host, path) = self.host_and_path(key)?;
        let now = Utc::now();
        let payload_hash = hex::encode(Sha256::digest(&body));
        let signed = sign_request(
            &SigningInput {
                method: method.as_str(),
                host: &host,
                canonical_uri: &path,
                payload_hash: &payload_hash,
                region: &self.config.region,
                access_key: &self.config.access_key,
                secret_key: self.config.secret_key.expose_secret(),
            },
            now,
        )?;

        debug!(method = %method, key = key, "S3 요청");

        let mut request = self
            .client
            .request(method, format!("{}{}", base, path))
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .header("authorization", signed.authorization);
        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        Ok(request.send().await?)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        "s3"
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let response = self.send(Method::HEAD, key, Vec::new(), None).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(DataError::from_status(
                status,
                format!("HEAD s3://{}/{} 실패", self.config.bucket, key),
            )),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self.send(Method::GET, key, Vec::new(), None).await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(DataError::from_status(
                    status,
                    format!("GET s3://{}/{} 실패: {}", self.config.bucket, key, detail),
                ))
            }
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self.send(Method::PUT, key, body, Some(content_type)).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(DataError::from_status(
            status,
            format!("PUT s3://{}/{} 실패: {}", self.config.bucket, key, detail),
        ))
    }
}

// =============================================================================
// SigV4 서명
// =============================================================================

struct SigningInput<'a> {
    method: &'a str,
    host: &'a str,
    canonical_uri: &'a str,
    payload_hash: &'a str,
    region: &'a str,
    access_key: &'a str,
    secret_key: &'a str,
}

struct SignedHeaders {
    amz_date: String,
    authorization: String,
}

fn sign_request(input: &SigningInput<'_>, now: DateTime<Utc>) -> Result<SignedHeaders> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let signed_headers = "host;x-amz-content-sha256;x-amz-date";

    let canonical_request = format!(
        "{}\n{}\n\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\n{}\n{}",
        input.method,
        input.canonical_uri,
        input.host,
        input.payload_hash,
        amz_date,
        signed_headers,
        input.payload_hash
    );

    let scope = format!("{}/{}/{}/aws4_request", date_stamp, input.region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(input.secret_key, &date_stamp, input.region, SERVICE)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        amz_date,
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, input.access_key, scope, signed_headers, signature
        ),
    })
}

fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| DataError::ConfigError(format!("HMAC 키 오류: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// 경로 세그먼트별 URI 인코딩 ('/'는 유지).
fn uri_encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
