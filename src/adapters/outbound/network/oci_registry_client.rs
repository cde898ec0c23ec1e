use crate::ports::outbound::{RegistryClient, RegistryError};
use crate::shared::Result;
use crate::vex_discovery::domain::{
    Digest, ImageReference, Platform, PlatformManifest, ReferenceError, ReferenceTarget,
    SignedEntity,
};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{ACCEPT, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
const DOCKER_MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDto {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    manifests: Option<Vec<DescriptorDto>>,
    #[serde(default)]
    layers: Vec<DescriptorDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorDto {
    #[serde(default)]
    media_type: String,
    digest: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    platform: Option<PlatformDto>,
}

#[derive(Debug, Deserialize)]
struct PlatformDto {
    os: String,
    architecture: String,
    #[serde(default)]
    variant: Option<String>,
}

impl From<PlatformDto> for Platform {
    fn from(dto: PlatformDto) -> Self {
        Platform {
            os: dto.os,
            architecture: dto.architecture,
            variant: dto.variant,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Manifest body plus the headers needed to identify it
struct FetchedManifest {
    body: Vec<u8>,
    content_type: Option<String>,
    digest: Option<String>,
}

/// `WWW-Authenticate: Bearer ...` challenge returned with a 401
#[derive(Debug, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let params = parse_auth_params(params);
        Some(Self {
            realm: params.get("realm")?.clone(),
            service: params.get("service").cloned(),
            scope: params.get("scope").cloned(),
        })
    }

    /// Token endpoint URL; `default_scope` is used when the challenge has none.
    fn token_url(&self, default_scope: &str) -> String {
        let mut query = Vec::new();
        if let Some(service) = &self.service {
            query.push(format!("service={}", urlencoding::encode(service)));
        }
        let scope = self.scope.as_deref().unwrap_or(default_scope);
        query.push(format!("scope={}", urlencoding::encode(scope)));

        let separator = if self.realm.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.realm, separator, query.join("&"))
    }
}

/// Parses `key="value", key=value` auth parameters. Quoted values may
/// contain commas.
fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();

    while let Some((key, after)) = rest.split_once('=') {
        let key = key.trim().to_ascii_lowercase();
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };
        params.insert(key, value.trim().to_string());
        rest = remaining.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    params
}

fn transport(error: reqwest::Error) -> RegistryError {
    RegistryError::Transport {
        source: Box::new(error),
    }
}

fn invalid_manifest(reason: impl ToString) -> RegistryError {
    RegistryError::InvalidManifest {
        reason: reason.to_string(),
    }
}

/// `algorithm:hex` digest of `content`, or None for unsupported algorithms.
fn compute_digest(algorithm: &str, content: &[u8]) -> Option<String> {
    let hex = match algorithm {
        "sha256" => hex::encode(Sha256::digest(content)),
        "sha384" => hex::encode(Sha384::digest(content)),
        "sha512" => hex::encode(Sha512::digest(content)),
        _ => return None,
    };
    Some(format!("{}:{}", algorithm, hex))
}

fn verify_digest(expected: &Digest, content: &[u8]) -> std::result::Result<(), RegistryError> {
    let actual = compute_digest(expected.algorithm(), content).unwrap_or_default();
    if actual != expected.to_string() {
        return Err(RegistryError::DigestMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Digest identifying a manifest fetched by tag: the advertised
/// `Docker-Content-Digest` when present and correct, the sha256 of the body
/// otherwise.
fn manifest_digest(
    advertised: Option<&str>,
    body: &[u8],
) -> std::result::Result<Digest, RegistryError> {
    if let Some(digest) = advertised.and_then(|value| value.parse::<Digest>().ok()) {
        verify_digest(&digest, body)?;
        return Ok(digest);
    }

    compute_digest("sha256", body)
        .unwrap_or_default()
        .parse()
        .map_err(|e: ReferenceError| invalid_manifest(e))
}

fn is_index(media_type: &str) -> bool {
    media_type == OCI_INDEX || media_type == DOCKER_MANIFEST_LIST
}

/// Builds the resolved entity from a manifest or index body.
fn entity_from_manifest(
    reference: &ImageReference,
    digest: Digest,
    manifest: &FetchedManifest,
) -> std::result::Result<SignedEntity, RegistryError> {
    let dto: ManifestDto = serde_json::from_slice(&manifest.body).map_err(invalid_manifest)?;

    let media_type = dto
        .media_type
        .or_else(|| manifest.content_type.clone())
        .unwrap_or_else(|| OCI_MANIFEST.to_string());

    match dto.manifests {
        Some(children) => {
            let manifests = children
                .into_iter()
                .map(|child| -> std::result::Result<PlatformManifest, RegistryError> {
                    Ok(PlatformManifest {
                        digest: child.digest.parse().map_err(invalid_manifest)?,
                        media_type: child.media_type,
                        platform: child.platform.map(Platform::from),
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(SignedEntity::index(reference, digest, &media_type, manifests))
        }
        None if is_index(&media_type) => Err(invalid_manifest(format!(
            "{} document has no manifests",
            media_type
        ))),
        None => Ok(SignedEntity::image(reference, digest, &media_type)),
    }
}

/// OciRegistryClient adapter speaking the OCI distribution API
///
/// Implements the RegistryClient port with an async reqwest client. Pulls are
/// anonymous; when a registry answers 401 with a Bearer challenge, a token is
/// requested from the advertised realm and cached per repository. A cached
/// token that draws a 401 is dropped, and the cache is cleared once it holds
/// `MAX_CACHED_TOKENS` repositories.
///
/// Attestations follow the cosign convention: the attestation manifest of
/// `alg:hex` is tagged `alg-hex.att` in the same repository.
///
/// # Security
/// - Manifests and blobs are read with size limits
/// - Every manifest and blob is verified against its digest
pub struct OciRegistryClient {
    client: reqwest::Client,
    tokens: DashMap<String, String>,
}

impl OciRegistryClient {
    const TIMEOUT_SECONDS: u64 = 30;
    const MAX_MANIFEST_SIZE: usize = 4 * 1024 * 1024;
    const MAX_BLOB_SIZE: usize = 32 * 1024 * 1024;
    const MAX_TOKEN_SIZE: usize = 64 * 1024;
    const MAX_CACHED_TOKENS: usize = 256;

    /// Creates a new registry client with default configuration
    pub fn new() -> Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("vex-discovery/{}", version);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::TIMEOUT_SECONDS))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            tokens: DashMap::new(),
        })
    }

    /// `scheme://registry/v2/repository`
    fn repository_endpoint(reference: &ImageReference) -> String {
        let scheme = if reference.is_insecure() {
            "http"
        } else {
            "https"
        };
        format!(
            "{}://{}/v2/{}",
            scheme,
            reference.registry(),
            reference.repository()
        )
    }

    async fn send(
        &self,
        url: &str,
        accept: Option<&str>,
        token: Option<String>,
    ) -> std::result::Result<Response, RegistryError> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(transport)
    }

    /// GET with one anonymous-token retry on a Bearer challenge
    async fn get(
        &self,
        reference: &ImageReference,
        label: &str,
        url: &str,
        accept: Option<&str>,
    ) -> std::result::Result<Response, RegistryError> {
        let context = reference.context();
        let cached = self.tokens.get(&context).map(|entry| entry.value().clone());
        let had_token = cached.is_some();
        let mut response = self.send(url, accept, cached).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if had_token {
                debug!(repository = %context, "cached token rejected");
                self.tokens.remove(&context);
            }

            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok())
                .and_then(BearerChallenge::parse);

            if let Some(challenge) = challenge {
                let token = self.fetch_token(&challenge, reference).await?;
                self.cache_token(context, token.clone());
                response = self.send(url, accept, Some(token)).await?;
            }
        }

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound {
                reference: label.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RegistryError::Unauthorized {
                reference: label.to_string(),
            }),
            status => Err(RegistryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    fn cache_token(&self, context: String, token: String) {
        if self.tokens.len() >= Self::MAX_CACHED_TOKENS && !self.tokens.contains_key(&context) {
            self.tokens.clear();
        }
        self.tokens.insert(context, token);
    }

    async fn fetch_token(
        &self,
        challenge: &BearerChallenge,
        reference: &ImageReference,
    ) -> std::result::Result<String, RegistryError> {
        let default_scope = format!("repository:{}:pull", reference.repository());
        let url = challenge.token_url(&default_scope);
        debug!(realm = %challenge.realm, repository = reference.repository(), "requesting anonymous token");

        let response = self.client.get(&url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(RegistryError::Unauthorized {
                reference: reference.to_string(),
            });
        }

        let body = read_limited(response, Self::MAX_TOKEN_SIZE, &challenge.realm).await?;
        let token: TokenResponse =
            serde_json::from_slice(&body).map_err(|e| RegistryError::Transport {
                source: Box::new(e),
            })?;

        token
            .token
            .or(token.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RegistryError::Unauthorized {
                reference: reference.to_string(),
            })
    }

    async fn fetch_manifest(
        &self,
        reference: &ImageReference,
        target: &str,
    ) -> std::result::Result<FetchedManifest, RegistryError> {
        let url = format!("{}/manifests/{}", Self::repository_endpoint(reference), target);
        let label = format!("{}:{}", reference.context(), target);
        let accept = [OCI_INDEX, OCI_MANIFEST, DOCKER_MANIFEST_LIST, DOCKER_MANIFEST].join(", ");

        let response = self.get(reference, &label, &url, Some(&accept)).await?;
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        };
        let content_type = header(CONTENT_TYPE.as_str());
        let digest = header(DOCKER_CONTENT_DIGEST);

        let body = read_limited(response, Self::MAX_MANIFEST_SIZE, &label).await?;
        Ok(FetchedManifest {
            body,
            content_type,
            digest,
        })
    }
}

/// Reads a response body, failing once it grows past `limit` bytes
async fn read_limited(
    mut response: Response,
    limit: usize,
    label: &str,
) -> std::result::Result<Vec<u8>, RegistryError> {
    let too_large = || RegistryError::TooLarge {
        reference: label.to_string(),
        limit,
    };

    if response.content_length().is_some_and(|length| length > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(transport)? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[async_trait]
impl RegistryClient for OciRegistryClient {
    async fn resolve(
        &self,
        reference: &ImageReference,
    ) -> std::result::Result<SignedEntity, RegistryError> {
        let target = match reference.target() {
            ReferenceTarget::Tag(tag) => tag.clone(),
            ReferenceTarget::Digest(digest) => digest.to_string(),
        };
        let manifest = self.fetch_manifest(reference, &target).await?;

        let digest = match reference.digest() {
            Some(addressed) => {
                verify_digest(addressed, &manifest.body)?;
                addressed.clone()
            }
            None => manifest_digest(manifest.digest.as_deref(), &manifest.body)?,
        };

        debug!(reference = %reference, digest = %digest, "fetched manifest");
        entity_from_manifest(reference, digest, &manifest)
    }

    async fn fetch_attestations(
        &self,
        entity: &SignedEntity,
    ) -> std::result::Result<Vec<Vec<u8>>, RegistryError> {
        let reference = &entity.reference;
        let tag = format!("{}-{}.att", entity.digest.algorithm(), entity.digest.hex());

        let manifest = match self.fetch_manifest(reference, &tag).await {
            Ok(manifest) => manifest,
            Err(RegistryError::NotFound { .. }) => {
                debug!(reference = %reference, tag, "no attestations attached");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let dto: ManifestDto = serde_json::from_slice(&manifest.body).map_err(invalid_manifest)?;
        let endpoint = Self::repository_endpoint(reference);
        let mut payloads = Vec::with_capacity(dto.layers.len());

        for layer in &dto.layers {
            let digest: Digest = layer
                .digest
                .parse()
                .map_err(|e: ReferenceError| invalid_manifest(e))?;
            let label = format!("{}@{}", reference.context(), digest);

            if layer
                .size
                .is_some_and(|size| size > Self::MAX_BLOB_SIZE as u64)
            {
                return Err(RegistryError::TooLarge {
                    reference: label,
                    limit: Self::MAX_BLOB_SIZE,
                });
            }

            let url = format!("{}/blobs/{}", endpoint, digest);
            let response = self.get(reference, &label, &url, None).await?;
            let blob = read_limited(response, Self::MAX_BLOB_SIZE, &label).await?;
            verify_digest(&digest, &blob)?;

            debug!(layer = %digest, media_type = %layer.media_type, bytes = blob.len(), "fetched attestation layer");
            payloads.push(blob);
        }

        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const EMPTY_SHA256: &str =
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn fetched(body: &str, content_type: Option<&str>) -> FetchedManifest {
        FetchedManifest {
            body: body.as_bytes().to_vec(),
            content_type: content_type.map(str::to_string),
            digest: None,
        }
    }

    #[test]
    fn test_parse_bearer_challenge() {
        let challenge = BearerChallenge::parse(
            r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/alpine:pull""#,
        )
        .unwrap();

        assert_eq!(challenge.realm, "https://auth.docker.io/token");
        assert_eq!(challenge.service.as_deref(), Some("registry.docker.io"));
        assert_eq!(
            challenge.scope.as_deref(),
            Some("repository:library/alpine:pull")
        );
    }

    #[test]
    fn test_parse_challenge_with_comma_in_scope() {
        let challenge = BearerChallenge::parse(
            r#"Bearer realm="https://cgr.dev/token", scope="repository:a:pull,push""#,
        )
        .unwrap();
        assert_eq!(challenge.scope.as_deref(), Some("repository:a:pull,push"));
        assert_eq!(challenge.service, None);
    }

    #[test]
    fn test_parse_rejects_basic_challenge() {
        assert!(BearerChallenge::parse(r#"Basic realm="registry""#).is_none());
        assert!(BearerChallenge::parse("Bearer service=\"x\"").is_none());
    }

    #[test]
    fn test_token_url_encodes_query() {
        let challenge = BearerChallenge {
            realm: "https://auth.docker.io/token".to_string(),
            service: Some("registry.docker.io".to_string()),
            scope: None,
        };

        assert_eq!(
            challenge.token_url("repository:library/alpine:pull"),
            "https://auth.docker.io/token?service=registry.docker.io&scope=repository%3Alibrary%2Falpine%3Apull"
        );
    }

    #[test]
    fn test_compute_digest() {
        assert_eq!(compute_digest("sha256", b"").unwrap(), EMPTY_SHA256);
        assert!(compute_digest("sha384", b"")
            .unwrap()
            .starts_with("sha384:38b060a751ac9638"));
        assert!(compute_digest("md5", b"").is_none());
    }

    #[test]
    fn test_verify_digest_mismatch() {
        let expected: Digest = EMPTY_SHA256.parse().unwrap();
        assert!(verify_digest(&expected, b"").is_ok());
        assert!(matches!(
            verify_digest(&expected, b"tampered"),
            Err(RegistryError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_manifest_digest_prefers_verified_header() {
        let digest = manifest_digest(Some(EMPTY_SHA256), b"").unwrap();
        assert_eq!(digest.to_string(), EMPTY_SHA256);

        let fallback = manifest_digest(None, b"").unwrap();
        assert_eq!(fallback.to_string(), EMPTY_SHA256);

        assert!(manifest_digest(Some(EMPTY_SHA256), b"{}").is_err());
    }

    #[test]
    fn test_repository_endpoint() {
        let hub: ImageReference = "alpine".parse().unwrap();
        assert_eq!(
            OciRegistryClient::repository_endpoint(&hub),
            "https://index.docker.io/v2/library/alpine"
        );

        let local: ImageReference = "localhost:5000/wolfi-base:latest".parse().unwrap();
        assert_eq!(
            OciRegistryClient::repository_endpoint(&local),
            "http://localhost:5000/v2/wolfi-base"
        );
    }

    #[test]
    fn test_entity_from_index() {
        let reference: ImageReference = "alpine:3.18".parse().unwrap();
        let body = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "manifests": [
                {
                    "mediaType": "application/vnd.oci.image.manifest.v1+json",
                    "digest": "sha256:48d9183eb12a05c99bcc0bf44a003607b8e941e1d4f41f9ad12bdcc4b5672f86",
                    "size": 528,
                    "platform": { "architecture": "amd64", "os": "linux" }
                },
                {
                    "mediaType": "application/vnd.oci.image.manifest.v1+json",
                    "digest": "sha256:1111111111111111111111111111111111111111111111111111111111111111",
                    "size": 528,
                    "platform": { "architecture": "arm", "os": "linux", "variant": "v7" }
                }
            ]
        }"#;

        let entity =
            entity_from_manifest(&reference, EMPTY_SHA256.parse().unwrap(), &fetched(body, None))
                .unwrap();

        let child = entity.manifest_for(&Platform::default()).unwrap();
        assert_eq!(
            child.digest.hex(),
            "48d9183eb12a05c99bcc0bf44a003607b8e941e1d4f41f9ad12bdcc4b5672f86"
        );
        assert_eq!(entity.reference.digest().unwrap().to_string(), EMPTY_SHA256);

        let arm: Platform = "linux/arm/v7".parse().unwrap();
        assert!(entity.manifest_for(&arm).is_some());
    }

    #[test]
    fn test_entity_from_image_uses_content_type() {
        let reference: ImageReference = "cgr.dev/chainguard/static:latest".parse().unwrap();
        let body = r#"{"schemaVersion": 2, "layers": []}"#;

        let entity = entity_from_manifest(
            &reference,
            EMPTY_SHA256.parse().unwrap(),
            &fetched(body, Some(DOCKER_MANIFEST)),
        )
        .unwrap();

        assert_eq!(entity.media_type, DOCKER_MANIFEST);
        assert!(entity.manifest_for(&Platform::default()).is_none());
    }

    #[test]
    fn test_entity_from_index_without_children_is_invalid() {
        let reference: ImageReference = "alpine".parse().unwrap();
        let body = r#"{"mediaType": "application/vnd.oci.image.index.v1+json"}"#;

        let result =
            entity_from_manifest(&reference, EMPTY_SHA256.parse().unwrap(), &fetched(body, None));
        assert!(matches!(result, Err(RegistryError::InvalidManifest { .. })));
    }

    #[test]
    fn test_client_builds() {
        assert!(OciRegistryClient::new().is_ok());
    }

    /// Request line and authorization header seen by the test registry
    #[derive(Debug, Clone)]
    struct SeenRequest {
        base: String,
        path: String,
        authorization: Option<String>,
    }

    struct Reply {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Reply {
        fn ok(body: impl Into<Vec<u8>>) -> Self {
            Self {
                status: 200,
                headers: Vec::new(),
                body: body.into(),
            }
        }

        fn status(status: u16) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: Vec::new(),
            }
        }

        fn header(mut self, name: &str, value: &str) -> Self {
            self.headers.push((name.to_string(), value.to_string()));
            self
        }

        fn to_bytes(&self) -> Vec<u8> {
            let mut head = format!(
                "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n",
                self.status,
                self.body.len()
            );
            for (name, value) in &self.headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            head.push_str("\r\n");

            let mut bytes = head.into_bytes();
            bytes.extend_from_slice(&self.body);
            bytes
        }
    }

    /// Plain-HTTP registry on 127.0.0.1 answering from a handler
    struct TestRegistry {
        host: String,
        requests: Arc<Mutex<Vec<SeenRequest>>>,
    }

    impl TestRegistry {
        async fn start<F>(handler: F) -> Self
        where
            F: Fn(&SeenRequest) -> Reply + Send + Sync + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let host = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let handler = Arc::new(handler);
            let seen = requests.clone();
            let base = format!("http://{}", host);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let handler = handler.clone();
                    let seen = seen.clone();
                    let base = base.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket, base).await else {
                            return;
                        };
                        seen.lock().unwrap().push(request.clone());
                        let reply = (*handler)(&request);
                        let _ = socket.write_all(&reply.to_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
            });

            Self { host, requests }
        }

        fn reference(&self, name: &str) -> ImageReference {
            format!("{}/{}", self.host, name).parse().unwrap()
        }

        fn requests(&self) -> Vec<SeenRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(socket: &mut TcpStream, base: String) -> Option<SeenRequest> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buffer.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = socket.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }

        let head = String::from_utf8_lossy(&buffer).to_string();
        let mut lines = head.lines();
        let path = lines.next()?.split_whitespace().nth(1)?.to_string();
        let authorization = lines.find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("authorization")
                .then(|| value.trim().to_string())
        });

        Some(SeenRequest {
            base,
            path,
            authorization,
        })
    }

    const IMAGE_MANIFEST: &str = r#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.manifest.v1+json","layers":[]}"#;
    const IMAGE_DIGEST: &str =
        "sha256:48d9183eb12a05c99bcc0bf44a003607b8e941e1d4f41f9ad12bdcc4b5672f86";

    fn attestation_manifest(layers: &[&[u8]]) -> String {
        let descriptors: Vec<String> = layers
            .iter()
            .map(|layer| {
                format!(
                    r#"{{"mediaType":"application/vnd.dsse.envelope.v1+json","digest":"{}","size":{}}}"#,
                    compute_digest("sha256", layer).unwrap(),
                    layer.len()
                )
            })
            .collect();
        format!(
            r#"{{"schemaVersion":2,"mediaType":"{}","layers":[{}]}}"#,
            OCI_MANIFEST,
            descriptors.join(",")
        )
    }

    fn attestation_tag_path() -> String {
        format!(
            "/v2/wolfi-base/manifests/{}.att",
            IMAGE_DIGEST.replace(':', "-")
        )
    }

    fn image_entity(registry: &TestRegistry) -> SignedEntity {
        SignedEntity::image(
            &registry.reference("wolfi-base:latest"),
            IMAGE_DIGEST.parse().unwrap(),
            OCI_MANIFEST,
        )
    }

    /// Manifest behind a Bearer challenge whose token endpoint hands out `token`
    fn token_protected_manifest(request: &SeenRequest, token: &str) -> Reply {
        if request.path.starts_with("/token") {
            return Reply::ok(format!(r#"{{"token":"{}"}}"#, token));
        }

        let expected = format!("Bearer {}", token);
        if request.authorization.as_deref() != Some(expected.as_str()) {
            let challenge = format!(
                r#"Bearer realm="{}/token",service="test-registry""#,
                request.base
            );
            return Reply::status(401).header("WWW-Authenticate", &challenge);
        }

        let digest = compute_digest("sha256", IMAGE_MANIFEST.as_bytes()).unwrap();
        Reply::ok(IMAGE_MANIFEST)
            .header("Content-Type", OCI_MANIFEST)
            .header("Docker-Content-Digest", &digest)
    }

    #[tokio::test]
    async fn test_resolve_retries_with_anonymous_token() {
        let registry =
            TestRegistry::start(|request| token_protected_manifest(request, "anonymous")).await;
        let client = OciRegistryClient::new().unwrap();

        let entity = client
            .resolve(&registry.reference("wolfi-base:latest"))
            .await
            .unwrap();

        assert_eq!(
            entity.digest.to_string(),
            compute_digest("sha256", IMAGE_MANIFEST.as_bytes()).unwrap()
        );
        assert_eq!(entity.media_type, OCI_MANIFEST);

        let requests = registry.requests();
        let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/v2/wolfi-base/manifests/latest",
                "/token?service=test-registry&scope=repository%3Awolfi-base%3Apull",
                "/v2/wolfi-base/manifests/latest",
            ]
        );
        assert_eq!(requests[0].authorization, None);
        assert_eq!(requests[2].authorization.as_deref(), Some("Bearer anonymous"));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let registry =
            TestRegistry::start(|request| token_protected_manifest(request, "anonymous")).await;
        let client = OciRegistryClient::new().unwrap();
        let reference = registry.reference("wolfi-base:latest");

        client.resolve(&reference).await.unwrap();
        client.resolve(&reference).await.unwrap();

        let requests = registry.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[3].authorization.as_deref(), Some("Bearer anonymous"));
    }

    #[tokio::test]
    async fn test_rejected_cached_token_is_replaced() {
        let registry =
            TestRegistry::start(|request| token_protected_manifest(request, "fresh")).await;
        let client = OciRegistryClient::new().unwrap();
        let reference = registry.reference("wolfi-base:latest");
        client
            .tokens
            .insert(reference.context(), "expired".to_string());

        client.resolve(&reference).await.unwrap();

        assert_eq!(
            client.tokens.get(&reference.context()).map(|t| t.value().clone()),
            Some("fresh".to_string())
        );
        let requests = registry.requests();
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer expired"));
    }

    #[test]
    fn test_token_cache_is_bounded() {
        let client = OciRegistryClient::new().unwrap();
        for i in 0..=OciRegistryClient::MAX_CACHED_TOKENS {
            client.cache_token(format!("cgr.dev/image-{}", i), "token".to_string());
        }

        assert!(client.tokens.len() <= OciRegistryClient::MAX_CACHED_TOKENS);
        assert!(client.tokens.contains_key(&format!(
            "cgr.dev/image-{}",
            OciRegistryClient::MAX_CACHED_TOKENS
        )));
    }

    #[tokio::test]
    async fn test_missing_attestation_tag_is_empty() {
        let registry = TestRegistry::start(|_| Reply::status(404)).await;
        let client = OciRegistryClient::new().unwrap();

        let payloads = client
            .fetch_attestations(&image_entity(&registry))
            .await
            .unwrap();

        assert!(payloads.is_empty());
        let requests = registry.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, attestation_tag_path());
    }

    #[tokio::test]
    async fn test_fetch_attestation_layers() {
        let layer: &'static [u8] = br#"{"payloadType":"application/vnd.in-toto+json","payload":""}"#;
        let manifest = attestation_manifest(&[layer]);
        let blob_path = format!(
            "/v2/wolfi-base/blobs/{}",
            compute_digest("sha256", layer).unwrap()
        );
        let tag_path = attestation_tag_path();

        let registry = TestRegistry::start(move |request| {
            if request.path == tag_path {
                Reply::ok(manifest.clone()).header("Content-Type", OCI_MANIFEST)
            } else if request.path == blob_path {
                Reply::ok(layer)
            } else {
                Reply::status(404)
            }
        })
        .await;
        let client = OciRegistryClient::new().unwrap();

        let payloads = client
            .fetch_attestations(&image_entity(&registry))
            .await
            .unwrap();

        assert_eq!(payloads, vec![layer.to_vec()]);
    }

    #[tokio::test]
    async fn test_tampered_attestation_layer_is_rejected() {
        let layer: &'static [u8] = b"original envelope";
        let manifest = attestation_manifest(&[layer]);
        let tag_path = attestation_tag_path();

        let registry = TestRegistry::start(move |request| {
            if request.path == tag_path {
                Reply::ok(manifest.clone())
            } else if request.path.starts_with("/v2/wolfi-base/blobs/") {
                Reply::ok("tampered envelope")
            } else {
                Reply::status(404)
            }
        })
        .await;
        let client = OciRegistryClient::new().unwrap();

        let result = client.fetch_attestations(&image_entity(&registry)).await;

        assert!(matches!(result, Err(RegistryError::DigestMismatch { .. })));
    }

    #[tokio::test]
    async fn test_oversized_manifest_is_rejected() {
        let registry = TestRegistry::start(|_| {
            Reply::ok(vec![b' '; OciRegistryClient::MAX_MANIFEST_SIZE + 1])
        })
        .await;
        let client = OciRegistryClient::new().unwrap();

        let result = client
            .resolve(&registry.reference("wolfi-base:latest"))
            .await;

        assert!(matches!(
            result,
            Err(RegistryError::TooLarge { limit, .. }) if limit == OciRegistryClient::MAX_MANIFEST_SIZE
        ));
    }

    #[tokio::test]
    async fn test_unchallenged_401_is_unauthorized() {
        let registry = TestRegistry::start(|_| Reply::status(401)).await;
        let client = OciRegistryClient::new().unwrap();

        let result = client
            .resolve(&registry.reference("wolfi-base:latest"))
            .await;

        assert!(matches!(result, Err(RegistryError::Unauthorized { .. })));
        assert_eq!(registry.requests().len(), 1);
    }
}
