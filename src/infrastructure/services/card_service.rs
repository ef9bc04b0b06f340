//! Card service - detection runs, reservations and card keys

use std::sync::Arc;

use bytes::Bytes;
use rand::RngCore;
use tracing::{debug, info, instrument};

use crate::domain::api_key::{ApiKey, ApiKeyRepository, IssuedApiKey};
use crate::domain::card::{Card, CardId, CardRepository};
use crate::domain::detection::{DetectionError, Detector};
use crate::domain::session::SessionId;
use crate::domain::DomainError;
use crate::infrastructure::api_key::ApiKeyService;
use crate::infrastructure::temp_store::TempStore;

/// URL prefix under which rendered results are served
pub const RESULTS_URL_PREFIX: &str = "/temp/results";

const RESERVE_ATTEMPTS: usize = 5;

/// An image received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub bytes: Bytes,
}

/// Card operations used by the HTTP layer
#[async_trait::async_trait]
pub trait CardServiceTrait: Send + Sync {
    async fn detect_and_store(
        &self,
        card_id: &CardId,
        session: &SessionId,
        upload: ImageUpload,
        cache_bust: bool,
    ) -> Result<Card, DomainError>;
    async fn allocate_card_id(&self) -> Result<CardId, DomainError>;
    async fn reserve(&self) -> Result<Card, DomainError>;
    async fn issue_key(&self, card_id: &CardId) -> Result<IssuedApiKey, DomainError>;
    async fn reserve_with_key(&self) -> Result<(Card, IssuedApiKey), DomainError>;
    async fn verify_key(&self, secret: &str, card_id: &CardId) -> Result<Option<ApiKey>, DomainError>;
    async fn resolve_key(&self, secret: &str) -> Result<Option<ApiKey>, DomainError>;
    async fn consume_key(&self, key: &ApiKey) -> Result<(), DomainError>;
    async fn get(&self, card_id: &CardId) -> Result<Option<Card>, DomainError>;
    async fn list(&self, limit: usize) -> Result<Vec<Card>, DomainError>;
    async fn purge_expired_keys(&self) -> Result<u64, DomainError>;
    async fn is_ready(&self) -> bool;
}

pub struct CardService<C, K>
where
    C: CardRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    cards: Arc<C>,
    api_keys: ApiKeyService<K>,
    detector: Arc<dyn Detector>,
    temp_store: TempStore,
}

impl<C, K> std::fmt::Debug for CardService<C, K>
where
    C: CardRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardService")
            .field("model", &self.detector.model_name())
            .field("temp_root", &self.temp_store.root())
            .finish_non_exhaustive()
    }
}

impl<C, K> CardService<C, K>
where
    C: CardRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    pub fn new(
        cards: Arc<C>,
        api_keys: ApiKeyService<K>,
        detector: Arc<dyn Detector>,
        temp_store: TempStore,
    ) -> Self {
        Self {
            cards,
            api_keys,
            detector,
            temp_store,
        }
    }

    /// Run detection on an upload and record the result against `card_id`
    #[instrument(skip(self, upload), fields(card_id = %card_id, size = upload.bytes.len()))]
    pub async fn detect_and_store(
        &self,
        card_id: &CardId,
        session: &SessionId,
        upload: ImageUpload,
        cache_bust: bool,
    ) -> Result<Card, DomainError> {
        self.temp_store
            .save_upload(session, upload.filename.as_deref(), &upload.bytes)
            .await?;

        let detector = Arc::clone(&self.detector);
        let bytes = upload.bytes.clone();
        let outcome = tokio::task::spawn_blocking(move || detector.detect(&bytes))
            .await
            .map_err(|e| DomainError::internal(format!("Detection task failed: {}", e)))?
            .map_err(|e| match e {
                DetectionError::Decode(msg) => DomainError::validation(format!("Invalid image: {}", msg)),
                other => DomainError::detection(other.to_string()),
            })?;

        let result_name = format!("{}_latest.jpg", card_id);
        self.temp_store
            .save_result(session, &result_name, &outcome.annotated_jpeg)
            .await?;

        let mut url = format!("{}/{}/{}", RESULTS_URL_PREFIX, session, result_name);
        if cache_bust {
            url.push_str("?v=");
            url.push_str(&cache_token());
        }

        let card = Card::detected(
            card_id.clone(),
            url,
            outcome.status,
            outcome.scores,
            self.detector.model_name(),
        );
        self.cards.upsert(&card).await?;

        info!(status = %card.status, detections = outcome.detections.len(), "Card updated");

        Ok(card)
    }

    /// A fresh id not used by any stored card
    pub async fn allocate_card_id(&self) -> Result<CardId, DomainError> {
        for _ in 0..RESERVE_ATTEMPTS {
            let card_id = CardId::generate();
            if !self.cards.exists(&card_id).await? {
                return Ok(card_id);
            }
            debug!(card_id = %card_id, "Generated card id already taken");
        }

        Err(DomainError::internal("Could not allocate a unique card id"))
    }

    /// Create an empty `PENDING` card under a fresh id
    pub async fn reserve(&self) -> Result<Card, DomainError> {
        let card_id = self.allocate_card_id().await?;

        let card = Card::pending(card_id, self.detector.model_name());
        self.cards.upsert(&card).await?;
        info!(card_id = %card.card_id, "Card reserved");
        Ok(card)
    }

    /// Issue a key for an existing card
    pub async fn issue_key(&self, card_id: &CardId) -> Result<IssuedApiKey, DomainError> {
        if !self.cards.exists(card_id).await? {
            return Err(DomainError::not_found(format!("Card '{}' not found", card_id)));
        }
        self.api_keys.issue(card_id).await
    }

    pub async fn reserve_with_key(&self) -> Result<(Card, IssuedApiKey), DomainError> {
        let card = self.reserve().await?;
        let issued = self.api_keys.issue(&card.card_id).await?;
        Ok((card, issued))
    }

    pub async fn verify_key(
        &self,
        secret: &str,
        card_id: &CardId,
    ) -> Result<Option<ApiKey>, DomainError> {
        self.api_keys.verify(secret, card_id).await
    }

    pub async fn resolve_key(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        self.api_keys.resolve(secret).await
    }

    pub async fn consume_key(&self, key: &ApiKey) -> Result<(), DomainError> {
        self.api_keys.consume(key).await
    }

    pub async fn get(&self, card_id: &CardId) -> Result<Option<Card>, DomainError> {
        self.cards.get(card_id).await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<Card>, DomainError> {
        self.cards.list(limit).await
    }

    /// Drop expired keys; run periodically
    pub async fn purge_expired_keys(&self) -> Result<u64, DomainError> {
        self.api_keys.purge_expired().await
    }

    /// Store reachable and model loaded
    pub async fn is_ready(&self) -> bool {
        self.detector.is_ready() && self.cards.list(1).await.is_ok()
    }
}

/// Six hex characters appended to result URLs to defeat client caches
fn cache_token() -> String {
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[async_trait::async_trait]
impl<C, K> CardServiceTrait for CardService<C, K>
where
    C: CardRepository + ?Sized + 'static,
    K: ApiKeyRepository + ?Sized + 'static,
{
    async fn detect_and_store(
        &self,
        card_id: &CardId,
        session: &SessionId,
        upload: ImageUpload,
        cache_bust: bool,
    ) -> Result<Card, DomainError> {
        CardService::detect_and_store(self, card_id, session, upload, cache_bust).await
    }

    async fn allocate_card_id(&self) -> Result<CardId, DomainError> {
        CardService::allocate_card_id(self).await
    }

    async fn reserve(&self) -> Result<Card, DomainError> {
        CardService::reserve(self).await
    }

    async fn issue_key(&self, card_id: &CardId) -> Result<IssuedApiKey, DomainError> {
        CardService::issue_key(self, card_id).await
    }

    async fn reserve_with_key(&self) -> Result<(Card, IssuedApiKey), DomainError> {
        CardService::reserve_with_key(self).await
    }

    async fn verify_key(&self, secret: &str, card_id: &CardId) -> Result<Option<ApiKey>, DomainError> {
        CardService::verify_key(self, secret, card_id).await
    }

    async fn resolve_key(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        CardService::resolve_key(self, secret).await
    }

    async fn consume_key(&self, key: &ApiKey) -> Result<(), DomainError> {
        CardService::consume_key(self, key).await
    }

    async fn get(&self, card_id: &CardId) -> Result<Option<Card>, DomainError> {
        CardService::get(self, card_id).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<Card>, DomainError> {
        CardService::list(self, limit).await
    }

    async fn purge_expired_keys(&self) -> Result<u64, DomainError> {
        CardService::purge_expired_keys(self).await
    }

    async fn is_ready(&self) -> bool {
        CardService::is_ready(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::{CardStatus, MockCardRepository, Scores};
    use crate::domain::detection::{DetectionOutcome, MockDetector};
    use crate::infrastructure::api_key::InMemoryApiKeyRepository;
    use crate::infrastructure::card::InMemoryCardRepository;
    use std::time::Duration;

    type TestService = CardService<InMemoryCardRepository, InMemoryApiKeyRepository>;

    fn fail_detector() -> MockDetector {
        let mut detector = MockDetector::new();
        detector.expect_model_name().return_const("best.onnx".to_string());
        detector.expect_is_ready().return_const(true);
        detector.expect_detect().returning(|_| {
            Ok(DetectionOutcome {
                status: CardStatus::Fail,
                scores: Scores::from([("spaghetti".to_string(), 0.8)]),
                detections: Vec::new(),
                annotated_jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            })
        });
        detector
    }

    async fn service_with(detector: MockDetector) -> (tempfile::TempDir, TestService) {
        let dir = tempfile::tempdir().unwrap();
        let temp_store = TempStore::new(dir.path(), Duration::from_secs(60))
            .await
            .unwrap();
        let service = CardService::new(
            Arc::new(InMemoryCardRepository::new()),
            ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new())),
            Arc::new(detector),
            temp_store,
        );
        (dir, service)
    }

    fn upload() -> ImageUpload {
        ImageUpload {
            filename: Some("print.jpg".to_string()),
            bytes: Bytes::from_static(b"not really a jpeg"),
        }
    }

    fn sid() -> SessionId {
        SessionId::new("session-0001").unwrap()
    }

    #[tokio::test]
    async fn test_detect_and_store_persists_card_and_result() {
        let (dir, service) = service_with(fail_detector()).await;
        let card_id = CardId::new("abcd1234").unwrap();

        let card = service
            .detect_and_store(&card_id, &sid(), upload(), false)
            .await
            .unwrap();

        assert_eq!(card.status, CardStatus::Fail);
        assert_eq!(
            card.detected_image_url,
            "/temp/results/session-0001/abcd1234_latest.jpg"
        );
        assert_eq!(card.model, "best.onnx");

        let stored = service.get(&card_id).await.unwrap().unwrap();
        assert_eq!(stored, card);

        let session_dir = dir.path().join("session-0001");
        assert!(session_dir.join("print.jpg").exists());
        assert!(session_dir.join("abcd1234_latest.jpg").exists());
    }

    #[tokio::test]
    async fn test_detect_and_store_cache_bust() {
        let (_dir, service) = service_with(fail_detector()).await;
        let card_id = CardId::new("abcd1234").unwrap();

        let card = service
            .detect_and_store(&card_id, &sid(), upload(), true)
            .await
            .unwrap();

        let (path, token) = card.detected_image_url.split_once("?v=").unwrap();
        assert!(path.ends_with("abcd1234_latest.jpg"));
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_validation_error() {
        let mut detector = MockDetector::new();
        detector.expect_model_name().return_const("best.onnx".to_string());
        detector
            .expect_detect()
            .returning(|_| Err(DetectionError::Decode("bad header".to_string())));
        let (_dir, service) = service_with(detector).await;

        let result = service
            .detect_and_store(&CardId::new("abcd1234").unwrap(), &sid(), upload(), false)
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_inference_failure_is_detection_error() {
        let mut detector = MockDetector::new();
        detector.expect_model_name().return_const("best.onnx".to_string());
        detector
            .expect_detect()
            .returning(|_| Err(DetectionError::Inference("boom".to_string())));
        let (_dir, service) = service_with(detector).await;

        let result = service
            .detect_and_store(&CardId::new("abcd1234").unwrap(), &sid(), upload(), false)
            .await;

        assert!(matches!(result, Err(DomainError::Detection { .. })));
    }

    #[tokio::test]
    async fn test_reserve_creates_pending_card() {
        let (_dir, service) = service_with(fail_detector()).await;

        let card = service.reserve().await.unwrap();

        assert_eq!(card.status, CardStatus::Pending);
        assert_eq!(card.card_id.as_str().len(), 8);
        assert!(service.get(&card.card_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reserve_gives_up_after_collisions() {
        let mut cards = MockCardRepository::new();
        cards.expect_exists().returning(|_| Ok(true));
        cards.expect_upsert().never();

        let dir = tempfile::tempdir().unwrap();
        let service = CardService::new(
            Arc::new(cards),
            ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new())),
            Arc::new(fail_detector()),
            TempStore::new(dir.path(), Duration::from_secs(60)).await.unwrap(),
        );

        let result = service.reserve().await;
        assert!(matches!(result, Err(DomainError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_allocate_skips_taken_ids() {
        let mut cards = MockCardRepository::new();
        let mut seq = mockall::Sequence::new();
        cards
            .expect_exists()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        cards
            .expect_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));

        let dir = tempfile::tempdir().unwrap();
        let service = CardService::new(
            Arc::new(cards),
            ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new())),
            Arc::new(fail_detector()),
            TempStore::new(dir.path(), Duration::from_secs(60)).await.unwrap(),
        );

        let card_id = service.allocate_card_id().await.unwrap();
        assert_eq!(card_id.as_str().len(), 8);
    }

    #[tokio::test]
    async fn test_issue_key_requires_card() {
        let (_dir, service) = service_with(fail_detector()).await;

        let result = service.issue_key(&CardId::new("nocard01").unwrap()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_reserve_with_key_round_trip() {
        let (_dir, service) = service_with(fail_detector()).await;

        let (card, issued) = service.reserve_with_key().await.unwrap();

        let verified = service
            .verify_key(&issued.secret, &card.card_id)
            .await
            .unwrap();
        assert!(verified.is_some());

        let resolved = service.resolve_key(&issued.secret).await.unwrap().unwrap();
        assert_eq!(resolved.card_id(), &card.card_id);
    }
}
