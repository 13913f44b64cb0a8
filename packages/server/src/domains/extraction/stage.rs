//! AI extraction stage: `LeadEnriched` in, field patches out.
//!
//! Every patch in the plan overwrites, so a message that failed halfway is
//! safe to re-run from the start.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::prompt::ExtractionRequest;
use super::response::{ExtractionResult, RawCompletion};
use crate::common::messages::{LeadEnriched, WireMessage};
use crate::domains::leads::PatchError;
use crate::kernel::consumer::{MessageHandler, StageError};
use crate::kernel::{BaseAI, BaseLeadPatcher};

pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(180);

pub struct ExtractionStage {
    ai: Arc<dyn BaseAI>,
    patcher: Arc<dyn BaseLeadPatcher>,
    timeout: Duration,
}

impl ExtractionStage {
    pub fn new(ai: Arc<dyn BaseAI>, patcher: Arc<dyn BaseLeadPatcher>) -> Self {
        Self {
            ai,
            patcher,
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One blocking inference call, bounded by the stage timeout.
    pub async fn complete(&self, request: &ExtractionRequest) -> Result<RawCompletion, StageError> {
        let prompt = request
            .render()
            .map_err(|e| StageError::malformed("render prompt", e))?;

        match tokio::time::timeout(self.timeout, self.ai.complete(&prompt)).await {
            Ok(Ok(text)) => Ok(RawCompletion(text)),
            Ok(Err(e)) => Err(StageError::retryable("inference", format!("{e:#}"))),
            Err(_) => Err(StageError::Retryable(format!(
                "inference timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    pub async fn apply(&self, lead_id: Uuid, result: &ExtractionResult) -> Result<usize, StageError> {
        let plan = result.patch_plan();
        for (field, value) in &plan {
            self.patcher
                .patch_field(lead_id, field, value.clone())
                .await
                .map_err(|e| match e {
                    PatchError::NotFound(id) => StageError::NotFound(format!("lead {}", id)),
                    e if e.is_permanent() => StageError::Validation(format!("{}: {}", field, e)),
                    other => StageError::retryable(field, other),
                })?;
            debug!(lead_id = %lead_id, field, "Field patched");
        }
        Ok(plan.len())
    }
}

#[async_trait]
impl MessageHandler for ExtractionStage {
    fn name(&self) -> &'static str {
        "extraction"
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), StageError> {
        let message =
            LeadEnriched::decode(payload).map_err(|e| StageError::malformed("LeadEnriched", e))?;
        let lead_id = message.bundle.lead.id;

        let request = ExtractionRequest::new(message.bundle);
        let completion = self.complete(&request).await?;
        debug!(
            lead_id = %lead_id,
            preview = %completion.0.chars().take(200).collect::<String>(),
            "Completion received"
        );

        let result = completion
            .parse()
            .map_err(|e| StageError::malformed("model response", e))?;

        let patched = self.apply(lead_id, &result).await?;
        info!(lead_id = %lead_id, patched, "Extraction applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::enrichment::EnrichmentBundle;
    use crate::domains::leads::{InMemoryLeadStore, LeadStore, NewLead, StoreLeadPatcher};
    use crate::kernel::test_dependencies::{FlakyPatcher, MockAI};
    use crate::kernel::consumer::Disposition;
    use crate::kernel::LeadApiClient;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESPONSE: &str = "```json\n{\"RegisteredName\": \"PADARIA BOA VISTA LTDA\", \"CNPJ\": \"12.345.678/0001-95\", \"Contatos\": \"Maria Souza\", \"DataFundacao\": \"2010-03-15\", \"Website\": \"https://boavista.com.br\"}\n```";

    async fn seeded_store() -> (Arc<InMemoryLeadStore>, Vec<u8>, Uuid) {
        let store = Arc::new(InMemoryLeadStore::new());
        let (lead, _) = store
            .upsert(NewLead {
                external_id: "P1".into(),
                business_name: "Padaria Boa Vista".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let id = lead.id;
        let payload = LeadEnriched::new(EnrichmentBundle::new(lead))
            .to_bytes()
            .unwrap()
            .to_vec();
        (store, payload, id)
    }

    #[tokio::test]
    async fn test_patches_all_fields() {
        let (store, payload, id) = seeded_store().await;
        let ai = Arc::new(MockAI::new().with_response(RESPONSE));
        let stage = ExtractionStage::new(ai.clone(), Arc::new(StoreLeadPatcher::new(store.clone())));

        stage.handle(&payload).await.unwrap();

        let lead = store.get(id).await.unwrap().unwrap();
        assert_eq!(lead.registered_name, "PADARIA BOA VISTA LTDA");
        assert_eq!(lead.company_registration_id, "12.345.678/0001-95");
        assert_eq!(lead.owner, "Maria Souza");
        assert_eq!(lead.foundation_date, chrono::NaiveDate::from_ymd_opt(2010, 3, 15));
        assert_eq!(lead.website, "https://boavista.com.br");
        assert!(ai.calls()[0].contains("Padaria Boa Vista"));
    }

    #[tokio::test]
    async fn test_unparseable_response_is_malformed() {
        let (store, payload, _) = seeded_store().await;
        let ai = Arc::new(MockAI::new().with_response("Desculpe, não encontrei dados."));
        let stage = ExtractionStage::new(ai, Arc::new(StoreLeadPatcher::new(store)));

        let err = stage.handle(&payload).await.unwrap_err();
        assert!(matches!(err, StageError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_inference_failure_and_timeout_are_retryable() {
        let (store, payload, _) = seeded_store().await;

        let failing = ExtractionStage::new(
            Arc::new(MockAI::failing()),
            Arc::new(StoreLeadPatcher::new(store.clone())),
        );
        assert!(matches!(
            failing.handle(&payload).await.unwrap_err(),
            StageError::Retryable(_)
        ));

        let slow = ExtractionStage::new(
            Arc::new(MockAI::new().with_response(RESPONSE).with_delay(Duration::from_millis(200))),
            Arc::new(StoreLeadPatcher::new(store)),
        )
        .with_timeout(Duration::from_millis(10));
        assert!(matches!(
            slow.handle(&payload).await.unwrap_err(),
            StageError::Retryable(_)
        ));
    }

    #[tokio::test]
    async fn test_patch_failure_requeues_and_missing_lead_drops() {
        let (store, payload, _) = seeded_store().await;
        let patcher = FlakyPatcher::new(Arc::new(StoreLeadPatcher::new(store.clone())), 3);
        let stage = ExtractionStage::new(
            Arc::new(MockAI::new().with_response(RESPONSE).with_response(RESPONSE)),
            Arc::new(patcher),
        );
        assert!(matches!(
            stage.handle(&payload).await.unwrap_err(),
            StageError::Retryable(_)
        ));
        stage.handle(&payload).await.unwrap();

        let unknown = Uuid::new_v4();
        let err = stage
            .apply(unknown, &ExtractionResult::parse(&json!({"Website": "https://x"}).to_string()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::NotFound(_)));
    }

    fn website_only() -> ExtractionResult {
        ExtractionResult::parse(&json!({"Website": "https://x"}).to_string()).unwrap()
    }

    async fn apply_against(status: u16) -> StageError {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let stage = ExtractionStage::new(
            Arc::new(MockAI::new()),
            Arc::new(LeadApiClient::new(server.uri()).unwrap()),
        );
        stage.apply(Uuid::new_v4(), &website_only()).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_lead_api_client_errors_drop_and_server_errors_requeue() {
        for status in [400, 409, 422] {
            let err = apply_against(status).await;
            assert!(matches!(err, StageError::Validation(_)), "{status}: {err:?}");
            assert_eq!(err.disposition(), Disposition::Drop);
        }

        for status in [500, 502, 503] {
            let err = apply_against(status).await;
            assert!(matches!(err, StageError::Retryable(_)), "{status}: {err:?}");
            assert_eq!(err.disposition(), Disposition::Requeue);
        }

        assert!(matches!(apply_against(404).await, StageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreachable_lead_api_requeues() {
        let stage = ExtractionStage::new(
            Arc::new(MockAI::new()),
            Arc::new(LeadApiClient::new("http://127.0.0.1:1").unwrap()),
        );
        let err = stage.apply(Uuid::new_v4(), &website_only()).await.unwrap_err();
        assert!(matches!(err, StageError::Retryable(_)));
    }

    struct RejectingPatcher;

    #[async_trait]
    impl BaseLeadPatcher for RejectingPatcher {
        async fn patch_field(
            &self,
            _lead_id: Uuid,
            field: &str,
            _value: serde_json::Value,
        ) -> Result<(), PatchError> {
            Err(PatchError::UnknownField(field.to_string()))
        }
    }

    #[tokio::test]
    async fn test_unknown_field_is_validation() {
        let stage = ExtractionStage::new(Arc::new(MockAI::new()), Arc::new(RejectingPatcher));
        let err = stage.apply(Uuid::new_v4(), &website_only()).await.unwrap_err();
        assert!(matches!(err, StageError::Validation(_)));
    }
}
