use serde::Serialize;
use tracing::{info, warn};

use crate::enhance::{Credentials, Enhancer};
use crate::error::{EnhancementError, PipelineError};
use crate::parser;
use crate::schema::{self, DocumentRecord};

/// Stages a run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Raw,
    Normalized,
    BaselineExtracted,
    Validated,
    EnhancementAttempted,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EnhancementStatus {
    Disabled,
    Succeeded,
    Failed { reason: String },
}

impl EnhancementStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EnhancementStatus::Disabled => "disabled",
            EnhancementStatus::Succeeded => "succeeded",
            EnhancementStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: DocumentRecord,
    pub enhancement: EnhancementStatus,
    pub stages: Vec<Stage>,
}

/// Raw text in, one validated record out.
///
/// Holds no mutable state; clones share the provider, so independent
/// documents can run concurrently.
#[derive(Debug, Clone)]
pub struct Pipeline {
    enhancement: Option<(Enhancer, Credentials)>,
}

impl Pipeline {
    pub fn baseline_only() -> Self {
        Pipeline { enhancement: None }
    }

    pub fn with_enhancement(enhancer: Enhancer, credentials: Credentials) -> Self {
        Pipeline {
            enhancement: Some((enhancer, credentials)),
        }
    }

    pub fn enhancement_enabled(&self) -> bool {
        self.enhancement.is_some()
    }

    pub async fn run(&self, raw: &str) -> Result<Extraction, PipelineError> {
        if raw.trim().is_empty() {
            return Err(PipelineError::Input("document contains no text".to_string()));
        }
        let mut stages = vec![Stage::Raw];

        let text = parser::normalize(raw);
        stages.push(Stage::Normalized);
        info!(raw_chars = raw.chars().count(), chars = text.chars().count(), "normalized");

        let baseline = parser::extract(&text);
        stages.push(Stage::BaselineExtracted);

        let baseline = check_baseline(&baseline)?;
        stages.push(Stage::Validated);
        let filled = schema::Field::ALL
            .into_iter()
            .filter(|f| baseline.get(*f).is_some())
            .count();
        info!(fields = filled, "baseline validated");

        let (record, enhancement) = match &self.enhancement {
            None => (baseline, EnhancementStatus::Disabled),
            Some((enhancer, credentials)) => {
                stages.push(Stage::EnhancementAttempted);
                let attempt = match enhancer.enhance(&text, &baseline, credentials).await {
                    Ok(candidate) => reconcile(&baseline, &candidate),
                    Err(e) => Err(e),
                };
                match attempt {
                    Ok(merged) => {
                        info!("enhancement merged");
                        (merged, EnhancementStatus::Succeeded)
                    }
                    Err(e) => {
                        warn!(error = %e, "enhancement failed, keeping baseline");
                        (
                            baseline,
                            EnhancementStatus::Failed {
                                reason: e.to_string(),
                            },
                        )
                    }
                }
            }
        };

        stages.push(Stage::Finalized);
        info!(enhancement = enhancement.label(), "finalized");
        Ok(Extraction {
            record,
            enhancement,
            stages,
        })
    }
}

/// The baseline passes the same gate as any candidate; a failure here is a
/// bug in the extractor, not in the document.
fn check_baseline(baseline: &DocumentRecord) -> Result<DocumentRecord, PipelineError> {
    schema::validate(&baseline.to_map()).map_err(PipelineError::InternalConsistency)
}

/// Field by field: the candidate wins where it is non-null, the baseline
/// fills the rest. The merged record is validated again.
pub fn reconcile(
    baseline: &DocumentRecord,
    candidate: &DocumentRecord,
) -> Result<DocumentRecord, EnhancementError> {
    let mut merged = baseline.to_map();
    for (key, value) in candidate.to_map() {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    Ok(schema::validate(&merged)?)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::{ApiKey, CompletionRequest, EnhancementOptions, TextCompletionProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const PAPER: &str = "Deep Learning for Glioma Grading\n\nIntroduction\nGliomas are common brain tumours.\n\nMethods\nWe trained a network.\n\nResults\nAccuracy was 91 percent.\n\nReferences\n1. Smith J. Neural nets. 2020.";

    struct Fake {
        reply: String,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextCompletionProvider for Fake {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, EnhancementError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.clone())
        }
    }

    fn fake(reply: &str, delay: Duration) -> Arc<Fake> {
        Arc::new(Fake {
            reply: reply.to_string(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn enhanced(provider: Arc<Fake>, timeout: Duration, key: Option<&str>) -> Pipeline {
        let options = EnhancementOptions {
            model: "fake-model".into(),
            temperature: 0.1,
            max_output_tokens: 500,
            timeout,
            max_input_chars: 4000,
        };
        let credentials = Credentials {
            source: "FAKE_API_KEY".into(),
            api_key: key.map(ApiKey::new),
        };
        Pipeline::with_enhancement(Enhancer::new(provider, options), credentials)
    }

    async fn baseline_record() -> DocumentRecord {
        Pipeline::baseline_only().run(PAPER).await.unwrap().record
    }

    #[tokio::test]
    async fn baseline_only_run() {
        let out = Pipeline::baseline_only().run(PAPER).await.unwrap();
        assert_eq!(out.enhancement, EnhancementStatus::Disabled);
        assert_eq!(
            out.stages,
            vec![
                Stage::Raw,
                Stage::Normalized,
                Stage::BaselineExtracted,
                Stage::Validated,
                Stage::Finalized
            ]
        );
        assert_eq!(out.record.document, "Deep Learning for Glioma Grading");
        assert_eq!(out.record.answers, "Accuracy was 91 percent.");
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        for raw in ["", "   \n\t\u{000C}  "] {
            let err = Pipeline::baseline_only().run(raw).await.unwrap_err();
            assert!(matches!(err, PipelineError::Input(_)));
        }
    }

    #[test]
    fn broken_baseline_is_internal_consistency_error() {
        let mut broken = DocumentRecord {
            document: "Title".into(),
            introduction: "   ".into(),
            thoughts: "T".into(),
            answers: "A".into(),
            hallmarks: None,
            further_reading: None,
            images: None,
            further_development: None,
            thoughts_i: None,
            answers_i: None,
            answers_ii: None,
            further_thoughts: None,
            ependymoma: None,
        };
        match check_baseline(&broken) {
            Err(PipelineError::InternalConsistency(e)) => {
                assert_eq!(e.field, "Introduction");
                assert_eq!(e.violation, crate::error::Violation::Empty);
            }
            other => panic!("expected internal consistency error, got {:?}", other),
        }

        broken.introduction = "Intro".into();
        assert_eq!(check_baseline(&broken).unwrap(), broken);
    }

    #[test]
    fn merge_prefers_non_null_candidate_values() {
        let baseline = DocumentRecord {
            document: "Base".into(),
            introduction: "Base intro".into(),
            thoughts: "Base thoughts".into(),
            answers: "Base answers".into(),
            hallmarks: None,
            further_reading: Some("Base refs".into()),
            images: Some("Base images".into()),
            further_development: None,
            thoughts_i: None,
            answers_i: None,
            answers_ii: None,
            further_thoughts: None,
            ependymoma: None,
        };
        let candidate = DocumentRecord {
            document: "Better".into(),
            hallmarks: Some("New hallmarks".into()),
            images: None,
            ..baseline.clone()
        };
        let merged = reconcile(&baseline, &candidate).unwrap();
        assert_eq!(merged.document, "Better");
        assert_eq!(merged.hallmarks.as_deref(), Some("New hallmarks"));
        assert_eq!(merged.images.as_deref(), Some("Base images"));
        assert_eq!(merged.further_reading.as_deref(), Some("Base refs"));
        assert!(merged.ependymoma.is_none());
    }

    #[tokio::test]
    async fn successful_enhancement_is_merged() {
        let provider = fake(
            r#"{"document":"Glioma grading with deep networks","Introduction":null,"Thoughts":"CNN trained on MRI.","Answers":"91% accuracy.","Hallmarks":"Automated grading"}"#,
            Duration::ZERO,
        );
        let out = enhanced(provider.clone(), Duration::from_secs(5), Some("key"))
            .run(PAPER)
            .await
            .unwrap();
        assert_eq!(out.enhancement, EnhancementStatus::Succeeded);
        assert!(out.stages.contains(&Stage::EnhancementAttempted));
        assert_eq!(out.record.document, "Glioma grading with deep networks");
        assert_eq!(out.record.introduction, "Gliomas are common brain tumours.");
        assert_eq!(out.record.hallmarks.as_deref(), Some("Automated grading"));
        assert_eq!(
            out.record.further_reading,
            baseline_record().await.further_reading
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_key_is_dropped_not_fatal() {
        let provider = fake(
            r#"Here you go: {"document":"T","Introduction":"I","Thoughts":"M","Answers":"R","Summary":"extra"}"#,
            Duration::ZERO,
        );
        let out = enhanced(provider, Duration::from_secs(5), Some("key"))
            .run(PAPER)
            .await
            .unwrap();
        assert_eq!(out.enhancement, EnhancementStatus::Succeeded);
        assert!(!out.record.to_map().contains_key("Summary"));
    }

    #[tokio::test]
    async fn malformed_reply_keeps_baseline() {
        let provider = fake("I could not read the document.", Duration::ZERO);
        let out = enhanced(provider, Duration::from_secs(5), Some("key"))
            .run(PAPER)
            .await
            .unwrap();
        assert!(matches!(out.enhancement, EnhancementStatus::Failed { .. }));
        assert_eq!(out.record, baseline_record().await);
        assert_eq!(out.stages.last(), Some(&Stage::Finalized));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_keeps_baseline() {
        let provider = fake("{}", Duration::from_secs(5));
        let out = enhanced(provider, Duration::from_millis(50), Some("key"))
            .run(PAPER)
            .await
            .unwrap();
        match &out.enhancement {
            EnhancementStatus::Failed { reason } => assert!(reason.contains("did not answer")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(out.record, baseline_record().await);
    }

    #[tokio::test]
    async fn missing_credentials_never_call_provider() {
        let provider = fake("{}", Duration::ZERO);
        let out = enhanced(provider.clone(), Duration::from_secs(5), None)
            .run(PAPER)
            .await
            .unwrap();
        match &out.enhancement {
            EnhancementStatus::Failed { reason } => assert!(reason.contains("FAKE_API_KEY")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(out.record, baseline_record().await);
    }

    #[tokio::test]
    async fn independent_runs_do_not_interfere() {
        let pipeline = Pipeline::baseline_only();
        let cloned = pipeline.clone();
        let other = "Another Paper\n\nIntroduction\nSomething else entirely.";
        let (a, b) = tokio::join!(pipeline.run(PAPER), cloned.run(other));
        assert_eq!(a.unwrap().record.document, "Deep Learning for Glioma Grading");
        assert_eq!(b.unwrap().record.document, "Another Paper");
    }

    #[test]
    fn status_serializes_with_tag() {
        let failed = EnhancementStatus::Failed {
            reason: "boom".into(),
        };
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"status":"failed","reason":"boom"}"#
        );
        assert_eq!(EnhancementStatus::Disabled.label(), "disabled");
    }
}
