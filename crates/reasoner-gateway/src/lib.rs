pub mod prompt;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use budget_governor::{BudgetGovernor, OperationClass};
use contract_codec::{Contract, ContractError, ResponseType};
use podcast_core::types::{Outline, SegmentDraft, SegmentPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub deadline_ms: u64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            deadline_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub usage: Usage,
}

#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited, retry after backoff")]
    RateLimited,
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("budget exceeded before the call was issued")]
    BudgetExceeded,
}

impl ReasonerError {
    fn is_transient(&self) -> bool {
        matches!(self, ReasonerError::Transport(_) | ReasonerError::RateLimited)
    }
}

/// The collaborator seam. Implementations are plain structs wrapping an
/// HTTP/SDK client (production) or a scripted responder (tests); the gateway
/// never constructs one, it only holds an `Arc<dyn Reasoner>`.
///
/// Returns a boxed future rather than using `async fn` so the trait stays
/// object-safe behind `Arc<dyn Reasoner>`.
pub trait Reasoner: Send + Sync {
    fn invoke<'a>(
        &'a self,
        messages: &'a [Message],
        response_type: ResponseType,
        options: &'a GenerationOptions,
    ) -> Pin<Box<dyn Future<Output = Result<RawCompletion, ReasonerError>> + Send + 'a>>;
}

pub struct ReasonerGateway {
    reasoner: Arc<dyn Reasoner>,
    budget: BudgetGovernor,
    max_transport_retries: usize,
}

impl ReasonerGateway {
    pub fn new(reasoner: Arc<dyn Reasoner>, budget: BudgetGovernor) -> Self {
        Self {
            reasoner,
            budget,
            max_transport_retries: 3,
        }
    }

    async fn call(
        &self,
        messages: Vec<Message>,
        response_type: ResponseType,
        options: GenerationOptions,
    ) -> Result<RawCompletion, ReasonerError> {
        if !self
            .budget
            .check_precall(options.max_tokens as u64, OperationClass::Reasoning)
        {
            return Err(ReasonerError::BudgetExceeded);
        }

        let deadline = Duration::from_millis(options.deadline_ms);
        let reasoner = Arc::clone(&self.reasoner);
        let attempt = {
            let messages = &messages;
            let options = &options;
            move || {
                let reasoner = Arc::clone(&reasoner);
                let messages = messages.clone();
                let options = options.clone();
                async move { reasoner.invoke(&messages, response_type, &options).await }
            }
        };

        let backoff = ExponentialBuilder::default()
            .with_jitter()
            .with_max_times(self.max_transport_retries);

        let result = tokio::time::timeout(
            deadline,
            attempt.retry(backoff).when(|e: &ReasonerError| e.is_transient()),
        )
        .await
        .map_err(|_| ReasonerError::Transport("deadline exceeded".to_string()))??;

        self.budget
            .record_usage(result.usage.total(), OperationClass::Reasoning);
        Ok(result)
    }

    /// Decodes `completion.text`; on `ContractError`, re-prompts the
    /// reasoner exactly once with a "return valid JSON only" instruction
    /// (repair policy step 3) before surfacing the error.
    async fn decode_with_repair(
        &self,
        completion: RawCompletion,
        response_type: ResponseType,
        options: &GenerationOptions,
    ) -> Result<Contract, ReasonerError> {
        match contract_codec::decode(&completion.text, response_type) {
            Ok(contract) => Ok(contract),
            Err(_) => {
                let repair_messages = vec![
                    Message {
                        role: Role::System,
                        content: "Return valid JSON only. No prose, no code fences.".to_string(),
                    },
                    Message {
                        role: Role::User,
                        content: completion.text.clone(),
                    },
                ];
                let repaired = self
                    .call(repair_messages, response_type, options.clone())
                    .await?;
                Ok(contract_codec::decode(&repaired.text, response_type)?)
            }
        }
    }

    pub async fn generate_outline(
        &self,
        paper_title: &str,
        paper_excerpt: &str,
        target_duration_s: u32,
        options: GenerationOptions,
    ) -> Result<(Outline, Usage), ReasonerError> {
        let messages = prompt::outline_prompt(paper_title, paper_excerpt, target_duration_s);
        let completion = self.call(messages, ResponseType::Outline, options.clone()).await?;
        let usage = completion.usage;
        let contract = self
            .decode_with_repair(completion, ResponseType::Outline, &options)
            .await?;
        let Contract::Outline(outline) = contract else {
            unreachable!("decode_with_repair honored the requested response_type")
        };
        Ok((prompt::outline_from_contract(outline, target_duration_s), usage))
    }

    pub async fn generate_draft(
        &self,
        plan: &SegmentPlan,
        fact_context: &[String],
        options: GenerationOptions,
    ) -> Result<(Vec<prompt::DraftLine>, Usage), ReasonerError> {
        let messages = prompt::draft_prompt(plan, fact_context);
        let completion = self.call(messages, ResponseType::Segment, options.clone()).await?;
        let usage = completion.usage;
        let contract = self
            .decode_with_repair(completion, ResponseType::Segment, &options)
            .await?;
        let Contract::Segment(segment) = contract else {
            unreachable!("decode_with_repair honored the requested response_type")
        };
        Ok((prompt::lines_from_contract(segment), usage))
    }

    pub async fn fact_check(
        &self,
        draft: &SegmentDraft,
        fact_context: &[String],
        options: GenerationOptions,
    ) -> Result<(prompt::FactCheckOutcome, Usage), ReasonerError> {
        let messages = prompt::factcheck_prompt(draft, fact_context);
        let completion = self.call(messages, ResponseType::FactCheck, options.clone()).await?;
        let usage = completion.usage;
        let contract = self
            .decode_with_repair(completion, ResponseType::FactCheck, &options)
            .await?;
        let Contract::FactCheck(factcheck) = contract else {
            unreachable!("decode_with_repair honored the requested response_type")
        };
        Ok((prompt::outcome_from_contract(factcheck, draft.lines.len()), usage))
    }

    pub async fn rewrite(
        &self,
        draft: &SegmentDraft,
        feedback: &str,
        fact_context: &[String],
        options: GenerationOptions,
    ) -> Result<(Vec<prompt::DraftLine>, Usage), ReasonerError> {
        let messages = prompt::rewrite_prompt(draft, feedback, fact_context);
        let completion = self.call(messages, ResponseType::Rewrite, options.clone()).await?;
        let usage = completion.usage;
        let contract = self
            .decode_with_repair(completion, ResponseType::Rewrite, &options)
            .await?;
        let Contract::Rewrite(segment) = contract else {
            unreachable!("decode_with_repair honored the requested response_type")
        };
        Ok((prompt::lines_from_contract(segment), usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedReasoner {
        responses: Mutex<Vec<Result<String, ReasonerError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedReasoner {
        fn new(responses: Vec<Result<String, ReasonerError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Reasoner for ScriptedReasoner {
        fn invoke<'a>(
            &'a self,
            _messages: &'a [Message],
            _response_type: ResponseType,
            _options: &'a GenerationOptions,
        ) -> Pin<Box<dyn Future<Output = Result<RawCompletion, ReasonerError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.is_empty() {
                Err(ReasonerError::Transport("exhausted script".to_string()))
            } else {
                responses.remove(0)
            };
            Box::pin(async move {
                next.map(|text| RawCompletion {
                    text,
                    usage: Usage {
                        prompt_tokens: 10,
                        completion_tokens: 10,
                    },
                })
            })
        }
    }

    fn governor() -> BudgetGovernor {
        BudgetGovernor::new(&podcast_core::AppConfig::default())
    }

    #[tokio::test]
    async fn generate_outline_decodes_a_clean_response() {
        let outline_json = r#"{"title":"T","segments":[
            {"type":"intro","title":"Intro","duration_target_s":60,"key_points":["a"]},
            {"type":"core","title":"Core","duration_target_s":300,"key_points":["a"]},
            {"type":"outro","title":"Outro","duration_target_s":60,"key_points":["a"]}
        ]}"#;
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok(outline_json.to_string())]));
        let gateway = ReasonerGateway::new(reasoner, governor());
        let (outline, usage) = gateway
            .generate_outline("Paper", "excerpt", 900, GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(outline.segments.len(), 3);
        assert_eq!(usage.prompt_tokens, 10);
    }

    #[tokio::test]
    async fn malformed_response_triggers_one_repair_reprompt() {
        let good = r#"{"title":"T","segments":[
            {"type":"intro","title":"Intro","duration_target_s":60,"key_points":["a"]},
            {"type":"core","title":"Core","duration_target_s":300,"key_points":["a"]},
            {"type":"outro","title":"Outro","duration_target_s":60,"key_points":["a"]}
        ]}"#;
        let reasoner = Arc::new(ScriptedReasoner::new(vec![
            Ok("not json at all".to_string()),
            Ok(good.to_string()),
        ]));
        let gateway = ReasonerGateway::new(reasoner.clone(), governor());
        let (outline, _) = gateway
            .generate_outline("Paper", "excerpt", 900, GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(outline.segments.len(), 3);
        assert_eq!(reasoner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn budget_exhaustion_blocks_the_call_before_the_wire() {
        let mut config = podcast_core::AppConfig::default();
        config.max_tokens_per_paper = 1;
        let budget = BudgetGovernor::new(&config);
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Ok("{}".to_string())]));
        let gateway = ReasonerGateway::new(reasoner.clone(), budget);
        let err = gateway
            .generate_outline("Paper", "excerpt", 900, GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReasonerError::BudgetExceeded));
        assert_eq!(reasoner.calls.load(Ordering::SeqCst), 0);
    }
}
