//! Scripted collaborator mocks for the end-to-end scenarios. Each mock
//! implements one of the four boxed-future trait seams directly rather than
//! going through a real HTTP/SDK client, matching how `reasoner-gateway` and
//! friends are unit-tested in isolation.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use budget_governor::BudgetGovernor;
use podcast_core::types::Paper;
use podcast_core::AppConfig;
use reasoner_gateway::{GenerationOptions, Message, RawCompletion, Reasoner, ReasonerError, ReasonerGateway, Usage};
use retriever_gateway::{
    Embedder, EmbedderError, Filter, InputType, RetrievalItem, Retriever, RetrieverError, RetrieverGateway,
    RetrieverGatewayConfig,
};
use style_engine::Style;
use synthesizer_gateway::{SynthesisRequest, SynthesizedAudio, Synthesizer, SynthesizerError, SynthesizerGateway};

fn usage() -> Usage {
    Usage {
        prompt_tokens: 50,
        completion_tokens: 50,
    }
}

fn haystack(messages: &[Message]) -> String {
    messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>().join("\n")
}

/// Responds to `generate_outline`/`generate_draft`/`fact_check`/`rewrite`
/// calls. Outline responses are a flat queue (there's only ever one
/// episode's worth of planning per job). Draft/fact-check/rewrite responses
/// are keyed by a marker substring that each scenario embeds in its segment
/// titles, since segments race each other through `JoinSet` and call order
/// alone can't identify which segment a given call belongs to.
pub struct ScriptedReasoner {
    outline_responses: Mutex<VecDeque<Result<String, ReasonerError>>>,
    markers: Vec<&'static str>,
    draft_script: HashMap<&'static str, String>,
    factcheck_script: Mutex<HashMap<&'static str, VecDeque<String>>>,
    factcheck_default: String,
    rewrite_script: HashMap<&'static str, String>,
}

impl ScriptedReasoner {
    pub fn new(markers: Vec<&'static str>) -> Self {
        Self {
            outline_responses: Mutex::new(VecDeque::new()),
            markers,
            draft_script: HashMap::new(),
            factcheck_script: Mutex::new(HashMap::new()),
            factcheck_default: r#"{"accuracy":1.0,"needs_rewrite":false,"feedback":"fine"}"#.to_string(),
            rewrite_script: HashMap::new(),
        }
    }

    pub fn with_outline(mut self, response: Result<String, ReasonerError>) -> Self {
        self.outline_responses.get_mut().unwrap().push_back(response);
        self
    }

    pub fn with_draft(mut self, marker: &'static str, script_lines: &str) -> Self {
        self.draft_script.insert(marker, draft_json(marker, script_lines));
        self
    }

    pub fn with_factcheck_sequence(mut self, marker: &'static str, accuracies: Vec<(f64, bool)>) -> Self {
        let queue = accuracies
            .into_iter()
            .map(|(accuracy, needs_rewrite)| factcheck_json(accuracy, needs_rewrite))
            .collect();
        self.factcheck_script.get_mut().unwrap().insert(marker, queue);
        self
    }

    pub fn with_rewrite(mut self, marker: &'static str) -> Self {
        self.rewrite_script.insert(marker, draft_json(marker, "revised line"));
        self
    }
}

fn draft_json(marker: &str, extra: &str) -> String {
    format!(
        r#"{{"script":[{{"speaker":"host1","text":"{marker} says: {extra}"}},{{"speaker":"host2","text":"{marker} follow-up: {extra}"}}]}}"#
    )
}

fn factcheck_json(accuracy: f64, needs_rewrite: bool) -> String {
    format!(r#"{{"accuracy":{accuracy},"needs_rewrite":{needs_rewrite},"feedback":"scripted"}}"#)
}

impl Reasoner for ScriptedReasoner {
    fn invoke<'a>(
        &'a self,
        messages: &'a [Message],
        response_type: contract_codec::ResponseType,
        _options: &'a GenerationOptions,
    ) -> Pin<Box<dyn Future<Output = Result<RawCompletion, ReasonerError>> + Send + 'a>> {
        use contract_codec::ResponseType;

        match response_type {
            ResponseType::Outline => {
                let mut queue = self.outline_responses.lock().unwrap();
                let next = queue
                    .pop_front()
                    .unwrap_or_else(|| Err(ReasonerError::Transport("outline script exhausted".to_string())));
                Box::pin(async move { next.map(|text| RawCompletion { text, usage: usage() }) })
            }
            ResponseType::Segment => {
                let text = self.draft_script.get(marker_in(&haystack(messages), &self.markers)).cloned();
                Box::pin(async move {
                    text.map(|text| RawCompletion { text, usage: usage() })
                        .ok_or_else(|| ReasonerError::Transport("no scripted draft for segment".to_string()))
                })
            }
            ResponseType::FactCheck => {
                let marker = marker_in(&haystack(messages), &self.markers);
                let mut scripts = self.factcheck_script.lock().unwrap();
                let text = scripts
                    .get_mut(marker)
                    .and_then(|q| q.pop_front())
                    .unwrap_or_else(|| self.factcheck_default.clone());
                Box::pin(async move { Ok(RawCompletion { text, usage: usage() }) })
            }
            ResponseType::Rewrite => {
                let marker = marker_in(&haystack(messages), &self.markers);
                let text = self
                    .rewrite_script
                    .get(marker)
                    .cloned()
                    .unwrap_or_else(|| draft_json(marker, "default rewrite"));
                Box::pin(async move { Ok(RawCompletion { text, usage: usage() }) })
            }
        }
    }
}

fn marker_in<'a>(haystack: &str, markers: &'a [&'a str]) -> &'a str {
    markers
        .iter()
        .copied()
        .find(|m| haystack.contains(m))
        .expect("scenario message didn't carry a recognized segment marker")
}

pub struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed<'a>(
        &'a self,
        texts: &'a [String],
        _input_type: InputType,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, EmbedderError>> + Send + 'a>> {
        let len = texts.len();
        Box::pin(async move { Ok((0..len).map(|_| vec![0.1, 0.2, 0.3]).collect()) })
    }
}

pub struct StubRetriever;

impl Retriever for StubRetriever {
    fn upsert<'a>(
        &'a self,
        _namespace: &'a str,
        _items: Vec<RetrievalItem>,
    ) -> Pin<Box<dyn Future<Output = Result<(), RetrieverError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    fn query<'a>(
        &'a self,
        _namespace: &'a str,
        _vector: &'a [f32],
        _k: usize,
        _filter: Option<Filter>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<podcast_core::types::ScoredItem>, RetrieverError>> + Send + 'a>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Always succeeds with a duration proportional to word count, never
/// transient, so its retry loop never actually fires.
pub struct ScriptedSynthesizer;

impl Synthesizer for ScriptedSynthesizer {
    fn synthesize<'a>(
        &'a self,
        request: &'a SynthesisRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SynthesizedAudio, SynthesizerError>> + Send + 'a>> {
        let words = request.text.split_whitespace().count().max(1) as u64;
        Box::pin(async move {
            Ok(SynthesizedAudio {
                id: uuid::Uuid::new_v4(),
                duration_ms: words * 400,
            })
        })
    }
}

pub fn sample_paper() -> Paper {
    Paper {
        paper_id: podcast_core::ids::PaperId::new(),
        title: "Attention Is All You Need".to_string(),
        body: (0..2000).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" "),
        source_ref: "arxiv:1706.03762".to_string(),
    }
}

pub fn sample_style() -> &'static Style {
    style_engine::find_style("npr_calm").expect("npr_calm is a built-in style")
}

/// Models the reasoner's own outline response, which only ever carries core
/// content segments — the intro, ad break, and outro are injected afterward
/// by `insert_structural_segments`, never planned by the model.
pub fn valid_outline_json(markers: &[&str]) -> String {
    let segments: Vec<String> = markers
        .iter()
        .map(|marker| {
            format!(r#"{{"type":"core","title":"{marker}","duration_target_s":180,"key_points":["point about {marker}"]}}"#)
        })
        .collect();
    format!(r#"{{"title":"Attention Is All You Need, Explained","segments":[{}]}}"#, segments.join(","))
}

pub fn reasoner_gateway(reasoner: ScriptedReasoner, budget: BudgetGovernor) -> Arc<ReasonerGateway> {
    Arc::new(ReasonerGateway::new(Arc::new(reasoner), budget))
}

pub fn retriever_gateway() -> Arc<RetrieverGateway> {
    Arc::new(RetrieverGateway::new(
        Arc::new(StubEmbedder),
        Arc::new(StubRetriever),
        RetrieverGatewayConfig {
            chunk_words: 300,
            chunk_overlap_words: 100,
            min_chunk_words: 50,
            embed_batch_size: 16,
            embed_batch_delay_ms: 0,
        },
    ))
}

pub fn synthesizer_gateway(budget: BudgetGovernor) -> Arc<SynthesizerGateway> {
    Arc::new(SynthesizerGateway::new(Arc::new(ScriptedSynthesizer), budget, 2))
}

pub fn config() -> AppConfig {
    AppConfig::default()
}
