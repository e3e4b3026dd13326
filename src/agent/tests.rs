use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::db::GraphStore;
use crate::test_support::{movie_store, UnavailableStore};
use crate::tools::{default_registry, ToolInvocation, ToolRegistry};

use super::heuristic::HeuristicReasoner;
use super::orchestrator::{AgentConfig, SemanticAgent, Turn};
use super::reasoner::{Decision, Reasoner, ReasoningError, ReasoningRequest};

fn registry_for(store: Arc<dyn GraphStore>) -> ToolRegistry {
    default_registry(store, 25).unwrap()
}

fn agent_with(reasoner: Arc<dyn Reasoner>, store: Arc<dyn GraphStore>, max_iterations: usize) -> SemanticAgent {
    SemanticAgent::new(
        registry_for(store),
        reasoner,
        AgentConfig {
            max_iterations,
            ..Default::default()
        },
    )
}

/// Never finalizes; counts how often it was asked
struct AlwaysInvoke {
    calls: AtomicUsize,
}

#[async_trait]
impl Reasoner for AlwaysInvoke {
    async fn decide(&self, request: &ReasoningRequest<'_>) -> Result<Decision, ReasoningError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.steps.len(), n);
        Ok(Decision::Invoke(ToolInvocation::new(
            format!("call_{}", n),
            "Information",
            json!({"entity": "Inception"}),
        )))
    }
}

/// Replays a fixed list of decisions and records the observations it was shown
struct Scripted {
    decisions: Mutex<Vec<Decision>>,
    seen: Mutex<Vec<Vec<String>>>,
}

impl Scripted {
    fn new(mut decisions: Vec<Decision>) -> Self {
        decisions.reverse();
        Self {
            decisions: Mutex::new(decisions),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn observations(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reasoner for Scripted {
    async fn decide(&self, request: &ReasoningRequest<'_>) -> Result<Decision, ReasoningError> {
        self.seen.lock().unwrap().push(
            request
                .steps
                .iter()
                .map(|s| s.observation.clone())
                .collect(),
        );
        Ok(self
            .decisions
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Decision::Final("done".to_string())))
    }
}

struct Failing;

#[async_trait]
impl Reasoner for Failing {
    async fn decide(&self, _request: &ReasoningRequest<'_>) -> Result<Decision, ReasoningError> {
        Err(ReasoningError::Unavailable("503 Service Unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_who_directed_inception_mentions_director() {
    let (_dir, store) = movie_store();
    let agent = agent_with(Arc::new(HeuristicReasoner::new()), store, 4);

    let answer = agent.query("Who directed Inception?", &[]).await.unwrap();
    assert!(answer.contains("Christopher Nolan"), "answer was: {}", answer);
}

#[tokio::test]
async fn test_follow_up_uses_explicit_history() {
    let (_dir, store) = movie_store();
    let agent = agent_with(Arc::new(HeuristicReasoner::new()), store, 4);

    let mut history = Vec::new();
    let first = agent.query("Who directed Inception?", &history).await.unwrap();
    history.push(Turn::new("Who directed Inception?", first));

    let second = agent.query("When was it released?", &history).await.unwrap();
    assert!(second.contains("Inception"), "answer was: {}", second);
    assert!(second.contains("2010-07-16"));

    // Without the history the follow-up has nothing to refer to
    let cold = agent.query("When was it released?", &[]).await.unwrap();
    assert!(!cold.contains("Inception"));
}

#[tokio::test]
async fn test_history_is_not_mutated() {
    let (_dir, store) = movie_store();
    let agent = agent_with(Arc::new(HeuristicReasoner::new()), store, 4);

    let history = vec![Turn::new("Tell me about The Matrix", "A 1999 film.")];
    let before = history.clone();
    agent.query("Who acted in it?", &history).await.unwrap();

    assert_eq!(history, before);
}

#[tokio::test]
async fn test_iteration_bound_gives_best_effort_answer() {
    let (_dir, store) = movie_store();
    let reasoner = Arc::new(AlwaysInvoke {
        calls: AtomicUsize::new(0),
    });
    let agent = agent_with(reasoner.clone(), store, 3);

    let answer = agent.query("Who directed Inception?", &[]).await.unwrap();

    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 3);
    assert!(answer.contains("Christopher Nolan"));
}

#[tokio::test]
async fn test_unknown_tool_becomes_observation() {
    let (_dir, store) = movie_store();
    let reasoner = Arc::new(Scripted::new(vec![
        Decision::Invoke(ToolInvocation::new("call_0", "Recommend", json!({}))),
        Decision::Invoke(ToolInvocation::new(
            "call_1",
            "Information",
            json!({"entity": "The Matrix"}),
        )),
        Decision::Final("Keanu Reeves starred in The Matrix.".to_string()),
    ]));
    let agent = agent_with(reasoner.clone(), store, 4);

    let answer = agent.query("Who starred in The Matrix?", &[]).await.unwrap();
    assert_eq!(answer, "Keanu Reeves starred in The Matrix.");

    let seen = reasoner.observations();
    assert_eq!(seen.len(), 3);
    assert!(seen[1][0].starts_with("Error: Tool not found: Recommend"));
    assert!(seen[1][0].contains("Available tools: Information"));
    assert!(seen[2][1].starts_with("Movie: The Matrix"));
}

#[tokio::test]
async fn test_invalid_arguments_become_observation() {
    let (_dir, store) = movie_store();
    let reasoner = Arc::new(Scripted::new(vec![
        Decision::Invoke(ToolInvocation::new(
            "call_0",
            "Information",
            json!("{entity: Inception"),
        )),
        Decision::Invoke(ToolInvocation::new("call_1", "Information", json!({"entity": 7}))),
    ]));
    let agent = agent_with(reasoner.clone(), store, 4);

    let answer = agent.query("Who directed Inception?", &[]).await.unwrap();
    assert_eq!(answer, "done");

    let seen = reasoner.observations();
    assert!(seen[2][0].contains("must be a JSON object"));
    assert!(seen[2][1].contains("must be of type string"));
}

#[tokio::test]
async fn test_store_failure_becomes_degraded_answer() {
    let agent = agent_with(
        Arc::new(HeuristicReasoner::new()),
        Arc::new(UnavailableStore),
        4,
    );

    let answer = agent.query("Who directed Inception?", &[]).await.unwrap();
    assert!(answer.contains("connection refused"), "answer was: {}", answer);
}

#[tokio::test]
async fn test_reasoning_failure_is_fatal() {
    let (_dir, store) = movie_store();
    let agent = agent_with(Arc::new(Failing), store, 4);

    let err = agent.query("Who directed Inception?", &[]).await.unwrap_err();
    assert!(err.reason.contains("503"));
}

#[tokio::test]
async fn test_empty_utterance_is_rejected() {
    let (_dir, store) = movie_store();
    let agent = agent_with(Arc::new(HeuristicReasoner::new()), store, 4);

    assert!(agent.query("   ", &[]).await.is_err());
}

#[tokio::test]
async fn test_identical_queries_make_identical_decisions() {
    let (_dir, store) = movie_store();
    let history = vec![Turn::new("Tell me about The Matrix", "A 1999 film.")];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let reasoner = Arc::new(Scripted::new(vec![Decision::Invoke(ToolInvocation::new(
            "call_0",
            "Information",
            json!({"entity": "Keanu Reeves"}),
        ))]));
        let agent = agent_with(reasoner.clone(), store.clone(), 4);
        agent.query("Who is Keanu Reeves?", &history).await.unwrap();
        runs.push(reasoner.observations());
    }

    assert_eq!(runs[0], runs[1]);

    let heuristic = agent_with(Arc::new(HeuristicReasoner::new()), store, 4);
    let first = heuristic.query("Tell me about The Matrix", &[]).await.unwrap();
    let second = heuristic.query("Tell me about The Matrix", &[]).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrent_queries_share_registry_and_store() {
    let (_dir, store) = movie_store();
    let agent = Arc::new(agent_with(Arc::new(HeuristicReasoner::new()), store, 4));

    let questions = [
        ("Who directed Inception?", "Christopher Nolan"),
        ("Tell me about The Matrix", "Keanu Reeves"),
        ("What movies did Christopher Nolan direct?", "Interstellar"),
        ("Tell me about Keanu Reeves", "The Matrix"),
    ];

    let answers = futures::future::join_all(questions.iter().map(|(q, _)| {
        let agent = agent.clone();
        async move { agent.query(q, &[]).await }
    }))
    .await;

    for ((question, expected), answer) in questions.iter().zip(answers) {
        let answer = answer.unwrap();
        assert!(
            answer.contains(expected),
            "answer to {:?} was: {}",
            question,
            answer
        );
    }
}
