//! The per-session actor loop (spec.md §4.7): one `tokio::spawn`ed task per
//! session, driven entirely by `tokio::select!` over its own channels and
//! timers — "cooperative concurrency on top of a single-threaded event loop
//! per session" (spec.md §5). No state here is shared with any other
//! session.

use crate::lifecycle::SessionPhase;
use crate::protocol::{ClientMessage, DiagnosticsWire, ServerMessage, SuggestionWire};
use crate::rate_limit::{RateLimitConfig, TokenBucket};
use citegraph_core::types::UserId;
use citegraph_core::EnvConfig;
use citegraph_embedder::Embedder;
use citegraph_index::Store;
use citegraph_pipeline::context::{FocusContext, PaperProvider, RetrievalConfig, SearchStrategy};
use citegraph_pipeline::Suggestions;
use citegraph_reranker::Reranker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Raw events the transport layer feeds into a session: parsed JSON
/// messages, and the WebSocket-protocol pong frame (which never goes
/// through JSON, so it isn't a [`ClientMessage`]).
#[derive(Debug)]
pub enum Inbound {
    Message(ClientMessage),
    Pong,
}

/// Events the session asks the transport layer to act on directly on the
/// socket (native WS ping, or a hard close after a missed pong) — distinct
/// from [`ServerMessage`], which is a JSON payload framed as WS text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    SendPing,
    CloseUnresponsive,
}

/// Everything the actor needs to actually run a retrieval.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<Store>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
    pub papers: Arc<dyn PaperProvider>,
    pub cfg: Arc<EnvConfig>,
}

/// Handle returned by [`spawn`]; owned by the transport layer (the server
/// crate's WebSocket handler).
pub struct SessionHandle {
    pub inbound: mpsc::Sender<Inbound>,
    /// Reliable delivery: `error` and `pong` are never dropped.
    pub control: mpsc::Receiver<ServerMessage>,
    /// Most-recent-wins delivery: an unconsumed `suggestions` message is
    /// silently replaced by the next one rather than queued (spec.md §4.7
    /// back-pressure rule).
    pub suggestions: watch::Receiver<Option<ServerMessage>>,
    pub transport_events: mpsc::Receiver<TransportEvent>,
}

struct PendingSuggest {
    focus: FocusContext,
}

fn apply_preferences(config: &mut RetrievalConfig, prefs: &crate::protocol::PreferencesWire) {
    if let Some(use_enhanced) = prefs.use_enhanced {
        config.use_enhanced = use_enhanced;
    }
    if let Some(use_reranking) = prefs.use_reranking {
        config.use_reranking = use_reranking;
    }
    if let Some(strategy) = &prefs.search_strategy {
        config.strategy = match strategy.as_str() {
            "vector" => SearchStrategy::Vector,
            "bm25" => SearchStrategy::Bm25,
            _ => SearchStrategy::Hybrid,
        };
    }
}

fn to_wire(suggestions: Suggestions) -> ServerMessage {
    ServerMessage::Suggestions {
        results: suggestions
            .items
            .into_iter()
            .map(|s| SuggestionWire {
                paper_id: s.paper_id,
                title: s.title,
                authors: s.authors,
                year: s.year,
                confidence: s.confidence,
                display_text: s.display_text,
                chunk_id: s.chunk_id,
                chunk_preview: s.chunk_preview,
                chunk_section: s.chunk_section,
                page_span: s.page_span,
            })
            .collect(),
        diagnostics: DiagnosticsWire {
            vector_degraded: suggestions.diagnostics.vector_degraded,
            lexical_degraded: suggestions.diagnostics.lexical_degraded,
            rerank_skipped: suggestions.diagnostics.rerank_skipped,
        },
    }
}

/// Spawns one session actor for `user_id` and returns the handle the
/// transport layer drives it through.
pub fn spawn(user_id: UserId, deps: SessionDeps) -> SessionHandle {
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let (control_tx, control_rx) = mpsc::channel(16);
    let (suggestions_tx, suggestions_rx) = watch::channel(None);
    let (transport_tx, transport_rx) = mpsc::channel(4);

    tokio::spawn(run(
        user_id,
        deps,
        inbound_rx,
        control_tx,
        suggestions_tx,
        transport_tx,
    ));

    SessionHandle {
        inbound: inbound_tx,
        control: control_rx,
        suggestions: suggestions_rx,
        transport_events: transport_rx,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    user_id: UserId,
    deps: SessionDeps,
    mut inbound_rx: mpsc::Receiver<Inbound>,
    control_tx: mpsc::Sender<ServerMessage>,
    suggestions_tx: watch::Sender<Option<ServerMessage>>,
    transport_tx: mpsc::Sender<TransportEvent>,
) {
    let cfg = deps.cfg.clone();
    let mut phase = SessionPhase::Open;
    let mut last_activity = Instant::now();
    let mut awaiting_pong = false;
    let mut ping_sent_at: Option<Instant> = None;

    let mut rate_limiter = TokenBucket::new(RateLimitConfig {
        requests_per_minute: cfg.rate_limit_per_minute,
        burst: cfg.rate_limit_burst,
    });
    let mut retrieval_config = RetrievalConfig::default();
    let mut pending: Option<PendingSuggest> = None;
    let mut debounce_deadline: Option<Instant> = None;
    let mut current_cancel: Option<CancellationToken> = None;

    let idle_ping = cfg.idle_ping();
    let ping_timeout = cfg.ping_timeout();
    let debounce = cfg.debounce();

    tracing::info!(%user_id, "session_opened");

    while phase != SessionPhase::Closed {
        let watchdog_deadline = match ping_sent_at {
            Some(sent) => sent + ping_timeout,
            None => last_activity + idle_ping,
        };

        tokio::select! {
            maybe_event = inbound_rx.recv() => {
                let Some(event) = maybe_event else {
                    break;
                };
                last_activity = Instant::now();
                match event {
                    Inbound::Pong => {
                        awaiting_pong = false;
                        ping_sent_at = None;
                    }
                    Inbound::Message(ClientMessage::Ping) => {
                        if control_tx.send(ServerMessage::Pong).await.is_err() {
                            break;
                        }
                    }
                    Inbound::Message(ClientMessage::UpdatePreferences { preferences }) => {
                        apply_preferences(&mut retrieval_config, &preferences);
                    }
                    Inbound::Message(ClientMessage::Suggest { text, context }) => {
                        let current_sentence = if context.current_sentence.trim().is_empty() {
                            text
                        } else {
                            context.current_sentence
                        };
                        pending = Some(PendingSuggest {
                            focus: FocusContext {
                                current_sentence,
                                previous_sentence: context.previous_sentence,
                                next_sentence: context.next_sentence,
                                paragraph: context.paragraph,
                                cursor_position: context.cursor_position,
                            },
                        });
                        debounce_deadline = Some(Instant::now() + debounce);
                    }
                }
            }

            _ = tokio::time::sleep_until(debounce_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)).into()), if debounce_deadline.is_some() => {
                debounce_deadline = None;
                if let Some(job) = pending.take() {
                    if !rate_limiter.try_acquire() {
                        if control_tx.send(ServerMessage::Error {
                            code: "rate_limited",
                            message: "too many suggest requests".into(),
                        }).await.is_err() {
                            break;
                        }
                        continue;
                    }

                    if let Some(previous) = current_cancel.take() {
                        previous.cancel();
                    }
                    let cancel = CancellationToken::new();
                    current_cancel = Some(cancel.clone());

                    let query = citegraph_pipeline::context::QueryContext {
                        user_id,
                        focus: job.focus,
                        config: retrieval_config,
                    };
                    let deps = deps.clone();
                    let control_tx = control_tx.clone();
                    let suggestions_tx = suggestions_tx.clone();
                    tokio::spawn(async move {
                        let result = citegraph_pipeline::suggest(
                            query,
                            &deps.store,
                            deps.embedder.as_ref(),
                            deps.reranker.as_ref(),
                            deps.papers.as_ref(),
                            &deps.cfg,
                            &cancel,
                        )
                        .await;
                        if cancel.is_cancelled() {
                            return;
                        }
                        match result {
                            Ok(suggestions) => {
                                let _ = suggestions_tx.send(Some(to_wire(suggestions)));
                            }
                            Err(err) => {
                                let _ = control_tx
                                    .send(ServerMessage::Error {
                                        code: err.code(),
                                        message: err.to_string(),
                                    })
                                    .await;
                            }
                        }
                    });
                }
            }

            _ = tokio::time::sleep_until(watchdog_deadline.into()) => {
                if awaiting_pong {
                    tracing::warn!(%user_id, "session_unresponsive");
                    let _ = transport_tx.send(TransportEvent::CloseUnresponsive).await;
                    phase = SessionPhase::Draining;
                    break;
                } else {
                    awaiting_pong = true;
                    ping_sent_at = Some(Instant::now());
                    if transport_tx.send(TransportEvent::SendPing).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    if let Some(cancel) = current_cancel.take() {
        cancel.cancel();
    }
    tracing::info!(%user_id, "session_closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_update_only_touches_present_fields() {
        let mut config = RetrievalConfig::default();
        apply_preferences(
            &mut config,
            &crate::protocol::PreferencesWire {
                use_enhanced: Some(false),
                use_reranking: None,
                search_strategy: None,
            },
        );
        assert!(!config.use_enhanced);
        assert!(config.use_reranking);
    }

    #[test]
    fn search_strategy_string_maps_to_enum() {
        let mut config = RetrievalConfig::default();
        apply_preferences(
            &mut config,
            &crate::protocol::PreferencesWire {
                use_enhanced: None,
                use_reranking: None,
                search_strategy: Some("vector".into()),
            },
        );
        assert_eq!(config.strategy, SearchStrategy::Vector);
    }
}
