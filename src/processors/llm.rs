//! Large-language-model processor: streaming generation, sentence
//! chunking, tool-call recursion, and single-in-flight cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::LlmConfig;
use crate::domain::Conversation;
use crate::error::Result;
use crate::frame::{Frame, FrameDirection, FrameEnvelope, Role};
use crate::ports::llm::{LlmMessage, LlmPort, LlmRequest};
use crate::processors::{push_frame, FrameProcessor, ProcessorNode};
use crate::usecases::execute_tool::ExecuteToolUseCase;
use crate::usecases::handle_barge_in::handle_barge_in;
use crate::usecases::prompt_builder::build_system_prompt;
use crate::value_objects::{ConversationRole, ConversationTurn, ToolDefinition, ToolRequest};

const END_CALL_SENTINEL: &str = "[END_CALL]";

fn ends_sentence(buf: &str) -> bool {
    if buf.len() <= 10 {
        return false;
    }
    if !buf.ends_with(char::is_whitespace) {
        return false;
    }
    matches!(buf.trim_end().chars().last(), Some('.') | Some('?') | Some('!'))
}

/// A single assistant generation attempt, possibly recursing on tool calls.
struct GenerationArgs {
    trace_id: String,
    tool_result: Option<(Role, String)>,
}

/// Streaming LLM processor. Holds the shared, mutable `conversation` history
/// and ensures at most one generation task is ever in flight.
pub struct LlmProcessor {
    node: ProcessorNode,
    provider: Arc<dyn LlmPort>,
    execute_tool: Arc<ExecuteToolUseCase>,
    conversation: Arc<Mutex<Conversation>>,
    config: LlmConfig,
    system_prompt_config: serde_json::Map<String, serde_json::Value>,
    tools: Vec<ToolDefinition>,
    last_user_content: Mutex<Option<String>>,
    current_task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
    shutdown: CancellationToken,
    end_call_warned: AtomicBool,
}

impl LlmProcessor {
    pub fn new(
        provider: Arc<dyn LlmPort>,
        execute_tool: Arc<ExecuteToolUseCase>,
        conversation: Arc<Mutex<Conversation>>,
        config: LlmConfig,
        system_prompt_config: serde_json::Map<String, serde_json::Value>,
        tools: Vec<ToolDefinition>,
        parent_token: &CancellationToken,
    ) -> Self {
        Self {
            node: ProcessorNode::new(),
            provider,
            execute_tool,
            conversation,
            config,
            system_prompt_config,
            tools,
            last_user_content: Mutex::new(None),
            current_task: Mutex::new(None),
            shutdown: parent_token.child_token(),
            end_call_warned: AtomicBool::new(false),
        }
    }

    /// Cancel whatever generation task is currently in flight. Idempotent.
    async fn cancel_in_flight(&self) {
        if let Some((token, handle)) = self.current_task.lock().await.take() {
            token.cancel();
            let _ = handle.await;
        }
    }

    async fn handle_user_text(self: &Arc<Self>, text: &str, trace_id: &str) -> Result<()> {
        {
            let mut last = self.last_user_content.lock().await;
            if last.as_deref() != Some(text) {
                self.conversation
                    .lock()
                    .await
                    .add_turn(ConversationTurn::new(ConversationRole::User, text));
                *last = Some(text.to_owned());
            }
        }

        let had_in_flight = {
            let mut current = self.current_task.lock().await;
            match current.as_ref() {
                Some((_, handle)) if handle.is_finished() => {
                    current.take();
                    false
                }
                Some(_) => true,
                None => false,
            }
        };
        if had_in_flight {
            let command = handle_barge_in("user_spoke");
            if command.interrupt_audio {
                self.cancel_in_flight().await;
            }
            if command.clear_pipeline {
                let me: Arc<dyn FrameProcessor> = Arc::clone(self) as Arc<dyn FrameProcessor>;
                push_frame(
                    &me,
                    FrameEnvelope::new(
                        Frame::Cancel {
                            reason: command.reason,
                        },
                        trace_id,
                    ),
                    FrameDirection::Downstream,
                )
                .await?;
            }
        }

        self.spawn_generation(GenerationArgs {
            trace_id: trace_id.to_owned(),
            tool_result: None,
        })
        .await;
        Ok(())
    }

    async fn spawn_generation(self: &Arc<Self>, args: GenerationArgs) {
        let token = self.shutdown.child_token();
        let me = Arc::clone(self);
        let child = token.clone();
        let handle = tokio::spawn(async move {
            me.generate(args, child).await;
        });
        *self.current_task.lock().await = Some((token, handle));
    }

    /// One generation attempt; recurses (by spawning a follow-up call inline,
    /// not a new task) when the model issues a tool call.
    async fn generate(self: Arc<Self>, args: GenerationArgs, cancel: CancellationToken) {
        let GenerationArgs {
            trace_id,
            tool_result,
        } = args;

        let mut messages: Vec<LlmMessage> = {
            let conversation = self.conversation.lock().await;
            conversation
                .history_as_dicts()
                .into_iter()
                .map(|turn| LlmMessage {
                    role: turn
                        .get("role")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("user")
                        .to_owned(),
                    content: turn
                        .get("content")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_owned(),
                })
                .collect()
        };
        if let Some((role, content)) = tool_result {
            messages.push(LlmMessage {
                role: role_wire_name(role).to_owned(),
                content,
            });
        }

        let system_prompt = build_system_prompt(&self.system_prompt_config, None);
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.iter().map(ToolDefinition::to_function_schema).collect())
        };

        let mut request = LlmRequest::new(messages, self.config.model.clone());
        request.temperature = self.config.temperature as f32;
        request.max_tokens = self.config.max_tokens;
        request.system_prompt = system_prompt;
        request.tools = tools;

        let me: Arc<dyn FrameProcessor> = Arc::clone(&self) as Arc<dyn FrameProcessor>;

        let mut stream = self.provider.generate_stream(request);
        let mut full_response = String::new();
        let mut sentence_buffer = String::new();
        let mut should_end_call = false;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(trace_id = trace_id.as_str(), "LLM generation cancelled");
                    return;
                }
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    error!(error = %err, "LLM stream error; ending this turn's generation");
                    break;
                }
            };

            if let Some(call) = chunk.function_call {
                self.conversation.lock().await.add_turn(ConversationTurn::new(
                    ConversationRole::Assistant,
                    format!("[TOOL_CALL: {}]", call.name),
                ));
                let mut tool_request = match ToolRequest::new(call.name.clone(), call.arguments) {
                    Ok(req) => req,
                    Err(err) => {
                        warn!(error = %err, "invalid tool call arguments");
                        return;
                    }
                };
                tool_request.trace_id.clone_from(&trace_id);
                let response = self.execute_tool.execute(tool_request).await;
                let result_text = if response.success {
                    match response.result {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    }
                } else {
                    response.error_message
                };

                // Tool-call recursion owns the remainder of this turn.
                Box::pin(Arc::clone(&self).generate(
                    GenerationArgs {
                        trace_id,
                        tool_result: Some((Role::Tool, result_text)),
                    },
                    cancel,
                ))
                .await;
                return;
            }

            if chunk.has_text() {
                let mut text = chunk.text;
                if text.contains(END_CALL_SENTINEL) {
                    text = text.replace(END_CALL_SENTINEL, "");
                    should_end_call = true;
                }
                full_response.push_str(&text);
                sentence_buffer.push_str(&text);

                if ends_sentence(&sentence_buffer) {
                    if let Err(err) = push_frame(
                        &me,
                        FrameEnvelope::new(
                            Frame::Text {
                                text: sentence_buffer.trim().to_owned(),
                                is_final: true,
                                role: Role::Assistant,
                            },
                            trace_id.clone(),
                        ),
                        FrameDirection::Downstream,
                    )
                    .await
                    {
                        error!(error = %err, "failed to push assistant sentence downstream");
                    }
                    sentence_buffer.clear();
                }
            }
        }

        let trimmed = sentence_buffer.trim();
        if !trimmed.is_empty() {
            if let Err(err) = push_frame(
                &me,
                FrameEnvelope::new(
                    Frame::Text {
                        text: trimmed.to_owned(),
                        is_final: true,
                        role: Role::Assistant,
                    },
                    trace_id.clone(),
                ),
                FrameDirection::Downstream,
            )
            .await
            {
                error!(error = %err, "failed to flush final assistant sentence");
            }
        }

        if !full_response.is_empty() {
            self.conversation
                .lock()
                .await
                .add_turn(ConversationTurn::new(ConversationRole::Assistant, full_response.clone()));
        }

        if should_end_call {
            if !self.end_call_warned.swap(true, Ordering::SeqCst) {
                info!(trace_id = trace_id.as_str(), "[END_CALL] sentinel observed");
            }
            if let Err(err) = push_frame(
                &me,
                FrameEnvelope::new(
                    Frame::EndTask {
                        task_id: trace_id.clone(),
                        result: full_response,
                    },
                    trace_id,
                ),
                FrameDirection::Downstream,
            )
            .await
            {
                error!(error = %err, "failed to push EndTask frame");
            }
        }
    }
}

fn role_wire_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "function",
    }
}

#[async_trait]
impl FrameProcessor for LlmProcessor {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn node(&self) -> &ProcessorNode {
        &self.node
    }

    async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, direction: FrameDirection) -> Result<()> {
        if direction == FrameDirection::Downstream {
            match &envelope.frame {
                Frame::Text {
                    text,
                    is_final: true,
                    role: Role::User,
                } => {
                    let text = text.clone();
                    let trace_id = envelope.trace_id.clone();
                    self.handle_user_text(&text, &trace_id).await?;
                }
                Frame::Cancel { .. } => {
                    self.cancel_in_flight().await;
                }
                _ => {}
            }
        }
        let me: Arc<dyn FrameProcessor> = self.clone();
        push_frame(&me, envelope, direction).await
    }

    async fn stop(self: Arc<Self>) {
        self.cancel_in_flight().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm::{LlmChunkStream, LlmResponseChunk};

    struct ScriptedLlm {
        chunks: Vec<LlmResponseChunk>,
    }

    #[async_trait]
    impl LlmPort for ScriptedLlm {
        async fn generate_response(&self, _conversation: &Conversation, _agent: &crate::domain::Agent) -> Result<String> {
            Ok(String::new())
        }

        fn generate_stream(&self, _request: LlmRequest) -> LlmChunkStream {
            let chunks = self.chunks.clone();
            Box::pin(tokio_stream::iter(chunks.into_iter().map(Ok)))
        }

        async fn get_available_models(&self) -> Result<Vec<String>> {
            Ok(vec!["scripted".into()])
        }

        fn is_model_safe_for_voice(&self, _model: &str) -> bool {
            true
        }
    }

    struct Sink {
        node: ProcessorNode,
        frames: Mutex<Vec<Frame>>,
    }

    #[async_trait]
    impl FrameProcessor for Sink {
        fn name(&self) -> &'static str {
            "sink"
        }
        fn node(&self) -> &ProcessorNode {
            &self.node
        }
        async fn process_frame(self: Arc<Self>, envelope: FrameEnvelope, _direction: FrameDirection) -> Result<()> {
            self.frames.lock().await.push(envelope.frame);
            Ok(())
        }
    }

    fn make_processor(llm: ScriptedLlm) -> (Arc<LlmProcessor>, Arc<Sink>) {
        let tools = Arc::new(ExecuteToolUseCase::new(std::collections::HashMap::new()));
        let processor = Arc::new(LlmProcessor::new(
            Arc::new(llm),
            tools,
            Arc::new(Mutex::new(Conversation::new())),
            LlmConfig::default(),
            serde_json::Map::new(),
            vec![],
            &CancellationToken::new(),
        ));
        let sink = Arc::new(Sink {
            node: ProcessorNode::new(),
            frames: Mutex::new(Vec::new()),
        });
        (processor, sink)
    }

    #[tokio::test]
    async fn simple_text_response_emits_assistant_frame() {
        let (processor, sink) = make_processor(ScriptedLlm {
            chunks: vec![LlmResponseChunk {
                text: "Hello there. ".into(),
                is_final: true,
                function_call: None,
            }],
        });
        let llm_dyn: Arc<dyn FrameProcessor> = processor.clone();
        let sink_dyn: Arc<dyn FrameProcessor> = sink.clone();
        crate::processors::link(&llm_dyn, &sink_dyn).await;

        let envelope = FrameEnvelope::new(
            Frame::Text {
                text: "hi".into(),
                is_final: true,
                role: Role::User,
            },
            "trace-1",
        );
        llm_dyn.process_frame(envelope, FrameDirection::Downstream).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let frames = sink.frames.lock().await;
        assert!(frames.iter().any(|f| matches!(
            f,
            Frame::Text {
                role: Role::Assistant,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn end_call_sentinel_emits_end_task_after_assistant_text() {
        let (processor, sink) = make_processor(ScriptedLlm {
            chunks: vec![LlmResponseChunk {
                text: "Goodbye for now. [END_CALL]".into(),
                is_final: true,
                function_call: None,
            }],
        });
        let llm_dyn: Arc<dyn FrameProcessor> = processor.clone();
        let sink_dyn: Arc<dyn FrameProcessor> = sink.clone();
        crate::processors::link(&llm_dyn, &sink_dyn).await;

        let envelope = FrameEnvelope::new(
            Frame::Text {
                text: "please end".into(),
                is_final: true,
                role: Role::User,
            },
            "trace-2",
        );
        llm_dyn.process_frame(envelope, FrameDirection::Downstream).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let frames = sink.frames.lock().await;
        let end_task_index = frames.iter().position(|f| matches!(f, Frame::EndTask { .. }));
        assert!(end_task_index.is_some());
        if let Some(Frame::Text { text, .. }) = frames.iter().find(|f| matches!(f, Frame::Text { role: Role::Assistant, .. })) {
            assert!(!text.contains("[END_CALL]"));
        } else {
            panic!("expected an assistant text frame");
        }
    }
}
