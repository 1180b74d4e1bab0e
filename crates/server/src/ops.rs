// SPDX-License-Identifier: MIT

//! Request dispatch: one method per operation family, mapping the protocol
//! onto the engine and engine errors onto error frames.

use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use cue_core::{Clock, FindingFilter, LogEntry, LogFilter, SystemClock};
use cue_engine::{AdvanceOutcome, Engine, EngineError, NewArtifact, NewFinding, StartRequest};
use serde_json::json;
use tracing::debug;

use crate::protocol::{
    ArtifactBody, CompletedBody, CueBody, FindingBody, ProjectContextBody, Request, Response,
    ServerStatusBody, StepSummary,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Operation dispatcher. Cheap to clone; shares the engine.
#[derive(Clone)]
pub struct Ops<C: Clock = SystemClock> {
    engine: Engine<C>,
    start_time: Instant,
}

impl<C: Clock> Ops<C> {
    pub fn new(engine: Engine<C>) -> Self {
        Self { engine, start_time: Instant::now() }
    }

    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    /// Dispatch one request. Never panics; every failure becomes an error
    /// frame.
    pub fn handle(&self, request: Request) -> Response {
        debug!(?request, "dispatch");
        match request {
            Request::Ping => Response::ok(json!({"pong": true})),

            Request::StartWorkflow {
                workflow_name,
                execution_id,
                project_path,
                timeout_ms,
                metadata,
            } => self.respond(
                self.engine
                    .start_workflow(StartRequest {
                        workflow_name,
                        execution_id,
                        project_path,
                        timeout_ms,
                        metadata,
                    })
                    .map(CueBody::from),
            ),

            Request::AdvanceStep { token, output } => {
                match self.engine.advance_step(&token, output) {
                    Ok(AdvanceOutcome::Next(cue)) => Response::ok(CueBody::from(cue)),
                    Ok(AdvanceOutcome::Completed { execution_id }) => {
                        Response::ok(CompletedBody {
                            execution_id,
                            workflow_state: cue_core::ExecutionState::Completed,
                        })
                    }
                    Err(e) => Response::error(&e),
                }
            }

            Request::GetCurrentStep { execution_id } => {
                self.respond(self.engine.get_current_step(&execution_id))
            }

            Request::GetExecutionStatus { execution_id } => {
                self.respond(self.engine.get_execution_status(&execution_id))
            }

            Request::GetStepHistory { execution_id } => self.respond(
                self.engine
                    .get_step_history(&execution_id)
                    .map(|steps| steps.into_iter().map(StepSummary::from).collect::<Vec<_>>()),
            ),

            Request::ListArtifacts { execution_id, step_name } => {
                self.respond(self.engine.list_artifacts(&execution_id, step_name.as_deref()))
            }

            Request::GetArtifact { artifact_id } => self.respond(
                self.engine.get_artifact(&artifact_id).map(|artifact| {
                    json!({
                        "artifact_id": artifact.artifact_id,
                        "execution_id": artifact.execution_id,
                        "step_name": artifact.step_name,
                        "artifact_type": artifact.kind,
                        "name": artifact.name,
                        "content": BASE64.encode(&artifact.content),
                        "content_type": artifact.content_type,
                        "size_bytes": artifact.size_bytes,
                        "metadata": artifact.metadata,
                        "created_at_ms": artifact.created_at_ms,
                    })
                }),
            ),

            Request::StoreArtifact {
                execution_id,
                step_name,
                artifact_type,
                name,
                content,
                binary,
                content_type,
                metadata,
            } => {
                let content = if binary {
                    match BASE64.decode(content.as_bytes()) {
                        Ok(bytes) => bytes,
                        Err(e) => return Response::invalid(format!("bad base64 content: {e}")),
                    }
                } else {
                    content.into_bytes()
                };
                self.respond(
                    self.engine
                        .store_artifact(NewArtifact {
                            execution_id,
                            step_name,
                            kind: artifact_type,
                            name,
                            content,
                            content_type,
                            metadata,
                        })
                        .map(|artifact| ArtifactBody {
                            artifact_id: artifact.artifact_id.to_string(),
                            artifact_type: artifact.kind,
                            name: artifact.name,
                            size_bytes: artifact.size_bytes,
                        }),
                )
            }

            Request::StoreFinding {
                execution_id,
                step_id,
                severity,
                category,
                title,
                description,
                tags,
                is_global,
                project_path,
                location,
                metadata,
            } => self.respond(
                self.engine
                    .record_finding(NewFinding {
                        execution_id,
                        step_id,
                        severity,
                        category,
                        title,
                        description,
                        tags,
                        is_global,
                        project_path,
                        location,
                        metadata,
                    })
                    .map(|(finding, state)| FindingBody {
                        finding_id: finding.finding_id.to_string(),
                        severity: finding.severity,
                        execution_state: state,
                        escalated: state == cue_core::ExecutionState::Escalated,
                    }),
            ),

            Request::QueryFindings {
                execution_id,
                project_path,
                severities,
                category,
                tags,
                search,
                limit,
            } => {
                let filter = FindingFilter {
                    execution_id: execution_id.map(cue_core::ExecutionId::from_string),
                    project_id: None,
                    severities,
                    category,
                    tags,
                    search,
                    limit,
                };
                self.respond(self.engine.query_findings(&filter, project_path.as_deref()))
            }

            Request::FindingCounts { execution_id } => {
                let filter = FindingFilter {
                    execution_id: execution_id.map(cue_core::ExecutionId::from_string),
                    ..FindingFilter::default()
                };
                self.respond(self.engine.finding_counts(&filter))
            }

            Request::LogEvent {
                execution_id,
                layer,
                layer_id,
                level,
                message,
                context,
                contract_input,
                contract_output,
            } => {
                let mut entry = LogEntry::new(
                    cue_core::ExecutionId::from_string(execution_id),
                    layer,
                    layer_id,
                    level,
                    message,
                    0,
                );
                entry.context = context;
                entry.contract_input = contract_input;
                entry.contract_output = contract_output;
                self.respond(self.engine.log_event(entry))
            }

            Request::QueryLogs { execution_id, layer, level, limit } => self.respond(
                self.engine.query_logs(&execution_id, &LogFilter { layer, level, limit }),
            ),

            Request::ListTelemetry { execution_id, event_type, limit } => self.respond(
                self.engine.list_telemetry(execution_id.as_deref(), event_type.as_deref(), limit),
            ),

            Request::ListWorkflows => self.respond(self.engine.list_workflows()),

            Request::GetWorkflow { name } => self.respond(self.engine.get_workflow(&name)),

            Request::RegisterWorkflow { workflow } => self.respond(
                self.engine
                    .register_workflow(&workflow)
                    .map(|hash| json!({"name": workflow.name, "hash": hash})),
            ),

            Request::RegisterAgent { agent } => self.respond(
                self.engine.register_agent(&agent).map(|()| json!({"name": agent.name})),
            ),

            Request::ListProjects => self.respond(self.engine.list_projects()),

            Request::GetProjectContext { path } => self.respond(
                self.engine
                    .project_context(&path)
                    .map(|(project, finding_counts)| ProjectContextBody {
                        project,
                        finding_counts,
                    }),
            ),

            Request::RegisterProject { name, path, is_git_repo, metadata } => {
                self.respond(self.engine.register_project(&name, &path, is_git_repo, metadata))
            }

            Request::ListIncomplete => self.respond(self.engine.list_incomplete_executions()),

            Request::ResumeExecution { execution_id } => {
                self.respond(self.engine.resume_execution(&execution_id).map(CueBody::from))
            }

            Request::CheckTimeouts => self.respond(
                self.engine.check_timeouts().map(|transitioned| {
                    transitioned
                        .into_iter()
                        .map(|e| e.execution_id.to_string())
                        .collect::<Vec<_>>()
                }),
            ),

            Request::ServerStatus => {
                let store_healthy = self.engine.store().health_check();
                let incomplete = self
                    .engine
                    .list_incomplete_executions()
                    .map(|list| list.len() as u32)
                    .unwrap_or(0);
                Response::ok(ServerStatusBody {
                    version: VERSION.to_string(),
                    uptime_ms: self.start_time.elapsed().as_millis() as u64,
                    store_healthy,
                    incomplete_executions: incomplete,
                })
            }

            // the listener intercepts Shutdown before dispatch; answering
            // here keeps handle() total
            Request::Shutdown => Response::ok(json!({"stopping": true})),
        }
    }

    fn respond(&self, result: Result<impl serde::Serialize, EngineError>) -> Response {
        match result {
            Ok(body) => Response::ok(body),
            Err(e) => Response::error(&e),
        }
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
