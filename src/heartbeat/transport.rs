//! The request/response exchange carrying heartbeats.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::message::{HeartbeatRequest, HeartbeatResponse};
use crate::master::heartbeat::MasterHeartbeatHandler;

/// The heartbeat did not reach the coordinator, or its answer did not come back.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("Heartbeat transport failed: {0}")]
    Transport(String),
}

/// Delivers a worker heartbeat and returns the coordinator's answer.
#[async_trait]
pub trait HeartbeatTransport: Send + Sync {
    async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatResponse, HeartbeatError>;
}

/// Calls an in-process coordinator directly.
pub struct LocalTransport {
    handler: Arc<MasterHeartbeatHandler>,
}

impl LocalTransport {
    pub fn new(handler: Arc<MasterHeartbeatHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl HeartbeatTransport for LocalTransport {
    async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatResponse, HeartbeatError> {
        Ok(self.handler.handle(request))
    }
}
