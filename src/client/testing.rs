//! In-memory sink used by unit tests

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use super::{ClientInfo, ClientSink, SinkError, SinkFuture};
use crate::protocol::message::{CloseReason, Outgoing, RoomUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Accept,
    Fail,
    Hang,
}

/// Sink recording every frame it receives
#[derive(Debug)]
pub(crate) struct RecordingSink {
    frames: Mutex<Vec<Outgoing>>,
    closed: Mutex<Vec<CloseReason>>,
    behavior: Mutex<Behavior>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            behavior: Mutex::new(Behavior::Accept),
        })
    }

    pub(crate) fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn frames(&self) -> Vec<Outgoing> {
        self.frames.lock().unwrap().clone()
    }

    /// Drain recorded frames
    pub(crate) fn take(&self) -> Vec<Outgoing> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }

    /// Rosters of every `info` frame received
    pub(crate) fn infos(&self) -> Vec<Vec<RoomUser>> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                Outgoing::Info { users, .. } => Some(users),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn close_reasons(&self) -> Vec<CloseReason> {
        self.closed.lock().unwrap().clone()
    }

    fn behavior(&self) -> Behavior {
        *self.behavior.lock().unwrap()
    }
}

impl ClientSink for RecordingSink {
    fn write(&self, message: Outgoing) -> SinkFuture<'_> {
        Box::pin(async move {
            match self.behavior() {
                Behavior::Accept => {
                    self.frames.lock().unwrap().push(message);
                    Ok(())
                }
                Behavior::Fail => Err(SinkError::Closed),
                Behavior::Hang => std::future::pending().await,
            }
        })
    }

    fn close(&self, reason: CloseReason) -> SinkFuture<'_> {
        Box::pin(async move {
            self.closed.lock().unwrap().push(reason);
            Ok(())
        })
    }
}

/// Anonymous client backed by a fresh recording sink
pub(crate) fn client() -> (ClientInfo, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);
    let info = ClientInfo::new(addr, sink.clone());
    (info, sink)
}
