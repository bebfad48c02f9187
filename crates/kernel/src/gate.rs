//! One-shot physics readiness.
//!
//! The physics subsystem may come up at any tick. Whoever builds the world
//! fires the [`ReadySignal`] once; the scene polls its [`PhysicsGate`] at tick
//! boundaries and owns the registry from then on.

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};

use shatter_common::SimConfig;
use shatter_physics::{PhysicsWorld, RigidBodyRegistry};

use crate::SceneError;

/// Create a linked signal/gate pair.
pub fn ready_channel() -> (ReadySignal, PhysicsGate) {
    let (tx, rx) = sync_channel(1);
    (ReadySignal(tx), PhysicsGate::Waiting(rx))
}

/// Sending half. Consumed on fire, so readiness is reported at most once.
#[derive(Debug)]
pub struct ReadySignal(SyncSender<PhysicsWorld>);

impl ReadySignal {
    /// Hand the initialized world to the scene. False if the gate is gone.
    pub fn fire(self, world: PhysicsWorld) -> bool {
        self.0.try_send(world).is_ok()
    }
}

/// Receiving half, held by the scene.
pub enum PhysicsGate {
    Waiting(Receiver<PhysicsWorld>),
    Ready(RigidBodyRegistry),
    /// The signal was dropped without firing; physics will never arrive.
    Closed,
}

impl PhysicsGate {
    /// A gate that is open from the start.
    pub fn ready(world: PhysicsWorld, config: &SimConfig) -> Self {
        Self::Ready(RigidBodyRegistry::new(world, config))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Check for the world. True only on the call that opens the gate.
    pub fn poll(&mut self, config: &SimConfig) -> bool {
        let received = match self {
            Self::Waiting(rx) => rx.try_recv(),
            _ => return false,
        };
        match received {
            Ok(world) => {
                *self = Self::ready(world, config);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("physics ready signal dropped without firing");
                *self = Self::Closed;
                false
            }
        }
    }

    /// Open the gate directly with a world. Ignored if already open.
    pub fn open(&mut self, world: PhysicsWorld, config: &SimConfig) -> bool {
        if self.is_ready() {
            tracing::warn!("physics already ready, ignoring second world");
            return false;
        }
        *self = Self::ready(world, config);
        true
    }

    pub fn registry(&self) -> Result<&RigidBodyRegistry, SceneError> {
        match self {
            Self::Ready(registry) => Ok(registry),
            _ => Err(SceneError::PhysicsNotReady),
        }
    }

    pub fn registry_mut(&mut self) -> Result<&mut RigidBodyRegistry, SceneError> {
        match self {
            Self::Ready(registry) => Ok(registry),
            _ => Err(SceneError::PhysicsNotReady),
        }
    }
}

impl std::fmt::Debug for PhysicsGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting(_) => write!(f, "PhysicsGate::Waiting"),
            Self::Ready(registry) => write!(f, "PhysicsGate::Ready({} bodies)", registry.body_count()),
            Self::Closed => write!(f, "PhysicsGate::Closed"),
        }
    }
}
