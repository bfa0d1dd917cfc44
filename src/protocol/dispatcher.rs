use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packets::{ClientPacket, PacketSet, ServerPacket};
use crate::utils::metrics::Timer;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type HandlerFn<In, Out> = dyn Fn(&In) -> Result<Vec<Out>> + Send + Sync + 'static;

/// Dispatcher used by servers: client packets in, server packets out
pub type ServerDispatcher = Dispatcher<ClientPacket, ServerPacket>;

/// Dispatcher used by clients: server packets in, client packets out
pub type ClientDispatcher = Dispatcher<ServerPacket, ClientPacket>;

/// Packet dispatcher with opcode routing.
///
/// Handlers receive a decoded packet and return the packets to send back.
/// Clones share the same handler table.
pub struct Dispatcher<In, Out> {
    handlers: Arc<RwLock<HashMap<u8, Box<HandlerFn<In, Out>>>>>,
}

impl<In, Out> Clone for Dispatcher<In, Out> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<In: PacketSet, Out> Default for Dispatcher<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: PacketSet, Out> Dispatcher<In, Out> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register `handler` for `opcode`, replacing any previous handler.
    ///
    /// The opcode must be defined for the incoming direction.
    pub fn register<F>(&self, opcode: u8, handler: F) -> Result<()>
    where
        F: Fn(&In) -> Result<Vec<Out>> + Send + Sync + 'static,
    {
        if !In::opcodes().contains(&opcode) {
            return Err(ProtocolError::UnknownPacket {
                direction: In::DIRECTION,
                opcode,
            });
        }

        let mut handlers = self.handlers.write().map_err(|_| {
            ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert(opcode, Box::new(handler));
        debug!(opcode, direction = %In::DIRECTION, "Registered packet handler");
        Ok(())
    }

    pub fn dispatch(&self, packet: &In) -> Result<Vec<Out>> {
        let _timer = Timer::start("dispatch");
        let opcode = packet.opcode();

        let handlers = self.handlers.read().map_err(|_| {
            ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
        })?;

        handlers
            .get(&opcode)
            .ok_or(ProtocolError::UnexpectedMessage)
            .and_then(|handler| handler(packet))
    }

    pub fn is_registered(&self, opcode: u8) -> bool {
        self.handlers
            .read()
            .map(|handlers| handlers.contains_key(&opcode))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::packets::{
        AnswerPacket, AnswerResultPacket, GameStatePacket, Packet, RequestGameStatePacket,
    };
    use crate::protocol::enums::States;

    #[test]
    fn test_dispatch_routes_by_opcode() {
        let dispatcher = ServerDispatcher::new();
        dispatcher
            .register(AnswerPacket::OPCODE, |packet| match packet {
                ClientPacket::Answer(answer) => Ok(vec![ServerPacket::from(AnswerResultPacket {
                    result: answer.id == 1,
                })]),
                _ => Err(ProtocolError::UnexpectedMessage),
            })
            .unwrap();
        dispatcher
            .register(RequestGameStatePacket::OPCODE, |_| {
                Ok(vec![GameStatePacket::new(States::Start).into()])
            })
            .unwrap();

        let replies = dispatcher
            .dispatch(&ClientPacket::from(AnswerPacket { id: 1 }))
            .unwrap();
        assert_eq!(
            replies,
            vec![ServerPacket::AnswerResult(AnswerResultPacket { result: true })]
        );

        let replies = dispatcher
            .dispatch(&ClientPacket::from(RequestGameStatePacket { id: "ABCDE".into() }))
            .unwrap();
        assert_eq!(replies, vec![ServerPacket::GameState(GameStatePacket { state: 1 })]);
    }

    #[test]
    fn test_unhandled_packet() {
        let dispatcher = ServerDispatcher::new();
        let result = dispatcher.dispatch(&ClientPacket::from(AnswerPacket { id: 0 }));
        assert!(matches!(result, Err(ProtocolError::UnexpectedMessage)));
    }

    #[test]
    fn test_register_unknown_opcode_rejected() {
        let dispatcher = ServerDispatcher::new();
        let result = dispatcher.register(0x09, |_| Ok(vec![]));
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownPacket { opcode: 0x09, .. })
        ));
        assert!(!dispatcher.is_registered(0x09));
    }

    #[test]
    fn test_clones_share_handlers() {
        let dispatcher = ClientDispatcher::new();
        let clone = dispatcher.clone();
        clone
            .register(AnswerResultPacket::OPCODE, |_| Ok(vec![]))
            .unwrap();
        assert!(dispatcher.is_registered(AnswerResultPacket::OPCODE));
    }
}
