//! Shared codecs, schema and dispatcher under parallel load

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use bytes::BytesMut;
use quiz_protocol::protocol::dispatcher::ServerDispatcher;
use quiz_protocol::protocol::packets::*;
use quiz_protocol::{quiz_schema, ClientCodec, Direction, PacketSet, ServerCodec};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::codec::{Decoder, Encoder};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    let iterations = 2_000usize;
    let mut tasks = JoinSet::new();

    for worker in 0..8usize {
        tasks.spawn(async move {
            let mut client = ClientCodec::new();
            let mut server = ServerCodec::new();
            let mut buf = BytesMut::new();
            let packets = common::client_packets();

            for i in 0..iterations {
                let packet = packets[(i + worker) % packets.len()].clone();
                client.encode(packet.clone(), &mut buf).unwrap();
                let decoded = server.decode(&mut buf).unwrap();
                assert_eq!(decoded, Some(packet));
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_schema_access() {
    let mut tasks = JoinSet::new();

    for _ in 0..16 {
        tasks.spawn(async move {
            let schema = quiz_schema().unwrap();
            for packet in common::server_packets() {
                let bytes = packet.to_bytes().unwrap();
                let (definition, _) = schema.decode(Direction::Server, &bytes).unwrap();
                assert_eq!(definition.opcode(), packet.opcode());
            }
            schema as *const _ as usize
        });
    }

    // Every task sees the same table
    let mut addresses = Vec::new();
    while let Some(res) = tasks.join_next().await {
        addresses.push(res.unwrap());
    }
    addresses.dedup();
    assert_eq!(addresses.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatch_with_registration() {
    let dispatcher = ServerDispatcher::new();
    let answered = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&answered);
    dispatcher
        .register(AnswerPacket::OPCODE, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(vec![ServerPacket::from(AnswerResultPacket { result: true })])
        })
        .unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..8u8 {
        let dispatcher = dispatcher.clone();
        tasks.spawn(async move {
            for _ in 0..500 {
                let replies = dispatcher
                    .dispatch(&ClientPacket::from(AnswerPacket { id: i }))
                    .unwrap();
                assert_eq!(replies.len(), 1);
            }
            // Registering while others dispatch must not deadlock
            dispatcher
                .register(KickPacket::OPCODE, |_| Ok(vec![]))
                .unwrap();
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
    assert_eq!(answered.load(Ordering::Relaxed), 8 * 500);
    assert!(dispatcher.is_registered(KickPacket::OPCODE));
}
