//! Sample packets shared by the integration tests

#![allow(dead_code)]

use bytes::Bytes;
use quiz_protocol::core::value::{Record, Value};
use quiz_protocol::protocol::enums::{PlayerDataMode, States};
use quiz_protocol::protocol::packets::*;

pub fn sample_question() -> QuestionData {
    QuestionData {
        image_type: "image/png".into(),
        image: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
        question: "Capital of France?".into(),
        answers: vec!["Paris".into(), "Lyon".into(), "Nice".into()],
        values: vec![1, 0, 0],
    }
}

pub fn server_packets() -> Vec<ServerPacket> {
    vec![
        DisconnectPacket::new("bye").into(),
        ErrorPacket::new("Game not found").into(),
        JoinGamePacket {
            id: "A1B2C".into(),
            owner: true,
            title: "Geography".into(),
        }
        .into(),
        NameTakenResultPacket { result: false }.into(),
        GameStatePacket::new(States::Start).into(),
        PlayerDataPacket::new("7F3", "Alice", PlayerDataMode::Add).into(),
        TimeSyncPacket::new(30_000, 12_345).into(),
        sample_question().to_question().into(),
        AnswerResultPacket { result: true }.into(),
        ScoresPacket::new([("Alice", 1200u32)]).into(),
    ]
}

pub fn client_packets() -> Vec<ClientPacket> {
    vec![
        CreateGamePacket {
            title: "Geography".into(),
            questions: vec![sample_question(), sample_question()],
        }
        .into(),
        CheckNameTakenPacket {
            id: "A1B2C".into(),
            name: "Alice".into(),
        }
        .into(),
        RequestGameStatePacket { id: "A1B2C".into() }.into(),
        RequestJoinPacket {
            id: "A1B2C".into(),
            name: "Bob".into(),
        }
        .into(),
        StateChangePacket::new(States::Skip).into(),
        AnswerPacket { id: 2 }.into(),
        KickPacket { id: "7F3".into() }.into(),
    ]
}

fn question_record(question: &QuestionData) -> Record {
    Record::new()
        .with("imageType", question.image_type.as_str())
        .with("image", question.image.to_vec())
        .with("question", question.question.as_str())
        .with("answers", Value::list(question.answers.iter().map(String::as_str)))
        .with("values", Value::list(question.values.iter().copied()))
}

/// The generic record carrying the same fields as a typed server packet
pub fn server_record(packet: &ServerPacket) -> Record {
    match packet {
        ServerPacket::Disconnect(p) => Record::new().with("reason", p.reason.as_str()),
        ServerPacket::Error(p) => Record::new().with("cause", p.cause.as_str()),
        ServerPacket::JoinGame(p) => Record::new()
            .with("id", p.id.as_str())
            .with("owner", p.owner)
            .with("title", p.title.as_str()),
        ServerPacket::NameTakenResult(p) => Record::new().with("result", p.result),
        ServerPacket::GameState(p) => Record::new().with("state", p.state),
        ServerPacket::PlayerData(p) => Record::new()
            .with("id", p.id.as_str())
            .with("name", p.name.as_str())
            .with("mode", p.mode),
        ServerPacket::TimeSync(p) => Record::new()
            .with("total", p.total)
            .with("remaining", p.remaining),
        ServerPacket::Question(p) => Record::new()
            .with("imageType", p.image_type.as_str())
            .with("image", p.image.to_vec())
            .with("question", p.question.as_str())
            .with("answers", Value::list(p.answers.iter().map(String::as_str))),
        ServerPacket::AnswerResult(p) => Record::new().with("result", p.result),
        ServerPacket::Scores(p) => Record::new().with(
            "scores",
            Value::map(p.scores.iter().map(|(name, score)| (name.as_str(), *score))),
        ),
    }
}

/// The generic record carrying the same fields as a typed client packet
pub fn client_record(packet: &ClientPacket) -> Record {
    match packet {
        ClientPacket::CreateGame(p) => Record::new().with("title", p.title.as_str()).with(
            "questions",
            p.questions.iter().map(question_record).collect::<Vec<_>>(),
        ),
        ClientPacket::CheckNameTaken(p) => Record::new()
            .with("id", p.id.as_str())
            .with("name", p.name.as_str()),
        ClientPacket::RequestGameState(p) => Record::new().with("id", p.id.as_str()),
        ClientPacket::RequestJoin(p) => Record::new()
            .with("id", p.id.as_str())
            .with("name", p.name.as_str()),
        ClientPacket::StateChange(p) => Record::new().with("state", p.state),
        ClientPacket::Answer(p) => Record::new().with("id", p.id),
        ClientPacket::Kick(p) => Record::new().with("id", p.id.as_str()),
    }
}
