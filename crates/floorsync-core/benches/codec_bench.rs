//! Criterion benchmarks for the floorsync framing and payload codec.
//!
//! The receive worker decodes every packet on the I/O thread, so the position
//! batch (the largest and most frequent payload) is the one that matters.
//!
//! Run with:
//! ```bash
//! cargo bench --package floorsync-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use floorsync_core::protocol::codec::{
    decode_datagram, decode_payload, decode_type_and_payload, encode_message,
};
use floorsync_core::protocol::messages::{
    AllPositionUpdateMessage, ChatMessage, GameState, GameStatusMessage, Message, PlayerMotion,
    PlayerStatus, TaggingMessage, Team,
};
use floorsync_core::protocol::types::MAX_PLAYERS;

fn make_position_batch() -> Message {
    let mut players = [PlayerMotion::default(); MAX_PLAYERS];
    for (i, m) in players.iter_mut().enumerate() {
        *m = PlayerMotion {
            x: i as f32 * 10.0,
            y: i as f32 * 5.0,
            vx: 1.5,
            vy: -0.5,
        };
    }
    Message::AllPositionUpdate(AllPositionUpdateMessage {
        floor: 1,
        on_floor_mask: 0xFFFF,
        players,
    })
}

fn make_game_status() -> Message {
    let mut players = [PlayerStatus::default(); MAX_PLAYERS];
    for (i, p) in players.iter_mut().enumerate() {
        *p = PlayerStatus {
            valid: i % 2 == 0,
            team: if i % 3 == 0 { Team::A } else { Team::B },
            character: i as u8,
            ready: true,
        };
    }
    Message::GameStatus(GameStatusMessage {
        game_state: GameState::Running,
        players,
    })
}

fn make_chat() -> Message {
    Message::Chat(ChatMessage {
        sender: 4,
        text: "see you on floor two".to_string(),
    })
}

fn make_tagging() -> Message {
    Message::Tagging(TaggingMessage {
        tagger_id: 2,
        objective_id: 11,
    })
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, msg) in [
        ("all_position_update", make_position_batch()),
        ("game_status", make_game_status()),
        ("chat", make_chat()),
        ("tagging", make_tagging()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, m| {
            b.iter(|| encode_message(black_box(m), 0).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let datagram = encode_message(&make_position_batch(), 123).unwrap();
    group.bench_function("all_position_update_datagram", |b| {
        b.iter(|| {
            let (t, payload, _) = decode_datagram(black_box(&datagram)).unwrap().unwrap();
            decode_payload(t, &payload).unwrap()
        })
    });

    let stream_frame = encode_message(&make_game_status(), 0).unwrap();
    group.bench_function("game_status_stream", |b| {
        b.iter(|| {
            let (t, payload) = decode_type_and_payload(black_box(&stream_frame)).unwrap().unwrap();
            decode_payload(t, &payload).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
