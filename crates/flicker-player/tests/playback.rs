//! Playback tests over hand-built documents.

use flicker_player::Player;
use flicker_swf::{Status, SwfDecoder, TagCode};

fn tag(code: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    assert!(body.len() < 0x3f);
    out.extend_from_slice(&((code << 6) | body.len() as u16).to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn header_block(frame_count: u16) -> Vec<u8> {
    // nbits=8 rectangle 0,100,0,100 followed by rate 1.0 and the count.
    let mut bits: Vec<bool> = Vec::new();
    let mut push = |value: u32, n: u32| {
        for i in (0..n).rev() {
            bits.push((value >> i) & 1 != 0);
        }
    };
    push(8, 5);
    for v in [0u32, 100, 0, 100] {
        push(v, 8);
    }
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            out[i / 8] |= 1 << (7 - i % 8);
        }
    }
    out.extend_from_slice(&256u16.to_le_bytes());
    out.extend_from_slice(&frame_count.to_le_bytes());
    out
}

fn swf_file(frame_count: u16, tags: &[Vec<u8>]) -> Vec<u8> {
    let mut body = header_block(frame_count);
    for t in tags {
        body.extend_from_slice(t);
    }
    let mut out = vec![b'F', b'W', b'S', 6];
    out.extend_from_slice(&((body.len() + 8) as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

fn trace_actions(message: &str) -> Vec<u8> {
    let mut out = vec![0x96];
    out.extend_from_slice(&((message.len() + 2) as u16).to_le_bytes());
    out.push(0);
    out.extend_from_slice(message.as_bytes());
    out.push(0);
    out.push(0x26);
    out.push(0x00);
    out
}

fn player_for(frame_count: u16, tags: &[Vec<u8>]) -> Player {
    let file = swf_file(frame_count, tags);
    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    Player::new(dec).unwrap()
}

#[test]
fn frame_scripts_trace_in_order() {
    let tags = vec![
        tag(TagCode::DoAction.code(), &trace_actions("one")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::DoAction.code(), &trace_actions("two")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(2, &tags);
    player.run_frames(2);
    assert_eq!(player.take_traces(), vec!["one", "two"]);
}

#[test]
fn placements_build_the_display_list() {
    // Frame 1 places character 9 at depth 3; frame 2 removes it.
    let mut place = vec![0b0000_0010];
    place.extend_from_slice(&3u16.to_le_bytes());
    place.extend_from_slice(&9u16.to_le_bytes());
    let mut remove = Vec::new();
    remove.extend_from_slice(&3u16.to_le_bytes());
    let tags = vec![
        tag(TagCode::PlaceObject2.code(), &place),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::RemoveObject2.code(), &remove),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(2, &tags);
    player.advance_frame();
    assert_eq!(player.display().len(), 1);
    assert_eq!(player.display().get(3).unwrap().character_id, 9);
    player.advance_frame();
    assert!(player.display().is_empty());
}

#[test]
fn stop_action_halts_advancement() {
    let stop = vec![0x07, 0x00]; // stop; end
    let tags = vec![
        tag(TagCode::DoAction.code(), &stop),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(2, &tags);
    player.advance_frame();
    assert!(!player.playing());
    assert_eq!(player.current_frame(), 0);
    // Still frame 0 on the next tick.
    player.advance_frame();
    assert_eq!(player.current_frame(), 0);
}

#[test]
fn goto_action_overrides_advancement() {
    // Frame 0 jumps straight to frame 2 (operand is zero-based).
    let mut goto = vec![0x81, 2, 0];
    goto.extend_from_slice(&2u16.to_le_bytes());
    goto.push(0x00);
    let tags = vec![
        tag(TagCode::DoAction.code(), &goto),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::DoAction.code(), &trace_actions("skipped")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::DoAction.code(), &trace_actions("landed")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(3, &tags);
    player.advance_frame();
    assert_eq!(player.current_frame(), 2);
    player.advance_frame();
    assert_eq!(player.take_traces(), vec!["landed"]);
}

#[test]
fn timeline_wraps_at_the_end() {
    let tags = vec![
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(2, &tags);
    assert_eq!(player.current_frame(), 0);
    player.advance_frame();
    assert_eq!(player.current_frame(), 1);
    player.advance_frame();
    assert_eq!(player.current_frame(), 0);
}

#[test]
fn script_error_does_not_stop_playback() {
    // An unknown opcode aborts its script; the next frame still runs.
    let bad = vec![0x2a, 0x00];
    let tags = vec![
        tag(TagCode::DoAction.code(), &bad),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::DoAction.code(), &trace_actions("still here")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(2, &tags);
    player.run_frames(2);
    assert_eq!(player.take_traces(), vec!["still here"]);
}

#[test]
fn variables_persist_across_frames() {
    // Frame 0: x = "saved"; frame 1: trace(x).
    let mut set = vec![0x96];
    let payload: Vec<u8> = {
        let mut p = vec![0u8];
        p.extend_from_slice(b"x\0");
        p.push(0);
        p.extend_from_slice(b"saved\0");
        p
    };
    set.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    set.extend_from_slice(&payload);
    set.push(0x1d); // set variable
    set.push(0x00);

    let mut get = vec![0x96, 3, 0, 0];
    get.extend_from_slice(b"x\0");
    get.push(0x1c); // get variable
    get.push(0x26); // trace
    get.push(0x00);

    let tags = vec![
        tag(TagCode::DoAction.code(), &set),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::DoAction.code(), &get),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::End.code(), &[]),
    ];
    let mut player = player_for(2, &tags);
    player.run_frames(2);
    assert_eq!(player.take_traces(), vec!["saved"]);
}
