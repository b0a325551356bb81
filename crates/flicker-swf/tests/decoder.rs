//! End-to-end decoder tests over hand-built streams.

use std::io::Write;

use flicker_swf::{Character, FrameAction, Status, SwfDecoder, TagCode};

/// Encode a short- or long-form tag header plus body.
fn tag(code: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if body.len() < 0x3f {
        out.extend_from_slice(&((code << 6) | body.len() as u16).to_le_bytes());
    } else {
        out.extend_from_slice(&((code << 6) | 0x3f).to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    }
    out.extend_from_slice(body);
    out
}

/// Force the long-form header regardless of body size.
fn tag_long(code: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&((code << 6) | 0x3f).to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn end_tag() -> Vec<u8> {
    tag(TagCode::End.code(), &[])
}

/// The stream dimensions record: a 0,0,100,100-twip rectangle with 8-bit
/// fields, rate 1.0 (256/256), and the given frame count.
fn header_block(frame_count: u16) -> Vec<u8> {
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

/// Assemble a whole plain-variant file.
fn swf_file(version: u8, frame_count: u16, tags: &[Vec<u8>]) -> Vec<u8> {
    let mut body = header_block(frame_count);
    for t in tags {
        body.extend_from_slice(t);
    }
    let mut out = vec![b'F', b'W', b'S', version];
    out.extend_from_slice(&((body.len() + 8) as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// A trace script: push a string, trace it, end.
fn trace_actions(message: &str) -> Vec<u8> {
    let mut out = vec![0x96];
    out.extend_from_slice(&((message.len() + 2) as u16).to_le_bytes());
    out.push(0);
    out.extend_from_slice(message.as_bytes());
    out.push(0);
    out.push(0x26); // trace
    out.push(0x00); // end
    out
}

fn frame_label_body(label: &str) -> Vec<u8> {
    let mut out = label.as_bytes().to_vec();
    out.push(0);
    out
}

#[test]
fn minimal_valid_file_initializes_then_ends() {
    let file = swf_file(6, 1, &[end_tag()]);
    let mut dec = SwfDecoder::new();
    // The header completes: dimensions become known.
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    // 100 twips at 20 twips per pixel.
    assert_eq!(dec.dimensions(), Some((5, 5)));
    assert_eq!(dec.frame_rate(), Some(1.0));
    assert_eq!(dec.version(), 6);
    assert_eq!(dec.frame_count(), 1);
    // Resuming reaches the end marker.
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    assert_eq!(dec.character_count(), 0);
}

#[test]
fn bad_magic_is_fatal() {
    let mut dec = SwfDecoder::new();
    assert!(dec.feed(b"XWS\x06\x08\x00\x00\x00").is_err());
}

#[test]
fn need_data_is_idempotent() {
    // A DefineSound tag declaring 10 payload bytes, only 5 provided.
    let mut sound_body = 1u16.to_le_bytes().to_vec();
    sound_body.push(0x20); // format
    sound_body.extend_from_slice(&4u32.to_le_bytes());
    sound_body.extend_from_slice(&[9, 9, 9]);
    let sound = tag(TagCode::DefineSound.code(), &sound_body);
    let (provided, withheld) = sound.split_at(sound.len() - 4);

    let mut file = swf_file(6, 1, &[]);
    file.extend_from_slice(provided);

    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    // The incomplete tag parks the parser; retrying with no new bytes
    // changes nothing, any number of times.
    for _ in 0..5 {
        assert_eq!(dec.feed(&[]).unwrap(), Status::NeedData);
        assert_eq!(dec.character_count(), 0);
    }
    // The remainder completes the tag.
    let mut rest = withheld.to_vec();
    rest.extend_from_slice(&end_tag());
    assert_eq!(dec.feed(&rest).unwrap(), Status::Eof);
    assert_eq!(dec.character_count(), 1);
    assert!(matches!(
        dec.character(1),
        Some(Character::Sound {
            format: 2,
            sample_count: 4,
            ..
        })
    ));
}

#[test]
fn tag_boundaries_with_mixed_header_forms() {
    // K frames, each a label plus a show-frame; one label uses the
    // long-form header despite fitting the short form.
    let tags = vec![
        tag(TagCode::FrameLabel.code(), &frame_label_body("one")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag_long(TagCode::FrameLabel.code(), &frame_label_body("two")),
        tag(TagCode::ShowFrame.code(), &[]),
        tag(TagCode::FrameLabel.code(), &frame_label_body("three")),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 3, &tags);
    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    let root = dec.root_sprite();
    assert_eq!(root.frames_loaded(), 3);
    for (i, label) in ["one", "two", "three"].iter().enumerate() {
        assert_eq!(root.frame(i as u16).unwrap().label.as_deref(), Some(*label));
        assert_eq!(root.frame_for_label(label), Some(i as u16));
    }
}

#[test]
fn byte_at_a_time_feeding_matches_bulk() {
    let tags = vec![
        tag(TagCode::SetBackgroundColor.code(), &[0x11, 0x22, 0x33]),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);

    let mut dec = SwfDecoder::new();
    let mut inits = 0;
    let mut last = Status::NeedData;
    for &b in &file {
        last = dec.feed(&[b]).unwrap();
        if last == Status::Init {
            inits += 1;
        }
    }
    assert_eq!(inits, 1, "dimensions reported exactly once");
    assert_eq!(last, Status::Eof);
    assert_eq!(dec.dimensions(), Some((5, 5)));
    let bg = dec.background_color();
    assert_eq!((bg.r, bg.g, bg.b), (0x11, 0x22, 0x33));
    assert_eq!(dec.frames_loaded(), 1);
}

#[test]
fn compressed_stream_round_trip() {
    let tags = vec![
        tag(TagCode::FrameLabel.code(), &frame_label_body("zipped")),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let plain = swf_file(6, 1, &tags);
    // Compress everything after the 8-byte signature.
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&plain[8..]).unwrap();
    let deflated = encoder.finish().unwrap();
    let mut file = plain[..8].to_vec();
    file[0] = b'C';
    file.extend_from_slice(&deflated);

    let mut dec = SwfDecoder::new();
    // Feed in small chunks to exercise incremental inflation.
    let mut statuses = Vec::new();
    for chunk in file.chunks(7) {
        statuses.push(dec.feed(chunk).unwrap());
    }
    assert_eq!(*statuses.last().unwrap(), Status::Eof);
    assert_eq!(dec.dimensions(), Some((5, 5)));
    assert_eq!(dec.root_sprite().frame_for_label("zipped"), Some(0));
}

#[test]
fn unknown_tags_are_skipped_not_fatal() {
    let tags = vec![
        tag(500, &[1, 2, 3, 4]),
        tag(TagCode::FrameLabel.code(), &frame_label_body("after")),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    assert_eq!(dec.root_sprite().frame_for_label("after"), Some(0));
}

#[test]
fn malformed_tag_costs_only_itself() {
    // A DefineShape whose payload ends mid-rectangle.
    let bad_shape = tag(TagCode::DefineShape.code(), &[7, 0, 0xff]);
    let tags = vec![
        bad_shape,
        tag(TagCode::FrameLabel.code(), &frame_label_body("alive")),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    assert_eq!(dec.character_count(), 0);
    assert_eq!(dec.root_sprite().frame_for_label("alive"), Some(0));
}

#[test]
fn first_only_tag_after_first_is_skipped() {
    let tags = vec![
        tag(TagCode::FileAttributes.code(), &[0, 0, 0, 0]),
        tag(TagCode::FileAttributes.code(), &[0, 0, 0, 0]),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(7, 1, &tags);
    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    // The duplicate only warns; the stream still completes.
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    assert_eq!(dec.frames_loaded(), 1);
}

#[test]
fn duplicate_character_id_is_rejected() {
    let mut shape = 5u16.to_le_bytes().to_vec();
    // nbits=0 rectangle: a single zero byte.
    shape.push(0);
    shape.extend_from_slice(&[1, 2, 3]);
    let tags = vec![
        tag(TagCode::DefineShape.code(), &shape),
        tag(TagCode::DefineShape.code(), &shape),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    dec.feed(&file).unwrap();
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    assert_eq!(dec.character_count(), 1);
}

#[test]
fn place_object_2_records_placement() {
    // has_name | has_character, depth 3, id 9, name "hero".
    let mut body = vec![0b0010_0010];
    body.extend_from_slice(&3u16.to_le_bytes());
    body.extend_from_slice(&9u16.to_le_bytes());
    body.extend_from_slice(b"hero\0");
    let tags = vec![
        tag(TagCode::PlaceObject2.code(), &body),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    dec.feed(&file).unwrap();
    dec.feed(&[]).unwrap();

    let frame = dec.root_sprite().frame(0).unwrap();
    assert_eq!(frame.actions.len(), 1);
    let FrameAction::Place(p) = &frame.actions[0] else {
        panic!("expected a placement");
    };
    assert_eq!(p.depth, 3);
    assert_eq!(p.character_id, Some(9));
    assert_eq!(p.name.as_deref(), Some("hero"));
    assert!(!p.is_move);
    assert!(p.matrix.is_none());
}

#[test]
fn do_action_scripts_attach_to_frames() {
    let tags = vec![
        tag(TagCode::DoAction.code(), &trace_actions("hi")),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    dec.feed(&file).unwrap();
    dec.feed(&[]).unwrap();

    let frame = dec.root_sprite().frame(0).unwrap();
    assert!(matches!(frame.actions[0], FrameAction::Script(_)));
    assert_eq!(dec.script_count(), 1);
}

#[test]
fn define_sprite_parses_nested_tags() {
    // Sprite 4 with one frame: a placement, a script, a show-frame.
    let mut sprite_body = 4u16.to_le_bytes().to_vec();
    sprite_body.extend_from_slice(&1u16.to_le_bytes());
    let mut place = vec![0b0000_0010];
    place.extend_from_slice(&1u16.to_le_bytes());
    place.extend_from_slice(&7u16.to_le_bytes());
    sprite_body.extend_from_slice(&tag(TagCode::PlaceObject2.code(), &place));
    sprite_body.extend_from_slice(&tag(TagCode::DoAction.code(), &trace_actions("in sprite")));
    sprite_body.extend_from_slice(&tag(TagCode::ShowFrame.code(), &[]));
    sprite_body.extend_from_slice(&end_tag());

    let tags = vec![
        tag(TagCode::DefineSprite.code(), &sprite_body),
        tag(TagCode::ShowFrame.code(), &[]),
        end_tag(),
    ];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    dec.feed(&file).unwrap();
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);

    let Some(Character::Sprite(sprite)) = dec.character(4) else {
        panic!("expected sprite character");
    };
    assert_eq!(sprite.frame_count(), 1);
    assert_eq!(sprite.frames_loaded(), 1);
    let frame = sprite.frame(0).unwrap();
    assert_eq!(frame.actions.len(), 2);
    assert!(matches!(frame.actions[0], FrameAction::Place(_)));
    assert!(matches!(frame.actions[1], FrameAction::Script(_)));
    // Nested frames never leak onto the root timeline.
    assert_eq!(dec.root_sprite().frame(0).unwrap().actions.len(), 0);
}

#[test]
fn export_assets_are_recorded() {
    let mut body = 1u16.to_le_bytes().to_vec();
    body.extend_from_slice(&9u16.to_le_bytes());
    body.extend_from_slice(b"logo\0");
    let tags = vec![tag(TagCode::ExportAssets.code(), &body), end_tag()];
    let file = swf_file(6, 1, &tags);
    let mut dec = SwfDecoder::new();
    dec.feed(&file).unwrap();
    dec.feed(&[]).unwrap();
    assert_eq!(dec.export("logo"), Some(9));
    assert_eq!(dec.export("missing"), None);
}

#[test]
fn signal_eof_before_completion() {
    let file = swf_file(6, 1, &[tag(TagCode::ShowFrame.code(), &[])]);
    let mut dec = SwfDecoder::new();
    assert_eq!(dec.feed(&file).unwrap(), Status::Init);
    assert_eq!(dec.feed(&[]).unwrap(), Status::NeedData);
    // Transport ends without an end tag: what was decoded stays valid.
    assert_eq!(dec.signal_eof(), Status::Eof);
    assert_eq!(dec.feed(&[]).unwrap(), Status::Eof);
    assert_eq!(dec.frames_loaded(), 1);
}
