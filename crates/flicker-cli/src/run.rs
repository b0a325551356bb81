use std::path::PathBuf;

use anyhow::Result;

use flicker_player::Player;

use crate::decode_file;

pub fn run(file: &PathBuf, frames: Option<u32>) -> Result<()> {
    let decoder = decode_file(file)?;
    let mut player = Player::new(decoder)?;

    let frames = frames.unwrap_or_else(|| player.decoder().frame_count().max(1) as u32);
    for _ in 0..frames {
        player.advance_frame();
        for line in player.take_traces() {
            println!("{line}");
        }
        if !player.playing() {
            break;
        }
    }
    Ok(())
}
