use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::decode_file;

#[derive(Serialize)]
struct InfoReport {
    version: u8,
    declared_length: u32,
    width: Option<u32>,
    height: Option<u32>,
    frame_rate: Option<f64>,
    frame_count: u16,
    frames_loaded: u16,
    background: String,
    characters: Vec<CharacterReport>,
    exports: Vec<ExportReport>,
}

#[derive(Serialize)]
struct CharacterReport {
    id: u16,
    kind: &'static str,
}

#[derive(Serialize)]
struct ExportReport {
    name: String,
    id: u16,
}

pub fn info(file: &PathBuf, json: bool) -> Result<()> {
    let decoder = decode_file(file)?;

    let bg = decoder.background_color();
    let mut characters: Vec<CharacterReport> = decoder
        .characters()
        .map(|(id, c)| CharacterReport { id, kind: c.kind() })
        .collect();
    characters.sort_by_key(|c| c.id);

    let report = InfoReport {
        version: decoder.version(),
        declared_length: decoder.declared_length(),
        width: decoder.dimensions().map(|d| d.0),
        height: decoder.dimensions().map(|d| d.1),
        frame_rate: decoder.frame_rate(),
        frame_count: decoder.frame_count(),
        frames_loaded: decoder.frames_loaded(),
        background: format!("#{:02x}{:02x}{:02x}", bg.r, bg.g, bg.b),
        characters,
        exports: {
            let mut exports: Vec<ExportReport> = decoder
                .exports()
                .map(|(name, id)| ExportReport {
                    name: name.to_owned(),
                    id,
                })
                .collect();
            exports.sort_by(|a, b| a.name.cmp(&b.name));
            exports
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("version:      {}", report.version);
    println!("length:       {} bytes", report.declared_length);
    match (report.width, report.height) {
        (Some(w), Some(h)) => println!("stage:        {w}x{h} px"),
        _ => println!("stage:        unknown (header incomplete)"),
    }
    if let Some(rate) = report.frame_rate {
        println!("frame rate:   {rate}");
    }
    println!(
        "frames:       {} declared, {} loaded",
        report.frame_count, report.frames_loaded
    );
    println!("background:   {}", report.background);
    println!("characters:   {}", report.characters.len());
    for c in &report.characters {
        println!("  #{:<5} {}", c.id, c.kind);
    }
    if !report.exports.is_empty() {
        println!("exports:      {}", report.exports.len());
        for e in &report.exports {
            println!("  {} -> #{}", e.name, e.id);
        }
    }
    Ok(())
}
