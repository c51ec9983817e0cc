//! Print a summary of a GIF, WAV, ZIP, BCX or TDB file.
//!
//! ```text
//! RUST_LOG=debug cargo run --example inspect -- path/to/file.gif
//! ```

use std::env;
use std::fs;
use std::path::Path;

use binscope::formats::gif::Block;
use binscope::{Error, Result};

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: inspect <file>");
        std::process::exit(2);
    };
    let bytes = fs::read(&path)?;
    let extension = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "gif" => {
            let gif = binscope::parse_gif(&bytes)?;
            println!(
                "GIF{} {}x{}, {} blocks",
                gif.version,
                gif.screen.width,
                gif.screen.height,
                gif.blocks.len()
            );
            if let Some(loops) = gif.loop_count() {
                println!("loop count: {loops}");
            }
            for (i, image) in gif.images().enumerate() {
                let pixels = image.decode_indices()?;
                println!(
                    "image {i}: {}x{} at ({}, {}), {} pixels",
                    image.descriptor.width,
                    image.descriptor.height,
                    image.descriptor.left,
                    image.descriptor.top,
                    pixels.len()
                );
            }
            for block in &gif.blocks {
                if let Block::Comment(comment) = block {
                    println!("comment: {}", comment.text());
                }
            }
        }
        "wav" => {
            let wav = binscope::parse_wav(&bytes)?;
            println!(
                "{:?}, {} channels, {} Hz, {} bytes of samples",
                wav.format.format,
                wav.format.channels,
                wav.format.sample_rate,
                wav.data.len()
            );
            if let Some(duration) = wav.duration() {
                println!("duration: {:.3}s", duration.as_secs_f64());
            }
            for (field, value) in &wav.info {
                println!("{field}: {value}");
            }
        }
        "zip" => {
            let zip = binscope::parse_zip(&bytes)?;
            for entry in &zip.entries {
                println!(
                    "{:>10} {:>10}  {}  {:<12} {}",
                    entry.central.compressed_size,
                    entry.central.uncompressed_size,
                    entry.central.modified,
                    entry.compression_method_name().unwrap_or("?"),
                    entry.name()
                );
            }
            let comment = &zip.end_of_central_directory.comment;
            if !comment.is_empty() {
                println!("comment: {comment}");
            }
        }
        "bcx" => {
            let model = binscope::parse_bcx(&bytes)?;
            println!(
                "{} bones, {} parts, {} animations",
                model.skeleton.len(),
                model.parts.len(),
                model.animations.len()
            );
            for (i, part) in model.parts.iter().enumerate() {
                println!(
                    "part {i}: bone {}, {} vertices, {} polygons",
                    part.header.bone_index,
                    part.vertices.len(),
                    part.polygons.len()
                );
            }
        }
        "tdb" => {
            let tdb = binscope::parse_tdb(&bytes)?;
            println!("{} images, {} palettes", tdb.images.len(), tdb.palettes.len());
        }
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "no parser for extension {other:?}"
            )));
        }
    }

    Ok(())
}
