//! Remove the background of a single photo.
//!
//! Usage:
//! ```sh
//! cargo run --example remove_background -- input.jpg output.png [scene] [mode]
//! ```

use std::env;
use std::path::Path;
use std::process;

use photolab::{remove_background, save_image, OutputMode, RemovalOptions, SceneType};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output> [scene] [mode]", args[0]);
        process::exit(1);
    }

    let parsed = (
        args.get(3).map_or(Ok(SceneType::Auto), |s| s.parse()),
        args.get(4).map_or(Ok(OutputMode::Transparent), |s| s.parse()),
    );
    let (scene, output) = match parsed {
        (Ok(scene), Ok(output)) => (scene, output),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let opts = RemovalOptions {
        scene,
        output,
        ..RemovalOptions::default()
    };

    let result = image::open(&args[1])
        .map_err(photolab::Error::from)
        .and_then(|img| remove_background(&img.into_rgb8().into(), &opts))
        .and_then(|out| save_image(&out, Path::new(&args[2])));

    match result {
        Ok(()) => println!("Done: {} ({scene}, {output})", args[2]),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
