use std::{env, error::Error, fs, process};

use folio::application::render::{RenderRequest, RenderService, render_service};
use serde::Serialize;
use sha2::{Digest, Sha256};

const USAGE: &str = "usage: render_dump <markdown_path>";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dump {
    fingerprint: String,
    nav_list: Vec<String>,
    html: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        process::exit(2);
    };

    let markdown = fs::read_to_string(&path)?;
    let fingerprint = hex::encode(Sha256::digest(markdown.as_bytes()));

    let output = render_service().render(&RenderRequest::new(path, markdown))?;

    let dump = Dump {
        fingerprint,
        nav_list: output.nav_list(),
        html: output.html,
    };
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
