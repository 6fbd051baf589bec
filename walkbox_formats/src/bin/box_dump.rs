use std::env;

use anyhow::{Context, Result};
use walkbox_formats::{BoxFormat, load_box_table};

fn main() -> Result<()> {
    let format = env::args()
        .nth(1)
        .context("usage: box_dump <v2|v3|v8> <box table file>")?;
    let path = env::args()
        .nth(2)
        .context("usage: box_dump <v2|v3|v8> <box table file>")?;
    let format = BoxFormat::from_tag(&format)
        .with_context(|| format!("unknown box format tag '{format}'"))?;

    let boxes = load_box_table(format, &path)?;
    println!("{}", serde_json::to_string_pretty(&boxes)?);
    Ok(())
}
