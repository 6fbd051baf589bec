use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use walkbox_engine::SceneContext;
use walkbox_formats::scale::decode_scale_slot_table;
use walkbox_formats::{BoxFormat, load_box_table};

/// Scene routing inspector: build the box matrix for a scene and query it.
#[derive(Parser, Debug)]
#[command(about = "Build and inspect walkbox routing for a scene", version)]
struct Args {
    /// Path to the box table file
    boxes: PathBuf,

    /// On-disk box layout of the table
    #[arg(long, value_enum, default_value_t = FormatArg::V3)]
    format: FormatArg,

    /// Optional scale slot table to install (V8 scenes)
    #[arg(long)]
    scale_slots: Option<PathBuf>,

    /// Source box id for a single route query (requires --to)
    #[arg(long)]
    from: Option<u8>,

    /// Destination box id for a single route query (requires --from)
    #[arg(long)]
    to: Option<u8>,

    /// Path to write the full scene report as JSON (default: stdout)
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    V2,
    V3,
    V8,
}

impl From<FormatArg> for BoxFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::V2 => BoxFormat::V2,
            FormatArg::V3 => BoxFormat::V3,
            FormatArg::V8 => BoxFormat::V8,
        }
    }
}

#[derive(Serialize)]
struct SceneReport {
    format: BoxFormat,
    num_boxes: usize,
    matrix_bytes: usize,
    boxes: Vec<BoxReport>,
    routes: Vec<RouteReport>,
}

#[derive(Serialize)]
struct BoxReport {
    id: u8,
    coords: walkbox_formats::BoxCoords,
    mask: u8,
    flags: u8,
    scale: u32,
    scale_slot: u16,
}

#[derive(Serialize)]
struct RouteReport {
    from: u8,
    to: u8,
    next_hop: Option<u8>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let format = BoxFormat::from(args.format);

    let boxes = load_box_table(format, &args.boxes)?;
    let mut scene = SceneContext::new(format, boxes);

    if let Some(path) = &args.scale_slots {
        let raw = fs::read(path)
            .with_context(|| format!("reading scale slot table {}", path.display()))?;
        let slots = decode_scale_slot_table(&raw)?;
        for (index, slot) in slots.iter().enumerate() {
            scene.set_scale_slot(index as u16 + 1, *slot)?;
        }
    }

    scene.build_box_matrix()?;

    match (args.from, args.to) {
        (Some(from), Some(to)) => print_route(&scene, from, to),
        (None, None) => write_report(&scene, args.report_json.as_deref()),
        _ => bail!("--from and --to must be given together"),
    }
}

/// Walk the routing matrix hop by hop and print the full chain.
fn print_route(scene: &SceneContext, from: u8, to: u8) -> Result<()> {
    let mut chain = vec![from];
    let mut current = from;
    while current != to {
        match scene.get_path_to_dest_box(current, to)? {
            Some(next) => {
                chain.push(next);
                current = next;
            }
            None => {
                println!("{from} -> {to}: unreachable");
                return Ok(());
            }
        }
    }
    let rendered: Vec<String> = chain.iter().map(|id| id.to_string()).collect();
    println!("{from} -> {to}: {}", rendered.join(" -> "));
    Ok(())
}

fn write_report(scene: &SceneContext, path: Option<&std::path::Path>) -> Result<()> {
    let num_boxes = scene.num_boxes();
    let mut boxes = Vec::with_capacity(num_boxes);
    for id in 0..num_boxes as u8 {
        let Some(def) = scene.box_def(id)?.copied() else {
            continue;
        };
        boxes.push(BoxReport {
            id,
            coords: def.coords,
            mask: def.mask,
            flags: def.flags.0,
            scale: def.scale,
            scale_slot: def.scale_slot,
        });
    }

    let mut routes = Vec::with_capacity(num_boxes * num_boxes);
    for from in 0..num_boxes as u8 {
        for to in 0..num_boxes as u8 {
            routes.push(RouteReport {
                from,
                to,
                next_hop: scene.get_path_to_dest_box(from, to)?,
            });
        }
    }

    let report = SceneReport {
        format: scene.format(),
        num_boxes,
        matrix_bytes: scene.matrix().map(|m| m.as_bytes().len()).unwrap_or(0),
        boxes,
        routes,
    };
    let rendered = serde_json::to_string_pretty(&report)?;
    match path {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing report {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
